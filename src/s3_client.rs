// src/s3_client.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Thread‑safe, blocking bridge to the async AWS Rust SDK.
//! Owns a single background multi-thread Tokio runtime and builds S3 clients
//! against an OBS (S3-compatible) endpoint from an [`ObsConfig`].
//!

use aws_config::meta::region::RegionProviderChain;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client;
use aws_smithy_http_client::tls;
use aws_smithy_http_client::tls::rustls_provider::CryptoMode;
use std::path::Path;
use std::sync::mpsc;
use std::{fs, thread, time::Duration};
use tokio::runtime::{Builder as TokioBuilder, Handle};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::config::ObsConfig;
use crate::constants::{DEFAULT_CONNECT_TIMEOUT_SECS, ENV_RT_THREADS};
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// Global runtime (lazy, thread-safe)
// -----------------------------------------------------------------------------
static RT_HANDLE: once_cell::sync::OnceCell<Handle> = once_cell::sync::OnceCell::new();

// Create (once) a background multi-thread Tokio runtime and return its Handle.
fn global_rt_handle() -> Result<&'static Handle> {
    RT_HANDLE.get_or_try_init(|| {
        let (tx, rx) = mpsc::sync_channel(1);
        thread::Builder::new()
            .name("obsfs-rt".to_string())
            .spawn(move || {
                let threads = get_runtime_threads();
                debug!("Creating Tokio runtime with {} worker threads", threads);

                let rt = match TokioBuilder::new_multi_thread()
                    .enable_io()
                    .enable_time()
                    .worker_threads(threads)
                    .thread_name("obsfs-rt-worker")
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        return;
                    }
                };

                // Send a Handle clone back to the creator, then park the runtime forever.
                let _ = tx.send(Ok(rt.handle().clone()));
                rt.block_on(std::future::pending::<()>());
            })
            .map_err(|e| Error::runtime(format!("failed to spawn runtime thread: {e}")))?;

        rx.recv()
            .map_err(|_| Error::runtime("runtime thread exited before reporting its handle"))?
            .map_err(|e| Error::runtime(format!("failed to build tokio runtime: {e}")))
    })
}

/// Worker thread count with environment override
fn get_runtime_threads() -> usize {
    std::env::var(ENV_RT_THREADS)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &usize| *n > 0)
        .unwrap_or_else(|| {
            let cores = num_cpus::get();
            // Calls block their caller, so a handful of workers is plenty
            std::cmp::min(std::cmp::max(4, cores), 16)
        })
}

/// Run an async `fut` on the global runtime and block the **current** thread
/// until it completes. Handles both runtime and non-runtime contexts.
pub fn run_on_global_rt<F, T>(fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let handle = global_rt_handle()?.clone();

    match Handle::try_current() {
        Ok(_) => {
            // Inside some other runtime: a std channel blocks without tripping
            // Tokio's "blocking inside async context" check.
            let (tx, rx) = mpsc::channel();
            handle.spawn(async move {
                let _ = tx.send(fut.await);
            });
            rx.recv()
                .map_err(|_| Error::runtime("global runtime task crashed before completing"))?
        }
        Err(_) => {
            let (tx, rx) = oneshot::channel();
            handle.spawn(async move {
                let _ = tx.send(fut.await);
            });

            // Block this plain OS thread until the async result arrives.
            rx.blocking_recv()
                .map_err(|_| Error::runtime("global runtime task crashed before completing"))?
        }
    }
}

// -----------------------------------------------------------------------------
// TLS helper, for CA bundle
// -----------------------------------------------------------------------------

/// Create a TLS context using a CA bundle file
fn tls_context_from_pem(filename: impl AsRef<Path>) -> Result<tls::TlsContext> {
    let pem_contents = fs::read(&filename).map_err(|e| Error::io(filename.as_ref(), e))?;

    // Build a trust store containing exactly that PEM
    let trust_store = tls::TrustStore::empty()
        .with_pem_certificate(pem_contents.as_slice());

    tls::TlsContext::builder()
        .with_trust_store(trust_store)
        .build()
        .map_err(|e| {
            Error::config(format!(
                "Failed to build TLS context from PEM {}: {e}",
                filename.as_ref().display()
            ))
        })
}

// -----------------------------------------------------------------------------
// Client factory (built on the global runtime)
// -----------------------------------------------------------------------------

/// Build an S3 client for the configured endpoint. Blocks until ready.
pub fn build_client(cfg: &ObsConfig) -> Result<Client> {
    let cfg = cfg.clone();
    run_on_global_rt(async move { build_client_async(&cfg).await })
}

/// Async variant of [`build_client`].
pub async fn build_client_async(cfg: &ObsConfig) -> Result<Client> {
    let credentials = Credentials::new(
        cfg.access_key_id.clone(),
        cfg.secret_access_key.clone(),
        None,
        None,
        "obsfs-config",
    );

    let region = RegionProviderChain::first_try(Some(Region::new(cfg.region.clone())));

    let timeout_config = TimeoutConfig::builder()
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .operation_timeout(cfg.operation_timeout)
        .build();

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(region)
        .credentials_provider(credentials)
        .endpoint_url(cfg.endpoint.clone())
        .timeout_config(timeout_config);

    if let Some(ca_bundle_path) = &cfg.ca_bundle_path {
        info!("Loading CA bundle from: {}", ca_bundle_path.display());
        let tls_context = tls_context_from_pem(ca_bundle_path)?;
        let http_client = aws_smithy_http_client::Builder::new()
            .tls_provider(tls::Provider::Rustls(CryptoMode::AwsLc))
            .tls_context(tls_context)
            .build_https();
        loader = loader.http_client(http_client);
    }

    let sdk_config = loader.load().await;

    // OBS and other S3-compatible services expect path-style addressing
    // (endpoint/bucket) rather than virtual-hosted buckets.
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(true)
        .build();

    debug!(endpoint = %cfg.endpoint, region = %cfg.region, "built S3 client");
    Ok(Client::from_conf(s3_config))
}
