// src/config.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Object-store connection settings, read once at construction.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_OPERATION_TIMEOUT_SECS, DEFAULT_REGION,
    DEFAULT_WRITE_BUFFER_SIZE, ENV_ACCESS_KEY_ID, ENV_CA_BUNDLE_PATH, ENV_ENDPOINT,
    ENV_MAX_RETRIES, ENV_OPERATION_TIMEOUT_SECS, ENV_REGION, ENV_SECRET_ACCESS_KEY,
    ENV_WRITE_BUFFER_MB,
};
use crate::error::{Error, Result};

/// Runtime parameters for the object-store transport and streams.
#[derive(Clone)]
pub struct ObsConfig {
    pub access_key_id:     String,
    pub secret_access_key: String,
    pub endpoint:          String,      // always carries a scheme, see normalize_endpoint()
    pub region:            String,
    pub write_buffer_size: usize,       // bytes per upload part
    pub operation_timeout: Duration,
    pub max_retries:       u32,         // 0 => every transport error is final
    pub ca_bundle_path:    Option<PathBuf>,
}

// Keep the secret out of logs.
impl fmt::Debug for ObsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObsConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("write_buffer_size", &self.write_buffer_size)
            .field("operation_timeout", &self.operation_timeout)
            .field("max_retries", &self.max_retries)
            .field("ca_bundle_path", &self.ca_bundle_path)
            .finish()
    }
}

impl ObsConfig {
    /// Build a config with explicit credentials and defaults for everything else.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        endpoint: impl AsRef<str>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            endpoint: normalize_endpoint(endpoint.as_ref()),
            region: DEFAULT_REGION.to_string(),
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            operation_timeout: Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            ca_bundle_path: None,
        }
    }

    /// Load from the process environment (after applying any `.env` file).
    pub fn from_env() -> Result<Self> {
        // Loads any variables from .env file that are not already set
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    ///
    /// Missing credentials or endpoint are reported before any I/O happens.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::config(format!("Need to set environment variable {name} to use OBS")))
        };

        let mut cfg = Self::new(
            required(ENV_ACCESS_KEY_ID)?,
            required(ENV_SECRET_ACCESS_KEY)?,
            required(ENV_ENDPOINT)?,
        );

        if let Some(region) = lookup(ENV_REGION).filter(|v| !v.is_empty()) {
            cfg.region = region;
        }
        if let Some(mb) = lookup(ENV_WRITE_BUFFER_MB) {
            let mb: usize = parse_number(ENV_WRITE_BUFFER_MB, &mb)?;
            if mb == 0 {
                return Err(Error::config(format!("{ENV_WRITE_BUFFER_MB} must be at least 1")));
            }
            cfg.write_buffer_size = mb
                .checked_mul(1 << 20)
                .ok_or_else(|| Error::config(format!("{ENV_WRITE_BUFFER_MB}={mb} is too large")))?;
        }
        if let Some(secs) = lookup(ENV_OPERATION_TIMEOUT_SECS) {
            cfg.operation_timeout = Duration::from_secs(parse_number(ENV_OPERATION_TIMEOUT_SECS, &secs)?);
        }
        if let Some(retries) = lookup(ENV_MAX_RETRIES) {
            cfg.max_retries = parse_number(ENV_MAX_RETRIES, &retries)?;
        }
        cfg.ca_bundle_path = lookup(ENV_CA_BUNDLE_PATH)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(cfg)
    }

    pub fn with_write_buffer_size(mut self, bytes: usize) -> Self {
        self.write_buffer_size = bytes;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{name} must be a non-negative integer, got '{value}'")))
}

/// OBS endpoints are commonly given as bare host names; the SDK wants a URL.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}
