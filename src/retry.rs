// src/retry.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Bounded retry with exponential backoff and jitter for transport calls.
//!
//! Only transient failures (see [`Error::is_transient`](crate::Error::is_transient)) are retried. When
//! attempts run out, the last error is returned unchanged, so callers see the
//! same failure they would have seen without this layer.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use tracing::warn;

use crate::constants::{DEFAULT_RETRY_INITIAL_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS};
use crate::error::Result;
use crate::transport::{KeyPage, ObjectTransport, PartTag};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first call.
    pub max_retries: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier (e.g., 2.0 for exponential backoff).
    pub backoff_multiplier: f64,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let secs = if self.jitter {
            // Jitter in [capped/2, capped]
            capped * rand::rng().random_range(0.5..=1.0)
        } else {
            capped
        };
        Duration::from_secs_f64(secs)
    }
}

/// Run `f` until it succeeds, fails permanently, or the policy is exhausted.
pub fn with_retry<T>(policy: &RetryConfig, what: &str, mut f: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 0;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    what,
                    attempt + 1,
                    policy.max_retries + 1,
                    delay,
                    e
                );
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Transport decorator applying a [`RetryConfig`] to every primitive.
pub struct RetryTransport {
    inner: Arc<dyn ObjectTransport>,
    policy: RetryConfig,
}

impl RetryTransport {
    pub fn new(inner: Arc<dyn ObjectTransport>, policy: RetryConfig) -> Self {
        Self { inner, policy }
    }
}

impl ObjectTransport for RetryTransport {
    fn list_keys(
        &self,
        bucket: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: usize,
    ) -> Result<KeyPage> {
        with_retry(&self.policy, "ListObjects", || {
            self.inner.list_keys(bucket, prefix, marker, delimiter, max_keys)
        })
    }

    fn get_range(&self, bucket: &str, key: &str, start: u64, length: u64) -> Result<Bytes> {
        with_retry(&self.policy, "GetObject", || self.inner.get_range(bucket, key, start, length))
    }

    fn initiate_multipart_upload(&self, bucket: &str, key: &str) -> Result<String> {
        with_retry(&self.policy, "CreateMultipartUpload", || {
            self.inner.initiate_multipart_upload(bucket, key)
        })
    }

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<String> {
        // Bytes clones share the buffer, so a retry resends the same part cheaply.
        with_retry(&self.policy, "UploadPart", || {
            self.inner
                .upload_part(bucket, key, upload_id, part_number, data.clone())
        })
    }

    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartTag],
    ) -> Result<()> {
        with_retry(&self.policy, "CompleteMultipartUpload", || {
            self.inner.complete_multipart_upload(bucket, key, upload_id, parts)
        })
    }

    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        with_retry(&self.policy, "AbortMultipartUpload", || {
            self.inner.abort_multipart_upload(bucket, key, upload_id)
        })
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory_transport::MemoryTransport;
    use crate::transport::TransportOp;

    fn fast_policy(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn delay_grows_and_caps() {
        let policy = RetryConfig {
            jitter: false,
            ..Default::default()
        };
        assert_eq!(policy.delay_for_attempt(0).as_millis(), 100);
        assert_eq!(policy.delay_for_attempt(1).as_millis(), 200);
        assert_eq!(policy.delay_for_attempt(20).as_millis(), policy.max_delay.as_millis());
    }

    #[test]
    fn transient_failure_is_retried() {
        let mem = Arc::new(MemoryTransport::new());
        mem.put_object("b", "k", Bytes::from_static(b"hello"));
        mem.fail_next(TransportOp::GetRange, 503);

        let t = RetryTransport::new(mem.clone(), fast_policy(2));
        assert_eq!(&t.get_range("b", "k", 0, 5).unwrap()[..], b"hello");
        assert_eq!(mem.calls(TransportOp::GetRange), 2);
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let mem = Arc::new(MemoryTransport::new());
        mem.fail_next(TransportOp::ListKeys, 403);

        let t = RetryTransport::new(mem.clone(), fast_policy(5));
        let err = t.list_keys("b", "", "", "/", 10).unwrap_err();
        assert!(matches!(err, Error::Transport { status: Some(403), .. }));
        assert_eq!(mem.calls(TransportOp::ListKeys), 1);
    }

    #[test]
    fn exhaustion_returns_last_error() {
        let mem = Arc::new(MemoryTransport::new());
        for _ in 0..3 {
            mem.fail_next(TransportOp::InitiateMultipartUpload, 500);
        }
        let t = RetryTransport::new(mem.clone(), fast_policy(1));
        let err = t.initiate_multipart_upload("b", "k").unwrap_err();
        assert!(matches!(err, Error::Transport { status: Some(500), .. }));
        assert_eq!(mem.calls(TransportOp::InitiateMultipartUpload), 2);
    }
}
