// src/constants.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
// Centralized constants for obsfs to avoid hardcoded values throughout the codebase

/// URI protocol handled by the object-store filesystem.
pub const OBS_PROTOCOL: &str = "obs://";

/// URI protocol for explicit local paths. Bare paths are local as well.
pub const FILE_PROTOCOL: &str = "file://";

/// Hierarchy delimiter used for listings and path handling.
pub const PATH_DELIMITER: &str = "/";

/// Maximum number of keys requested per listing page
pub const LIST_PAGE_SIZE: usize = 1000;

/// Default write buffer (and therefore upload part) size: 64 MiB
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 64 << 20;

/// Minimum part size accepted by S3-compatible stores for all but the last part (5 MiB)
pub const MIN_MULTIPART_PART_SIZE: usize = 5 * 1024 * 1024;

/// Maximum number of parts in a multipart upload
pub const MAX_MULTIPART_PARTS: usize = 10000;

/// Default region handed to the SDK; most S3-compatible endpoints ignore it
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default timeout for a single storage operation (seconds)
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 300;

/// Connect timeout for new connections (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default retry count. Zero keeps every transport failure fatal.
pub const DEFAULT_MAX_RETRIES: u32 = 0;

/// Initial backoff delay for retried transport calls (milliseconds)
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 100;

/// Upper bound on a single backoff delay (milliseconds)
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;

/// Copy buffer used by the cli `cat` and `cp` commands (1 MiB)
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = 1024 * 1024;

/// The push tool logs progress every this many records per worker
pub const PUSH_PROGRESS_INTERVAL: u64 = 500;

// ============================================================================
// Environment variables
// ============================================================================

pub const ENV_ACCESS_KEY_ID: &str = "OBS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "OBS_SECRET_ACCESS_KEY";
pub const ENV_ENDPOINT: &str = "OBS_ENDPOINT";
pub const ENV_REGION: &str = "OBS_REGION";
pub const ENV_WRITE_BUFFER_MB: &str = "OBS_WRITE_BUFFER_MB";
pub const ENV_OPERATION_TIMEOUT_SECS: &str = "OBS_OPERATION_TIMEOUT_SECS";
pub const ENV_MAX_RETRIES: &str = "OBS_MAX_RETRIES";
pub const ENV_CA_BUNDLE_PATH: &str = "OBS_CA_BUNDLE_PATH";
pub const ENV_RT_THREADS: &str = "OBS_RT_THREADS";
