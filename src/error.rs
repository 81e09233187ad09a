// src/error.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Error type shared by every obsfs component.
//!
//! The variants follow the failure classes of the filesystem: configuration,
//! transport, integrity, usage and not-found, plus local I/O and malformed
//! push input. Nothing in the library terminates the process; callers decide.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{op} failed for '{path}'{}: {message}", status_suffix(.status))]
    Transport {
        op: &'static str,
        path: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Integrity error for '{path}': {message}")]
    Integrity { path: String, message: String },

    #[error("Invalid usage: {message}")]
    Usage { message: String },

    #[error("'{path}' not found")]
    NotFound { path: String },

    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record in '{path}' (record {index}): {message}")]
    Record {
        path: String,
        index: u64,
        message: String,
    },

    #[error("Runtime error: {message}")]
    Runtime { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

// Convenience constructors
impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn transport(
        op: &'static str,
        path: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            op,
            path: path.into(),
            status,
            message: message.into(),
        }
    }

    pub fn integrity(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Integrity {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage { message: message.into() }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn record(path: impl Into<String>, index: u64, message: impl Into<String>) -> Self {
        Self::Record {
            path: path.into(),
            index,
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime { message: message.into() }
    }

    /// Whether retrying the same call could plausibly succeed.
    ///
    /// Only transport failures qualify: timeouts, throttling, server errors and
    /// failures that never produced an HTTP status (connection resets, dispatch
    /// errors).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } => true,
            Self::Transport { status: Some(s), .. } => *s == 408 || *s == 429 || *s >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::NotFound { .. } => std::io::ErrorKind::NotFound,
            Error::Usage { .. } => std::io::ErrorKind::Unsupported,
            Error::Io { source, .. } => source.kind(),
            Error::Integrity { .. } | Error::Record { .. } => std::io::ErrorKind::InvalidData,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_message_includes_status_and_path() {
        let err = Error::transport("GetObject", "obs://bucket/key", Some(416), "InvalidRange");
        let msg = err.to_string();
        assert!(msg.contains("GetObject"));
        assert!(msg.contains("obs://bucket/key"));
        assert!(msg.contains("status 416"));
        assert!(msg.contains("InvalidRange"));
    }

    #[test]
    fn transient_classification() {
        assert!(Error::transport("ListObjects", "p", Some(503), "slow down").is_transient());
        assert!(Error::transport("ListObjects", "p", Some(429), "throttled").is_transient());
        assert!(Error::transport("ListObjects", "p", None, "connection reset").is_transient());
        assert!(!Error::transport("ListObjects", "p", Some(403), "denied").is_transient());
        assert!(!Error::integrity("p", "empty etag").is_transient());
        assert!(!Error::not_found("p").is_transient());
    }

    #[test]
    fn converts_to_io_error_kind() {
        let io: std::io::Error = Error::not_found("obs://b/k").into();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
        let io: std::io::Error = Error::usage("write on read stream").into();
        assert_eq!(io.kind(), std::io::ErrorKind::Unsupported);
    }
}
