// src/uri.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Store-qualified paths and listing entries.
//!
//! A [`Uri`] splits `scheme://bucket/key` into its protocol (`"obs://"`), host
//! (the bucket) and name (the key, always starting with `/`). A path without
//! `://` is a local path and lives entirely in `name`.
//!
//! ```
//! use obsfs::Uri;
//!
//! let uri = Uri::parse("obs://models/run-1/part-0");
//! assert_eq!(uri.protocol, "obs://");
//! assert_eq!(uri.host, "models");
//! assert_eq!(uri.name, "/run-1/part-0");
//! assert_eq!(uri.transport_key(), "run-1/part-0");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::constants::PATH_DELIMITER;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Uri {
    /// Scheme including the separator, e.g. `"obs://"`; empty for local paths.
    pub protocol: String,
    /// Bucket for object-store URIs; empty for local paths.
    pub host: String,
    /// Object key with a leading `/`, or the local path.
    pub name: String,
}

impl Uri {
    pub fn parse(s: &str) -> Self {
        let Some(idx) = s.find("://") else {
            return Self {
                protocol: String::new(),
                host: String::new(),
                name: s.to_string(),
            };
        };
        let protocol = s[..idx + 3].to_string();
        let rest = &s[idx + 3..];
        let (host, name) = match rest.find('/') {
            Some(slash) => (&rest[..slash], &rest[slash..]),
            None => (rest, PATH_DELIMITER),
        };
        Self {
            protocol,
            host: host.to_string(),
            name: name.to_string(),
        }
    }

    /// A directory is recognized syntactically only: a trailing `/`.
    pub fn is_directory_syntax(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Copy of this URI with trailing slashes removed from the name. A lone
    /// `/` is kept so the bucket root stays addressable.
    pub fn trim_trailing_slashes(&self) -> Self {
        let mut out = self.clone();
        while out.name.len() > 1 && out.name.ends_with('/') {
            out.name.pop();
        }
        out
    }

    /// Key as submitted to the transport: the name without its leading `/`.
    pub fn transport_key(&self) -> &str {
        self.name.strip_prefix('/').unwrap_or(&self.name)
    }

    /// Last path component; empty for a directory URI.
    pub fn basename(&self) -> &str {
        match self.name.rfind(['/', '\\']) {
            Some(idx) => &self.name[idx + 1..],
            None => &self.name,
        }
    }

    /// Same protocol and host, with `child` appended below this name.
    pub fn join(&self, child: &str) -> Self {
        let mut out = self.clone();
        if !out.name.is_empty() && !out.name.ends_with('/') {
            out.name.push('/');
        }
        out.name.push_str(child.trim_start_matches('/'));
        out
    }

    /// Same protocol and host with a different name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            protocol: self.protocol.clone(),
            host: self.host.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.protocol, self.host, self.name)
    }
}

impl FromStr for Uri {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Uri {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
}

/// One listing entry. Always derived from a fresh listing; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: Uri,
    pub size: u64,
    pub file_type: FileType,
}

impl FileInfo {
    pub fn file(path: Uri, size: u64) -> Self {
        Self { path, size, file_type: FileType::File }
    }

    pub fn directory(path: Uri) -> Self {
        Self { path, size: 0, file_type: FileType::Directory }
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}
