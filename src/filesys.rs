// src/filesys.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Filesystem facade over the object store.
//!
//! Directories do not exist in the store; they are inferred from key prefixes
//! at listing time. `get_path_info` therefore always lists, and a path is a
//! directory exactly when some key continues it with a `/`.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ObsConfig;
use crate::constants::OBS_PROTOCOL;
use crate::error::{Error, Result};
use crate::lister::list_objects;
use crate::multipart::ObjectWriteStream;
use crate::read_stream::ObjectReadStream;
use crate::retry::{RetryConfig, RetryTransport};
use crate::s3_transport::S3Transport;
use crate::stream::{SeekStream, Stream};
use crate::transport::ObjectTransport;
use crate::uri::{FileInfo, Uri};

/// How a stream is opened. Text and binary modes behave the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" | "rb" => Ok(Self::Read),
            "w" | "wb" => Ok(Self::Write),
            other => Err(Error::usage(format!(
                "invalid open mode '{other}', expected one of r, rb, w, wb"
            ))),
        }
    }
}

/// Operations shared by every backing store.
pub trait FileSystem: Send + Sync {
    /// Entry for `path`, which may name a file or a directory.
    fn get_path_info(&self, path: &Uri) -> Result<FileInfo>;

    /// Direct children of a directory, or the single entry of a file path.
    /// Unknown paths list as empty.
    fn list_directory(&self, path: &Uri) -> Result<Vec<FileInfo>>;

    /// Open a stream. For reads, a missing path gives `Ok(None)` when
    /// `allow_missing` is set and `NotFound` otherwise.
    fn open(&self, path: &Uri, mode: &str, allow_missing: bool) -> Result<Option<Box<dyn Stream>>>;

    fn open_for_read(&self, path: &Uri, allow_missing: bool) -> Result<Option<Box<dyn SeekStream>>>;
}

pub struct ObjectFileSystem {
    transport: Arc<dyn ObjectTransport>,
    write_buffer_size: usize,
}

impl ObjectFileSystem {
    pub fn new(transport: Arc<dyn ObjectTransport>, write_buffer_size: usize) -> Self {
        Self {
            transport,
            write_buffer_size,
        }
    }

    /// Connect to the endpoint in `cfg`, with retries when `max_retries > 0`.
    pub fn from_config(cfg: &ObsConfig) -> Result<Self> {
        let s3: Arc<dyn ObjectTransport> = Arc::new(S3Transport::connect(cfg)?);
        let transport: Arc<dyn ObjectTransport> = if cfg.max_retries > 0 {
            Arc::new(RetryTransport::new(s3, RetryConfig::with_max_retries(cfg.max_retries)))
        } else {
            s3
        };
        info!(endpoint = %cfg.endpoint, retries = cfg.max_retries, "object filesystem ready");
        Ok(Self::new(transport, cfg.write_buffer_size))
    }

    pub fn transport(&self) -> &Arc<dyn ObjectTransport> {
        &self.transport
    }

    pub fn write_buffer_size(&self) -> usize {
        self.write_buffer_size
    }

    fn check_protocol(path: &Uri) -> Result<()> {
        if path.protocol != OBS_PROTOCOL {
            return Err(Error::usage(format!(
                "'{path}' is not an {OBS_PROTOCOL} path"
            )));
        }
        Ok(())
    }

    /// Like [`FileSystem::get_path_info`], with absence as `None`.
    pub fn try_get_path_info(&self, path: &Uri) -> Result<Option<FileInfo>> {
        Self::check_protocol(path)?;
        let target = path.trim_trailing_slashes();
        if target.name == "/" {
            return Ok(Some(FileInfo::directory(target)));
        }

        let as_dir = format!("{}/", target.name);
        let found = list_objects(self.transport.as_ref(), &target)?
            .into_iter()
            .find(|e| e.path.name == target.name || e.path.name == as_dir);
        Ok(found)
    }

    fn open_reader(&self, path: &Uri, allow_missing: bool) -> Result<Option<ObjectReadStream>> {
        match self.try_get_path_info(path)? {
            Some(info) if !info.is_dir() => {
                debug!(path = %path, size = info.size, "opening for read");
                Ok(Some(ObjectReadStream::new(
                    Arc::clone(&self.transport),
                    path.clone(),
                    info.size,
                )))
            }
            _ if allow_missing => Ok(None),
            _ => Err(Error::not_found(path.to_string())),
        }
    }
}

impl FileSystem for ObjectFileSystem {
    fn get_path_info(&self, path: &Uri) -> Result<FileInfo> {
        self.try_get_path_info(path)?
            .ok_or_else(|| Error::not_found(path.to_string()))
    }

    fn list_directory(&self, path: &Uri) -> Result<Vec<FileInfo>> {
        Self::check_protocol(path)?;
        if path.is_directory_syntax() {
            return list_objects(self.transport.as_ref(), path);
        }

        let as_dir = format!("{}/", path.name);
        let entries = list_objects(self.transport.as_ref(), path)?;
        if let Some(file) = entries.iter().find(|e| !e.is_dir() && e.path.name == path.name) {
            return Ok(vec![file.clone()]);
        }
        if entries.iter().any(|e| e.is_dir() && e.path.name == as_dir) {
            return list_objects(self.transport.as_ref(), &path.with_name(as_dir));
        }
        Ok(Vec::new())
    }

    fn open(&self, path: &Uri, mode: &str, allow_missing: bool) -> Result<Option<Box<dyn Stream>>> {
        Self::check_protocol(path)?;
        match mode.parse::<OpenMode>()? {
            OpenMode::Read => Ok(self
                .open_reader(path, allow_missing)?
                .map(|s| Box::new(s) as Box<dyn Stream>)),
            OpenMode::Write => {
                let writer = ObjectWriteStream::with_buffer_size(
                    Arc::clone(&self.transport),
                    path.clone(),
                    self.write_buffer_size,
                )?;
                Ok(Some(Box::new(writer)))
            }
        }
    }

    fn open_for_read(&self, path: &Uri, allow_missing: bool) -> Result<Option<Box<dyn SeekStream>>> {
        Ok(self
            .open_reader(path, allow_missing)?
            .map(|s| Box::new(s) as Box<dyn SeekStream>))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_mode_parsing() {
        assert_eq!("rb".parse::<OpenMode>().unwrap(), OpenMode::Read);
        assert_eq!("w".parse::<OpenMode>().unwrap(), OpenMode::Write);
        assert!(matches!("a".parse::<OpenMode>(), Err(Error::Usage { .. })));
        assert!("r+".parse::<OpenMode>().is_err());
    }
}
