// src/stream_factory.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Routes a path to the filesystem that owns its protocol.

use std::sync::Arc;

use crate::config::ObsConfig;
use crate::constants::{FILE_PROTOCOL, OBS_PROTOCOL};
use crate::error::{Error, Result};
use crate::filesys::{FileSystem, ObjectFileSystem};
use crate::local_fs::LocalFileSystem;
use crate::stream::{SeekStream, Stream};
use crate::uri::Uri;

/// `obs://` paths need credentials; local ones never do.
pub fn requires_obs_credentials(path: &str) -> bool {
    path.starts_with(OBS_PROTOCOL)
}

#[derive(Default)]
pub struct StreamFactory {
    local: LocalFileSystem,
    object: Option<Arc<ObjectFileSystem>>,
}

impl StreamFactory {
    /// Local paths only; `obs://` paths are rejected.
    pub fn local_only() -> Self {
        Self::default()
    }

    pub fn with_object_store(object: Arc<ObjectFileSystem>) -> Self {
        Self {
            local: LocalFileSystem::new(),
            object: Some(object),
        }
    }

    /// Connect to the object store only if one of `paths` needs it, so purely
    /// local runs work without credentials.
    pub fn for_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        if paths.into_iter().any(requires_obs_credentials) {
            let cfg = ObsConfig::from_env()?;
            Ok(Self::with_object_store(Arc::new(ObjectFileSystem::from_config(&cfg)?)))
        } else {
            Ok(Self::local_only())
        }
    }

    pub fn filesystem_for(&self, path: &Uri) -> Result<&dyn FileSystem> {
        match path.protocol.as_str() {
            "" | FILE_PROTOCOL => Ok(&self.local),
            OBS_PROTOCOL => match &self.object {
                Some(fs) => Ok(&**fs as &dyn FileSystem),
                None => Err(Error::config(format!(
                    "'{path}' needs an object store, but none is configured"
                ))),
            },
            other => Err(Error::usage(format!("unsupported protocol '{other}' in '{path}'"))),
        }
    }

    /// Open `path` in `mode` (`r`, `rb`, `w`, `wb`). A missing read target is `NotFound`.
    pub fn create(&self, path: &str, mode: &str) -> Result<Box<dyn Stream>> {
        let uri = Uri::parse(path);
        self.filesystem_for(&uri)?
            .open(&uri, mode, false)?
            .ok_or_else(|| Error::not_found(path))
    }

    pub fn create_for_read(&self, path: &str) -> Result<Box<dyn SeekStream>> {
        let uri = Uri::parse(path);
        self.filesystem_for(&uri)?
            .open_for_read(&uri, false)?
            .ok_or_else(|| Error::not_found(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_transport::MemoryTransport;

    #[test]
    fn routes_by_protocol() {
        let local = StreamFactory::local_only();
        assert!(local.filesystem_for(&Uri::parse("/tmp/x")).is_ok());
        assert!(local.filesystem_for(&Uri::parse("file:///tmp/x")).is_ok());
        assert!(matches!(
            local.filesystem_for(&Uri::parse("obs://b/k")),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            local.filesystem_for(&Uri::parse("s3://b/k")),
            Err(Error::Usage { .. })
        ));

        let obs = ObjectFileSystem::new(Arc::new(MemoryTransport::new()), 1024);
        let factory = StreamFactory::with_object_store(Arc::new(obs));
        assert!(factory.filesystem_for(&Uri::parse("obs://b/k")).is_ok());
    }

    #[test]
    fn local_paths_need_no_credentials() {
        assert!(StreamFactory::for_paths(["/data/in", "out/"]).is_ok());
        assert!(requires_obs_credentials("obs://bucket/key"));
        assert!(!requires_obs_credentials("file:///bucket/key"));
    }
}
