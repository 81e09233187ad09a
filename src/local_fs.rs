// src/local_fs.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Local filesystem backend for bare paths and `file://` URIs.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::FILE_PROTOCOL;
use crate::error::{Error, Result};
use crate::filesys::{FileSystem, OpenMode};
use crate::stream::{SeekStream, Stream};
use crate::uri::{FileInfo, Uri};

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Path on disk for a bare or `file://` URI. An empty name is the current directory.
    pub fn local_path(uri: &Uri) -> Result<PathBuf> {
        if !uri.protocol.is_empty() && uri.protocol != FILE_PROTOCOL {
            return Err(Error::usage(format!("'{uri}' is not a local path")));
        }
        let joined = format!("{}{}", uri.host, uri.name);
        Ok(if joined.is_empty() { PathBuf::from(".") } else { PathBuf::from(joined) })
    }

    fn open_reader(&self, path: &Uri, allow_missing: bool) -> Result<Option<LocalReadStream>> {
        let local = Self::local_path(path)?;
        match fs::metadata(&local) {
            Ok(meta) if meta.is_file() => {
                let file = File::open(&local).map_err(|e| Error::io(&local, e))?;
                Ok(Some(LocalReadStream {
                    file,
                    path: local,
                    size: meta.len(),
                    offset: 0,
                    at_end: false,
                }))
            }
            Ok(_) if allow_missing => Ok(None),
            Ok(_) => Err(Error::not_found(path.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound && allow_missing => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::not_found(path.to_string())),
            Err(e) => Err(Error::io(&local, e)),
        }
    }
}

fn entry_for(uri: Uri, meta: &fs::Metadata) -> FileInfo {
    if meta.is_dir() {
        FileInfo::directory(uri)
    } else {
        FileInfo::file(uri, meta.len())
    }
}

impl FileSystem for LocalFileSystem {
    fn get_path_info(&self, path: &Uri) -> Result<FileInfo> {
        let local = Self::local_path(path)?;
        match fs::metadata(&local) {
            Ok(meta) => Ok(entry_for(path.clone(), &meta)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::not_found(path.to_string())),
            Err(e) => Err(Error::io(&local, e)),
        }
    }

    fn list_directory(&self, path: &Uri) -> Result<Vec<FileInfo>> {
        let local = Self::local_path(path)?;
        let meta = match fs::metadata(&local) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&local, e)),
        };
        if meta.is_file() {
            return Ok(vec![FileInfo::file(path.clone(), meta.len())]);
        }

        let mut entries = Vec::new();
        for dirent in fs::read_dir(&local).map_err(|e| Error::io(&local, e))? {
            let dirent = dirent.map_err(|e| Error::io(&local, e))?;
            let meta = dirent.metadata().map_err(|e| Error::io(dirent.path(), e))?;
            let name = dirent.file_name().to_string_lossy().into_owned();
            let child = if meta.is_dir() {
                path.join(&format!("{name}/"))
            } else {
                path.join(&name)
            };
            entries.push(entry_for(child, &meta));
        }
        entries.sort_by(|a, b| a.path.name.cmp(&b.path.name));
        Ok(entries)
    }

    fn open(&self, path: &Uri, mode: &str, allow_missing: bool) -> Result<Option<Box<dyn Stream>>> {
        match mode.parse::<OpenMode>()? {
            OpenMode::Read => Ok(self
                .open_reader(path, allow_missing)?
                .map(|s| Box::new(s) as Box<dyn Stream>)),
            OpenMode::Write => {
                let local = Self::local_path(path)?;
                Ok(Some(Box::new(LocalWriteStream::create(local)?)))
            }
        }
    }

    fn open_for_read(&self, path: &Uri, allow_missing: bool) -> Result<Option<Box<dyn SeekStream>>> {
        Ok(self
            .open_reader(path, allow_missing)?
            .map(|s| Box::new(s) as Box<dyn SeekStream>))
    }
}

pub struct LocalReadStream {
    file: File,
    path: PathBuf,
    size: u64,
    offset: u64,
    at_end: bool,
}

impl Stream for LocalReadStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || self.at_end {
            return Ok(0);
        }
        let n = self.file.read(buf).map_err(|e| Error::io(&self.path, e))?;
        self.offset += n as u64;
        self.at_end = n == 0 || self.offset >= self.size;
        Ok(n)
    }

    fn write(&mut self, _data: &[u8]) -> Result<()> {
        Err(Error::usage(format!("'{}' is opened for reading", self.path.display())))
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl SeekStream for LocalReadStream {
    fn seek(&mut self, pos: u64) -> Result<()> {
        if pos != self.offset {
            self.file
                .seek(SeekFrom::Start(pos))
                .map_err(|e| Error::io(&self.path, e))?;
            self.offset = pos;
            self.at_end = false;
        }
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.offset
    }

    fn at_end(&self) -> bool {
        self.at_end
    }
}

pub struct LocalWriteStream {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl LocalWriteStream {
    /// Create (or truncate) `path`, making missing parent directories.
    pub fn create(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
        debug!(path = %path.display(), "opened local file for write");
        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Stream for LocalWriteStream {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::usage(format!("'{}' is opened for writing", self.path.display())))
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data).map_err(|e| Error::io(&self.path, e))
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        self.writer.flush().map_err(|e| Error::io(&self.path, e))?;
        self.writer.get_ref().sync_all().map_err(|e| Error::io(&self.path, e))
    }

    fn abort(self: Box<Self>) -> Result<()> {
        let Self { writer, path } = *self;
        drop(writer);
        debug!(path = %path.display(), "removing aborted local file");
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&path, e)),
        }
    }
}
