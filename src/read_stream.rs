// src/read_stream.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Seekable read stream over range GETs.
//!
//! Every `read` issues exactly one range request for the caller's buffer, so
//! the buffer size chosen by the caller is the request size. Seeks only move
//! the cursor; the next read fetches from there.

use std::io;
use std::sync::Arc;

use tracing::trace;

use crate::error::{Error, Result};
use crate::stream::{SeekStream, Stream};
use crate::transport::ObjectTransport;
use crate::uri::Uri;

pub struct ObjectReadStream {
    transport: Arc<dyn ObjectTransport>,
    uri: Uri,
    expected_size: u64,
    offset: u64,
    at_end: bool,
}

impl ObjectReadStream {
    /// `expected_size` comes from a listing; reads never go past it.
    pub fn new(transport: Arc<dyn ObjectTransport>, uri: Uri, expected_size: u64) -> Self {
        Self {
            transport,
            uri,
            expected_size,
            offset: 0,
            at_end: false,
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn expected_size(&self) -> u64 {
        self.expected_size
    }

    fn read_range(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || self.at_end {
            return Ok(0);
        }
        if self.offset == self.expected_size {
            self.at_end = true;
            return Ok(0);
        }

        let data = self.transport.get_range(
            &self.uri.host,
            self.uri.transport_key(),
            self.offset,
            buf.len() as u64,
        )?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        self.offset += n as u64;
        self.at_end = self.offset == self.expected_size;
        trace!(path = %self.uri, offset = self.offset, bytes = n, "range read");
        Ok(n)
    }
}

impl Stream for ObjectReadStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read_range(buf)
    }

    fn write(&mut self, _data: &[u8]) -> Result<()> {
        Err(Error::usage(format!("'{}' is opened for reading", self.uri)))
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl SeekStream for ObjectReadStream {
    fn seek(&mut self, pos: u64) -> Result<()> {
        if pos != self.offset {
            self.at_end = false;
            self.offset = pos;
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

impl io::Read for ObjectReadStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_range(buf)?)
    }
}

impl io::Seek for ObjectReadStream {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let base = match pos {
            io::SeekFrom::Start(p) => Some(p),
            io::SeekFrom::End(d) => self.expected_size.checked_add_signed(d),
            io::SeekFrom::Current(d) => self.offset.checked_add_signed(d),
        };
        let target = base.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek to a negative or overflowing position")
        })?;
        SeekStream::seek(self, target)?;
        Ok(target)
    }
}
