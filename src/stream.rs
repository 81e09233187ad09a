// src/stream.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Byte-stream traits handed out by the filesystems.
//!
//! The object-store and local implementations both satisfy these, so callers
//! such as the push converter never need to know where the bytes live.

use crate::error::Result;

/// A sequential byte stream opened for either reading or writing.
///
/// Calling the wrong direction (e.g. `write` on a read stream) is a
/// usage error.
pub trait Stream: Send {
    /// Read up to `buf.len()` bytes. `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Append all of `data`.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Finalize the stream. Writers commit their data here; errors that a
    /// `Drop` would only log are returned instead.
    fn close(self: Box<Self>) -> Result<()>;

    /// Give up on the stream. Writers discard everything written so far and
    /// leave no object or file behind; readers just release their handle.
    fn abort(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// A readable stream with random access.
pub trait SeekStream: Stream {
    /// Move the read position. Never touches the network or disk by itself.
    fn seek(&mut self, pos: u64) -> Result<()>;

    fn tell(&self) -> u64;

    fn at_end(&self) -> bool;
}

/// Fill `buf` completely unless the stream ends first. Returns the bytes read.
pub fn read_full<S: Stream + ?Sized>(stream: &mut S, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
