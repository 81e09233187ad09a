// src/multipart.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
// Buffered, sequential Multipart Upload (MPU) write stream.
//
// Design:
// - open() issues CreateMultipartUpload and keeps the upload id for the session.
// - write() appends to an in-memory buffer; once the buffer reaches
//   max_buffer_size the whole buffer goes out as the next part.
// - finish() uploads any tail and issues CompleteMultipartUpload with the parts
//   in ascending order. A stream that never uploaded a part sends one empty
//   part so that zero-byte objects still complete.
// - A failed part or a failed completion poisons the stream; Drop then aborts
//   instead of completing.

use std::io;
use std::mem;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use tracing::{debug, error, warn};

use crate::constants::{DEFAULT_WRITE_BUFFER_SIZE, MAX_MULTIPART_PARTS, MIN_MULTIPART_PART_SIZE};
use crate::error::{Error, Result};
use crate::stream::Stream;
use crate::transport::{ObjectTransport, PartTag};
use crate::uri::Uri;

/// Result info returned by finish()
#[derive(Clone, Debug)]
pub struct UploadSummary {
    pub total_bytes: u64,
    pub parts: usize,
    pub started_at: SystemTime,
    pub completed_at: SystemTime,
}

pub struct ObjectWriteStream {
    transport: Arc<dyn ObjectTransport>,
    uri: Uri,
    upload_id: String,
    max_buffer_size: usize,

    buf: Vec<u8>,
    parts: Vec<PartTag>,
    total_bytes: u64,
    started_at: SystemTime,

    finished: bool,
    poisoned: bool,
}

impl ObjectWriteStream {
    /// Start a multipart session for `uri` with the default 64 MiB buffer.
    pub fn open(transport: Arc<dyn ObjectTransport>, uri: Uri) -> Result<Self> {
        Self::with_buffer_size(transport, uri, DEFAULT_WRITE_BUFFER_SIZE)
    }

    pub fn with_buffer_size(
        transport: Arc<dyn ObjectTransport>,
        uri: Uri,
        max_buffer_size: usize,
    ) -> Result<Self> {
        if max_buffer_size == 0 {
            return Err(Error::usage("write buffer size must be at least 1 byte"));
        }
        if max_buffer_size < MIN_MULTIPART_PART_SIZE {
            // S3 proper rejects non-final parts under 5 MiB; some OBS-compatible stores don't.
            warn!(
                path = %uri,
                max_buffer_size,
                "write buffer is below the 5 MiB multipart minimum"
            );
        }

        let upload_id = transport.initiate_multipart_upload(&uri.host, uri.transport_key())?;
        if upload_id.is_empty() {
            return Err(Error::integrity(
                uri.to_string(),
                "CreateMultipartUpload returned empty upload_id",
            ));
        }
        debug!(path = %uri, upload_id = %upload_id, "multipart upload started");

        Ok(Self {
            transport,
            uri,
            upload_id,
            max_buffer_size,
            buf: Vec::new(),
            parts: Vec::new(),
            total_bytes: 0,
            started_at: SystemTime::now(),
            finished: false,
            poisoned: false,
        })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Parts uploaded so far.
    pub fn parts(&self) -> &[PartTag] {
        &self.parts
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.finished {
            return Err(Error::usage(format!("'{}' is already closed", self.uri)));
        }
        if self.poisoned {
            return Err(Error::usage(format!(
                "'{}' failed an earlier upload step and cannot accept more data",
                self.uri
            )));
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        self.buf.extend_from_slice(data);
        if self.buf.len() >= self.max_buffer_size {
            self.flush_part()?;
        }
        Ok(())
    }

    /// Upload the whole buffer as the next part.
    fn flush_part(&mut self) -> Result<()> {
        let part_number = self.parts.len() + 1;
        if part_number > MAX_MULTIPART_PARTS {
            self.poisoned = true;
            return Err(Error::usage(format!(
                "'{}' exceeds {MAX_MULTIPART_PARTS} parts; raise the write buffer size",
                self.uri
            )));
        }
        let part_number = part_number as i32;

        let len = self.buf.len();
        let data = Bytes::from(mem::take(&mut self.buf));
        let etag = match self.transport.upload_part(
            &self.uri.host,
            self.uri.transport_key(),
            &self.upload_id,
            part_number,
            data,
        ) {
            Ok(etag) => etag,
            Err(e) => {
                self.poisoned = true;
                return Err(e);
            }
        };
        if etag.is_empty() {
            self.poisoned = true;
            return Err(Error::integrity(
                self.uri.to_string(),
                format!("UploadPart returned empty ETag for part {part_number}"),
            ));
        }

        self.parts.push(PartTag { part_number, etag });
        self.total_bytes += len as u64;
        debug!(path = %self.uri, part_number, bytes = len, "part uploaded");
        Ok(())
    }

    /// Upload the tail and commit the object.
    pub fn finish(&mut self) -> Result<UploadSummary> {
        self.ensure_writable()?;

        if !self.buf.is_empty() || self.parts.is_empty() {
            self.flush_part()?;
        }

        if let Err(e) = self.transport.complete_multipart_upload(
            &self.uri.host,
            self.uri.transport_key(),
            &self.upload_id,
            &self.parts,
        ) {
            // Never re-send the completion; Drop aborts the session instead.
            self.poisoned = true;
            return Err(e);
        }
        self.finished = true;

        let summary = UploadSummary {
            total_bytes: self.total_bytes,
            parts: self.parts.len(),
            started_at: self.started_at,
            completed_at: SystemTime::now(),
        };
        debug!(
            path = %self.uri,
            bytes = summary.total_bytes,
            parts = summary.parts,
            "multipart upload completed"
        );
        Ok(summary)
    }

    /// Discard the session. Uploaded parts are released by the store.
    pub fn abort(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.buf.clear();
        self.transport
            .abort_multipart_upload(&self.uri.host, self.uri.transport_key(), &self.upload_id)
    }
}

impl Drop for ObjectWriteStream {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if self.poisoned {
            if let Err(e) = self.abort() {
                error!(path = %self.uri, "abort of failed upload did not succeed: {}", e);
            }
            return;
        }
        if let Err(e) = self.finish() {
            error!(path = %self.uri, "closing upload on drop failed: {}", e);
            if let Err(e) = self.abort() {
                error!(path = %self.uri, "abort after failed close did not succeed: {}", e);
            }
        }
    }
}

impl Stream for ObjectWriteStream {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::usage(format!("'{}' is opened for writing", self.uri)))
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.write_bytes(data)
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        self.finish().map(|_| ())
    }

    fn abort(mut self: Box<Self>) -> Result<()> {
        ObjectWriteStream::abort(&mut self)
    }
}

impl io::Write for ObjectWriteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    // Parts are cut at the buffer threshold only.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_transport::MemoryTransport;
    use crate::transport::TransportOp;

    fn open(mem: &Arc<MemoryTransport>, threshold: usize) -> ObjectWriteStream {
        ObjectWriteStream::with_buffer_size(mem.clone(), Uri::parse("obs://bkt/out"), threshold).unwrap()
    }

    #[test]
    fn threshold_is_checked_after_append() {
        let mem = Arc::new(MemoryTransport::new());
        let mut w = open(&mem, 4);
        w.write_bytes(b"abc").unwrap();
        assert_eq!(mem.calls(TransportOp::UploadPart), 0);
        w.write_bytes(b"defgh").unwrap();
        assert_eq!(mem.calls(TransportOp::UploadPart), 1);
        assert_eq!(w.buffered(), 0);
        assert_eq!(w.parts()[0].part_number, 1);
    }

    #[test]
    fn failed_part_poisons_and_drop_aborts() {
        let mem = Arc::new(MemoryTransport::new());
        mem.fail_next(TransportOp::UploadPart, 500);
        {
            let mut w = open(&mem, 2);
            assert!(w.write_bytes(b"xyz").is_err());
            assert!(w.write_bytes(b"more").is_err());
        }
        assert_eq!(mem.calls(TransportOp::AbortMultipartUpload), 1);
        assert_eq!(mem.calls(TransportOp::CompleteMultipartUpload), 0);
        assert_eq!(mem.pending_uploads(), 0);
        assert!(mem.object("bkt", "out").is_none());
    }

    #[test]
    fn drop_without_close_commits() {
        let mem = Arc::new(MemoryTransport::new());
        {
            let mut w = open(&mem, 1024);
            w.write_bytes(b"tail only").unwrap();
        }
        assert_eq!(&mem.object("bkt", "out").unwrap()[..], b"tail only");
    }

    #[test]
    fn explicit_abort_discards() {
        let mem = Arc::new(MemoryTransport::new());
        let mut w = open(&mem, 1024);
        w.write_bytes(b"never committed").unwrap();
        w.abort().unwrap();
        drop(w);
        assert!(mem.object("bkt", "out").is_none());
        assert_eq!(mem.calls(TransportOp::CompleteMultipartUpload), 0);
    }
}
