// src/transport.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! The object-store primitives every higher layer is built on.
//!
//! Implementations are blocking from the caller's point of view. The
//! filesystem, lister and streams never talk to an SDK directly; they go
//! through [`ObjectTransport`], which keeps them testable against
//! [`MemoryTransport`](crate::memory_transport::MemoryTransport).

use bytes::Bytes;

use crate::error::Result;

/// The primitive a transport call performs; used in errors, logs and test counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportOp {
    ListKeys,
    GetRange,
    InitiateMultipartUpload,
    UploadPart,
    CompleteMultipartUpload,
    AbortMultipartUpload,
}

impl TransportOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListKeys => "ListObjects",
            Self::GetRange => "GetObject",
            Self::InitiateMultipartUpload => "CreateMultipartUpload",
            Self::UploadPart => "UploadPart",
            Self::CompleteMultipartUpload => "CompleteMultipartUpload",
            Self::AbortMultipartUpload => "AbortMultipartUpload",
        }
    }
}

/// One object returned by a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

/// A single page of a marker-paginated, delimiter-grouped key listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPage {
    pub objects: Vec<ObjectEntry>,
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    /// Marker to resume from. Some stores leave this empty even when truncated.
    pub next_marker: Option<String>,
}

/// A part accepted by the store, as listed in the completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTag {
    pub part_number: i32,
    pub etag: String,
}

pub trait ObjectTransport: Send + Sync {
    /// List up to `max_keys` entries under `prefix` that sort after `marker`.
    fn list_keys(
        &self,
        bucket: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: usize,
    ) -> Result<KeyPage>;

    /// Read `[start, start + length)`; shorter if the object ends first.
    fn get_range(&self, bucket: &str, key: &str, start: u64, length: u64) -> Result<Bytes>;

    /// Open a multipart session, returning its upload id.
    fn initiate_multipart_upload(&self, bucket: &str, key: &str) -> Result<String>;

    /// Upload one part, returning the etag the store assigned to it.
    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<String>;

    /// Commit the session; `parts` must be in ascending part-number order.
    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartTag],
    ) -> Result<()>;

    /// Discard the session and any parts uploaded so far.
    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Display form used in error messages: `obs://bucket/key`.
pub(crate) fn object_path(bucket: &str, key: &str) -> String {
    format!("{}{bucket}/{key}", crate::constants::OBS_PROTOCOL)
}
