// src/memory_transport.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! In-process object store implementing [`ObjectTransport`].
//!
//! Follows the S3 v1 listing rules (delimiter grouping, marker resumption,
//! `NextMarker` only when a delimiter is given) and assembles multipart
//! uploads the way the service does. Every call is counted, and failures can
//! be injected per operation, so stream and listing behavior can be checked
//! without a network.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::error::{Error, Result};
use crate::transport::{object_path, KeyPage, ObjectEntry, ObjectTransport, PartTag, TransportOp};

/// A multipart upload that was committed, for inspection by tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedUpload {
    pub bucket: String,
    pub key: String,
    pub part_numbers: Vec<i32>,
    pub part_sizes: Vec<usize>,
}

#[derive(Default)]
struct PendingUpload {
    bucket: String,
    key: String,
    parts: BTreeMap<i32, (String, Bytes)>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(String, String), Bytes>,
    uploads: HashMap<String, PendingUpload>,
    next_upload_id: u64,
    completed: Vec<CompletedUpload>,
    calls: HashMap<TransportOp, usize>,
    injected: HashMap<TransportOp, VecDeque<u16>>,
    empty_etags: bool,
}

pub struct MemoryTransport {
    state: Mutex<State>,
    page_size: Option<usize>,
    emit_next_marker: bool,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: None,
            emit_next_marker: true,
        }
    }

    /// Cap every listing page at `n` entries regardless of the requested size.
    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = Some(n.max(1));
        self
    }

    /// Never return `NextMarker`, like stores that only send it sometimes.
    pub fn without_next_marker(mut self) -> Self {
        self.emit_next_marker = false;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put_object(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.lock()
            .objects
            .insert((bucket.to_string(), key.to_string()), data.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of times `op` has been invoked, including failed calls.
    pub fn calls(&self, op: TransportOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn completed_uploads(&self) -> Vec<CompletedUpload> {
        self.lock().completed.clone()
    }

    pub fn pending_uploads(&self) -> usize {
        self.lock().uploads.len()
    }

    /// Make the next call of `op` fail with the given HTTP status.
    pub fn fail_next(&self, op: TransportOp, status: u16) {
        self.lock().injected.entry(op).or_default().push_back(status);
    }

    /// Report success for part uploads but hand back an empty etag.
    pub fn set_empty_etags(&self, empty: bool) {
        self.lock().empty_etags = empty;
    }

    fn begin(state: &mut State, op: TransportOp, path: &str) -> Result<()> {
        *state.calls.entry(op).or_insert(0) += 1;
        trace!(op = op.as_str(), path, "memory transport call");
        if let Some(status) = state.injected.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(Error::transport(op.as_str(), path, Some(status), "injected failure"));
        }
        Ok(())
    }
}

impl ObjectTransport for MemoryTransport {
    fn list_keys(
        &self,
        bucket: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: usize,
    ) -> Result<KeyPage> {
        let mut state = self.lock();
        Self::begin(&mut state, TransportOp::ListKeys, &object_path(bucket, prefix))?;

        let limit = self.page_size.map_or(max_keys, |cap| cap.min(max_keys)).max(1);
        let mut page = KeyPage::default();
        let mut emitted = 0usize;
        let mut last: Option<String> = None;

        for ((b, key), data) in state.objects.iter() {
            if b != bucket || !key.starts_with(prefix) {
                continue;
            }
            let rest = &key[prefix.len()..];
            let grouped = if delimiter.is_empty() {
                None
            } else {
                rest.find(delimiter)
                    .map(|idx| key[..prefix.len() + idx + delimiter.len()].to_string())
            };
            let entry_name = grouped.as_deref().unwrap_or(key);
            if entry_name <= marker {
                continue;
            }
            if grouped.is_some() && page.common_prefixes.last().map(String::as_str) == Some(entry_name) {
                continue;
            }
            if emitted == limit {
                page.is_truncated = true;
                break;
            }
            match grouped {
                Some(p) => {
                    last = Some(p.clone());
                    page.common_prefixes.push(p);
                }
                None => {
                    last = Some(key.clone());
                    page.objects.push(ObjectEntry {
                        key: key.clone(),
                        size: data.len() as u64,
                    });
                }
            }
            emitted += 1;
        }

        if page.is_truncated && !delimiter.is_empty() && self.emit_next_marker {
            page.next_marker = last;
        }
        Ok(page)
    }

    fn get_range(&self, bucket: &str, key: &str, start: u64, length: u64) -> Result<Bytes> {
        let mut state = self.lock();
        let path = object_path(bucket, key);
        Self::begin(&mut state, TransportOp::GetRange, &path)?;

        let op = TransportOp::GetRange.as_str();
        let data = state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| Error::transport(op, &path, Some(404), "NoSuchKey"))?;
        let size = data.len() as u64;
        if start >= size {
            return Err(Error::transport(
                op,
                &path,
                Some(416),
                format!("InvalidRange: start {start} beyond object size {size}"),
            ));
        }
        let end = start.saturating_add(length).min(size);
        Ok(data.slice(start as usize..end as usize))
    }

    fn initiate_multipart_upload(&self, bucket: &str, key: &str) -> Result<String> {
        let mut state = self.lock();
        Self::begin(&mut state, TransportOp::InitiateMultipartUpload, &object_path(bucket, key))?;

        state.next_upload_id += 1;
        let upload_id = format!("upload-{}", state.next_upload_id);
        state.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<String> {
        let mut state = self.lock();
        let path = object_path(bucket, key);
        Self::begin(&mut state, TransportOp::UploadPart, &path)?;

        let empty_etags = state.empty_etags;
        let upload = state
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| Error::transport(TransportOp::UploadPart.as_str(), &path, Some(404), "NoSuchUpload"))?;
        let etag = format!("\"{upload_id}-{part_number}-{}\"", data.len());
        upload.parts.insert(part_number, (etag.clone(), data));
        Ok(if empty_etags { String::new() } else { etag })
    }

    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartTag],
    ) -> Result<()> {
        let mut state = self.lock();
        let path = object_path(bucket, key);
        Self::begin(&mut state, TransportOp::CompleteMultipartUpload, &path)?;

        let op = TransportOp::CompleteMultipartUpload.as_str();
        let upload = state
            .uploads
            .get(upload_id)
            .ok_or_else(|| Error::transport(op, &path, Some(404), "NoSuchUpload"))?;
        if upload.bucket != bucket || upload.key != key {
            return Err(Error::transport(op, &path, Some(400), "upload id belongs to another object"));
        }
        if parts.is_empty() {
            return Err(Error::transport(op, &path, Some(400), "MalformedXML: no parts"));
        }
        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(Error::transport(op, &path, Some(400), "InvalidPartOrder"));
        }

        let mut body = BytesMut::new();
        let mut sizes = Vec::with_capacity(parts.len());
        for part in parts {
            match upload.parts.get(&part.part_number) {
                Some((etag, data)) if *etag == part.etag => {
                    body.extend_from_slice(data);
                    sizes.push(data.len());
                }
                _ => {
                    return Err(Error::transport(
                        op,
                        &path,
                        Some(400),
                        format!("InvalidPart: part {} not uploaded with that etag", part.part_number),
                    ));
                }
            }
        }

        state.uploads.remove(upload_id);
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), body.freeze());
        state.completed.push(CompletedUpload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            part_numbers: parts.iter().map(|p| p.part_number).collect(),
            part_sizes: sizes,
        });
        Ok(())
    }

    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        let mut state = self.lock();
        let path = object_path(bucket, key);
        Self::begin(&mut state, TransportOp::AbortMultipartUpload, &path)?;

        state
            .uploads
            .remove(upload_id)
            .map(|_| ())
            .ok_or_else(|| Error::transport(TransportOp::AbortMultipartUpload.as_str(), &path, Some(404), "NoSuchUpload"))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
