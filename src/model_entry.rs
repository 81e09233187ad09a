// src/model_entry.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Binary model records and their text rendering.
//!
//! Record layout, little-endian:
//!
//! ```text
//! key:  u64
//! size: i32
//! size == 1:  w slot   (8 bytes, f32 in the first 4)
//!             sqc slot (8 bytes, f32 in the first 4)
//! otherwise:  w        (size x f32)
//!             sqc_grad ((size + 1) x f32)
//! ```

use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::stream::{read_full, Stream};

const KEY_LEN: usize = 8;
const SIZE_LEN: usize = 4;
const SCALAR_SLOT_LEN: usize = 8;
const F32_LEN: usize = 4;
// Floats decoded per read call for vector entries.
const READ_CHUNK_FLOATS: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelEntry {
    Scalar { w: f32, sqc_grad: f32 },
    Vector { w: Vec<f32>, sqc_grad: Vec<f32> },
}

impl ModelEntry {
    pub fn weights(&self) -> &[f32] {
        match self {
            Self::Scalar { w, .. } => std::slice::from_ref(w),
            Self::Vector { w, .. } => w,
        }
    }

    /// Append this entry, keyed by `key`, in the on-disk record layout.
    pub fn encode(&self, key: u64, out: &mut Vec<u8>) {
        out.extend_from_slice(&key.to_le_bytes());
        match self {
            Self::Scalar { w, sqc_grad } => {
                out.extend_from_slice(&1i32.to_le_bytes());
                for v in [w, sqc_grad] {
                    out.extend_from_slice(&v.to_le_bytes());
                    out.extend_from_slice(&[0u8; SCALAR_SLOT_LEN - F32_LEN]);
                }
            }
            Self::Vector { w, sqc_grad } => {
                let size = i32::try_from(w.len()).unwrap_or(i32::MAX);
                out.extend_from_slice(&size.to_le_bytes());
                for v in w.iter().chain(sqc_grad) {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
    }
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: u64,
    pub entry: ModelEntry,
}

/// The output identifier of a record key.
pub fn feature_id(key: u64, need_inverse: bool) -> u64 {
    if need_inverse { key.swap_bytes() } else { key }
}

/// `feature_id`, then each weight, tab separated, newline terminated.
pub fn format_line(feature_id: u64, entry: &ModelEntry) -> String {
    let mut line = feature_id.to_string();
    for w in entry.weights() {
        let _ = write!(line, "\t{w}");
    }
    line.push('\n');
    line
}

/// Sequential record decoder over a [`Stream`].
pub struct RecordReader<'a, S: Stream + ?Sized> {
    stream: &'a mut S,
    path: String,
    index: u64,
}

impl<'a, S: Stream + ?Sized> RecordReader<'a, S> {
    /// `path` is only used in error messages.
    pub fn new(stream: &'a mut S, path: impl Into<String>) -> Self {
        Self {
            stream,
            path: path.into(),
            index: 0,
        }
    }

    /// Records decoded so far.
    pub fn records_read(&self) -> u64 {
        self.index
    }

    fn read_exact(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        let n = read_full(&mut *self.stream, buf)?;
        if n < buf.len() {
            return Err(Error::record(
                &self.path,
                self.index,
                format!("truncated {what}: got {n} of {} bytes", buf.len()),
            ));
        }
        Ok(())
    }

    /// Read `count` floats. The size comes from the input, so memory grows
    /// only as fast as bytes actually arrive.
    fn read_f32s(&mut self, count: usize, what: &str) -> Result<Vec<f32>> {
        let chunk_len = count.min(READ_CHUNK_FLOATS);
        let mut out = Vec::with_capacity(chunk_len);
        let mut raw = vec![0u8; chunk_len * F32_LEN];
        while out.len() < count {
            let n = (count - out.len()).min(READ_CHUNK_FLOATS);
            let chunk = &mut raw[..n * F32_LEN];
            self.read_exact(chunk, what)?;
            out.extend(
                chunk
                    .chunks_exact(F32_LEN)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])),
            );
        }
        Ok(out)
    }

    /// Next record, or `None` once fewer than 8 key bytes remain.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let mut key_buf = [0u8; KEY_LEN];
        if read_full(&mut *self.stream, &mut key_buf)? < KEY_LEN {
            return Ok(None);
        }
        let key = u64::from_le_bytes(key_buf);

        let mut size_buf = [0u8; SIZE_LEN];
        self.read_exact(&mut size_buf, "size field")?;
        let size = i32::from_le_bytes(size_buf);

        let entry = match size {
            s if s < 0 => {
                return Err(Error::record(&self.path, self.index, format!("negative size {s}")));
            }
            1 => {
                let mut slots = [0u8; 2 * SCALAR_SLOT_LEN];
                self.read_exact(&mut slots, "scalar entry")?;
                let f = |at: usize| f32::from_le_bytes([slots[at], slots[at + 1], slots[at + 2], slots[at + 3]]);
                ModelEntry::Scalar {
                    w: f(0),
                    sqc_grad: f(SCALAR_SLOT_LEN),
                }
            }
            s => {
                let n = s as usize;
                let w = self.read_f32s(n, "weights")?;
                let sqc_grad = self.read_f32s(n + 1, "sqc_grad")?;
                ModelEntry::Vector { w, sqc_grad }
            }
        };

        self.index += 1;
        Ok(Some(Record { key, entry }))
    }
}
