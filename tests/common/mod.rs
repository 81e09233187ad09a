// tests/common/mod.rs
//
// Common test utilities: an in-memory object store wired into the facade.

#![allow(dead_code)]

use std::sync::Arc;

use obsfs::{MemoryTransport, ModelEntry, ObjectFileSystem, StreamFactory};

pub const BUCKET: &str = "test-bucket";

/// Memory transport plus a facade and stream factory sharing it.
pub struct MemStore {
    pub mem: Arc<MemoryTransport>,
    pub fs: Arc<ObjectFileSystem>,
}

impl MemStore {
    pub fn new(write_buffer_size: usize) -> Self {
        Self::with_transport(MemoryTransport::new(), write_buffer_size)
    }

    pub fn with_transport(mem: MemoryTransport, write_buffer_size: usize) -> Self {
        let mem = Arc::new(mem);
        let fs = Arc::new(ObjectFileSystem::new(mem.clone(), write_buffer_size));
        Self { mem, fs }
    }

    pub fn factory(&self) -> StreamFactory {
        StreamFactory::with_object_store(self.fs.clone())
    }

    pub fn put(&self, key: &str, data: impl Into<bytes::Bytes>) {
        self.mem.put_object(BUCKET, key, data);
    }
}

pub fn obs(key: &str) -> String {
    format!("obs://{BUCKET}/{key}")
}

/// Scalar records with the given keys and weights, back to back.
pub fn scalar_records(pairs: &[(u64, f32)]) -> Vec<u8> {
    let mut out = Vec::new();
    for &(key, w) in pairs {
        ModelEntry::Scalar { w, sqc_grad: 0.0 }.encode(key, &mut out);
    }
    out
}
