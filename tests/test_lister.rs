// tests/test_lister.rs
//
// Pagination and directory synthesis of the object lister.

mod common;

use anyhow::Result;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::BUCKET;
use obsfs::{list_objects, Error, FileType, KeyPage, MemoryTransport, ObjectTransport, PartTag, TransportOp, Uri};

fn seed(mem: &MemoryTransport) {
    for i in 0..23 {
        mem.put_object(BUCKET, &format!("data/part-{i:03}"), Bytes::from(vec![0u8; i]));
    }
    for d in ["a", "b", "c", "d"] {
        mem.put_object(BUCKET, &format!("data/{d}/nested"), Bytes::from_static(b"x"));
    }
    mem.put_object(BUCKET, "other/ignored", Bytes::from_static(b"y"));
}

fn names(entries: &[obsfs::FileInfo]) -> Vec<String> {
    entries.iter().map(|e| e.path.to_string()).collect()
}

#[test]
fn pagination_yields_union_for_any_page_size() -> Result<()> {
    let reference = {
        let mem = MemoryTransport::new();
        seed(&mem);
        list_objects(&mem, &Uri::parse(&format!("obs://{BUCKET}/data/")))?
    };
    assert_eq!(reference.len(), 27);

    for page_size in [1, 2, 3, 5, 7, 26, 27, 100] {
        for with_marker in [true, false] {
            let mut mem = MemoryTransport::new().with_page_size(page_size);
            if !with_marker {
                mem = mem.without_next_marker();
            }
            seed(&mem);
            let entries = list_objects(&mem, &Uri::parse(&format!("obs://{BUCKET}/data/")))?;

            let listed = names(&entries);
            let unique: HashSet<_> = listed.iter().collect();
            assert_eq!(unique.len(), listed.len(), "duplicates at page size {page_size}");
            let expected: HashSet<_> = names(&reference).into_iter().collect();
            let got: HashSet<_> = listed.into_iter().collect();
            assert_eq!(got, expected, "page size {page_size}, marker {with_marker}");
            assert_eq!(mem.calls(TransportOp::ListKeys), 27usize.div_ceil(page_size).max(1));
        }
    }
    Ok(())
}

#[test]
fn directory_synthesis() -> Result<()> {
    let mem = MemoryTransport::new();
    mem.put_object(BUCKET, "a/x", Bytes::from_static(b"12345"));
    mem.put_object(BUCKET, "a/b/y", Bytes::from_static(b"1"));

    let entries = list_objects(&mem, &Uri::parse(&format!("obs://{BUCKET}/a/")))?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].path.to_string(), format!("obs://{BUCKET}/a/x"));
    assert_eq!(entries[0].file_type, FileType::File);
    assert_eq!(entries[0].size, 5);
    assert_eq!(entries[1].path.to_string(), format!("obs://{BUCKET}/a/b/"));
    assert_eq!(entries[1].file_type, FileType::Directory);
    assert_eq!(entries[1].size, 0);
    Ok(())
}

#[test]
fn entries_carry_query_protocol_and_bucket() -> Result<()> {
    let mem = MemoryTransport::new();
    mem.put_object(BUCKET, "k", Bytes::from_static(b"v"));
    let entries = list_objects(&mem, &Uri::parse(&format!("obs://{BUCKET}")))?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path.protocol, "obs://");
    assert_eq!(entries[0].path.host, BUCKET);
    assert_eq!(entries[0].path.name, "/k");
    Ok(())
}

/// Delegates to a memory store but fails the listing call number `fail_at`.
struct FailOnCall {
    inner: MemoryTransport,
    fail_at: usize,
    seen: AtomicUsize,
}

impl ObjectTransport for FailOnCall {
    fn list_keys(&self, bucket: &str, prefix: &str, marker: &str, delimiter: &str, max_keys: usize) -> obsfs::Result<KeyPage> {
        if self.seen.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_at {
            return Err(Error::transport("ListObjects", prefix, Some(503), "SlowDown"));
        }
        self.inner.list_keys(bucket, prefix, marker, delimiter, max_keys)
    }

    fn get_range(&self, bucket: &str, key: &str, start: u64, length: u64) -> obsfs::Result<Bytes> {
        self.inner.get_range(bucket, key, start, length)
    }

    fn initiate_multipart_upload(&self, bucket: &str, key: &str) -> obsfs::Result<String> {
        self.inner.initiate_multipart_upload(bucket, key)
    }

    fn upload_part(&self, bucket: &str, key: &str, upload_id: &str, part_number: i32, data: Bytes) -> obsfs::Result<String> {
        self.inner.upload_part(bucket, key, upload_id, part_number, data)
    }

    fn complete_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str, parts: &[PartTag]) -> obsfs::Result<()> {
        self.inner.complete_multipart_upload(bucket, key, upload_id, parts)
    }

    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> obsfs::Result<()> {
        self.inner.abort_multipart_upload(bucket, key, upload_id)
    }

    fn name(&self) -> &'static str {
        "fail-on-call"
    }
}

#[test]
fn failed_page_discards_everything() {
    let inner = MemoryTransport::new().with_page_size(5);
    seed(&inner);
    let t = FailOnCall { inner, fail_at: 3, seen: AtomicUsize::new(0) };

    let err = list_objects(&t, &Uri::parse(&format!("obs://{BUCKET}/data/"))).unwrap_err();
    assert!(matches!(err, Error::Transport { status: Some(503), .. }));
    assert_eq!(t.seen.load(Ordering::SeqCst), 3);
}
