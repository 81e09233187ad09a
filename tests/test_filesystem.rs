// tests/test_filesystem.rs
//
// Path lookup, directory listing and open modes of the object filesystem.

mod common;

use anyhow::Result;
use bytes::Bytes;

use common::{obs, MemStore};
use obsfs::{read_full, Error, FileSystem, FileType, SeekStream, Stream, TransportOp, Uri};

fn store() -> MemStore {
    let s = MemStore::new(1024);
    s.put("models/part-0", Bytes::from_static(b"zero"));
    s.put("models/part-1", Bytes::from_static(b"one!!"));
    s.put("models/sub/part-2", Bytes::from_static(b"two"));
    s.put("models-old/part-0", Bytes::from_static(b"old"));
    s
}

#[test]
fn path_info_for_file_and_directory() -> Result<()> {
    let s = store();

    let file = s.fs.get_path_info(&Uri::parse(&obs("models/part-1")))?;
    assert_eq!(file.file_type, FileType::File);
    assert_eq!(file.size, 5);
    assert_eq!(file.path.to_string(), obs("models/part-1"));

    let dir = s.fs.get_path_info(&Uri::parse(&obs("models")))?;
    assert_eq!(dir.file_type, FileType::Directory);
    assert_eq!(dir.path.to_string(), obs("models/"));

    // Trailing slashes are normalized away before the lookup.
    let dir = s.fs.get_path_info(&Uri::parse(&obs("models//")))?;
    assert!(dir.is_dir());

    let root = s.fs.get_path_info(&Uri::parse(&obs("")))?;
    assert!(root.is_dir());
    Ok(())
}

#[test]
fn path_info_missing_is_not_found() {
    let s = store();
    let err = s.fs.get_path_info(&Uri::parse(&obs("models/part-9"))).unwrap_err();
    assert!(err.is_not_found());
    // A prefix of a real key is not a path.
    let err = s.fs.get_path_info(&Uri::parse(&obs("models/part"))).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn wrong_protocol_is_usage_error() {
    let s = store();
    let err = s.fs.get_path_info(&Uri::parse("s3://test-bucket/models")).unwrap_err();
    assert!(matches!(err, Error::Usage { .. }));
    let err = s.fs.open(&Uri::parse("/tmp/local"), "r", true).err().unwrap();
    assert!(matches!(err, Error::Usage { .. }));
}

#[test]
fn list_directory_variants() -> Result<()> {
    let s = store();

    let with_slash = s.fs.list_directory(&Uri::parse(&obs("models/")))?;
    let names: Vec<_> = with_slash.iter().map(|e| e.path.to_string()).collect();
    assert_eq!(
        names,
        vec![obs("models/part-0"), obs("models/part-1"), obs("models/sub/")]
    );

    // Without the slash the path is resolved to the directory first.
    let without_slash = s.fs.list_directory(&Uri::parse(&obs("models")))?;
    assert_eq!(without_slash, with_slash);

    // A file lists as itself.
    let file = s.fs.list_directory(&Uri::parse(&obs("models/part-0")))?;
    assert_eq!(file.len(), 1);
    assert_eq!(file[0].size, 4);

    assert!(s.fs.list_directory(&Uri::parse(&obs("nothing")))?.is_empty());
    Ok(())
}

#[test]
fn open_for_read_and_write() -> Result<()> {
    let s = store();

    let mut r = s.fs.open(&Uri::parse(&obs("models/part-1")), "rb", false)?.unwrap();
    let mut buf = [0u8; 16];
    let n = read_full(r.as_mut(), &mut buf)?;
    assert_eq!(&buf[..n], b"one!!");
    r.close()?;

    let mut w = s.fs.open(&Uri::parse(&obs("new/obj")), "w", false)?.unwrap();
    w.write(b"fresh")?;
    w.close()?;
    assert_eq!(&s.mem.object(common::BUCKET, "new/obj").unwrap()[..], b"fresh");
    Ok(())
}

#[test]
fn open_missing_respects_allow_missing() -> Result<()> {
    let s = store();
    let missing = Uri::parse(&obs("models/absent"));
    assert!(s.fs.open(&missing, "r", true)?.is_none());
    assert!(s.fs.open(&missing, "r", false).err().unwrap().is_not_found());
    assert!(s.fs.open_for_read(&missing, true)?.is_none());

    // Directories cannot be opened for read.
    let dir = Uri::parse(&obs("models/sub"));
    assert!(s.fs.open(&dir, "rb", true)?.is_none());
    assert!(s.fs.open(&dir, "rb", false).err().unwrap().is_not_found());
    Ok(())
}

#[test]
fn invalid_mode_touches_nothing() {
    let s = store();
    let err = s.fs.open(&Uri::parse(&obs("models/part-0")), "a+", false).err().unwrap();
    assert!(matches!(err, Error::Usage { .. }));
    assert_eq!(s.mem.calls(TransportOp::ListKeys), 0);
    assert_eq!(s.mem.calls(TransportOp::InitiateMultipartUpload), 0);
}

#[test]
fn seekable_open() -> Result<()> {
    let s = store();
    let mut r = s.fs.open_for_read(&Uri::parse(&obs("models/part-1")), false)?.unwrap();
    r.seek(3)?;
    let mut buf = [0u8; 8];
    let n = r.read(&mut buf)?;
    assert_eq!(&buf[..n], b"!!");
    assert!(r.at_end());
    assert_eq!(r.tell(), 5);
    Ok(())
}
