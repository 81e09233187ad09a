// tests/test_write_stream.rs
//
// Part cutting, completion and failure handling of the multipart write stream.

mod common;

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;

use common::BUCKET;
use obsfs::{Error, MemoryTransport, ObjectWriteStream, Stream, TransportOp, Uri};

fn open(mem: &Arc<MemoryTransport>, threshold: usize) -> Result<ObjectWriteStream> {
    let uri = Uri::parse(&format!("obs://{BUCKET}/out.bin"));
    Ok(ObjectWriteStream::with_buffer_size(mem.clone(), uri, threshold)?)
}

#[test]
fn aligned_writes_cut_ceil_parts() -> Result<()> {
    let mem = Arc::new(MemoryTransport::new());
    let mut w = open(&mem, 10)?;
    let data: Vec<u8> = (0..25u8).collect();
    for chunk in data.chunks(5) {
        w.write_bytes(chunk)?;
    }
    let summary = w.finish()?;

    assert_eq!(summary.total_bytes, 25);
    assert_eq!(summary.parts, 3);
    let uploads = mem.completed_uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].part_numbers, vec![1, 2, 3]);
    assert_eq!(uploads[0].part_sizes, vec![10, 10, 5]);
    assert_eq!(&mem.object(BUCKET, "out.bin").unwrap()[..], &data[..]);
    Ok(())
}

#[test]
fn exact_multiple_sends_no_empty_tail() -> Result<()> {
    let mem = Arc::new(MemoryTransport::new());
    let mut w = open(&mem, 8)?;
    w.write_bytes(&[7u8; 16])?;
    let summary = w.finish()?;
    assert_eq!(summary.parts, 1);
    assert_eq!(mem.calls(TransportOp::UploadPart), 1);
    assert_eq!(mem.completed_uploads()[0].part_sizes, vec![16]);
    Ok(())
}

#[test]
fn zero_byte_object_completes_with_one_part() -> Result<()> {
    let mem = Arc::new(MemoryTransport::new());
    let w = open(&mem, 8)?;
    Box::new(w).close()?;
    let uploads = mem.completed_uploads();
    assert_eq!(uploads[0].part_numbers, vec![1]);
    assert_eq!(uploads[0].part_sizes, vec![0]);
    assert_eq!(mem.object(BUCKET, "out.bin").unwrap().len(), 0);
    Ok(())
}

#[test]
fn empty_etag_is_integrity_error() -> Result<()> {
    let mem = Arc::new(MemoryTransport::new());
    mem.set_empty_etags(true);
    let mut w = open(&mem, 4)?;
    let err = w.write_bytes(b"12345").unwrap_err();
    assert!(matches!(err, Error::Integrity { .. }));
    assert!(w.parts().is_empty());
    drop(w);
    assert_eq!(mem.calls(TransportOp::CompleteMultipartUpload), 0);
    assert_eq!(mem.calls(TransportOp::AbortMultipartUpload), 1);
    Ok(())
}

#[test]
fn initiate_failure_is_fatal() {
    let mem = Arc::new(MemoryTransport::new());
    mem.fail_next(TransportOp::InitiateMultipartUpload, 403);
    let err = open(&mem, 4).err().expect("open should fail");
    let err = err.downcast::<Error>().unwrap();
    assert!(matches!(err, Error::Transport { status: Some(403), .. }));
}

#[test]
fn read_on_write_stream_is_usage_error() -> Result<()> {
    let mem = Arc::new(MemoryTransport::new());
    let mut w = open(&mem, 4)?;
    assert!(matches!(Stream::read(&mut w, &mut [0u8; 4]), Err(Error::Usage { .. })));
    w.abort()?;
    Ok(())
}

#[test]
fn io_write_adapter() -> Result<()> {
    let mem = Arc::new(MemoryTransport::new());
    let mut w = open(&mem, 6)?;
    write!(w, "{}\t{}\n", 5, 1.0f32)?;
    writeln!(w, "{}\t{}", 3, 2.5f32)?;
    w.flush()?;
    assert_eq!(mem.calls(TransportOp::UploadPart), 1);
    w.finish()?;
    assert_eq!(&mem.object(BUCKET, "out.bin").unwrap()[..], b"5\t1\n3\t2.5\n");
    Ok(())
}

#[test]
fn writes_after_finish_are_rejected() -> Result<()> {
    let mem = Arc::new(MemoryTransport::new());
    let mut w = open(&mem, 4)?;
    w.write_bytes(b"ab")?;
    w.finish()?;
    assert!(matches!(w.write_bytes(b"cd"), Err(Error::Usage { .. })));
    drop(w);
    assert_eq!(mem.calls(TransportOp::CompleteMultipartUpload), 1);
    Ok(())
}

#[test]
fn failed_completion_is_not_resent() -> Result<()> {
    let mem = Arc::new(MemoryTransport::new());
    let mut w = open(&mem, 1024)?;
    w.write_bytes(b"data")?;
    mem.fail_next(TransportOp::CompleteMultipartUpload, 503);

    let err = Box::new(w).close().unwrap_err();
    assert!(matches!(err, Error::Transport { status: Some(503), .. }));
    assert_eq!(mem.calls(TransportOp::CompleteMultipartUpload), 1);
    assert_eq!(mem.calls(TransportOp::AbortMultipartUpload), 1);
    assert_eq!(mem.pending_uploads(), 0);
    assert!(mem.object(BUCKET, "out.bin").is_none());
    Ok(())
}

#[test]
fn stream_abort_discards_buffered_data() -> Result<()> {
    let mem = Arc::new(MemoryTransport::new());
    let mut w: Box<dyn Stream> = Box::new(open(&mem, 4)?);
    Stream::write(w.as_mut(), b"abcdef")?;
    w.abort()?;
    assert_eq!(mem.calls(TransportOp::CompleteMultipartUpload), 0);
    assert_eq!(mem.calls(TransportOp::AbortMultipartUpload), 1);
    assert!(mem.object(BUCKET, "out.bin").is_none());
    Ok(())
}
