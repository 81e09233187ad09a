// src/lib.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
// Crate root: module wiring and public re-exports.

pub mod constants;
pub mod config;
pub mod error;
pub mod uri;

// ===== Object transport =====
pub mod transport;
pub mod s3_client;
pub mod s3_transport;
pub mod memory_transport;
pub mod retry;

// ===== Streams and filesystems =====
pub mod stream;
pub mod lister;
pub mod read_stream;
pub mod multipart;
pub mod filesys;
pub mod local_fs;
pub mod stream_factory;
pub mod match_file;

// ===== Batch conversion =====
pub mod model_entry;
pub mod push;

// Re-export the main API at the crate root for convenience
pub use config::ObsConfig;
pub use error::{Error, Result};
pub use filesys::{FileSystem, ObjectFileSystem, OpenMode};
pub use lister::list_objects;
pub use local_fs::LocalFileSystem;
pub use match_file::match_files;
pub use memory_transport::MemoryTransport;
pub use model_entry::{ModelEntry, Record, RecordReader};
pub use multipart::{ObjectWriteStream, UploadSummary};
pub use push::{push_file, run_push, PushOptions, PushSummary};
pub use read_stream::ObjectReadStream;
pub use retry::{RetryConfig, RetryTransport};
pub use s3_transport::S3Transport;
pub use stream::{read_full, SeekStream, Stream};
pub use stream_factory::StreamFactory;
pub use transport::{KeyPage, ObjectEntry, ObjectTransport, PartTag, TransportOp};
pub use uri::{FileInfo, FileType, Uri};
