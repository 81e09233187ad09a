// src/s3_transport.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! [`ObjectTransport`] over the AWS Rust SDK, for OBS and other S3-compatible
//! endpoints. Every call is driven on the global runtime and blocks the caller.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use crate::config::ObsConfig;
use crate::error::{Error, Result};
use crate::s3_client::{build_client, run_on_global_rt};
use crate::transport::{object_path, KeyPage, ObjectEntry, ObjectTransport, PartTag, TransportOp};

pub struct S3Transport {
    client: Client,
}

impl S3Transport {
    /// Connect using the credentials and endpoint in `cfg`.
    pub fn connect(cfg: &ObsConfig) -> Result<Self> {
        Ok(Self { client: build_client(cfg)? })
    }

    /// Wrap an already-built client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

/// Keep the store's own status, code and message in the error.
fn sdk_error<E>(op: TransportOp, path: &str, err: SdkError<E, HttpResponse>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let message = match err.code() {
        Some(code) => format!("{code}: {}", DisplayErrorContext(&err)),
        None => DisplayErrorContext(&err).to_string(),
    };
    Error::transport(op.as_str(), path, status, message)
}

impl ObjectTransport for S3Transport {
    fn list_keys(
        &self,
        bucket: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: usize,
    ) -> Result<KeyPage> {
        let client = self.client.clone();
        let path = object_path(bucket, prefix);
        let (bucket, prefix, marker, delimiter) =
            (bucket.to_string(), prefix.to_string(), marker.to_string(), delimiter.to_string());
        let max_keys = i32::try_from(max_keys).unwrap_or(i32::MAX);

        run_on_global_rt(async move {
            let mut req = client
                .list_objects()
                .bucket(&bucket)
                .prefix(&prefix)
                .max_keys(max_keys);
            if !delimiter.is_empty() {
                req = req.delimiter(&delimiter);
            }
            if !marker.is_empty() {
                req = req.marker(&marker);
            }
            let resp = req
                .send()
                .await
                .map_err(|e| sdk_error(TransportOp::ListKeys, &path, e))?;

            let objects = resp
                .contents()
                .iter()
                .filter_map(|obj| {
                    obj.key().map(|k| ObjectEntry {
                        key: k.to_string(),
                        size: obj.size().unwrap_or_default().max(0) as u64,
                    })
                })
                .collect();
            let common_prefixes = resp
                .common_prefixes()
                .iter()
                .filter_map(|p| p.prefix().map(str::to_string))
                .collect();

            Ok(KeyPage {
                objects,
                common_prefixes,
                is_truncated: resp.is_truncated().unwrap_or(false),
                next_marker: resp.next_marker().filter(|m| !m.is_empty()).map(str::to_string),
            })
        })
    }

    fn get_range(&self, bucket: &str, key: &str, start: u64, length: u64) -> Result<Bytes> {
        if length == 0 {
            return Ok(Bytes::new());
        }
        let client = self.client.clone();
        let path = object_path(bucket, key);
        let (bucket, key) = (bucket.to_string(), key.to_string());
        let range = format!("bytes={}-{}", start, start.saturating_add(length - 1));

        run_on_global_rt(async move {
            let resp = client
                .get_object()
                .bucket(&bucket)
                .key(&key)
                .range(range)
                .send()
                .await
                .map_err(|e| sdk_error(TransportOp::GetRange, &path, e))?;
            let data = resp
                .body
                .collect()
                .await
                .map_err(|e| Error::transport(TransportOp::GetRange.as_str(), &path, None, e.to_string()))?
                .into_bytes();
            Ok(data)
        })
    }

    fn initiate_multipart_upload(&self, bucket: &str, key: &str) -> Result<String> {
        let client = self.client.clone();
        let path = object_path(bucket, key);
        let (bucket, key) = (bucket.to_string(), key.to_string());

        run_on_global_rt(async move {
            let resp = client
                .create_multipart_upload()
                .bucket(&bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| sdk_error(TransportOp::InitiateMultipartUpload, &path, e))?;
            Ok(resp.upload_id().unwrap_or_default().to_string())
        })
    }

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<String> {
        let client = self.client.clone();
        let path = object_path(bucket, key);
        let (bucket, key, upload_id) = (bucket.to_string(), key.to_string(), upload_id.to_string());
        debug!(path = %path, part_number, bytes = data.len(), "uploading part");

        run_on_global_rt(async move {
            let resp = client
                .upload_part()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .part_number(part_number)
                .body(ByteStream::from(data))
                .send()
                .await
                .map_err(|e| sdk_error(TransportOp::UploadPart, &path, e))?;
            Ok(resp.e_tag().unwrap_or_default().to_string())
        })
    }

    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartTag],
    ) -> Result<()> {
        let client = self.client.clone();
        let path = object_path(bucket, key);
        let (bucket, key, upload_id) = (bucket.to_string(), key.to_string(), upload_id.to_string());

        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .e_tag(&p.etag)
                    .part_number(p.part_number)
                    .build()
            })
            .collect();
        let cmu = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        run_on_global_rt(async move {
            client
                .complete_multipart_upload()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .multipart_upload(cmu)
                .send()
                .await
                .map_err(|e| sdk_error(TransportOp::CompleteMultipartUpload, &path, e))?;
            Ok(())
        })
    }

    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        let client = self.client.clone();
        let path = object_path(bucket, key);
        let (bucket, key, upload_id) = (bucket.to_string(), key.to_string(), upload_id.to_string());

        run_on_global_rt(async move {
            client
                .abort_multipart_upload()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .send()
                .await
                .map_err(|e| sdk_error(TransportOp::AbortMultipartUpload, &path, e))?;
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
