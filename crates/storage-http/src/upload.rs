//! Uploads: multipart single-shot requests and resumable sessions.
//!
//! A resumable session is initiated once, then content is sent in
//! `chunk_size` pieces with `Content-Range` headers. The server answers
//! `308` with the committed byte range until the last piece, which returns
//! the file resource. After a failed piece the committed offset is
//! re-queried before sending again.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION, RANGE};
use reqwest::{Response, StatusCode};
use rusty_drive_storage::{
    ChunkStatus, ChunkedRequest, DataSource, File, OperationType, SingleShotRequest, StorageError,
    UploadTarget,
};
use serde::Serialize;

use crate::context::{check_status, read_json, ApiContext, FILE_FIELDS};
use crate::error::HttpError;

/// Boundary of multipart upload bodies.
const MULTIPART_BOUNDARY: &str = "===============rusty_drive_part==";

/// Metadata sent along with uploaded content.
#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parents: Vec<String>,
}

impl UploadMetadata {
    pub(crate) fn for_target(target: &UploadTarget) -> Self {
        match target {
            UploadTarget::New {
                name,
                parent_id,
                mime_type,
            } => Self {
                name: Some(name.clone()),
                mime_type: mime_type.clone(),
                parents: vec![parent_id.clone()],
            },
            UploadTarget::Existing { .. } => Self::default(),
        }
    }
}

fn existing_id(target: &UploadTarget) -> Option<&str> {
    match target {
        UploadTarget::Existing { file_id } => Some(file_id.as_str()),
        UploadTarget::New { .. } => None,
    }
}

fn target_key(target: &UploadTarget) -> String {
    match target {
        UploadTarget::New { name, .. } => name.clone(),
        UploadTarget::Existing { file_id } => file_id.clone(),
    }
}

/// Assemble a `multipart/related` body: JSON metadata, then the content.
pub(crate) fn multipart_body(metadata: &[u8], content_type: &str, content: &[u8]) -> Bytes {
    let mut body: BytesMut = BytesMut::with_capacity(metadata.len() + content.len() + 256);
    body.put_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.put_slice(metadata);
    body.put_slice(format!("\r\n--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.put_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.put_slice(content);
    body.put_slice(format!("\r\n--{}--", MULTIPART_BOUNDARY).as_bytes());
    body.freeze()
}

/// `Content-Range` value for `length` bytes at `offset` of `total`.
pub(crate) fn content_range(offset: u64, length: u64, total: u64) -> String {
    if length == 0 {
        format!("bytes */{}", total)
    } else {
        format!("bytes {}-{}/{}", offset, offset + length - 1, total)
    }
}

/// Next offset from a `Range: bytes=0-N` header of a `308` response.
pub(crate) fn committed_offset(range: Option<&str>) -> Option<u64> {
    let range: &str = match range {
        Some(r) => r,
        None => return Some(0),
    };
    let (_, last) = range.trim().strip_prefix("bytes=")?.split_once('-')?;
    last.trim().parse::<u64>().ok().map(|n| n + 1)
}

/// Whole upload in one `multipart/related` request.
pub(crate) struct MultipartUpload {
    pub(crate) ctx: Arc<ApiContext>,
    pub(crate) target: UploadTarget,
    pub(crate) source: DataSource,
    pub(crate) content_type: String,
}

#[async_trait]
impl SingleShotRequest for MultipartUpload {
    type Output = File;

    async fn execute(&mut self) -> Result<File, StorageError> {
        let content: Vec<u8> = self.source.read_all().await?;
        let metadata: Vec<u8> = serde_json::to_vec(&UploadMetadata::for_target(&self.target))?;
        let body: Bytes = multipart_body(&metadata, &self.content_type, &content);

        let url: String = self.ctx.upload_url(existing_id(&self.target));
        let builder = match self.target {
            UploadTarget::New { .. } => self.ctx.http.post(url),
            UploadTarget::Existing { .. } => self.ctx.http.patch(url),
        };
        let response: Response = self
            .ctx
            .send(
                builder
                    .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
                    .header(
                        CONTENT_TYPE,
                        format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
                    )
                    .body(body),
            )
            .await?;
        let file: File = read_json(response).await?;
        log::debug!("Uploaded {} ({} bytes)", file, content.len());
        Ok(file)
    }
}

/// Resumable upload session.
pub(crate) struct ResumableUpload {
    ctx: Arc<ApiContext>,
    target: UploadTarget,
    source: DataSource,
    content_type: String,
    key: String,
    session_uri: Option<String>,
    total: Option<u64>,
    offset: u64,
    needs_resync: bool,
}

impl ResumableUpload {
    pub(crate) fn new(
        ctx: Arc<ApiContext>,
        target: UploadTarget,
        source: DataSource,
        content_type: String,
    ) -> Self {
        let key: String = target_key(&target);
        Self {
            ctx,
            target,
            source,
            content_type,
            key,
            session_uri: None,
            total: None,
            offset: 0,
            needs_resync: false,
        }
    }

    async fn initiate(&self, total: u64) -> Result<String, StorageError> {
        let url: String = self.ctx.upload_url(existing_id(&self.target));
        let builder = match self.target {
            UploadTarget::New { .. } => self.ctx.http.post(url),
            UploadTarget::Existing { .. } => self.ctx.http.patch(url),
        };
        let response: Response = self
            .ctx
            .send(
                builder
                    .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
                    .header("X-Upload-Content-Type", &self.content_type)
                    .header("X-Upload-Content-Length", total)
                    .json(&UploadMetadata::for_target(&self.target)),
            )
            .await?;

        let location: String = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| HttpError::Protocol("resumable session without Location".into()))?;
        log::debug!("Started upload session for {}", self.key);
        Ok(location)
    }

    /// Interpret a session response: `308` means more to send.
    async fn handle(
        &mut self,
        response: Response,
        total: u64,
    ) -> Result<ChunkStatus<File>, StorageError> {
        if response.status() == StatusCode::PERMANENT_REDIRECT {
            let range: Option<&str> = response.headers().get(RANGE).and_then(|v| v.to_str().ok());
            self.offset = committed_offset(range).ok_or_else(|| {
                HttpError::Protocol(format!("invalid Range header {:?}", range))
            })?;
            let progress: Option<f64> = (total > 0).then(|| self.offset as f64 / total as f64);
            return Ok(ChunkStatus::InProgress { progress });
        }

        let response: Response = check_status(response).await?;
        let file: File = read_json(response).await?;
        Ok(ChunkStatus::Complete(file))
    }

    async fn resync(
        &mut self,
        session_uri: &str,
        total: u64,
    ) -> Result<ChunkStatus<File>, StorageError> {
        let response: Response = self
            .ctx
            .send_unchecked(
                self.ctx
                    .http
                    .put(session_uri)
                    .header(CONTENT_RANGE, format!("bytes */{}", total))
                    .header(CONTENT_LENGTH, 0),
            )
            .await?;
        self.handle(response, total).await
    }

    async fn send_chunk(&mut self, total: u64) -> Result<ChunkStatus<File>, StorageError> {
        let session_uri: String = match self.session_uri {
            Some(ref uri) => uri.clone(),
            None => {
                let uri: String = self.initiate(total).await?;
                self.session_uri = Some(uri.clone());
                self.needs_resync = false;
                uri
            }
        };

        if self.needs_resync {
            let status: ChunkStatus<File> = self.resync(&session_uri, total).await?;
            self.needs_resync = false;
            if let ChunkStatus::Complete(file) = status {
                return Ok(ChunkStatus::Complete(file));
            }
        }

        let chunk: Vec<u8> = self
            .source
            .read_range(self.offset, self.ctx.chunk_size)
            .await?;
        let response: Response = self
            .ctx
            .send_unchecked(
                self.ctx
                    .http
                    .put(&session_uri)
                    .header(
                        CONTENT_RANGE,
                        content_range(self.offset, chunk.len() as u64, total),
                    )
                    .body(chunk),
            )
            .await?;
        self.handle(response, total).await
    }
}

#[async_trait]
impl ChunkedRequest for ResumableUpload {
    type Output = File;

    fn operation(&self) -> OperationType {
        OperationType::Uploading
    }

    fn key(&self) -> &str {
        &self.key
    }

    async fn next_chunk(&mut self) -> Result<ChunkStatus<File>, StorageError> {
        let total: u64 = match self.total {
            Some(total) => total,
            None => {
                let total: u64 = self.source.size().await?;
                self.total = Some(total);
                total
            }
        };

        let result: Result<ChunkStatus<File>, StorageError> = self.send_chunk(total).await;
        if result.is_err() && self.session_uri.is_some() {
            self.needs_resync = true;
        }
        result
    }
}
