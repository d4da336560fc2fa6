//! Downloads: whole-body requests and ranged chunked requests.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{RequestBuilder, Response, StatusCode};
use rusty_drive_storage::{ChunkStatus, ChunkedRequest, OperationType, SingleShotRequest, StorageError};

use crate::context::{check_status, ApiContext};
use crate::error::HttpError;

/// Parse `bytes first-last/total` (total may be `*`).
pub(crate) fn parse_content_range(value: &str) -> Option<(u64, u64, Option<u64>)> {
    let (range, total) = value.trim().strip_prefix("bytes ")?.split_once('/')?;
    let (first, last) = range.split_once('-')?;
    let total: Option<u64> = match total {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    Some((first.parse().ok()?, last.parse().ok()?, total))
}

/// What a download fetches.
#[derive(Debug, Clone)]
pub(crate) struct DownloadTarget {
    pub(crate) file_id: String,
    pub(crate) export_mime_type: Option<String>,
}

impl DownloadTarget {
    fn request(&self, ctx: &ApiContext) -> RequestBuilder {
        match self.export_mime_type {
            Some(ref mime) => ctx
                .http
                .get(format!("{}/export", ctx.file_url(&self.file_id)))
                .query(&[("mimeType", mime.as_str())]),
            None => ctx
                .http
                .get(ctx.file_url(&self.file_id))
                .query(&[("alt", "media")]),
        }
    }
}

/// Whole content in one request.
pub(crate) struct SimpleDownload {
    pub(crate) ctx: Arc<ApiContext>,
    pub(crate) target: DownloadTarget,
}

#[async_trait]
impl SingleShotRequest for SimpleDownload {
    type Output = Vec<u8>;

    async fn execute(&mut self) -> Result<Vec<u8>, StorageError> {
        let response: Response = self.ctx.send(self.target.request(&self.ctx)).await?;
        let body = response.bytes().await.map_err(HttpError::from)?;
        Ok(body.to_vec())
    }
}

/// Content fetched `chunk_size` bytes at a time with `Range` requests.
///
/// Servers that ignore the range (exports) answer `200` with the whole body,
/// which completes the download at once.
pub(crate) struct ChunkedDownload {
    ctx: Arc<ApiContext>,
    target: DownloadTarget,
    received: Vec<u8>,
}

impl ChunkedDownload {
    pub(crate) fn new(ctx: Arc<ApiContext>, target: DownloadTarget) -> Self {
        Self {
            ctx,
            target,
            received: Vec::new(),
        }
    }
}

#[async_trait]
impl ChunkedRequest for ChunkedDownload {
    type Output = Vec<u8>;

    fn operation(&self) -> OperationType {
        OperationType::Downloading
    }

    fn key(&self) -> &str {
        &self.target.file_id
    }

    async fn next_chunk(&mut self) -> Result<ChunkStatus<Vec<u8>>, StorageError> {
        let offset: u64 = self.received.len() as u64;
        let last: u64 = offset + self.ctx.chunk_size.max(1) - 1;
        let builder: RequestBuilder = self
            .target
            .request(&self.ctx)
            .header(RANGE, format!("bytes={}-{}", offset, last));
        let response: Response = self
            .ctx
            .send_unchecked(builder.query(&self.ctx.drive_params()))
            .await?;

        match response.status() {
            StatusCode::RANGE_NOT_SATISFIABLE if offset == 0 => {
                return Ok(ChunkStatus::Complete(Vec::new()));
            }
            StatusCode::PARTIAL_CONTENT => {}
            _ => {
                let response: Response = check_status(response).await?;
                let body = response.bytes().await.map_err(HttpError::from)?;
                return Ok(ChunkStatus::Complete(body.to_vec()));
            }
        }

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);
        let (first, _, total) =
            range.ok_or_else(|| HttpError::Protocol("partial content without Content-Range".into()))?;
        if first != offset {
            return Err(HttpError::Protocol(format!(
                "expected range starting at {}, got {}",
                offset, first
            ))
            .into());
        }

        let body = response.bytes().await.map_err(HttpError::from)?;
        self.received.extend_from_slice(&body);
        let received: u64 = self.received.len() as u64;

        match total {
            Some(total) if received >= total => {
                Ok(ChunkStatus::Complete(std::mem::take(&mut self.received)))
            }
            Some(total) => Ok(ChunkStatus::InProgress {
                progress: Some(received as f64 / total as f64),
            }),
            None if body.is_empty() => {
                Ok(ChunkStatus::Complete(std::mem::take(&mut self.received)))
            }
            None => Ok(ChunkStatus::InProgress { progress: None }),
        }
    }
}
