//! Storage traits/interfaces for Drive operations.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::file::{File, Permission};
use crate::types::{DataSource, FileUpdate, OperationType, UploadTarget};

/// Outcome of advancing a chunked request by one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkStatus<T> {
    /// A chunk went through; more remain.
    InProgress {
        /// Fraction of the transfer completed, when known.
        progress: Option<f64>,
    },
    /// The final response was received.
    Complete(T),
}

/// A request performed in one round-trip.
#[async_trait]
pub trait SingleShotRequest: Send {
    /// Decoded response entity.
    type Output: Send;

    /// Perform the whole operation.
    async fn execute(&mut self) -> Result<Self::Output, StorageError>;
}

/// A request split into several round-trips, each moving one chunk.
///
/// Implementations must tolerate `next_chunk` being called again after a
/// failed call: the failed chunk is resent (or the remote offset re-queried).
#[async_trait]
pub trait ChunkedRequest: Send {
    /// Decoded response entity.
    type Output: Send;

    /// Direction of the transfer.
    fn operation(&self) -> OperationType;

    /// Name or id of the transferred object, for progress reporting.
    fn key(&self) -> &str;

    /// Advance the transfer by one chunk.
    async fn next_chunk(&mut self) -> Result<ChunkStatus<Self::Output>, StorageError>;
}

/// A transfer handed to the executor.
pub enum TransferRequest<T> {
    /// Whole operation in one call, no retry.
    SingleShot(Box<dyn SingleShotRequest<Output = T>>),
    /// Chunked operation, retried on transient faults.
    Chunked(Box<dyn ChunkedRequest<Output = T>>),
}

impl<T> TransferRequest<T> {
    /// Wrap a single-shot request.
    pub fn single_shot(request: impl SingleShotRequest<Output = T> + 'static) -> Self {
        TransferRequest::SingleShot(Box::new(request))
    }

    /// Wrap a chunked request.
    pub fn chunked(request: impl ChunkedRequest<Output = T> + 'static) -> Self {
        TransferRequest::Chunked(Box::new(request))
    }

    /// Whether the request is chunked (resumable).
    pub fn is_resumable(&self) -> bool {
        matches!(self, TransferRequest::Chunked(_))
    }
}

/// Clock capability used for backoff delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Source of backoff jitter.
pub trait Jitter: Send + Sync {
    /// Uniform sample in `[0.0, 1.0)`.
    fn sample(&self) -> f64;
}

/// Jitter drawn from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngJitter;

impl Jitter for ThreadRngJitter {
    fn sample(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Low-level Drive operations - implemented by each backend.
#[async_trait]
pub trait DriveClient: Send + Sync {
    /// Fetch a file's metadata. `fields` restricts the returned fields.
    async fn get_file_metadata(
        &self,
        file_id: &str,
        fields: Option<&str>,
    ) -> Result<File, StorageError>;

    /// List files matching a search query.
    async fn list_files(&self, query: &str, page_size: u32) -> Result<Vec<File>, StorageError>;

    /// Create a folder, optionally under a parent.
    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<File, StorageError>;

    /// Apply metadata changes to a file.
    async fn update_file(&self, file_id: &str, update: &FileUpdate) -> Result<File, StorageError>;

    /// Delete a file. Folders are deleted with their content.
    async fn remove_file(&self, file_id: &str) -> Result<(), StorageError>;

    /// Grant a permission on a file.
    async fn create_permission(
        &self,
        file_id: &str,
        role: &str,
        grantee_type: &str,
    ) -> Result<Permission, StorageError>;

    /// Build the request uploading `source` to `target`.
    fn upload_request(
        &self,
        target: UploadTarget,
        source: DataSource,
        content_type: &str,
        resumable: bool,
    ) -> TransferRequest<File>;

    /// Build the request downloading a file's content, exported to
    /// `export_mime_type` when given.
    fn download_request(
        &self,
        file_id: &str,
        export_mime_type: Option<&str>,
        chunked: bool,
    ) -> TransferRequest<Vec<u8>>;
}
