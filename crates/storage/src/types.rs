//! Shared data structures for storage operations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusty_drive_common::{
    CHUNK_ALIGNMENT, DEFAULT_BACKOFF_UNIT, DEFAULT_CHUNK_SIZE, DEFAULT_FIXED_RETRY_ATTEMPTS,
    DEFAULT_FIXED_RETRY_DELAY, DEFAULT_MAX_RETRIES, DEFAULT_PAGE_SIZE,
    DEFAULT_RETRYABLE_STATUSES,
};

use crate::credentials::Credentials;
use crate::error::StorageError;

/// Default endpoint of the Drive v3 metadata API.
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Default endpoint of the Drive v3 media upload API.
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// Default endpoint of the Sheets v4 API.
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Configuration settings for Drive and Sheets clients.
#[derive(Debug, Clone)]
pub struct DriveSettings {
    /// Base URL of the metadata API.
    pub api_base_url: String,
    /// Base URL of the media upload API.
    pub upload_base_url: String,
    /// Base URL of the Sheets API.
    pub sheets_base_url: String,
    /// Access credentials. `None` means they are loaded from the environment.
    pub credentials: Option<Credentials>,
    /// Chunk size for resumable transfers.
    pub chunk_size: u64,
    /// Retry settings for chunked transfers.
    pub upload_retry: RetrySettings,
    /// Retry settings for spreadsheet range reads.
    pub sheets_retry: FixedRetrySettings,
    /// Include shared drives in requests.
    pub supports_all_drives: bool,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.into(),
            sheets_base_url: DEFAULT_SHEETS_BASE_URL.into(),
            credentials: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            upload_retry: RetrySettings::default(),
            sheets_retry: FixedRetrySettings::default(),
            supports_all_drives: true,
        }
    }
}

impl DriveSettings {
    /// Use explicit credentials instead of the environment.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Point every endpoint at a single base URL (used against local test servers).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base: &str = base_url.trim_end_matches('/');
        self.api_base_url = format!("{}/drive/v3", base);
        self.upload_base_url = format!("{}/upload/drive/v3", base);
        self.sheets_base_url = format!("{}/v4", base);
        self
    }

    /// Set the resumable transfer chunk size.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the chunked transfer retry settings.
    pub fn with_upload_retry(mut self, retry: RetrySettings) -> Self {
        self.upload_retry = retry;
        self
    }

    /// Set the spreadsheet read retry settings.
    pub fn with_sheets_retry(mut self, retry: FixedRetrySettings) -> Self {
        self.sheets_retry = retry;
        self
    }

    /// Check that the settings can be used to build a client.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.chunk_size == 0 {
            return Err(StorageError::InvalidConfig {
                message: "chunk_size must be greater than zero".into(),
            });
        }
        if self.chunk_size % CHUNK_ALIGNMENT != 0 {
            return Err(StorageError::InvalidConfig {
                message: format!("chunk_size must be a multiple of {} bytes", CHUNK_ALIGNMENT),
            });
        }
        for (name, url) in [
            ("api_base_url", &self.api_base_url),
            ("upload_base_url", &self.upload_base_url),
            ("sheets_base_url", &self.sheets_base_url),
        ] {
            if url.is_empty() {
                return Err(StorageError::InvalidConfig {
                    message: format!("{} must not be empty", name),
                });
            }
        }
        Ok(())
    }
}

/// Retry settings for chunked transfers (exponential backoff with jitter).
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    /// Consecutive non-progressing attempts tolerated before the last
    /// fault is re-raised.
    pub max_retries: u32,
    /// Backoff unit: the Nth consecutive failure sleeps a random
    /// duration in `[0, 2^N)` units.
    pub backoff_unit: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl RetrySettings {
    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff unit.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }
}

/// Retry settings for the fixed-delay variant used by spreadsheet reads.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedRetrySettings {
    /// Total number of attempts, the first one included.
    pub max_attempts: u32,
    /// Delay slept between two attempts.
    pub delay: Duration,
    /// HTTP statuses that trigger a retry.
    pub retryable_statuses: Vec<u16>,
}

impl Default for FixedRetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_FIXED_RETRY_ATTEMPTS,
            delay: DEFAULT_FIXED_RETRY_DELAY,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl FixedRetrySettings {
    /// Set the number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Check whether an error should be retried under these settings.
    pub fn should_retry(&self, err: &StorageError) -> bool {
        err.status()
            .is_some_and(|status| self.retryable_statuses.contains(&status))
    }
}

/// Source of data for upload.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// Read from file at path.
    FilePath(PathBuf),
    /// In-memory bytes.
    Bytes(Vec<u8>),
}

impl DataSource {
    /// Size of the data in bytes.
    pub async fn size(&self) -> Result<u64, StorageError> {
        match self {
            DataSource::FilePath(path) => tokio::fs::metadata(path)
                .await
                .map(|m| m.len())
                .map_err(|e| StorageError::io(path.display().to_string(), e)),
            DataSource::Bytes(bytes) => Ok(bytes.len() as u64),
        }
    }

    /// Read the whole source into memory.
    pub async fn read_all(&self) -> Result<Vec<u8>, StorageError> {
        match self {
            DataSource::FilePath(path) => tokio::fs::read(path)
                .await
                .map_err(|e| StorageError::io(path.display().to_string(), e)),
            DataSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    /// Read `length` bytes starting at `offset` (for chunked uploads).
    pub async fn read_range(&self, offset: u64, length: u64) -> Result<Vec<u8>, StorageError> {
        match self {
            DataSource::FilePath(path) => read_file_range(path, offset, length).await,
            DataSource::Bytes(bytes) => {
                let start: usize = (offset as usize).min(bytes.len());
                let end: usize = (offset.saturating_add(length) as usize).min(bytes.len());
                Ok(bytes[start..end].to_vec())
            }
        }
    }

    /// Local file name, when the source is a file.
    pub fn file_name(&self) -> Option<String> {
        match self {
            DataSource::FilePath(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            DataSource::Bytes(_) => None,
        }
    }
}

async fn read_file_range(path: &Path, offset: u64, length: u64) -> Result<Vec<u8>, StorageError> {
    use std::io::SeekFrom;
    use tokio::io::{AsyncReadExt, AsyncSeekExt};

    let display: String = path.display().to_string();
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| StorageError::io(&display, e))?;
    file.seek(SeekFrom::Start(offset))
        .await
        .map_err(|e| StorageError::io(&display, e))?;

    let mut buffer: Vec<u8> = Vec::with_capacity(length as usize);
    file.take(length)
        .read_to_end(&mut buffer)
        .await
        .map_err(|e| StorageError::io(&display, e))?;
    Ok(buffer)
}

/// Progress update for transfer operations.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    /// Current operation type.
    pub operation: OperationType,
    /// Name or id of the object being transferred.
    pub key: String,
    /// Fraction completed, between 0.0 and 1.0.
    pub fraction: f64,
}

impl TransferProgress {
    /// Completion as a whole percentage.
    pub fn percent(&self) -> u32 {
        (self.fraction.clamp(0.0, 1.0) * 100.0) as u32
    }
}

/// Type of operation in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Uploading,
    Downloading,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Uploading => write!(f, "Upload"),
            OperationType::Downloading => write!(f, "Download"),
        }
    }
}

/// Filters for a file listing. Trashed files are always excluded.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Exact name match.
    pub name_equals: Option<String>,
    /// Substring name match.
    pub name_contains: Option<String>,
    /// Exact MIME type match.
    pub mime_type: Option<String>,
    /// Parent folder id.
    pub parents_in: Option<String>,
    /// Maximum number of results.
    pub page_size: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            name_equals: None,
            name_contains: None,
            mime_type: None,
            parents_in: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListQuery {
    /// Create an unfiltered query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match files with exactly this name.
    pub fn name_equals(mut self, name: impl Into<String>) -> Self {
        self.name_equals = Some(name.into());
        self
    }

    /// Match files whose name contains this string.
    pub fn name_contains(mut self, fragment: impl Into<String>) -> Self {
        self.name_contains = Some(fragment.into());
        self
    }

    /// Match files of this MIME type.
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Match files under this parent. `None` leaves the filter unset.
    pub fn parents_in(mut self, parent_id: Option<&str>) -> Self {
        self.parents_in = parent_id.map(str::to_string);
        self
    }

    /// Limit the number of results.
    pub fn page_size(mut self, n: u32) -> Self {
        self.page_size = n;
        self
    }
}

/// Metadata changes applied by `update_file`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileUpdate {
    /// Parents to detach the file from.
    pub remove_parents: Vec<String>,
    /// Parents to attach the file to.
    pub add_parents: Vec<String>,
    /// New name.
    pub name: Option<String>,
}

impl FileUpdate {
    /// Whether the update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.remove_parents.is_empty() && self.add_parents.is_empty() && self.name.is_none()
    }
}

/// Where uploaded content goes.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadTarget {
    /// Create a new file.
    New {
        name: String,
        parent_id: String,
        /// Target MIME type (e.g. a Google Sheets conversion).
        mime_type: Option<String>,
    },
    /// Replace the content of an existing file.
    Existing { file_id: String },
}

/// A file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Parent folder id.
    pub parent_id: String,
    /// Remote file name.
    pub name: String,
    /// Content to upload.
    pub source: DataSource,
    /// Target MIME type of the created file.
    pub mime_type: Option<String>,
    /// MIME type of the uploaded content.
    pub original_mime_type: Option<String>,
    /// Replace an existing same-name file in the parent instead of creating a new one.
    pub update_existing: bool,
    /// Use a resumable (chunked) upload session.
    pub resumable: bool,
}

impl UploadRequest {
    /// Create an upload of `source` as `name` under `parent_id`.
    pub fn new(parent_id: impl Into<String>, name: impl Into<String>, source: DataSource) -> Self {
        Self {
            parent_id: parent_id.into(),
            name: name.into(),
            source,
            mime_type: None,
            original_mime_type: None,
            update_existing: false,
            resumable: false,
        }
    }

    /// Set the target MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the MIME type of the uploaded content.
    pub fn with_original_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.original_mime_type = Some(mime_type.into());
        self
    }

    /// Replace an existing same-name file.
    pub fn update_existing(mut self, update_existing: bool) -> Self {
        self.update_existing = update_existing;
        self
    }

    /// Use a resumable session.
    pub fn resumable(mut self, resumable: bool) -> Self {
        self.resumable = resumable;
        self
    }
}
