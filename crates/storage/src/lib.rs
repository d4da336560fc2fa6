//! Storage abstraction for Google Drive operations.
//!
//! This crate provides a backend-agnostic interface for managing files in
//! Drive and moving their content. Backends implement `DriveClient`; this
//! crate supplies everything built on top of it:
//!
//! - **Transfer Executor** - Runs single-shot and chunked transfers, retrying
//!   transient faults with exponential backoff and jitter
//! - **Fixed Retry** - Constant-delay retry for calls that fail spuriously
//! - **Drive Operations** - Lookups, folders, moves, uploads and downloads
//!
//! # Queries
//!
//! The `query` module renders the `files.list` search expressions used by
//! name and folder lookups.

mod credentials;
mod drive;
mod error;
mod executor;
mod file;
pub mod mimetypes;
pub mod query;
mod retry;
mod traits;
mod types;

pub use credentials::{
    credentials_path_from_env, expand_home, read_credentials_file, Credentials, TokenProvider,
};
pub use drive::{parse_json_lines, DriveOperations, ROOT_FOLDER_ID};
pub use error::StorageError;
pub use executor::TransferExecutor;
pub use file::{File, FileList, Permission};
pub use retry::retry_fixed;
pub use rusty_drive_common::ProgressCallback;
pub use traits::{
    ChunkStatus, ChunkedRequest, DriveClient, Jitter, SingleShotRequest, Sleeper, ThreadRngJitter,
    TokioSleeper, TransferRequest,
};
pub use types::{
    DataSource, DriveSettings, FileUpdate, FixedRetrySettings, ListQuery, OperationType,
    RetrySettings, TransferProgress, UploadRequest, UploadTarget, DEFAULT_API_BASE_URL,
    DEFAULT_SHEETS_BASE_URL, DEFAULT_UPLOAD_BASE_URL,
};
