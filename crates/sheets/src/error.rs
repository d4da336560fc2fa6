//! Error types for spreadsheet reads.

use rusty_drive_storage::StorageError;
use thiserror::Error;

/// Errors from reading and decoding spreadsheet ranges.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SheetsError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid range read options: {message}")]
    InvalidOptions { message: String },

    #[error("Malformed spreadsheet content: {message}")]
    MalformedResponse { message: String },

    #[error("Cannot encode rows: {message}")]
    Encode { message: String },
}
