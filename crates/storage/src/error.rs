//! Error types for storage operations.

use thiserror::Error;

/// Errors that can occur during Drive and Sheets operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// The remote API answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure (connection reset, timeout, DNS...).
    #[error("Network error: {message}")]
    Network { message: String },

    /// Local I/O error.
    #[error("I/O error for {path}: {message}")]
    Io { path: String, message: String },

    /// A lookup by name matched nothing.
    #[error("File not found: {name}")]
    NotFound { name: String },

    /// Invalid or missing configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Response body could not be decoded.
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl StorageError {
    /// Build an HTTP fault from a status code and message.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        StorageError::Http {
            status,
            message: message.into(),
        }
    }

    /// Build an I/O fault for a path.
    pub fn io(path: impl Into<String>, err: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check whether retrying the failed call may succeed.
    ///
    /// Server faults (status >= 500), transport errors and I/O errors are
    /// transient; everything else is final.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Http { status, .. } => *status >= 500,
            StorageError::Network { .. } => true,
            StorageError::Io { .. } => true,
            StorageError::NotFound { .. } => false,
            StorageError::InvalidConfig { .. } => false,
            StorageError::Decode { .. } => false,
            StorageError::Other { .. } => false,
        }
    }

    /// Check whether this is an HTTP 404.
    pub fn is_not_found_status(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io {
            path: String::new(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Decode {
            message: err.to_string(),
        }
    }
}
