//! Error types for the HTTP backend.

use rusty_drive_storage::StorageError;
use serde::Deserialize;
use thiserror::Error;

/// Errors specific to the HTTP client.
#[derive(Error, Debug)]
pub enum HttpError {
    /// Transport or body decoding failure reported by reqwest.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response did not follow the expected protocol.
    #[error("Unexpected response: {0}")]
    Protocol(String),
}

impl HttpError {
    /// Build a status error from a response body, preferring the API's
    /// `error.message` over the raw body.
    pub fn from_body(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: ErrorDetail,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            message: String,
        }

        let message: String = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => parsed.error.message,
            Err(_) if body.trim().is_empty() => format!("status {}", status),
            Err(_) => body.trim().to_string(),
        };
        HttpError::Status { status, message }
    }
}

impl From<HttpError> for StorageError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Transport(e) => {
                if let Some(status) = e.status() {
                    StorageError::http(status.as_u16(), e.to_string())
                } else if e.is_decode() {
                    StorageError::Decode {
                        message: e.to_string(),
                    }
                } else if e.is_builder() {
                    StorageError::InvalidConfig {
                        message: e.to_string(),
                    }
                } else {
                    StorageError::Network {
                        message: e.to_string(),
                    }
                }
            }
            HttpError::Status { status, message } => StorageError::Http { status, message },
            HttpError::Protocol(message) => StorageError::Other { message },
        }
    }
}
