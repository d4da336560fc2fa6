//! reqwest backend for the rusty-drive Drive and Sheets clients.
//!
//! This crate provides a `DriveClient` implementation over the Drive v3 REST
//! API, with multipart and resumable uploads and ranged downloads, and a
//! Sheets v4 client reading cell ranges. Service account keys are exchanged
//! for access tokens through `google-cloud-auth`.
//!
//! # Example
//!
//! ```ignore
//! use rusty_drive_storage::DriveSettings;
//! use rusty_drive_storage_http::HttpDriveClient;
//!
//! let client = HttpDriveClient::new(DriveSettings::default())?;
//! let drive = client.operations();
//! let folder = drive.get_or_create_folder("reports", None).await?;
//! ```

mod auth;
mod client;
mod context;
mod download;
mod error;
mod sheets;
mod upload;

pub use auth::{
    strip_bearer, token_provider_from_env, token_provider_from_file, token_provider_from_json,
    GoogleTokenProvider, KeyKind, DRIVE_SCOPE,
};
pub use client::HttpDriveClient;
pub use error::HttpError;
pub use sheets::HttpSheetsClient;
