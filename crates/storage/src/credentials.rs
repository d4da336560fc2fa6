//! Access credentials and bearer-token providers.
//!
//! `Credentials` wraps an already-issued access token. Key files that need a
//! token exchange (service accounts) are handled by the HTTP backend, which
//! implements `TokenProvider` on top of an auth library.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusty_drive_common::ENV_CREDENTIALS_PATH;
use serde::Deserialize;

use crate::error::StorageError;

/// Source of bearer tokens for authorized requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a token valid for the next request.
    async fn access_token(&self) -> Result<String, StorageError>;
}

/// An already-issued access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// On-disk credentials file.
#[derive(Deserialize)]
struct CredentialsFile {
    access_token: Option<String>,
    token: Option<String>,
}

impl Credentials {
    /// Wrap a raw access token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, StorageError> {
        let access_token: String = token.into();
        if access_token.trim().is_empty() {
            return Err(StorageError::InvalidConfig {
                message: "access token is empty".into(),
            });
        }
        Ok(Self { access_token })
    }

    /// Load credentials from a JSON file holding an `access_token` (or `token`) field.
    ///
    /// A leading `~` in the path is expanded to the home directory.
    pub fn from_file(path: &Path) -> Result<Self, StorageError> {
        let path: PathBuf = expand_home(path);
        let contents: String = read_credentials_file(&path)?;
        Self::from_json(&contents).map_err(|e| match e {
            StorageError::InvalidConfig { message } => StorageError::InvalidConfig {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    /// Parse credentials from JSON text.
    pub fn from_json(contents: &str) -> Result<Self, StorageError> {
        let file: CredentialsFile =
            serde_json::from_str(contents).map_err(|e| StorageError::InvalidConfig {
                message: format!("malformed credentials: {}", e),
            })?;
        match file.access_token.or(file.token) {
            Some(token) => Self::from_token(token),
            None => Err(StorageError::InvalidConfig {
                message: "credentials carry no access_token".into(),
            }),
        }
    }
}

#[async_trait]
impl TokenProvider for Credentials {
    async fn access_token(&self) -> Result<String, StorageError> {
        Ok(self.access_token.clone())
    }
}

/// Path named by `GOOGLE_APPLICATION_CREDENTIALS`, with `~` expanded.
///
/// # Errors
/// `StorageError::InvalidConfig` when the variable is unset.
pub fn credentials_path_from_env() -> Result<PathBuf, StorageError> {
    let path: String =
        std::env::var(ENV_CREDENTIALS_PATH).map_err(|_| StorageError::InvalidConfig {
            message: format!("Missing credentials! Please set {}", ENV_CREDENTIALS_PATH),
        })?;
    Ok(expand_home(Path::new(&path)))
}

/// Read a credentials file, mapping failures to `InvalidConfig`.
pub fn read_credentials_file(path: &Path) -> Result<String, StorageError> {
    std::fs::read_to_string(path).map_err(|e| StorageError::InvalidConfig {
        message: format!("cannot read credentials {}: {}", path.display(), e),
    })
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
