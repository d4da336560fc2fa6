//! Bearer tokens for the Drive and Sheets APIs.
//!
//! `GOOGLE_APPLICATION_CREDENTIALS` usually names a service account key. Such
//! keys are exchanged for access tokens through `google-cloud-auth`; files
//! that already carry an access token are served as is.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use google_cloud_auth::credentials::CredentialsFile;
use google_cloud_auth::project::Config;
use google_cloud_auth::token::DefaultTokenSourceProvider;
use google_cloud_token::{TokenSource, TokenSourceProvider};
use serde::Deserialize;
use tokio::sync::OnceCell;

use rusty_drive_storage::{
    credentials_path_from_env, expand_home, read_credentials_file, Credentials, StorageError,
    TokenProvider,
};

/// Full access to the user's Drive, spreadsheets included.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const SCOPES: [&str; 1] = [DRIVE_SCOPE];

/// Kind of credentials file, from its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Service account key (`"type": "service_account"`).
    ServiceAccount,
    /// Refresh token issued to a user (`"type": "authorized_user"`).
    AuthorizedUser,
    /// File holding an already-issued `access_token`.
    AccessToken,
}

#[derive(Deserialize)]
struct KeyHeader {
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl KeyKind {
    /// Classify a credentials file.
    ///
    /// # Errors
    /// `StorageError::InvalidConfig` when the text is not a JSON object.
    pub fn detect(contents: &str) -> Result<Self, StorageError> {
        let header: KeyHeader =
            serde_json::from_str(contents).map_err(|e| StorageError::InvalidConfig {
                message: format!("malformed credentials: {}", e),
            })?;
        Ok(match header.kind.as_deref() {
            Some("service_account") => KeyKind::ServiceAccount,
            Some("authorized_user") => KeyKind::AuthorizedUser,
            _ => KeyKind::AccessToken,
        })
    }
}

/// Token provider exchanging a Google key file for short-lived access tokens.
///
/// The token source is built on first use and refreshes tokens itself.
pub struct GoogleTokenProvider {
    key_json: String,
    source: OnceCell<Arc<dyn TokenSource>>,
}

impl std::fmt::Debug for GoogleTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTokenProvider")
            .field("initialized", &self.source.initialized())
            .finish()
    }
}

impl GoogleTokenProvider {
    /// Create a provider from the text of a key file.
    ///
    /// # Errors
    /// `StorageError::InvalidConfig` when the key does not parse.
    pub fn from_json(contents: &str) -> Result<Self, StorageError> {
        parse_key(contents)?;
        Ok(Self {
            key_json: contents.to_string(),
            source: OnceCell::new(),
        })
    }

    async fn token_source(&self) -> Result<&Arc<dyn TokenSource>, StorageError> {
        self.source
            .get_or_try_init(|| async {
                let key: CredentialsFile = parse_key(&self.key_json)?;
                let config: Config<'_> = Config::default().with_scopes(&SCOPES);
                let provider: DefaultTokenSourceProvider =
                    DefaultTokenSourceProvider::new_with_credentials(config, Box::new(key))
                        .await
                        .map_err(|e| StorageError::InvalidConfig {
                            message: format!("cannot use credentials: {}", e),
                        })?;
                Ok::<_, StorageError>(provider.token_source())
            })
            .await
    }
}

#[async_trait]
impl TokenProvider for GoogleTokenProvider {
    async fn access_token(&self) -> Result<String, StorageError> {
        let token: String =
            self.token_source()
                .await?
                .token()
                .await
                .map_err(|e| StorageError::Network {
                    message: format!("token exchange failed: {}", e),
                })?;
        Ok(strip_bearer(&token).to_string())
    }
}

fn parse_key(contents: &str) -> Result<CredentialsFile, StorageError> {
    serde_json::from_str(contents).map_err(|e| StorageError::InvalidConfig {
        message: format!("malformed key file: {}", e),
    })
}

/// Drop the `Bearer ` prefix token sources put in front of the token.
pub fn strip_bearer(token: &str) -> &str {
    token.strip_prefix("Bearer ").unwrap_or(token)
}

/// Token provider for the text of a credentials file of any supported kind.
pub fn token_provider_from_json(contents: &str) -> Result<Arc<dyn TokenProvider>, StorageError> {
    match KeyKind::detect(contents)? {
        KeyKind::ServiceAccount | KeyKind::AuthorizedUser => {
            Ok(Arc::new(GoogleTokenProvider::from_json(contents)?))
        }
        KeyKind::AccessToken => Ok(Arc::new(Credentials::from_json(contents)?)),
    }
}

/// Token provider for a credentials file. A leading `~` is expanded.
pub fn token_provider_from_file(path: &Path) -> Result<Arc<dyn TokenProvider>, StorageError> {
    let path: PathBuf = expand_home(path);
    let contents: String = read_credentials_file(&path)?;
    log::debug!("Loading credentials from {}", path.display());
    token_provider_from_json(&contents).map_err(|e| match e {
        StorageError::InvalidConfig { message } => StorageError::InvalidConfig {
            message: format!("{}: {}", path.display(), message),
        },
        other => other,
    })
}

/// Token provider for the file named by `GOOGLE_APPLICATION_CREDENTIALS`.
pub fn token_provider_from_env() -> Result<Arc<dyn TokenProvider>, StorageError> {
    token_provider_from_file(&credentials_path_from_env()?)
}
