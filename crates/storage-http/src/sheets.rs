//! Sheets v4 range reads.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::Deserialize;
use serde_json::Value;

use rusty_drive_sheets::{Cell, Row, RowSource, SheetsError};
use rusty_drive_storage::{
    retry_fixed, DriveSettings, FixedRetrySettings, Sleeper, StorageError,
    TokenProvider, TokioSleeper,
};

use crate::auth::token_provider_from_env;
use crate::client::build_http_client;
use crate::context::{check_status, read_json};
use crate::error::HttpError;

/// Body of a `values.get` response. Empty ranges have no `values`.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Spreadsheet client reading cell ranges.
///
/// Range reads regularly fail with 500 or 503; they are retried with a
/// fixed delay.
pub struct HttpSheetsClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
    retry: FixedRetrySettings,
    sleeper: Arc<dyn Sleeper>,
}

impl HttpSheetsClient {
    /// Create a client. Credentials come from the settings, or else from the
    /// environment.
    pub fn new(settings: DriveSettings) -> Result<Self, StorageError> {
        let tokens: Arc<dyn TokenProvider> = match settings.credentials {
            Some(ref credentials) => Arc::new(credentials.clone()),
            None => token_provider_from_env()?,
        };
        Self::with_token_provider(settings, tokens)
    }

    /// Create a client authorizing requests with a custom token provider.
    pub fn with_token_provider(
        settings: DriveSettings,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, StorageError> {
        settings.validate()?;
        Ok(Self {
            http: build_http_client()?,
            tokens,
            base_url: settings.sheets_base_url.trim_end_matches('/').to_string(),
            retry: settings.sheets_retry,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the clock used between retries.
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// URL of `values.get` for `{tab}!{cell_range}`.
    fn range_url(&self, sheet_id: &str, tab: &str, cell_range: &str) -> Result<Url, StorageError> {
        let invalid = |message: String| StorageError::InvalidConfig { message };
        let mut url: Url = Url::parse(&format!("{}/spreadsheets", self.base_url))
            .map_err(|e| invalid(format!("invalid sheets base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("{} cannot be a base URL", self.base_url)))?
            .push(sheet_id)
            .push("values")
            .push(&format!("{}!{}", tab, cell_range));
        Ok(url)
    }

    async fn fetch_range(&self, url: &Url) -> Result<Vec<Row>, StorageError> {
        let token: String = self.tokens.access_token().await?;
        let response: Response = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(HttpError::from)?;
        let response: Response = check_status(response).await?;
        let range: ValueRange = read_json(response).await?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(Cell::from).collect())
            .collect())
    }

    /// Read the rows of `{tab}!{cell_range}`, retrying spurious server faults.
    ///
    /// # Errors
    /// The last fault once the attempts are exhausted, or the first fault
    /// whose status is not retryable.
    pub async fn get_sheet_range(
        &self,
        sheet_id: &str,
        tab: &str,
        cell_range: &str,
    ) -> Result<Vec<Row>, StorageError> {
        let url: Url = self.range_url(sheet_id, tab, cell_range)?;
        let rows: Vec<Row> =
            retry_fixed(&self.retry, self.sleeper.as_ref(), || self.fetch_range(&url)).await?;
        log::debug!("Read {} rows from {}!{}", rows.len(), tab, cell_range);
        Ok(rows)
    }
}

#[async_trait]
impl RowSource for HttpSheetsClient {
    async fn get_sheet_range(
        &self,
        sheet_id: &str,
        tab: &str,
        cell_range: &str,
    ) -> Result<Vec<Row>, SheetsError> {
        Ok(HttpSheetsClient::get_sheet_range(self, sheet_id, tab, cell_range).await?)
    }
}
