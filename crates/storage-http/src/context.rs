//! Shared request plumbing for the Drive endpoints.

use std::sync::Arc;

use reqwest::{RequestBuilder, Response};
use rusty_drive_storage::{StorageError, TokenProvider};
use serde::de::DeserializeOwned;

use crate::error::HttpError;

/// Fields requested for every file resource.
pub(crate) const FILE_FIELDS: &str = "id,name,kind,mimeType,size,parents,webViewLink";

/// Connection state shared by the client and its in-flight transfers.
pub(crate) struct ApiContext {
    pub(crate) http: reqwest::Client,
    pub(crate) tokens: Arc<dyn TokenProvider>,
    pub(crate) api_base_url: String,
    pub(crate) upload_base_url: String,
    pub(crate) supports_all_drives: bool,
    pub(crate) chunk_size: u64,
}

impl ApiContext {
    /// `files` collection URL.
    pub(crate) fn files_url(&self) -> String {
        format!("{}/files", self.api_base_url)
    }

    /// URL of one file resource.
    pub(crate) fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_base_url, file_id)
    }

    /// Media upload URL, for a new file or an existing one.
    pub(crate) fn upload_url(&self, file_id: Option<&str>) -> String {
        match file_id {
            Some(id) => format!("{}/files/{}", self.upload_base_url, id),
            None => format!("{}/files", self.upload_base_url),
        }
    }

    /// Query parameters added to every Drive call.
    pub(crate) fn drive_params(&self) -> Vec<(&'static str, &'static str)> {
        if self.supports_all_drives {
            vec![("supportsAllDrives", "true")]
        } else {
            Vec::new()
        }
    }

    /// Authorize and send a Drive API call, failing on non-2xx statuses.
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response, StorageError> {
        let response: Response = self.send_unchecked(builder.query(&self.drive_params())).await?;
        Ok(check_status(response).await?)
    }

    /// Authorize and send a call, returning the response whatever its status.
    pub(crate) async fn send_unchecked(
        &self,
        builder: RequestBuilder,
    ) -> Result<Response, StorageError> {
        let token: String = self.tokens.access_token().await?;
        let response: Response = builder
            .bearer_auth(token)
            .send()
            .await
            .map_err(HttpError::from)?;
        Ok(response)
    }
}

/// Turn a non-2xx response into a status error.
pub(crate) async fn check_status(response: Response) -> Result<Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: String = response.text().await.unwrap_or_default();
    Err(HttpError::from_body(status.as_u16(), &body))
}

/// Decode a JSON response body.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, StorageError> {
    let body = response.bytes().await.map_err(HttpError::from)?;
    Ok(serde_json::from_slice(&body)?)
}

/// Field mask for a file request; the id is always included.
pub(crate) fn file_fields(fields: Option<&str>) -> String {
    match fields {
        None => FILE_FIELDS.to_string(),
        Some(f) if f.split(',').any(|part| part.trim() == "id") => f.to_string(),
        Some(f) => format!("id,{}", f),
    }
}
