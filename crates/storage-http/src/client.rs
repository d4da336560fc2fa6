//! reqwest implementation of `DriveClient`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Response;
use serde::Serialize;

use rusty_drive_storage::{
    mimetypes, DataSource, DriveClient, DriveOperations, DriveSettings, File,
    FileList, FileUpdate, Permission, StorageError, TokenProvider, TransferExecutor,
    TransferRequest, UploadTarget,
};

use crate::auth::token_provider_from_env;
use crate::context::{file_fields, read_json, ApiContext, FILE_FIELDS};
use crate::download::{ChunkedDownload, DownloadTarget, SimpleDownload};
use crate::upload::{MultipartUpload, ResumableUpload};

/// Body of a folder creation request.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewFolder<'a> {
    name: &'a str,
    mime_type: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parents: Vec<&'a str>,
}

/// Body of a metadata update request.
#[derive(Serialize)]
struct MetadataPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

/// Body of a permission creation request.
#[derive(Serialize)]
struct NewPermission<'a> {
    role: &'a str,
    #[serde(rename = "type")]
    grantee_type: &'a str,
}

/// DriveClient implementation over the Drive v3 REST API.
pub struct HttpDriveClient {
    ctx: Arc<ApiContext>,
    settings: DriveSettings,
}

impl HttpDriveClient {
    /// Create a client. Credentials come from the settings, or else from the
    /// file named by `GOOGLE_APPLICATION_CREDENTIALS`.
    ///
    /// # Arguments
    /// * `settings` - Endpoints, credentials, chunk size and retry settings
    ///
    /// # Errors
    /// `StorageError::InvalidConfig` for invalid settings or missing credentials.
    pub fn new(settings: DriveSettings) -> Result<Self, StorageError> {
        let tokens: Arc<dyn TokenProvider> = match settings.credentials {
            Some(ref credentials) => Arc::new(credentials.clone()),
            None => token_provider_from_env()?,
        };
        Self::with_token_provider(settings, tokens)
    }

    /// Create a client authorizing requests with a custom token provider.
    ///
    /// # Arguments
    /// * `settings` - Endpoints, chunk size and retry settings
    /// * `tokens` - Source of bearer tokens
    pub fn with_token_provider(
        settings: DriveSettings,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, StorageError> {
        let http: reqwest::Client = build_http_client()?;
        Self::from_client(http, settings, tokens)
    }

    /// Create a client from an existing reqwest client (for testing).
    ///
    /// The client must not follow redirects: resumable uploads answer `308`.
    pub fn from_client(
        http: reqwest::Client,
        settings: DriveSettings,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, StorageError> {
        settings.validate()?;
        let ctx: ApiContext = ApiContext {
            http,
            tokens,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: settings.upload_base_url.trim_end_matches('/').to_string(),
            supports_all_drives: settings.supports_all_drives,
            chunk_size: settings.chunk_size,
        };
        Ok(Self {
            ctx: Arc::new(ctx),
            settings,
        })
    }

    /// Settings this client was built with.
    pub fn settings(&self) -> &DriveSettings {
        &self.settings
    }

    /// Executor configured with this client's chunked transfer retry settings.
    pub fn executor(&self) -> TransferExecutor {
        TransferExecutor::new(self.settings.upload_retry.clone())
    }

    /// High-level operations over this client.
    pub fn operations(&self) -> DriveOperations<'_, Self> {
        DriveOperations::new(self).with_executor(self.executor())
    }
}

/// reqwest client shared by the Drive and Sheets clients.
pub(crate) fn build_http_client() -> Result<reqwest::Client, StorageError> {
    let http: reqwest::Client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!("rusty-drive/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| StorageError::InvalidConfig {
            message: format!("failed to build HTTP client: {}", e),
        })?;
    Ok(http)
}

#[async_trait]
impl DriveClient for HttpDriveClient {
    async fn get_file_metadata(
        &self,
        file_id: &str,
        fields: Option<&str>,
    ) -> Result<File, StorageError> {
        let request = self
            .ctx
            .http
            .get(self.ctx.file_url(file_id))
            .query(&[("fields", file_fields(fields))]);
        let response: Response = self.ctx.send(request).await?;
        read_json(response).await
    }

    async fn list_files(&self, query: &str, page_size: u32) -> Result<Vec<File>, StorageError> {
        let mut request = self
            .ctx
            .http
            .get(self.ctx.files_url())
            .query(&[
                ("q", query.to_string()),
                ("pageSize", page_size.to_string()),
                ("fields", format!("nextPageToken,files({})", FILE_FIELDS)),
            ]);
        if self.ctx.supports_all_drives {
            request = request.query(&[("includeItemsFromAllDrives", "true")]);
        }

        let response: Response = self.ctx.send(request).await?;
        let list: FileList = read_json(response).await?;
        log::debug!("Query {:?} matched {} files", query, list.files.len());
        Ok(list.files)
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<File, StorageError> {
        let body: NewFolder<'_> = NewFolder {
            name,
            mime_type: mimetypes::GOOGLE_DRIVE_FOLDER,
            parents: parent_id.into_iter().collect(),
        };
        let request = self
            .ctx
            .http
            .post(self.ctx.files_url())
            .query(&[("fields", FILE_FIELDS)])
            .json(&body);
        let response: Response = self.ctx.send(request).await?;
        read_json(response).await
    }

    async fn update_file(&self, file_id: &str, update: &FileUpdate) -> Result<File, StorageError> {
        let mut params: Vec<(&str, String)> = vec![("fields", FILE_FIELDS.to_string())];
        if !update.add_parents.is_empty() {
            params.push(("addParents", update.add_parents.join(",")));
        }
        if !update.remove_parents.is_empty() {
            params.push(("removeParents", update.remove_parents.join(",")));
        }

        let body: MetadataPatch<'_> = MetadataPatch {
            name: update.name.as_deref(),
        };
        let request = self
            .ctx
            .http
            .patch(self.ctx.file_url(file_id))
            .query(&params)
            .json(&body);
        let response: Response = self.ctx.send(request).await?;
        read_json(response).await
    }

    async fn remove_file(&self, file_id: &str) -> Result<(), StorageError> {
        let request = self.ctx.http.delete(self.ctx.file_url(file_id));
        self.ctx.send(request).await?;
        log::debug!("Removed {}", file_id);
        Ok(())
    }

    async fn create_permission(
        &self,
        file_id: &str,
        role: &str,
        grantee_type: &str,
    ) -> Result<Permission, StorageError> {
        let body: NewPermission<'_> = NewPermission { role, grantee_type };
        let request = self
            .ctx
            .http
            .post(format!("{}/permissions", self.ctx.file_url(file_id)))
            .json(&body);
        let response: Response = self.ctx.send(request).await?;
        read_json(response).await
    }

    fn upload_request(
        &self,
        target: UploadTarget,
        source: DataSource,
        content_type: &str,
        resumable: bool,
    ) -> TransferRequest<File> {
        let ctx: Arc<ApiContext> = self.ctx.clone();
        let content_type: String = content_type.to_string();
        if resumable {
            TransferRequest::chunked(ResumableUpload::new(ctx, target, source, content_type))
        } else {
            TransferRequest::single_shot(MultipartUpload {
                ctx,
                target,
                source,
                content_type,
            })
        }
    }

    fn download_request(
        &self,
        file_id: &str,
        export_mime_type: Option<&str>,
        chunked: bool,
    ) -> TransferRequest<Vec<u8>> {
        let ctx: Arc<ApiContext> = self.ctx.clone();
        let target: DownloadTarget = DownloadTarget {
            file_id: file_id.to_string(),
            export_mime_type: export_mime_type.map(str::to_string),
        };
        if chunked {
            TransferRequest::chunked(ChunkedDownload::new(ctx, target))
        } else {
            TransferRequest::single_shot(SimpleDownload { ctx, target })
        }
    }
}
