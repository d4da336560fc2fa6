//! High-level Drive operations.
//!
//! This module provides the operations of the Drive client that work with any
//! `DriveClient` implementation. It handles:
//!
//! - Lookups by id or name, with optional "not found" suppression
//! - Folder creation and navigation (children, parents, shared files)
//! - Metadata updates (rename, move)
//! - Uploads and downloads through the `TransferExecutor`
//!
//! # Example
//!
//! ```ignore
//! use rusty_drive_storage::{DriveOperations, UploadRequest, DataSource};
//!
//! let drive = DriveOperations::new(&client).with_executor(executor);
//! let folder = drive.get_or_create_folder("reports", None).await?;
//! let file = drive
//!     .upload(UploadRequest::new(&folder.id, "q3.csv", DataSource::FilePath(path)), None)
//!     .await?;
//! ```

use std::path::Path;

use rusty_drive_common::{ProgressCallback, DEFAULT_PAGE_SIZE};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StorageError;
use crate::executor::TransferExecutor;
use crate::file::{File, Permission};
use crate::mimetypes;
use crate::traits::DriveClient;
use crate::types::{
    DataSource, FileUpdate, ListQuery, RetrySettings, TransferProgress, UploadRequest,
    UploadTarget,
};

/// Alias id of the root folder.
pub const ROOT_FOLDER_ID: &str = "root";

/// Query listing files shared with the current user.
const SHARED_WITH_ME_QUERY: &str = "sharedWithMe=true";

/// High-level Drive operations using any DriveClient implementation.
pub struct DriveOperations<'a, C: DriveClient> {
    /// The client for Drive API calls.
    client: &'a C,
    /// Executor running uploads and downloads.
    executor: TransferExecutor,
}

impl<'a, C: DriveClient> DriveOperations<'a, C> {
    /// Create operations over a client, with default retry settings.
    ///
    /// # Arguments
    /// * `client` - Client for Drive API calls
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            executor: TransferExecutor::new(RetrySettings::default()),
        }
    }

    /// Set the executor used for transfers.
    ///
    /// # Arguments
    /// * `executor` - Transfer executor
    pub fn with_executor(mut self, executor: TransferExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        self.client
    }

    /// Create a folder, optionally under a parent.
    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<File, StorageError> {
        self.client.create_folder(name, parent_id).await
    }

    /// Return the folder named `name` under `parent_id`, creating it if needed.
    pub async fn get_or_create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<File, StorageError> {
        let query: ListQuery = ListQuery::new()
            .name_equals(name)
            .mime_type(mimetypes::GOOGLE_DRIVE_FOLDER)
            .parents_in(parent_id)
            .page_size(1);
        let mut folders: Vec<File> = self.list_files(&query).await?;

        match folders.len() {
            0 => self.create_folder(name, parent_id).await,
            1 => Ok(folders.remove(0)),
            _ => Err(StorageError::Other {
                message: format!("Unable to find folder {}", name),
            }),
        }
    }

    /// Remove a file by its id.
    pub async fn remove_file(&self, file_id: &str) -> Result<(), StorageError> {
        self.client.remove_file(file_id).await
    }

    /// Fetch a file's metadata.
    ///
    /// # Arguments
    /// * `file_id` - File id
    /// * `fields` - Optional field mask
    /// * `raise_if_not_found` - If `false`, a 404 yields `Ok(None)`
    pub async fn get_file_metadata(
        &self,
        file_id: &str,
        fields: Option<&str>,
        raise_if_not_found: bool,
    ) -> Result<Option<File>, StorageError> {
        match self.client.get_file_metadata(file_id, fields).await {
            Ok(file) => Ok(Some(file)),
            Err(err) if !raise_if_not_found && err.is_not_found_status() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Get a file by its id.
    pub async fn get_file(
        &self,
        file_id: &str,
        raise_if_not_found: bool,
    ) -> Result<Option<File>, StorageError> {
        self.get_file_metadata(file_id, None, raise_if_not_found)
            .await
    }

    /// The root folder.
    pub async fn root(&self) -> Result<File, StorageError> {
        self.client.get_file_metadata(ROOT_FOLDER_ID, None).await
    }

    /// Get a file by name.
    ///
    /// Names are not unique; the first match is returned.
    ///
    /// # Errors
    /// `StorageError::NotFound` if no file has that name.
    pub async fn get_file_by_name(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<File, StorageError> {
        let query: ListQuery = ListQuery::new()
            .name_equals(name)
            .parents_in(parent_id)
            .page_size(1);
        self.list_files(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::NotFound {
                name: name.to_string(),
            })
    }

    /// Check if a file exists and if so return it.
    ///
    /// A file id takes precedence over a name.
    ///
    /// # Errors
    /// `StorageError::Other` if both `name` and `file_id` are `None`.
    pub async fn file_exists(
        &self,
        name: Option<&str>,
        file_id: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Option<File>, StorageError> {
        if let Some(file_id) = file_id.filter(|id| !id.is_empty()) {
            return self.get_file(file_id, false).await;
        }

        let Some(name) = name.filter(|name| !name.is_empty()) else {
            return Err(StorageError::Other {
                message: "You must provide a name or file_id".into(),
            });
        };

        let query: ListQuery = ListQuery::new()
            .name_equals(name)
            .parents_in(parent_id)
            .page_size(1);
        Ok(self.list_files(&query).await?.into_iter().next())
    }

    /// List files matching a query.
    pub async fn list_files(&self, query: &ListQuery) -> Result<Vec<File>, StorageError> {
        self.client
            .list_files(&query.to_query_string(), query.page_size)
            .await
    }

    /// List a folder's content. Plain files have no children.
    pub async fn list_children(&self, folder: &File) -> Result<Vec<File>, StorageError> {
        if folder.is_directory() != Some(true) {
            return Ok(Vec::new());
        }
        self.list_files(&ListQuery::new().parents_in(Some(folder.id.as_str())))
            .await
    }

    /// Get a child of a folder by name; `None` if `folder` is not a folder.
    pub async fn get_child(&self, folder: &File, name: &str) -> Result<Option<File>, StorageError> {
        if folder.is_directory() != Some(true) {
            return Ok(None);
        }
        self.get_file_by_name(name, Some(folder.id.as_str())).await.map(Some)
    }

    /// All parents of a file. Parent ids are fetched and cached on first use.
    pub async fn parents(&self, file: &mut File) -> Result<Vec<File>, StorageError> {
        if file.parents.is_none() {
            let fetched: Option<File> = self
                .get_file_metadata(&file.id, Some("parents"), false)
                .await?;
            file.parents = Some(fetched.and_then(|f| f.parents).unwrap_or_default());
        }

        Ok(file
            .parents
            .iter()
            .flatten()
            .map(|id| File::folder(id.clone()))
            .collect())
    }

    /// First parent of a file.
    pub async fn parent(&self, file: &mut File) -> Result<Option<File>, StorageError> {
        Ok(self.parents(file).await?.into_iter().next())
    }

    /// Files and folders shared with the current user.
    pub async fn files_shared_with_me(&self) -> Result<Vec<File>, StorageError> {
        self.client
            .list_files(SHARED_WITH_ME_QUERY, DEFAULT_PAGE_SIZE)
            .await
    }

    /// Find a shared file by name.
    ///
    /// # Arguments
    /// * `name` - File name
    /// * `is_directory` - If set, only files that are (or are not) folders match
    /// * `raise_if_not_found` - If `false`, a miss yields `Ok(None)`
    pub async fn get_shared_file(
        &self,
        name: &str,
        is_directory: Option<bool>,
        raise_if_not_found: bool,
    ) -> Result<Option<File>, StorageError> {
        let found: Option<File> = self
            .files_shared_with_me()
            .await?
            .into_iter()
            .filter(|f| f.name.as_deref() == Some(name))
            .find(|f| match is_directory {
                Some(true) => f.is_directory() == Some(true),
                Some(false) => f.is_directory() != Some(true),
                None => true,
            });

        match found {
            Some(file) => Ok(Some(file)),
            None if raise_if_not_found => Err(StorageError::NotFound {
                name: name.to_string(),
            }),
            None => Ok(None),
        }
    }

    /// Find a shared folder by name.
    pub async fn get_shared_directory(&self, name: &str) -> Result<Option<File>, StorageError> {
        self.get_shared_file(name, Some(true), true).await
    }

    /// Apply metadata changes. Returns `None` when there is nothing to change.
    pub async fn update_file(
        &self,
        file_id: &str,
        update: &FileUpdate,
    ) -> Result<Option<File>, StorageError> {
        if update.is_empty() {
            return Ok(None);
        }
        self.client.update_file(file_id, update).await.map(Some)
    }

    /// Rename a file.
    pub async fn rename_file(&self, file_id: &str, name: &str) -> Result<Option<File>, StorageError> {
        let update: FileUpdate = FileUpdate {
            name: Some(name.to_string()),
            ..Default::default()
        };
        self.update_file(file_id, &update).await
    }

    /// Move a file into a folder, detaching it from its current parents.
    pub async fn move_file_to_folder(
        &self,
        file_id: &str,
        folder_id: &str,
    ) -> Result<Option<File>, StorageError> {
        let current: File = self.client.get_file_metadata(file_id, Some("parents")).await?;
        let update: FileUpdate = FileUpdate {
            remove_parents: current.parents.unwrap_or_default(),
            add_parents: vec![folder_id.to_string()],
            name: None,
        };
        self.update_file(file_id, &update).await
    }

    /// Move `file` under `new_parent`, optionally renaming it, and update
    /// the local handle.
    pub async fn move_in(
        &self,
        file: &mut File,
        new_parent: &File,
        new_name: Option<&str>,
    ) -> Result<(), StorageError> {
        if new_parent.is_directory() == Some(false) {
            return Err(StorageError::Other {
                message: format!("Not a directory: {}", new_parent),
            });
        }

        let remove_parents: Vec<String> = self
            .parents(file)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        let update: FileUpdate = FileUpdate {
            remove_parents,
            add_parents: vec![new_parent.id.clone()],
            name: new_name.map(str::to_string),
        };

        if let Some(updated) = self.update_file(&file.id, &update).await? {
            file.update_from(&updated);
        }
        file.parents = Some(vec![new_parent.id.clone()]);
        Ok(())
    }

    /// Grant a permission on a file.
    pub async fn grant_file_permissions(
        &self,
        file_id: &str,
        role: &str,
        grantee_type: &str,
    ) -> Result<Permission, StorageError> {
        self.client
            .create_permission(file_id, role, grantee_type)
            .await
    }

    /// Link opening the file in a browser.
    pub async fn get_web_view_link(&self, file_id: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .client
            .get_file_metadata(file_id, Some("webViewLink"))
            .await?
            .web_view_link)
    }

    /// Download a file's content in one request.
    ///
    /// # Arguments
    /// * `file_id` - File id
    /// * `mime_type` - If set, export the document to this MIME type
    pub async fn download(
        &self,
        file_id: &str,
        mime_type: Option<&str>,
    ) -> Result<Vec<u8>, StorageError> {
        let request = self.client.download_request(file_id, mime_type, false);
        self.executor.execute(request, None).await
    }

    /// Download a file's content chunk by chunk, retrying transient faults.
    pub async fn download_resumable(
        &self,
        file_id: &str,
        mime_type: Option<&str>,
        progress: Option<&dyn ProgressCallback<TransferProgress>>,
    ) -> Result<Vec<u8>, StorageError> {
        let request = self.client.download_request(file_id, mime_type, true);
        self.executor.execute(request, progress).await
    }

    /// Download a file and save it locally.
    pub async fn download_file(
        &self,
        file_id: &str,
        path: &Path,
        mime_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let data: Vec<u8> = self.download(file_id, mime_type).await?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent.display().to_string(), e))?;
        }
        tokio::fs::write(path, &data)
            .await
            .map_err(|e| StorageError::io(path.display().to_string(), e))
    }

    /// Download a file and parse it as JSON.
    pub async fn download_json<T: DeserializeOwned>(&self, file_id: &str) -> Result<T, StorageError> {
        let data: Vec<u8> = self.download(file_id, None).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Download a file of newline-delimited JSON objects. Empty lines are skipped.
    pub async fn download_jsons(&self, file_id: &str) -> Result<Vec<Value>, StorageError> {
        let data: Vec<u8> = self.download(file_id, None).await?;
        parse_json_lines(&data)
    }

    /// Upload content, creating a file or replacing an existing one.
    ///
    /// With `update_existing`, a file with the same name in the parent has
    /// its content replaced; otherwise a new file is created. Without an
    /// `original_mime_type`, the content type is guessed from the first
    /// kilobyte of the source.
    pub async fn upload(
        &self,
        request: UploadRequest,
        progress: Option<&dyn ProgressCallback<TransferProgress>>,
    ) -> Result<File, StorageError> {
        let content_type: String = match request.original_mime_type {
            Some(ref mime_type) => mime_type.clone(),
            None => {
                let head: Vec<u8> = request.source.read_range(0, mimetypes::SNIFF_LENGTH).await?;
                mimetypes::guess_mime_type(&head).to_string()
            }
        };
        log::debug!("Uploading {} as {}", request.name, content_type);

        let existing: Option<File> = if request.update_existing {
            self.file_exists(Some(request.name.as_str()), None, Some(request.parent_id.as_str()))
                .await?
        } else {
            None
        };

        let target: UploadTarget = match existing {
            Some(file) => UploadTarget::Existing { file_id: file.id },
            None => UploadTarget::New {
                name: request.name.clone(),
                parent_id: request.parent_id.clone(),
                mime_type: request.mime_type.clone(),
            },
        };

        let transfer =
            self.client
                .upload_request(target, request.source, &content_type, request.resumable);
        self.executor.execute(transfer, progress).await
    }

    /// Upload a local file. The remote name defaults to the local basename.
    pub async fn upload_file(
        &self,
        parent_id: &str,
        path: &Path,
        name: Option<&str>,
        update_existing: bool,
        progress: Option<&dyn ProgressCallback<TransferProgress>>,
    ) -> Result<File, StorageError> {
        let source: DataSource = DataSource::FilePath(path.to_path_buf());
        let name: String = match name {
            Some(name) => name.to_string(),
            None => source.file_name().ok_or_else(|| StorageError::Io {
                path: path.display().to_string(),
                message: "path has no file name".into(),
            })?,
        };

        let request: UploadRequest = UploadRequest::new(parent_id, name, source)
            .update_existing(update_existing)
            .resumable(true);
        self.upload(request, progress).await
    }
}

/// Parse newline-delimited JSON, skipping blank lines.
pub fn parse_json_lines(data: &[u8]) -> Result<Vec<Value>, StorageError> {
    data.split(|b| *b == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .map(|line| serde_json::from_slice(line).map_err(StorageError::from))
        .collect()
}
