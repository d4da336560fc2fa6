//! Drive operations against an in-memory client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusty_drive_common::progress_fn;
use rusty_drive_storage::{
    mimetypes, ChunkStatus, ChunkedRequest, DataSource, DriveClient, DriveOperations, File,
    FileUpdate, ListQuery, OperationType, Permission, RetrySettings, SingleShotRequest, Sleeper,
    StorageError, TransferExecutor, TransferProgress, TransferRequest, UploadRequest,
    UploadTarget,
};
use serde_json::{json, Value};

/// Bytes moved per chunk by the in-memory client.
const CHUNK: usize = 4;

#[derive(Default)]
struct State {
    files: Vec<File>,
    contents: HashMap<String, Vec<u8>>,
    shared: Vec<String>,
    content_types: HashMap<String, String>,
    /// Transient faults injected into the next chunked transfers.
    flaky_chunks: u32,
    next_id: u32,
}

impl State {
    fn insert(&mut self, name: &str, mime_type: Option<&str>, parent: Option<&str>) -> File {
        self.next_id += 1;
        let file: File = File {
            id: format!("id-{}", self.next_id),
            name: Some(name.to_string()),
            mime_type: mime_type.map(str::to_string),
            parents: parent.map(|p| vec![p.to_string()]),
            ..Default::default()
        };
        self.files.push(file.clone());
        file
    }

    fn get(&self, file_id: &str) -> Result<File, StorageError> {
        self.files
            .iter()
            .find(|f| f.id == file_id)
            .cloned()
            .ok_or_else(|| StorageError::http(404, format!("File not found: {}", file_id)))
    }

    fn take_fault(&mut self) -> Option<StorageError> {
        if self.flaky_chunks == 0 {
            return None;
        }
        self.flaky_chunks -= 1;
        Some(StorageError::http(503, "backend unavailable"))
    }

    fn matches(&self, file: &File, query: &str) -> bool {
        query.split(" and ").all(|clause| {
            if clause == "trashed = false" {
                true
            } else if clause == "sharedWithMe=true" {
                self.shared.contains(&file.id)
            } else if let Some(name) = quoted(clause, "name = ") {
                file.name.as_deref() == Some(name)
            } else if let Some(fragment) = quoted(clause, "name contains ") {
                file.name.as_deref().is_some_and(|n| n.contains(fragment))
            } else if let Some(mime) = quoted(clause, "mimeType = ") {
                file.mime_type.as_deref() == Some(mime)
            } else if let Some(parent) = clause
                .strip_suffix(" in parents")
                .and_then(|v| v.strip_prefix('\''))
                .and_then(|v| v.strip_suffix('\''))
            {
                file.parents.iter().flatten().any(|p| p == parent)
            } else {
                panic!("unsupported clause: {}", clause)
            }
        })
    }
}

fn quoted<'a>(clause: &'a str, prefix: &str) -> Option<&'a str> {
    clause
        .strip_prefix(prefix)
        .and_then(|v| v.strip_prefix('\''))
        .and_then(|v| v.strip_suffix('\''))
}

#[derive(Clone, Default)]
struct MemoryDrive {
    state: Arc<Mutex<State>>,
}

impl MemoryDrive {
    fn add(&self, name: &str, mime_type: Option<&str>, parent: Option<&str>) -> File {
        self.state.lock().unwrap().insert(name, mime_type, parent)
    }

    fn add_content(&self, name: &str, parent: Option<&str>, content: &[u8]) -> File {
        let mut state = self.state.lock().unwrap();
        let file: File = state.insert(name, Some("text/plain"), parent);
        state.contents.insert(file.id.clone(), content.to_vec());
        file
    }

    fn content(&self, file_id: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().contents.get(file_id).cloned()
    }
}

struct Upload {
    state: Arc<Mutex<State>>,
    target: UploadTarget,
    source: DataSource,
    content_type: String,
}

impl Upload {
    fn commit(&self, data: Vec<u8>) -> Result<File, StorageError> {
        let mut state = self.state.lock().unwrap();
        let file: File = match &self.target {
            UploadTarget::New {
                name,
                parent_id,
                mime_type,
            } => {
                let mime: &str = mime_type.as_deref().unwrap_or(&self.content_type);
                state.insert(name, Some(mime), Some(parent_id))
            }
            UploadTarget::Existing { file_id } => state.get(file_id)?,
        };
        state.contents.insert(file.id.clone(), data);
        state
            .content_types
            .insert(file.id.clone(), self.content_type.clone());
        Ok(file)
    }
}

#[async_trait]
impl SingleShotRequest for Upload {
    type Output = File;

    async fn execute(&mut self) -> Result<File, StorageError> {
        let data: Vec<u8> = self.source.read_all().await?;
        self.commit(data)
    }
}

struct ChunkedUpload {
    upload: Upload,
    sent: u64,
}

#[async_trait]
impl ChunkedRequest for ChunkedUpload {
    type Output = File;

    fn operation(&self) -> OperationType {
        OperationType::Uploading
    }

    fn key(&self) -> &str {
        "upload"
    }

    async fn next_chunk(&mut self) -> Result<ChunkStatus<File>, StorageError> {
        let fault: Option<StorageError> = self.upload.state.lock().unwrap().take_fault();
        if let Some(err) = fault {
            return Err(err);
        }
        let total: u64 = self.upload.source.size().await?;
        self.sent = (self.sent + CHUNK as u64).min(total);
        if self.sent < total {
            return Ok(ChunkStatus::InProgress {
                progress: Some(self.sent as f64 / total as f64),
            });
        }
        let data: Vec<u8> = self.upload.source.read_all().await?;
        self.upload.commit(data).map(ChunkStatus::Complete)
    }
}

struct Download {
    state: Arc<Mutex<State>>,
    file_id: String,
    received: Vec<u8>,
}

impl Download {
    fn content(&self) -> Result<Vec<u8>, StorageError> {
        let state = self.state.lock().unwrap();
        state
            .contents
            .get(&self.file_id)
            .cloned()
            .ok_or_else(|| StorageError::http(404, "no content"))
    }
}

#[async_trait]
impl SingleShotRequest for Download {
    type Output = Vec<u8>;

    async fn execute(&mut self) -> Result<Vec<u8>, StorageError> {
        self.content()
    }
}

#[async_trait]
impl ChunkedRequest for Download {
    type Output = Vec<u8>;

    fn operation(&self) -> OperationType {
        OperationType::Downloading
    }

    fn key(&self) -> &str {
        &self.file_id
    }

    async fn next_chunk(&mut self) -> Result<ChunkStatus<Vec<u8>>, StorageError> {
        let fault: Option<StorageError> = self.state.lock().unwrap().take_fault();
        if let Some(err) = fault {
            return Err(err);
        }
        let content: Vec<u8> = self.content()?;
        let end: usize = (self.received.len() + CHUNK).min(content.len());
        self.received
            .extend_from_slice(&content[self.received.len()..end]);
        if self.received.len() < content.len() {
            Ok(ChunkStatus::InProgress {
                progress: Some(self.received.len() as f64 / content.len() as f64),
            })
        } else {
            Ok(ChunkStatus::Complete(std::mem::take(&mut self.received)))
        }
    }
}

#[async_trait]
impl DriveClient for MemoryDrive {
    async fn get_file_metadata(
        &self,
        file_id: &str,
        _fields: Option<&str>,
    ) -> Result<File, StorageError> {
        if file_id == "root" {
            return Ok(File::folder("root-id"));
        }
        self.state.lock().unwrap().get(file_id)
    }

    async fn list_files(&self, query: &str, page_size: u32) -> Result<Vec<File>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .iter()
            .filter(|f| state.matches(f, query))
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<File, StorageError> {
        Ok(self.add(name, Some(mimetypes::GOOGLE_DRIVE_FOLDER), parent_id))
    }

    async fn update_file(&self, file_id: &str, update: &FileUpdate) -> Result<File, StorageError> {
        let mut state = self.state.lock().unwrap();
        let file: &mut File = state
            .files
            .iter_mut()
            .find(|f| f.id == file_id)
            .ok_or_else(|| StorageError::http(404, "not found"))?;
        if let Some(ref name) = update.name {
            file.name = Some(name.clone());
        }
        let mut parents: Vec<String> = file.parents.clone().unwrap_or_default();
        parents.retain(|p| !update.remove_parents.contains(p));
        parents.extend(update.add_parents.iter().cloned());
        file.parents = Some(parents);
        Ok(file.clone())
    }

    async fn remove_file(&self, file_id: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.get(file_id)?;
        state.files.retain(|f| f.id != file_id);
        state.contents.remove(file_id);
        Ok(())
    }

    async fn create_permission(
        &self,
        file_id: &str,
        role: &str,
        grantee_type: &str,
    ) -> Result<Permission, StorageError> {
        self.state.lock().unwrap().get(file_id)?;
        Ok(Permission {
            id: Some("perm-1".into()),
            role: role.to_string(),
            grantee_type: grantee_type.to_string(),
        })
    }

    fn upload_request(
        &self,
        target: UploadTarget,
        source: DataSource,
        content_type: &str,
        resumable: bool,
    ) -> TransferRequest<File> {
        let upload: Upload = Upload {
            state: self.state.clone(),
            target,
            source,
            content_type: content_type.to_string(),
        };
        if resumable {
            TransferRequest::chunked(ChunkedUpload { upload, sent: 0 })
        } else {
            TransferRequest::single_shot(upload)
        }
    }

    fn download_request(
        &self,
        file_id: &str,
        _export_mime_type: Option<&str>,
        chunked: bool,
    ) -> TransferRequest<Vec<u8>> {
        let download: Download = Download {
            state: self.state.clone(),
            file_id: file_id.to_string(),
            received: Vec::new(),
        };
        if chunked {
            TransferRequest::chunked(download)
        } else {
            TransferRequest::single_shot(download)
        }
    }
}

struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

fn operations(client: &MemoryDrive) -> DriveOperations<'_, MemoryDrive> {
    let executor: TransferExecutor =
        TransferExecutor::new(RetrySettings::default()).with_sleeper(NoSleep);
    DriveOperations::new(client).with_executor(executor)
}

#[tokio::test]
async fn test_get_or_create_folder_reuses_existing() {
    let client = MemoryDrive::default();
    let drive = operations(&client);

    let created: File = drive.get_or_create_folder("reports", Some("root-id")).await.unwrap();
    let found: File = drive.get_or_create_folder("reports", Some("root-id")).await.unwrap();

    assert_eq!(created.id, found.id);
    assert_eq!(found.is_directory(), Some(true));
    assert_eq!(client.state.lock().unwrap().files.len(), 1);

    // Same name elsewhere is a different folder.
    let other: File = drive.get_or_create_folder("reports", Some("elsewhere")).await.unwrap();
    assert_ne!(other.id, created.id);
}

#[tokio::test]
async fn test_get_file_metadata_not_found_suppression() {
    let client = MemoryDrive::default();
    let drive = operations(&client);

    assert_eq!(drive.get_file_metadata("missing", None, false).await, Ok(None));

    let err = drive.get_file("missing", true).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_root() {
    let client = MemoryDrive::default();
    let drive = operations(&client);

    let root: File = drive.root().await.unwrap();
    assert_eq!(root.id, "root-id");
    assert_eq!(root.is_directory(), Some(true));
}

#[tokio::test]
async fn test_get_file_by_name() {
    let client = MemoryDrive::default();
    let drive = operations(&client);
    let file: File = client.add("notes.txt", Some("text/plain"), Some("p1"));

    assert_eq!(drive.get_file_by_name("notes.txt", Some("p1")).await, Ok(file));
    assert_eq!(
        drive.get_file_by_name("notes.txt", Some("p2")).await,
        Err(StorageError::NotFound {
            name: "notes.txt".into()
        })
    );
}

#[tokio::test]
async fn test_file_exists() {
    let client = MemoryDrive::default();
    let drive = operations(&client);
    let file: File = client.add("a.csv", Some("text/csv"), Some("p1"));

    assert_eq!(
        drive.file_exists(Some("a.csv"), None, Some("p1")).await,
        Ok(Some(file.clone()))
    );
    assert_eq!(drive.file_exists(Some("b.csv"), None, None).await, Ok(None));
    assert_eq!(drive.file_exists(None, Some(file.id.as_str()), None).await, Ok(Some(file)));
    assert_eq!(drive.file_exists(None, Some("gone"), None).await, Ok(None));
    assert!(matches!(
        drive.file_exists(None, None, None).await,
        Err(StorageError::Other { .. })
    ));
}

#[tokio::test]
async fn test_list_files_and_children() {
    let client = MemoryDrive::default();
    let drive = operations(&client);
    let folder: File = client.add("dir", Some(mimetypes::GOOGLE_DRIVE_FOLDER), None);
    let plain: File = client.add("report.csv", Some("text/csv"), Some(folder.id.as_str()));
    client.add("report.json", Some(mimetypes::JSON), Some(folder.id.as_str()));

    let children: Vec<File> = drive.list_children(&folder).await.unwrap();
    assert_eq!(children.len(), 2);
    assert!(drive.list_children(&plain).await.unwrap().is_empty());

    let query: ListQuery = ListQuery::new().name_contains("report").mime_type("text/csv");
    assert_eq!(drive.list_files(&query).await.unwrap(), vec![plain.clone()]);

    assert_eq!(
        drive.get_child(&folder, "report.csv").await,
        Ok(Some(plain.clone()))
    );
    assert_eq!(drive.get_child(&plain, "anything").await, Ok(None));
}

#[tokio::test]
async fn test_parents_are_fetched_and_cached() {
    let client = MemoryDrive::default();
    let drive = operations(&client);
    let stored: File = client.add("child", Some("text/plain"), Some("parent-1"));

    let mut handle: File = File::with_id(stored.id.clone());
    let parents: Vec<File> = drive.parents(&mut handle).await.unwrap();
    assert_eq!(parents, vec![File::folder("parent-1")]);
    assert_eq!(handle.parents, Some(vec!["parent-1".to_string()]));

    let parent: Option<File> = drive.parent(&mut handle).await.unwrap();
    assert_eq!(parent.map(|p| p.id), Some("parent-1".to_string()));
}

#[tokio::test]
async fn test_shared_files() {
    let client = MemoryDrive::default();
    let drive = operations(&client);
    let dir: File = client.add("team", Some(mimetypes::GOOGLE_DRIVE_FOLDER), None);
    let doc: File = client.add("team", Some("text/plain"), None);
    client.add("private", Some("text/plain"), None);
    client.state.lock().unwrap().shared = vec![doc.id.clone(), dir.id.clone()];

    assert_eq!(drive.files_shared_with_me().await.unwrap().len(), 2);
    assert_eq!(drive.get_shared_directory("team").await, Ok(Some(dir)));
    assert_eq!(
        drive.get_shared_file("team", Some(false), true).await,
        Ok(Some(doc))
    );
    assert_eq!(drive.get_shared_file("private", None, false).await, Ok(None));
    assert!(matches!(
        drive.get_shared_file("private", None, true).await,
        Err(StorageError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_update_rename_and_move() {
    let client = MemoryDrive::default();
    let drive = operations(&client);
    let file: File = client.add("old.txt", Some("text/plain"), Some("p1"));

    assert_eq!(drive.update_file(&file.id, &FileUpdate::default()).await, Ok(None));

    let renamed: File = drive.rename_file(&file.id, "new.txt").await.unwrap().unwrap();
    assert_eq!(renamed.name.as_deref(), Some("new.txt"));

    let moved: File = drive.move_file_to_folder(&file.id, "p2").await.unwrap().unwrap();
    assert_eq!(moved.parents, Some(vec!["p2".to_string()]));
}

#[tokio::test]
async fn test_move_in() {
    let client = MemoryDrive::default();
    let drive = operations(&client);
    let target: File = client.add("target", Some(mimetypes::GOOGLE_DRIVE_FOLDER), None);
    let plain: File = client.add("plain", Some("text/plain"), None);
    let mut file: File = client.add("doc", Some("text/plain"), Some("p1"));

    drive.move_in(&mut file, &target, Some("renamed")).await.unwrap();
    assert_eq!(file.name.as_deref(), Some("renamed"));
    assert_eq!(file.parents, Some(vec![target.id.clone()]));

    let err = drive.move_in(&mut file, &plain, None).await.unwrap_err();
    assert!(matches!(err, StorageError::Other { .. }));
}

#[tokio::test]
async fn test_remove_and_permissions() {
    let client = MemoryDrive::default();
    let drive = operations(&client);
    let file: File = client.add("x", Some("text/plain"), None);

    let permission: Permission = drive
        .grant_file_permissions(&file.id, "reader", "anyone")
        .await
        .unwrap();
    assert_eq!(permission.role, "reader");
    assert_eq!(permission.grantee_type, "anyone");

    drive.remove_file(&file.id).await.unwrap();
    assert_eq!(drive.get_file(&file.id, false).await, Ok(None));
}

#[tokio::test]
async fn test_upload_new_then_update_existing() {
    let client = MemoryDrive::default();
    let drive = operations(&client);

    let first: Vec<u8> = vec![0x13, 0x00, 0x37, 0xFF];
    let request: UploadRequest =
        UploadRequest::new("p1", "data.bin", DataSource::Bytes(first.clone()));
    let created: File = drive.upload(request, None).await.unwrap();
    assert_eq!(client.content(&created.id), Some(first));
    assert_eq!(
        client.state.lock().unwrap().content_types.get(&created.id).cloned(),
        Some(mimetypes::OCTET_STREAM.to_string())
    );

    let request: UploadRequest =
        UploadRequest::new("p1", "data.bin", DataSource::Bytes(b"second".to_vec()))
            .with_original_mime_type("text/plain")
            .update_existing(true);
    let updated: File = drive.upload(request, None).await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(client.content(&created.id), Some(b"second".to_vec()));

    let request: UploadRequest =
        UploadRequest::new("p1", "data.bin", DataSource::Bytes(b"third".to_vec()));
    let duplicate: File = drive.upload(request, None).await.unwrap();
    assert_ne!(duplicate.id, created.id);
}

#[tokio::test]
async fn test_upload_guesses_content_type() {
    let temp_dir = tempfile::tempdir().unwrap();
    let image = temp_dir.path().join("logo");
    let mut png: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    png.extend(std::iter::repeat(0u8).take(2048));
    std::fs::write(&image, &png).unwrap();
    let notes = temp_dir.path().join("notes");
    std::fs::write(&notes, "first line\nsecond line\n").unwrap();

    let client = MemoryDrive::default();
    let drive = operations(&client);

    let uploaded: File = drive.upload_file("p1", &image, None, false, None).await.unwrap();
    let text: File = drive.upload_file("p1", &notes, None, false, None).await.unwrap();

    let state = client.state.lock().unwrap();
    assert_eq!(state.content_types.get(&uploaded.id).map(String::as_str), Some("image/png"));
    assert_eq!(
        state.content_types.get(&text.id).map(String::as_str),
        Some(mimetypes::TEXT_PLAIN)
    );
}

#[tokio::test]
async fn test_upload_conversion_mime_type() {
    let client = MemoryDrive::default();
    let drive = operations(&client);

    let request: UploadRequest =
        UploadRequest::new("p1", "table", DataSource::Bytes(b"a,b\n1,2\n".to_vec()))
            .with_mime_type(mimetypes::GOOGLE_SHEETS)
            .with_original_mime_type("text/csv");
    let file: File = drive.upload(request, None).await.unwrap();
    assert_eq!(file.mime_type.as_deref(), Some(mimetypes::GOOGLE_SHEETS));
    assert_eq!(file.human_type(), "Google Spreadsheet");
}

#[tokio::test]
async fn test_upload_file_resumable_with_retries() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("payload.txt");
    std::fs::write(&path, b"0123456789").unwrap();

    let client = MemoryDrive::default();
    client.state.lock().unwrap().flaky_chunks = 2;
    let drive = operations(&client);

    let fractions: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = fractions.clone();
    let callback = progress_fn(move |p: &TransferProgress| sink.lock().unwrap().push(p.fraction));

    let file: File = drive
        .upload_file("p1", &path, None, false, Some(&callback))
        .await
        .unwrap();

    assert_eq!(file.name.as_deref(), Some("payload.txt"));
    assert_eq!(client.content(&file.id), Some(b"0123456789".to_vec()));
    assert_eq!(*fractions.lock().unwrap(), vec![0.4, 0.8, 1.0]);
}

#[tokio::test]
async fn test_upload_file_explicit_name() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("local.txt");
    std::fs::write(&path, b"abc").unwrap();

    let client = MemoryDrive::default();
    let drive = operations(&client);
    let file: File = drive
        .upload_file("p1", &path, Some("remote.txt"), false, None)
        .await
        .unwrap();
    assert_eq!(file.name.as_deref(), Some("remote.txt"));
}

#[tokio::test]
async fn test_upload_file_missing_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let client = MemoryDrive::default();
    let drive = operations(&client);

    let err = drive
        .upload_file("p1", &temp_dir.path().join("absent"), None, false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Io { .. }));
}

#[tokio::test]
async fn test_download_resumable_recovers() {
    let client = MemoryDrive::default();
    let file: File = client.add_content("blob", None, b"abcdefghij");
    client.state.lock().unwrap().flaky_chunks = 3;
    let drive = operations(&client);

    let data: Vec<u8> = drive.download_resumable(&file.id, None, None).await.unwrap();
    assert_eq!(data, b"abcdefghij".to_vec());
}

#[tokio::test]
async fn test_download_resumable_exhausts_budget() {
    let client = MemoryDrive::default();
    let file: File = client.add_content("blob", None, b"abc");
    client.state.lock().unwrap().flaky_chunks = 100;
    let executor: TransferExecutor =
        TransferExecutor::new(RetrySettings::default().with_max_retries(2)).with_sleeper(NoSleep);
    let drive = DriveOperations::new(&client).with_executor(executor);

    let err = drive.download_resumable(&file.id, None, None).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(client.state.lock().unwrap().flaky_chunks, 97);
}

#[tokio::test]
async fn test_download_missing_file_is_final() {
    let client = MemoryDrive::default();
    let drive = operations(&client);

    let err = drive.download_resumable("nope", None, None).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_download_file_creates_directories() {
    let temp_dir = tempfile::tempdir().unwrap();
    let client = MemoryDrive::default();
    let file: File = client.add_content("x", None, b"hello");
    let drive = operations(&client);

    let dest = temp_dir.path().join("nested").join("out.txt");
    drive.download_file(&file.id, &dest, None).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"hello".to_vec());
}

#[tokio::test]
async fn test_download_json_and_jsons() {
    let client = MemoryDrive::default();
    let single: File = client.add_content("a.json", None, br#"{"k": [1, 2]}"#);
    let lines: File = client.add_content("b.jsons", None, b"{\"n\": 1}\n\n{\"n\": 2}\n");
    let drive = operations(&client);

    let value: Value = drive.download_json(&single.id).await.unwrap();
    assert_eq!(value, json!({"k": [1, 2]}));

    let values: Vec<Value> = drive.download_jsons(&lines.id).await.unwrap();
    assert_eq!(values, vec![json!({"n": 1}), json!({"n": 2})]);
}
