//! Shared plumbing of the `drive-upload` and `drive-download` tools.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rusty_drive_common::{progress_fn, ProgressCallback};
use rusty_drive_storage::{mimetypes, DriveSettings, File, TransferProgress};
use rusty_drive_storage_http::HttpDriveClient;

/// Initialize logging; `RUST_LOG` overrides the default `warn` level.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

/// Connect to Drive with credentials from the environment.
pub fn connect() -> Result<HttpDriveClient> {
    HttpDriveClient::new(DriveSettings::default()).context("Failed to create Drive client")
}

/// One-line progress message, e.g. `Upload 42%`.
pub fn format_progress(progress: &TransferProgress) -> String {
    format!("{} {}%", progress.operation, progress.percent())
}

/// Progress callback rewriting the current terminal line.
pub fn progress_printer() -> impl ProgressCallback<TransferProgress> {
    progress_fn(|progress: &TransferProgress| {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "\r{}", format_progress(progress));
        let _ = stdout.flush();
    })
}

/// Export format for native Google documents, which have no raw content.
pub fn export_mime_type(file: &File) -> Option<&'static str> {
    match file.mime_type.as_deref() {
        Some(mimetypes::GOOGLE_SHEETS) => Some(mimetypes::XLSX),
        _ => None,
    }
}

/// Local destination of a downloaded file inside `output_dir`.
///
/// Path separators in the remote name are replaced so the file stays in
/// `output_dir`.
pub fn output_path(output_dir: &Path, file: &File) -> Result<PathBuf> {
    let name: &str = match file.name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => bail!("File {} has no name", file.id),
    };
    let safe: String = name.replace(['/', '\\'], "_");
    if safe == "." || safe == ".." {
        bail!("Refusing to write file named {:?}", name);
    }
    Ok(output_dir.join(safe))
}
