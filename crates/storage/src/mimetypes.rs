//! MIME types the Drive API gives special meaning to.

/// A Drive folder.
pub const GOOGLE_DRIVE_FOLDER: &str = "application/vnd.google-apps.folder";

/// A generic Drive file.
pub const GOOGLE_DRIVE_FILE: &str = "application/vnd.google-apps.file";

/// A Google Spreadsheet.
pub const GOOGLE_SHEETS: &str = "application/vnd.google-apps.spreadsheet";

/// JSON document.
pub const JSON: &str = "application/json";

/// Comma-separated values, the export format for spreadsheet rows.
pub const CSV: &str = "text/csv";

/// Excel workbook, the usual export format for spreadsheets.
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Fallback content type when none is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Plain text, reported for UTF-8 content without a known signature.
pub const TEXT_PLAIN: &str = "text/plain";

/// Number of leading bytes inspected when guessing a content type.
pub const SNIFF_LENGTH: u64 = 1024;

/// Guess the content type of data from its first bytes.
///
/// Known binary signatures win; otherwise NUL-free UTF-8 is plain text and
/// anything else is `application/octet-stream`. A multi-byte character cut
/// at the end of `head` still counts as text.
pub fn guess_mime_type(head: &[u8]) -> &'static str {
    if let Some(kind) = infer::get(head) {
        return kind.mime_type();
    }
    if head.is_empty() || head.contains(&0) {
        return OCTET_STREAM;
    }
    match std::str::from_utf8(head) {
        Ok(_) => TEXT_PLAIN,
        Err(e) if e.error_len().is_none() => TEXT_PLAIN,
        Err(_) => OCTET_STREAM,
    }
}
