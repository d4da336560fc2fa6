//! Whole-spreadsheet transfers through Drive.
//!
//! A spreadsheet's first tab is exported as CSV and parsed into rows; rows
//! are uploaded as CSV, converted to a spreadsheet on request. CSV carries no
//! cell types, so they are inferred from the text of each cell.

use rusty_drive_storage::{
    mimetypes, DataSource, DriveClient, DriveOperations, File, UploadRequest,
};

use crate::cell::Cell;
use crate::decoder::{DecodeOptions, RecordReader, Row};
use crate::error::SheetsError;
use crate::record::Record;

/// Cell for the text of one CSV field.
///
/// Empty text is `Null`; `true`/`false` in any case are booleans; integers
/// and finite floats are numbers; anything else stays text.
pub fn infer_cell(text: &str) -> Cell {
    if text.is_empty() {
        return Cell::Null;
    }
    if text.eq_ignore_ascii_case("true") {
        return Cell::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Cell::Bool(false);
    }
    if let Ok(int) = text.parse::<i64>() {
        return Cell::Int(int);
    }
    match text.parse::<f64>() {
        Ok(float) if float.is_finite() => Cell::Float(float),
        _ => Cell::Text(text.to_string()),
    }
}

/// Parse CSV content into rows. Rows may differ in length.
///
/// # Errors
/// `SheetsError::MalformedResponse` when the content is not valid CSV.
pub fn parse_csv_rows(data: &[u8]) -> Result<Vec<Row>, SheetsError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows: Vec<Row> = Vec::new();
    for result in reader.records() {
        let record: csv::StringRecord = result.map_err(|e| SheetsError::MalformedResponse {
            message: format!("invalid CSV export: {}", e),
        })?;
        rows.push(record.iter().map(infer_cell).collect());
    }
    Ok(rows)
}

/// Serialize rows as CSV. `Null` cells are written as empty fields.
pub fn write_csv_rows(rows: &[Row]) -> Result<Vec<u8>, SheetsError> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(row.iter().map(Cell::to_string))
            .map_err(|e| SheetsError::Encode {
                message: format!("cannot write CSV: {}", e),
            })?;
    }
    writer.into_inner().map_err(|e| SheetsError::Encode {
        message: format!("cannot write CSV: {}", e),
    })
}

/// Download the first tab of a spreadsheet as rows.
///
/// # Arguments
/// * `drive` - Drive operations
/// * `file_id` - Id of a Google Spreadsheet
pub async fn download_spreadsheet_rows<C: DriveClient>(
    drive: &DriveOperations<'_, C>,
    file_id: &str,
) -> Result<Vec<Row>, SheetsError> {
    let data: Vec<u8> = drive.download(file_id, Some(mimetypes::CSV)).await?;
    log::debug!("Exported {} bytes of CSV from {}", data.len(), file_id);
    parse_csv_rows(&data)
}

/// Download the first tab of a spreadsheet as records.
pub async fn download_spreadsheet_records<C: DriveClient>(
    drive: &DriveOperations<'_, C>,
    file_id: &str,
    options: DecodeOptions,
) -> Result<Vec<Record>, SheetsError> {
    let rows: Vec<Row> = download_spreadsheet_rows(drive, file_id).await?;
    Ok(RecordReader::new(rows, options).collect())
}

/// Upload rows as a CSV file.
///
/// # Arguments
/// * `drive` - Drive operations
/// * `parent_id` - Destination folder
/// * `name` - Remote file name
/// * `rows` - Rows to write
/// * `as_spreadsheet` - Convert the upload to a Google Spreadsheet
pub async fn upload_spreadsheet_rows<C: DriveClient>(
    drive: &DriveOperations<'_, C>,
    parent_id: &str,
    name: &str,
    rows: &[Row],
    as_spreadsheet: bool,
) -> Result<File, SheetsError> {
    let data: Vec<u8> = write_csv_rows(rows)?;
    let mut request: UploadRequest =
        UploadRequest::new(parent_id, name, DataSource::Bytes(data))
            .with_original_mime_type(mimetypes::CSV);
    if as_spreadsheet {
        request = request.with_mime_type(mimetypes::GOOGLE_SHEETS);
    }
    Ok(drive.upload(request, None).await?)
}
