//! Paginated spreadsheet range reads.
//!
//! Rows are fetched in batches of `batch_size` over a fixed column span,
//! sleeping between batches to stay under the API rate limits. Fetching
//! stops at the first batch shorter than requested.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream, TryStreamExt};
use rusty_drive_common::{DEFAULT_SHEET_BATCH_DELAY, DEFAULT_SHEET_BATCH_SIZE};
use rusty_drive_storage::Sleeper;

use crate::decoder::{DecodeOptions, DecodeState, Row};
use crate::error::SheetsError;
use crate::record::Record;

/// Capability of reading a rectangular cell range.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Read the rows of `cell_range` (A1 notation, e.g. `A1:D400`) in tab `tab`.
    ///
    /// Trailing empty rows are omitted by the service, so fewer rows than
    /// requested mean the end of the data.
    async fn get_sheet_range(
        &self,
        sheet_id: &str,
        tab: &str,
        cell_range: &str,
    ) -> Result<Vec<Row>, SheetsError>;
}

/// A column span of one spreadsheet tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    /// Spreadsheet id.
    pub sheet_id: String,
    /// Tab (sheet) name.
    pub tab: String,
    /// First column, e.g. `A`.
    pub column_start: String,
    /// Last column, e.g. `D`.
    pub column_end: String,
}

impl SheetRange {
    /// Create a range over columns `column_start..=column_end`.
    pub fn new(
        sheet_id: impl Into<String>,
        tab: impl Into<String>,
        column_start: impl Into<String>,
        column_end: impl Into<String>,
    ) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            tab: tab.into(),
            column_start: column_start.into(),
            column_end: column_end.into(),
        }
    }

    /// A1 range of `count` rows starting at 1-based row `first_row`.
    pub fn cell_range(&self, first_row: u64, count: u32) -> String {
        let last_row: u64 = first_row + u64::from(count.max(1)) - 1;
        format!(
            "{}{}:{}{}",
            self.column_start, first_row, self.column_end, last_row
        )
    }
}

/// Batching of range reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeReadOptions {
    /// Rows to skip before the first read.
    pub offset: u64,
    /// Rows per read.
    pub batch_size: u32,
    /// Pause between reads.
    pub delay: Duration,
}

impl Default for RangeReadOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            batch_size: DEFAULT_SHEET_BATCH_SIZE,
            delay: DEFAULT_SHEET_BATCH_DELAY,
        }
    }
}

impl RangeReadOptions {
    /// Set the number of rows skipped before the first read.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Set the rows per read.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the pause between reads.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), SheetsError> {
        if self.batch_size == 0 {
            return Err(SheetsError::InvalidOptions {
                message: "batch_size must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Pagination cursor.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    /// 1-based index of the next row to read.
    next_row: u64,
    first: bool,
    finished: bool,
}

/// Stream the rows of a sheet, batch by batch.
///
/// # Arguments
/// * `source` - Range reader
/// * `sheet` - Spreadsheet, tab and columns to read
/// * `options` - Offset, batch size and inter-batch delay
/// * `sleeper` - Clock used for the pause between batches
///
/// # Returns
/// A stream of rows. A failed read ends the stream with its error.
pub fn sheet_rows<'a, S>(
    source: &'a S,
    sheet: &'a SheetRange,
    options: RangeReadOptions,
    sleeper: &'a dyn Sleeper,
) -> impl Stream<Item = Result<Row, SheetsError>> + Send + 'a
where
    S: RowSource + ?Sized,
{
    let cursor: Cursor = Cursor {
        next_row: options.offset + 1,
        first: true,
        finished: false,
    };

    stream::try_unfold(cursor, move |mut cursor: Cursor| async move {
        if cursor.finished {
            return Ok::<_, SheetsError>(None);
        }
        options.validate()?;

        if !cursor.first && !options.delay.is_zero() {
            sleeper.sleep(options.delay).await;
        }

        let cell_range: String = sheet.cell_range(cursor.next_row, options.batch_size);
        log::debug!("Reading {}!{} of {}", sheet.tab, cell_range, sheet.sheet_id);
        let rows: Vec<Row> = source
            .get_sheet_range(&sheet.sheet_id, &sheet.tab, &cell_range)
            .await?;

        cursor.finished = rows.len() < options.batch_size as usize;
        cursor.next_row += u64::from(options.batch_size);
        cursor.first = false;
        Ok(Some((rows, cursor)))
    })
    .map_ok(|rows: Vec<Row>| stream::iter(rows.into_iter().map(Ok::<Row, SheetsError>)))
    .try_flatten()
}

/// Decode a row stream into a record stream.
pub fn decode_stream<'a, S>(
    rows: S,
    options: DecodeOptions,
) -> impl Stream<Item = Result<Record, SheetsError>> + Send + 'a
where
    S: Stream<Item = Result<Row, SheetsError>> + Send + 'a,
{
    let mut state: DecodeState = DecodeState::new(options);
    rows.try_filter_map(move |row: Row| {
        let record: Option<Record> = state.push(row);
        async move { Ok(record) }
    })
}

/// Stream the records of a sheet: `sheet_rows` chained into the decoder.
pub fn sheet_records<'a, S>(
    source: &'a S,
    sheet: &'a SheetRange,
    read_options: RangeReadOptions,
    decode_options: DecodeOptions,
    sleeper: &'a dyn Sleeper,
) -> impl Stream<Item = Result<Record, SheetsError>> + Send + 'a
where
    S: RowSource + ?Sized,
{
    decode_stream(
        sheet_rows(source, sheet, read_options, sleeper),
        decode_options,
    )
}
