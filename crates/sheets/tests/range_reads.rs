//! Paginated range reads over a fake row source.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use rusty_drive_sheets::{
    sheet_records, sheet_rows, Cell, DecodeOptions, RangeReadOptions, Record, Row, RowSource,
    SheetRange, SheetsError,
};
use rusty_drive_storage::{Sleeper, StorageError};

/// Sleeper recording requested delays instead of sleeping.
#[derive(Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Row source serving rows from memory, recording the requested ranges.
struct MemorySheet {
    rows: Vec<Row>,
    requests: Mutex<Vec<String>>,
    fail_at: Option<usize>,
}

impl MemorySheet {
    fn new(count: i64) -> Self {
        let mut rows: Vec<Row> = vec![vec![Cell::from("n"), Cell::from("square")]];
        rows.extend((1..=count).map(|n| vec![Cell::Int(n), Cell::Int(n * n)]));
        Self {
            rows,
            requests: Mutex::new(Vec::new()),
            fail_at: None,
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Parse the row bounds of `A1:B400` style ranges.
fn row_bounds(cell_range: &str) -> (usize, usize) {
    let digits = |s: &str| -> usize {
        s.trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .parse()
            .unwrap()
    };
    let (start, end) = cell_range.split_once(':').unwrap();
    (digits(start), digits(end))
}

#[async_trait]
impl RowSource for MemorySheet {
    async fn get_sheet_range(
        &self,
        sheet_id: &str,
        tab: &str,
        cell_range: &str,
    ) -> Result<Vec<Row>, SheetsError> {
        assert_eq!(sheet_id, "sheet-1");
        assert_eq!(tab, "Data");
        let call: usize = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(cell_range.to_string());
            requests.len()
        };
        if self.fail_at == Some(call) {
            return Err(StorageError::http(503, "unavailable").into());
        }

        let (first, last) = row_bounds(cell_range);
        let start: usize = (first - 1).min(self.rows.len());
        let end: usize = last.min(self.rows.len());
        Ok(self.rows[start..end].to_vec())
    }
}

fn sheet() -> SheetRange {
    SheetRange::new("sheet-1", "Data", "A", "B")
}

fn options(batch_size: u32) -> RangeReadOptions {
    RangeReadOptions::default().with_batch_size(batch_size)
}

#[tokio::test]
async fn test_rows_are_read_in_batches() {
    let source = MemorySheet::new(9);
    let sheet = sheet();
    let sleeper = RecordingSleeper::default();

    let rows: Vec<Row> = sheet_rows(&source, &sheet, options(4), &sleeper)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(sleeper.delays(), vec![Duration::from_millis(500); 2]);
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[1], vec![Cell::Int(1), Cell::Int(1)]);
    assert_eq!(rows[9], vec![Cell::Int(9), Cell::Int(81)]);
    assert_eq!(source.requests(), vec!["A1:B4", "A5:B8", "A9:B12"]);
}

#[tokio::test]
async fn test_exact_multiple_needs_one_empty_read() {
    let source = MemorySheet::new(7);
    let sheet = sheet();
    let sleeper = RecordingSleeper::default();

    let rows: Vec<Row> = sheet_rows(&source, &sheet, options(4), &sleeper)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(rows.len(), 8);
    assert_eq!(source.requests(), vec!["A1:B4", "A5:B8", "A9:B12"]);
}

#[tokio::test]
async fn test_offset_skips_rows() {
    let source = MemorySheet::new(5);
    let sheet = sheet();
    let sleeper = RecordingSleeper::default();

    let rows: Vec<Row> = sheet_rows(&source, &sheet, options(10).with_offset(3), &sleeper)
        .try_collect()
        .await
        .unwrap();

    assert!(sleeper.delays().is_empty());
    assert_eq!(rows.first(), Some(&vec![Cell::Int(3), Cell::Int(9)]));
    assert_eq!(rows.len(), 3);
    assert_eq!(source.requests(), vec!["A4:B13"]);
}

#[tokio::test]
async fn test_records_from_sheet() {
    let source = MemorySheet::new(5);
    let sheet = sheet();
    let sleeper = RecordingSleeper::default();
    let read_options: RangeReadOptions = options(2).with_delay(Duration::from_millis(20));

    let records: Vec<Record> =
        sheet_records(&source, &sheet, read_options, DecodeOptions::new(), &sleeper)
            .try_collect()
            .await
            .unwrap();

    assert_eq!(source.requests().len(), 4);
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(20); 3]);
    assert_eq!(records.len(), 5);
    let squares: Vec<Option<&Cell>> = records
        .iter()
        .map(|r| r.value(&"square".into()))
        .collect();
    assert_eq!(squares[4], Some(&Cell::Int(25)));
    assert!(squares.iter().all(Option::is_some));
}

#[tokio::test]
async fn test_read_error_ends_stream() {
    let mut source = MemorySheet::new(9);
    source.fail_at = Some(2);
    let sheet = sheet();
    let sleeper = RecordingSleeper::default();

    let result: Result<Vec<Row>, SheetsError> =
        sheet_rows(&source, &sheet, options(4), &sleeper).try_collect().await;

    assert_eq!(
        result,
        Err(SheetsError::Storage(StorageError::http(503, "unavailable")))
    );
    assert_eq!(source.requests().len(), 2);
}

#[tokio::test]
async fn test_invalid_batch_size() {
    let source = MemorySheet::new(1);
    let sheet = sheet();
    let sleeper = RecordingSleeper::default();

    let result: Result<Vec<Row>, SheetsError> =
        sheet_rows(&source, &sheet, options(0), &sleeper).try_collect().await;

    assert!(matches!(result, Err(SheetsError::InvalidOptions { .. })));
    assert!(source.requests().is_empty());
}

#[tokio::test]
async fn test_zero_delay_skips_sleeping() {
    let source = MemorySheet::new(9);
    let sheet = sheet();
    let sleeper = RecordingSleeper::default();

    let read_options: RangeReadOptions = options(4).with_delay(Duration::ZERO);

    let rows: Vec<Row> = sheet_rows(&source, &sheet, read_options, &sleeper)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(rows.len(), 10);
    assert!(sleeper.delays().is_empty());
}
