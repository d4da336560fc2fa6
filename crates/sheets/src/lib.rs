//! Spreadsheet row decoding.
//!
//! This crate turns tabular rows (ordered sequences of scalar cells) into
//! records keyed by field name. It provides:
//!
//! - **Cells and records** - `Cell` values and order-preserving `Record` maps
//! - **Decoding** - `RecordDecoder` for single rows, `RecordReader` over row iterators
//! - **Range reads** - `sheet_rows` and `sheet_records` streams over any `RowSource`
//! - **Whole sheets** - CSV export and upload of a spreadsheet through Drive
//!
//! # Example
//!
//! ```ignore
//! use rusty_drive_sheets::{records, Cell};
//!
//! let rows = vec![
//!     vec![Cell::from("name"), Cell::from("age")],
//!     vec![Cell::from("ada"), Cell::Int(36)],
//! ];
//! for record in records(rows) {
//!     println!("{:?}", record.value(&"name".into()));
//! }
//! ```

mod cell;
mod decoder;
mod error;
mod export;
mod record;
mod source;

pub use cell::Cell;
pub use decoder::{records, DecodeOptions, RecordDecoder, RecordReader, Row};
pub use error::SheetsError;
pub use export::{
    download_spreadsheet_records, download_spreadsheet_rows, infer_cell, parse_csv_rows,
    upload_spreadsheet_rows, write_csv_rows,
};
pub use record::{Field, Record};
pub use source::{
    decode_stream, sheet_records, sheet_rows, RangeReadOptions, RowSource, SheetRange,
};
