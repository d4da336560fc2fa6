//! Row-to-record decoding.
//!
//! A `RecordDecoder` zips rows against a fixed list of field names. A
//! `RecordReader` wraps a row iterator and, unless field names are given
//! up front, takes them from the first row.
//!
//! Row shape handling:
//!
//! - Short rows: missing fields take `restval`
//! - Long rows: trailing cells are collected under `restkey`
//! - Empty rows are decoded like any short row, not skipped
//!
//! Duplicate field names overwrite each other; the last cell wins.

use crate::cell::Cell;
use crate::record::{Field, Record};

/// An ordered sequence of cells, as read from a spreadsheet.
pub type Row = Vec<Cell>;

/// Options for decoding a row sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeOptions {
    /// Field names. When `None`, the first row provides them.
    pub fields: Option<Vec<Cell>>,
    /// Key collecting the trailing cells of long rows.
    pub restkey: Cell,
    /// Value of fields missing from short rows.
    pub restval: Cell,
}

impl DecodeOptions {
    /// Options taking field names from the first row, null restkey and restval.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit field names; every row is then data.
    pub fn with_fields<I, C>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set the key collecting trailing cells.
    pub fn with_restkey(mut self, restkey: impl Into<Cell>) -> Self {
        self.restkey = restkey.into();
        self
    }

    /// Set the fill value for missing fields.
    pub fn with_restval(mut self, restval: impl Into<Cell>) -> Self {
        self.restval = restval.into();
        self
    }

    fn decoder(&self, fields: Vec<Cell>) -> RecordDecoder {
        RecordDecoder::new(fields)
            .with_restkey(self.restkey.clone())
            .with_restval(self.restval.clone())
    }
}

/// Decodes rows against a fixed list of field names.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecoder {
    fields: Vec<Cell>,
    restkey: Cell,
    restval: Cell,
}

impl RecordDecoder {
    /// Create a decoder with null restkey and restval.
    ///
    /// # Arguments
    /// * `fields` - Field names, in column order
    pub fn new(fields: Vec<Cell>) -> Self {
        Self {
            fields,
            restkey: Cell::Null,
            restval: Cell::Null,
        }
    }

    /// Set the key collecting trailing cells.
    pub fn with_restkey(mut self, restkey: Cell) -> Self {
        self.restkey = restkey;
        self
    }

    /// Set the fill value for missing fields.
    pub fn with_restval(mut self, restval: Cell) -> Self {
        self.restval = restval;
        self
    }

    /// Field names, in column order.
    pub fn fields(&self) -> &[Cell] {
        &self.fields
    }

    /// Decode one row.
    ///
    /// # Returns
    /// A record holding every field name, plus `restkey` if and only if the
    /// row has more cells than there are field names.
    pub fn decode_row(&self, row: Row) -> Record {
        let mut record: Record = Record::with_capacity(self.fields.len() + 1);
        let mut cells = row.into_iter();

        for field in &self.fields {
            let value: Cell = cells.next().unwrap_or_else(|| self.restval.clone());
            record.insert(field.clone(), Field::Value(value));
        }

        let rest: Vec<Cell> = cells.collect();
        if !rest.is_empty() {
            record.insert(self.restkey.clone(), Field::Rest(rest));
        }
        record
    }
}

/// Decoding state of a row sequence: waiting for field names, or decoding.
#[derive(Debug, Clone)]
pub(crate) enum DecodeState {
    Pending(DecodeOptions),
    Ready(RecordDecoder),
}

impl DecodeState {
    pub(crate) fn new(options: DecodeOptions) -> Self {
        match options.fields {
            Some(ref fields) => DecodeState::Ready(options.decoder(fields.clone())),
            None => DecodeState::Pending(options),
        }
    }

    /// Feed the next row. The header row yields no record.
    pub(crate) fn push(&mut self, row: Row) -> Option<Record> {
        match self {
            DecodeState::Ready(decoder) => Some(decoder.decode_row(row)),
            DecodeState::Pending(options) => {
                let decoder: RecordDecoder = options.decoder(row);
                log::debug!("Decoding rows with {} fields", decoder.fields().len());
                *self = DecodeState::Ready(decoder);
                None
            }
        }
    }
}

/// Iterator of records over an iterator of rows.
///
/// Single pass: rows are pulled one at a time as records are requested.
pub struct RecordReader<I> {
    rows: I,
    state: DecodeState,
}

impl<I: Iterator<Item = Row>> RecordReader<I> {
    /// Create a reader.
    ///
    /// # Arguments
    /// * `rows` - Row sequence, header first unless `options` names the fields
    /// * `options` - Field names, restkey and restval
    pub fn new<R>(rows: R, options: DecodeOptions) -> Self
    where
        R: IntoIterator<IntoIter = I>,
    {
        Self {
            rows: rows.into_iter(),
            state: DecodeState::new(options),
        }
    }

    /// Field names, once known.
    pub fn fields(&self) -> Option<&[Cell]> {
        match self.state {
            DecodeState::Ready(ref decoder) => Some(decoder.fields()),
            DecodeState::Pending(_) => None,
        }
    }
}

impl<I: Iterator<Item = Row>> Iterator for RecordReader<I> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            let row: Row = self.rows.next()?;
            if let Some(record) = self.state.push(row) {
                return Some(record);
            }
        }
    }
}

/// Decode rows into records, taking field names from the first row.
pub fn records<R>(rows: R) -> RecordReader<R::IntoIter>
where
    R: IntoIterator<Item = Row>,
{
    RecordReader::new(rows, DecodeOptions::default())
}
