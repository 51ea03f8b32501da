//! # Count Matrix Input
//!
//! Reads the exported event-count matrix. The file is comma separated with a header row;
//! each data row carries an ignored leading column (usually a row id) followed by the day,
//! the event type and the count:
//!
//! ```text
//! ,day,event_type,count
//! 0,2024-08-01,CLICK_RESOURCE_CARD,1250
//! 1,2024-08-01,LINK_FOLDER_CREATED,87
//! ```
//!
//! Parsing fails fast: the first malformed row aborts the read and is reported with its
//! line number, so a plan is never built from a partially understood file.

use crate::DailyRecord;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Number of fields a row needs (the leading column is ignored but must exist)
const MIN_FIELDS: usize = 4;

const DAY_COLUMN: usize = 1;
const EVENT_TYPE_COLUMN: usize = 2;
const COUNT_COLUMN: usize = 3;

/// Errors that can occur while reading the count matrix.
///
/// `row` is the 1-based line number in the source file, the header being line 1.
#[derive(Error, Debug)]
pub enum RecordError {
    /// Input file could not be opened
    #[error("cannot open input: {0}")]
    Io(#[from] io::Error),

    /// Underlying CSV reader failed (bad quoting, invalid UTF-8, ...)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Row has fewer fields than day, event type and count require
    #[error("row {row}: expected at least 4 fields, found {found}")]
    MissingFields { row: u64, found: usize },

    /// Day or event type column is blank
    #[error("row {row}: column {column} is empty")]
    EmptyField { row: u64, column: usize },

    /// Count column is not a non-negative integer
    #[error("row {row}: invalid count '{value}'")]
    InvalidCount { row: u64, value: String },
}

/// Read every record from a count matrix file.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<DailyRecord>, RecordError> {
    let file = File::open(path.as_ref())?;
    let records = parse_records(file)?;
    debug!(
        path = %path.as_ref().display(),
        records = records.len(),
        "read count matrix"
    );
    Ok(records)
}

/// Parse count matrix rows from any reader. The first row is treated as a header.
pub fn parse_records<R: Read>(reader: R) -> Result<Vec<DailyRecord>, RecordError> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, result) in csv.records().enumerate() {
        let row = result?;
        // Header is line 1, so the first data row is line 2 unless the reader knows better.
        let line = row
            .position()
            .map(|p| p.line())
            .unwrap_or(index as u64 + 2);
        records.push(parse_row(&row, line)?);
    }
    Ok(records)
}

fn parse_row(row: &StringRecord, line: u64) -> Result<DailyRecord, RecordError> {
    if row.len() < MIN_FIELDS {
        return Err(RecordError::MissingFields {
            row: line,
            found: row.len(),
        });
    }

    let day = required_field(row, line, DAY_COLUMN)?;
    let event_type = required_field(row, line, EVENT_TYPE_COLUMN)?;
    let raw_count = row.get(COUNT_COLUMN).unwrap_or_default();
    let count = raw_count
        .parse::<u64>()
        .map_err(|_| RecordError::InvalidCount {
            row: line,
            value: raw_count.to_string(),
        })?;

    Ok(DailyRecord::new(day, event_type, count))
}

fn required_field(row: &StringRecord, line: u64, column: usize) -> Result<&str, RecordError> {
    match row.get(column) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(RecordError::EmptyField { row: line, column }),
    }
}
