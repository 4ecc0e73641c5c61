//! CSV recording ingestion
//!
//! Accepts `time,ch1,ch2,...` text with an optional header row. The first
//! record is taken as a header when none of its fields is a number; a
//! partly numeric first record is a malformed data row.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};

use super::table::TimeSeriesTable;
use crate::error::{AnalysisError, Result};

/// Parse a table from any reader
pub fn read_table<R: Read>(reader: R) -> Result<TimeSeriesTable> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (i, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| AnalysisError::MalformedInput(e.to_string()))?;

        match parse_record(&record) {
            Ok(row) => rows.push(row),
            Err(_) if i == 0 && is_header(&record) => {
                header = Some(record.iter().map(str::to_string).collect());
            }
            Err(column) => {
                return Err(AnalysisError::MalformedInput(format!(
                    "line {}, column {}: '{}' is not a number",
                    i + 1,
                    column + 1,
                    record.get(column).unwrap_or("")
                )));
            }
        }
    }

    tracing::debug!(
        rows = rows.len(),
        has_header = header.is_some(),
        "parsed csv records"
    );

    TimeSeriesTable::from_rows(&rows, header)
}

/// Parse a table from in-memory text
pub fn parse_table(text: &str) -> Result<TimeSeriesTable> {
    read_table(text.as_bytes())
}

/// A header row has no numeric fields at all
fn is_header(record: &StringRecord) -> bool {
    record.iter().all(|field| field.parse::<f64>().is_err())
}

/// Parse every field of a record, returning the first failing column on error
fn parse_record(record: &StringRecord) -> std::result::Result<Vec<f64>, usize> {
    record
        .iter()
        .enumerate()
        .map(|(column, field)| field.parse::<f64>().map_err(|_| column))
        .collect()
}
