//! CSV loading for the command-line tool.
//!
//! The first row is the header. Empty or non-numeric fields become NaN,
//! which the binning layer treats as missing.

use std::io;
use std::path::Path;

use ndarray::{Array2, ArrayView2};

/// Errors that can occur when reading or writing CSV data.
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row} has {got} fields, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("file has no header row")]
    MissingHeader,
}

/// A parsed CSV table: column names plus a dense row-major matrix.
#[derive(Debug, Clone)]
pub struct Table {
    pub columns: Vec<String>,
    pub data: Array2<f32>,
}

/// Read a CSV file with a header row.
pub fn read_csv(path: &Path) -> Result<Table, CsvError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    read_table(reader)
}

/// Read CSV from any reader.
pub fn read_csv_from<R: io::Read>(input: R) -> Result<Table, CsvError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    read_table(reader)
}

fn read_table<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Table, CsvError> {
    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if columns.is_empty() {
        return Err(CsvError::MissingHeader);
    }

    let n_cols = columns.len();
    let mut values: Vec<f32> = Vec::new();
    let mut n_rows = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != n_cols {
            return Err(CsvError::RaggedRow {
                row,
                expected: n_cols,
                got: record.len(),
            });
        }
        values.extend(record.iter().map(parse_field));
        n_rows += 1;
    }

    let data = Array2::from_shape_vec((n_rows, n_cols), values)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Table { columns, data })
}

#[inline]
fn parse_field(field: &str) -> f32 {
    let field = field.trim();
    if field.is_empty() {
        return f32::NAN;
    }
    field.parse().unwrap_or(f32::NAN)
}

/// Write a matrix as CSV with the given header.
pub fn write_csv(path: &Path, header: &[String], data: ArrayView2<'_, f32>) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in data.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}
