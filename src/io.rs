//! CSV import and export.
//!
//! The CSV schema is the only place columns are looked up by name:
//! `batch_size` and `defect_count`. Everything past this module works on
//! [`BatchRow`] and [`Dataset`].

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::Serialize;

use crate::dataset::{BatchRow, Dataset};
use crate::report::ExportReport;

/// Column holding batch sizes.
pub const BATCH_SIZE_COLUMN: &str = "batch_size";
/// Column holding defect counts.
pub const DEFECT_COUNT_COLUMN: &str = "defect_count";

/// CSV boundary failure.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("file must contain columns 'batch_size' and 'defect_count'; missing '{0}'")]
    MissingColumn(&'static str),
    #[error("row {row}: '{value}' in column '{column}' is not a whole number")]
    InvalidCell {
        /// 1-based data row.
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct CsvRow {
    batch_size: u64,
    defect_count: u64,
}

/// Reads rows from CSV with a header line.
///
/// Extra columns are ignored. Empty cells (and `NaN`) become `None`;
/// integral floats such as `100.0` are accepted.
///
/// # Examples
///
/// ```
/// use defect_fit::io::read_rows;
///
/// let csv = "batch_size,defect_count\n100,5\n120,\n";
/// let rows = read_rows(csv.as_bytes()).unwrap();
/// assert_eq!(rows[0].size, Some(100));
/// assert_eq!(rows[1].defect_count, None);
/// ```
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<BatchRow>, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let position = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
            .ok_or(IoError::MissingColumn(name))
    };
    let size_idx = position(BATCH_SIZE_COLUMN)?;
    let defect_idx = position(DEFECT_COUNT_COLUMN)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        rows.push(BatchRow {
            size: parse_cell(record.get(size_idx), row, BATCH_SIZE_COLUMN)?,
            defect_count: parse_cell(record.get(defect_idx), row, DEFECT_COUNT_COLUMN)?,
        });
    }

    tracing::info!(rows = rows.len(), "imported batch rows");
    Ok(rows)
}

fn parse_cell(raw: Option<&str>, row: usize, column: &'static str) -> Result<Option<i64>, IoError> {
    let s = raw.unwrap_or("").trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(v) = s.parse::<i64>() {
        return Ok(Some(v));
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 => Ok(Some(v as i64)),
        _ => Err(IoError::InvalidCell {
            row,
            column,
            value: s.to_string(),
        }),
    }
}

/// Reads rows from a CSV file.
pub fn read_rows_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<BatchRow>, IoError> {
    read_rows(File::open(path)?)
}

/// Writes a dataset as `batch_size,defect_count` CSV.
pub fn write_dataset<W: Write>(dataset: &Dataset, writer: W) -> Result<(), IoError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in dataset.records() {
        wtr.serialize(CsvRow {
            batch_size: record.size,
            defect_count: record.defect_count,
        })?;
    }
    // header is emitted with the first record; an empty dataset still gets one
    if dataset.is_empty() {
        wtr.write_record([BATCH_SIZE_COLUMN, DEFECT_COUNT_COLUMN])?;
    }
    wtr.flush()?;
    tracing::info!(rows = dataset.len(), "exported dataset");
    Ok(())
}

/// Writes a dataset to a CSV file, creating or truncating it.
pub fn write_dataset_to_path<P: AsRef<Path>>(dataset: &Dataset, path: P) -> Result<(), IoError> {
    write_dataset(dataset, File::create(path)?)
}

/// Writes the report's batch table as
/// `batch,batch_size,defect_count,defect_pct` CSV.
pub fn write_report_table<W: Write>(report: &ExportReport, writer: W) -> Result<(), IoError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in &report.rows {
        wtr.serialize(row)?;
    }
    if report.rows.is_empty() {
        wtr.write_record(["batch", BATCH_SIZE_COLUMN, DEFECT_COUNT_COLUMN, "defect_pct"])?;
    }
    wtr.flush()?;
    Ok(())
}
