//! CSV Data Loader Module
//! Reads the monthly UPI CSV with Polars and cleans it into typed records.

use chrono::NaiveDate;
use log::{debug, info};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MONTH_COL: &str = "Month";
pub const BANKS_COL: &str = "No. of Banks live on UPI";
pub const VOLUME_COL: &str = "Volume (in Mn)";
pub const VALUE_COL: &str = "Value (in Cr.)";

/// Header row the loader accepts, in order.
pub const EXPECTED_HEADERS: [&str; 4] = [MONTH_COL, BANKS_COL, VOLUME_COL, VALUE_COL];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Unexpected CSV header: expected {expected:?}, found {found:?}")]
    Schema {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Malformed row {row} ({month}): column '{column}' has invalid value {raw:?}: {reason}")]
    MalformedRow {
        row: usize,
        month: String,
        column: &'static str,
        raw: String,
        reason: String,
    },
    #[error("Duplicate month {month} in rows {first} and {second}")]
    DuplicateMonth {
        month: String,
        first: usize,
        second: usize,
    },
}

/// One cleaned source month.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRecord {
    /// First day of the month.
    pub month: NaiveDate,
    pub volume_in_mn: f64,
    pub value_in_cr: f64,
    pub banks_live: u32,
}

/// Cleaned records in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CleanedTable {
    pub records: Vec<CleanedRecord>,
}

impl CleanedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Loads and cleans the UPI monthly CSV.
pub struct DataLoader;

impl DataLoader {
    /// Load and clean a CSV file from disk.
    pub fn load_csv(path: &Path) -> Result<CleanedTable, LoaderError> {
        let bytes = fs::read(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::load_bytes(&bytes)?;
        info!("Loaded {} months from {}", table.len(), path.display());
        Ok(table)
    }

    /// Load and clean CSV content held in memory.
    pub fn load_bytes(content: &[u8]) -> Result<CleanedTable, LoaderError> {
        let df = Self::read_raw(content)?;
        Self::clean(&df)
    }

    /// Read the CSV with every column kept as a string, so thousands
    /// separators reach the cleaning step intact.
    pub fn read_raw(content: &[u8]) -> Result<DataFrame, LoaderError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(content))
            .finish()?;
        debug!("Raw CSV shape: {:?}", df.shape());
        Ok(df)
    }

    /// Validate the header and convert raw string columns into cleaned records.
    pub fn clean(df: &DataFrame) -> Result<CleanedTable, LoaderError> {
        let found: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        if found != EXPECTED_HEADERS {
            return Err(LoaderError::Schema {
                expected: EXPECTED_HEADERS.iter().map(|s| s.to_string()).collect(),
                found,
            });
        }

        let months = df.column(MONTH_COL)?.str()?;
        let banks = df.column(BANKS_COL)?.str()?;
        let volumes = df.column(VOLUME_COL)?.str()?;
        let values = df.column(VALUE_COL)?.str()?;

        let mut records = Vec::with_capacity(df.height());
        let mut seen: HashMap<NaiveDate, usize> = HashMap::new();

        for i in 0..df.height() {
            let row = i + 1;
            let label = months.get(i).unwrap_or("").trim().to_string();
            let malformed = |column: &'static str, raw: Option<&str>, reason: String| {
                LoaderError::MalformedRow {
                    row,
                    month: label.clone(),
                    column,
                    raw: raw.unwrap_or("").to_string(),
                    reason,
                }
            };

            let month = parse_month(&label)
                .map_err(|reason| malformed(MONTH_COL, months.get(i), reason))?;
            let banks_live = parse_count(banks.get(i))
                .map_err(|reason| malformed(BANKS_COL, banks.get(i), reason))?;
            let volume_in_mn = parse_amount(volumes.get(i))
                .map_err(|reason| malformed(VOLUME_COL, volumes.get(i), reason))?;
            let value_in_cr = parse_amount(values.get(i))
                .map_err(|reason| malformed(VALUE_COL, values.get(i), reason))?;

            if let Some(&first) = seen.get(&month) {
                return Err(LoaderError::DuplicateMonth {
                    month: label,
                    first,
                    second: row,
                });
            }
            seen.insert(month, row);

            records.push(CleanedRecord {
                month,
                volume_in_mn,
                value_in_cr,
                banks_live,
            });
        }

        Ok(CleanedTable { records })
    }
}

/// Parse a `Mon-YY` label (e.g. `Jan-20`) to the first day of that month.
pub fn parse_month(label: &str) -> Result<NaiveDate, String> {
    if label.is_empty() {
        return Err("empty month label".to_string());
    }
    NaiveDate::parse_from_str(&format!("01-{label}"), "%d-%b-%y")
        .map_err(|e| format!("expected Mon-YY: {e}"))
}

fn strip_separators(raw: Option<&str>) -> Result<String, String> {
    let cleaned: String = raw
        .unwrap_or("")
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        Err("empty value".to_string())
    } else {
        Ok(cleaned)
    }
}

/// Parse a comma-grouped, non-negative number.
pub fn parse_amount(raw: Option<&str>) -> Result<f64, String> {
    let cleaned = strip_separators(raw)?;
    let value: f64 = cleaned
        .parse()
        .map_err(|_| "not a number".to_string())?;
    if !value.is_finite() {
        return Err("not a finite number".to_string());
    }
    if value < 0.0 {
        return Err("negative value".to_string());
    }
    Ok(value)
}

/// Parse a comma-grouped, non-negative integer count.
pub fn parse_count(raw: Option<&str>) -> Result<u32, String> {
    let cleaned = strip_separators(raw)?;
    cleaned
        .parse()
        .map_err(|_| "not a non-negative integer".to_string())
}
