//! Input snapshot table.
//!
//! The snapshot is a delimited file written by an external scraper. Its
//! header is unknown in advance, so rows are kept as raw strings aligned to
//! the header and interpreted later by the row normalizer.

mod csv_table;

pub use csv_table::{parse_csv_table, read_csv_table};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the input table.
#[derive(Error, Debug)]
pub enum DataError {
    /// Input file does not exist
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Input file has no header or no data rows
    #[error("Input file is empty: {}", .0.display())]
    EmptyInput(PathBuf),

    /// CSV structure error (header unreadable)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Whether this error means there is nothing to process at all.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, Self::MissingInput(_) | Self::EmptyInput(_))
    }
}

/// One input record, aligned to [`RawTable::headers`].
///
/// Ragged rows are allowed; cells past the end read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<String>,
}

impl RawRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    /// Cell at `index`, or `""` when the row is shorter.
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A table of raw string records with an open-ended header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { headers, rows }
    }

    /// Build a table from string literals. Mostly useful in tests.
    pub fn from_rows<H, R, C>(headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|cells| RawRow::new(cells.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
