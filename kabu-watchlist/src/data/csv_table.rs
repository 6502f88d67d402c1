//! CSV loading for the snapshot table.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use super::{DataError, RawRow, RawTable};

/// Read the snapshot table at `path`.
///
/// A missing file, a file without a header, or a header without data rows
/// are all reported as missing input: there is nothing to rank.
pub fn read_csv_table(path: &Path) -> Result<RawTable, DataError> {
    if !path.exists() {
        return Err(DataError::MissingInput(path.to_path_buf()));
    }

    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(DataError::EmptyInput(path.to_path_buf()));
    }
    let table = parse_csv_table(file)?;

    if table.headers.is_empty() || table.is_empty() {
        return Err(DataError::EmptyInput(path.to_path_buf()));
    }

    debug!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.len(),
        "Loaded input table"
    );

    Ok(table)
}

/// Parse a CSV stream with a header row into a [`RawTable`].
///
/// Records that fail to decode are skipped with a warning; only an
/// unreadable header is an error.
pub fn parse_csv_table<R: Read>(reader: R) -> Result<RawTable, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; lines are 1-based
        let line = idx + 2;
        match result {
            Ok(record) => rows.push(RawRow::new(record.iter().map(String::from).collect())),
            Err(e) => warn!(line, error = %e, "Skipping malformed CSV record"),
        }
    }

    Ok(RawTable::new(headers, rows))
}
