//! CSV feature-matrix source.
//!
//! Files are header-less; every cell must parse as a number.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::{Error, Result};

/// Read every row of the CSV file at `path`.
pub fn read_csv_file(path: impl AsRef<Path>) -> Result<Vec<Vec<f64>>> {
    let file = File::open(path)?;
    read_csv(file)
}

/// Read every row from any CSV source.
///
/// Row and column numbers in parse errors are 1-based.
pub fn read_csv<R: Read>(source: R) -> Result<Vec<Vec<f64>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source);

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row = record
            .iter()
            .enumerate()
            .map(|(col_idx, cell)| {
                cell.parse::<f64>().map_err(|e| {
                    Error::InvalidData(format!(
                        "row {}, column {}: cannot parse {cell:?} as a number ({e})",
                        row_idx + 1,
                        col_idx + 1
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(rows)
}
