use serde::Serialize;
use tracing::debug;

use crate::data::table::{Cell, Table};
use crate::data::upload::UploadedFile;
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Numeric training data: one feature row and one label per complete record.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedTrainingSet {
    pub feature_names: Vec<String>,
    pub label_name: String,
    /// `(rows, columns - 1)`, unscaled.
    pub features: Matrix,
    pub labels: Vec<f64>,
    /// Records discarded for having at least one missing cell.
    pub dropped_rows: usize,
}

impl PreparedTrainingSet {
    pub fn row_count(&self) -> usize {
        self.labels.len()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }
}

/// Parses the whole of `file` and converts it to features and labels.
///
/// # Errors
/// `UnsupportedFormat`, `Parse`, `EmptyDataset` (no records, or none left
/// after dropping incomplete ones) and `NonNumeric`.
pub fn prepare(file: &UploadedFile) -> Result<PreparedTrainingSet> {
    let format = file.format()?;
    let table = Table::parse(file.raw.bytes(), format, None)?;
    prepare_table(&table)
}

/// Drops incomplete records, then splits each remaining record into
/// features (all but the last column) and label (the last column).
pub fn prepare_table(table: &Table) -> Result<PreparedTrainingSet> {
    if table.rows.is_empty() || table.columns.is_empty() {
        return Err(Error::EmptyDataset);
    }

    let label_col = table.columns.len() - 1;
    let mut features = Matrix::zeros(0, label_col);
    let mut labels = Vec::new();
    let mut dropped_rows = 0;

    for (i, row) in table.rows.iter().enumerate() {
        if row.iter().any(Cell::is_missing) {
            dropped_rows += 1;
            continue;
        }
        // 1-based, counting the header line like a spreadsheet would.
        let line = i + 2;
        for (col, cell) in row.iter().enumerate() {
            let value = cell.as_number().ok_or_else(|| Error::NonNumeric {
                row: line,
                column: table.columns[col].clone(),
                value: cell.to_string(),
            })?;
            if col == label_col {
                labels.push(value);
            } else {
                features.data.push(value);
            }
        }
        features.rows += 1;
    }

    if labels.is_empty() {
        return Err(Error::EmptyDataset);
    }
    debug!(rows = labels.len(), dropped = dropped_rows, features = label_col, "prepared training set");

    Ok(PreparedTrainingSet {
        feature_names: table.columns[..label_col].to_vec(),
        label_name: table.columns[label_col].clone(),
        features,
        labels,
        dropped_rows,
    })
}
