use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};

use crate::data::table::{Table, ValueKind};
use crate::data::upload::UploadedFile;
use crate::error::{Error, Result};

/// Number of data records inspected by `validate`.
pub const PREVIEW_ROWS: usize = 1000;

/// Structural summary of the first `PREVIEW_ROWS` records of an upload.
/// Statistics may not reflect the rest of a larger file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub missing_value_count: usize,
    pub observed_data_types: BTreeSet<ValueKind>,
    pub feature_names: Vec<String>,
}

/// Checks the format and summarizes a bounded preview of `file`.
///
/// # Errors
/// `UnsupportedFormat`, `Parse`, or `EmptyDataset` when the preview holds
/// no records. Missing cells do not fail validation.
pub fn validate(file: &UploadedFile) -> Result<ValidationSummary> {
    let format = file.format()?;
    let table = Table::parse(file.raw.bytes(), format, Some(PREVIEW_ROWS))?;
    summarize(&table)
}

pub fn summarize(table: &Table) -> Result<ValidationSummary> {
    if table.rows.is_empty() {
        return Err(Error::EmptyDataset);
    }

    let mut missing_value_count = 0;
    let mut observed_data_types = BTreeSet::new();
    for cell in table.rows.iter().flatten() {
        match cell.kind() {
            Some(kind) => {
                observed_data_types.insert(kind);
            }
            None => missing_value_count += 1,
        }
    }

    Ok(ValidationSummary {
        row_count: table.row_count(),
        column_count: table.column_count(),
        missing_value_count,
        observed_data_types,
        feature_names: table.columns.clone(),
    })
}
