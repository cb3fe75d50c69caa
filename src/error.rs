use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between an upload and a finished run.
///
/// A start request that is ignored by a guard (nothing selected, run already
/// active) is not an error; see `run::RunOutcome::Ignored`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported file '{name}' ({media_type}); upload a CSV, JSON, or Excel file")]
    UnsupportedFormat { name: String, media_type: String },

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("could not parse dataset: {0}")]
    Parse(String),

    #[error("row {row}, column '{column}': '{value}' is not numeric")]
    NonNumeric {
        row: usize,
        column: String,
        value: String,
    },

    #[error("training failed: {0}")]
    Training(String),

    #[error("expected exactly one file per upload, got {0}")]
    FileCount(usize),

    #[error("unknown model id {0}")]
    UnknownModel(String),

    #[error("unknown dataset id {0}")]
    UnknownDataset(String),
}

impl Error {
    /// True for failures the user fixes by uploading different data.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat { .. }
                | Error::EmptyDataset
                | Error::Parse(_)
                | Error::NonNumeric { .. }
                | Error::FileCount(_)
        )
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}
