pub mod format;
pub mod ingest;
pub mod preprocess;
pub mod table;
pub mod upload;
pub mod validate;

pub use format::DataFormat;
pub use ingest::{accept, ingest, AcceptedUpload, IngestReport};
pub use preprocess::{prepare, prepare_table, PreparedTrainingSet};
pub use table::{Cell, Table, ValueKind};
pub use upload::{RawHandle, UploadedFile};
pub use validate::{summarize, validate, ValidationSummary, PREVIEW_ROWS};
