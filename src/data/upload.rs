use std::fmt;
use std::sync::Arc;

use crate::data::format::DataFormat;
use crate::error::{Error, Result};

/// Shared, immutable handle to uploaded bytes. Clones are cheap; the bytes
/// are released when the last clone is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct RawHandle(Arc<[u8]>);

impl RawHandle {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> RawHandle {
        RawHandle(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({} bytes)", self.0.len())
    }
}

/// One file as received from the upload boundary.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    /// Declared media type, possibly empty.
    pub media_type: String,
    pub raw: RawHandle,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> UploadedFile {
        UploadedFile {
            name: name.into(),
            media_type: media_type.into(),
            raw: RawHandle::new(bytes),
        }
    }

    pub fn format(&self) -> Result<DataFormat> {
        DataFormat::detect(&self.name, &self.media_type)
    }

    /// Enforces the one-file-per-upload rule.
    pub fn single(mut files: Vec<UploadedFile>) -> Result<UploadedFile> {
        match files.len() {
            1 => Ok(files.remove(0)),
            n => Err(Error::FileCount(n)),
        }
    }
}
