use serde::Serialize;
use tracing::{info, warn};

use crate::data::preprocess::prepare;
use crate::data::upload::UploadedFile;
use crate::data::validate::{validate, ValidationSummary};
use crate::error::Result;
use crate::store::records::{DatasetId, NewDataset};
use crate::store::run_store::RunStore;

/// Result of accepting one upload into the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub dataset_id: DatasetId,
    pub summary: ValidationSummary,
    /// Usable records after dropping incomplete ones.
    pub usable_rows: usize,
}

/// An upload that passed validation and converts to numeric training data,
/// not yet recorded anywhere.
#[derive(Debug, Clone)]
pub struct AcceptedUpload {
    pub dataset: NewDataset,
    pub summary: ValidationSummary,
    pub usable_rows: usize,
}

impl AcceptedUpload {
    /// Records the upload as the latest dataset.
    pub fn commit(self, store: &mut RunStore) -> IngestReport {
        let name = self.dataset.name.clone();
        let dataset_id = store.add_dataset(self.dataset);
        info!(
            id = %dataset_id,
            name = %name,
            rows = self.summary.row_count,
            columns = self.summary.column_count,
            missing = self.summary.missing_value_count,
            usable = self.usable_rows,
            "dataset uploaded"
        );
        IngestReport {
            dataset_id,
            summary: self.summary,
            usable_rows: self.usable_rows,
        }
    }
}

/// Validates exactly one uploaded file and checks that it converts to
/// numeric training data. Touches no store, so callers sharing a store
/// only need to lock it for [`AcceptedUpload::commit`].
pub fn accept(files: Vec<UploadedFile>) -> Result<AcceptedUpload> {
    let file = UploadedFile::single(files)?;

    let summary = match validate(&file) {
        Ok(s) => s,
        Err(e) => {
            warn!(name = %file.name, error = %e, "upload rejected");
            return Err(e);
        }
    };
    let prepared = match prepare(&file) {
        Ok(p) => p,
        Err(e) => {
            warn!(name = %file.name, error = %e, "upload is not trainable");
            return Err(e);
        }
    };

    Ok(AcceptedUpload {
        dataset: NewDataset::from_upload(&file),
        summary,
        usable_rows: prepared.row_count(),
    })
}

/// [`accept`] followed by [`AcceptedUpload::commit`].
///
/// Nothing is added to `store` when any step fails.
pub fn ingest(store: &mut RunStore, files: Vec<UploadedFile>) -> Result<IngestReport> {
    Ok(accept(files)?.commit(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn csv(name: &str, text: &str) -> UploadedFile {
        UploadedFile::new(name, "text/csv", text.as_bytes().to_vec())
    }

    #[test]
    fn accepted_upload_becomes_latest_dataset() {
        let mut store = RunStore::new();
        let report = ingest(&mut store, vec![csv("d.csv", "x,y\n1,2\n,3\n4,5\n")]).unwrap();
        assert_eq!(report.summary.row_count, 3);
        assert_eq!(report.summary.missing_value_count, 1);
        assert_eq!(report.usable_rows, 2);
        assert_eq!(store.latest_dataset().unwrap().id, report.dataset_id);
    }

    #[test]
    fn rejected_upload_leaves_store_untouched() {
        let mut store = RunStore::new();
        let err = ingest(&mut store, vec![csv("d.csv", "x,y\n1,abc\n")]).unwrap_err();
        assert!(matches!(err, Error::NonNumeric { row: 2, .. }));
        let err = ingest(&mut store, vec![csv("a.csv", "x\n1\n"), csv("b.csv", "x\n1\n")]).unwrap_err();
        assert!(matches!(err, Error::FileCount(2)));
        assert!(ingest(&mut store, Vec::new()).is_err());
        assert!(store.datasets().is_empty());
    }

    #[test]
    fn accepting_runs_while_the_shared_store_is_locked() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let shared = RunStore::new().shared();
        let guard = shared.lock().unwrap();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(accept(vec![csv("d.csv", "x,y\n1,2\n3,4\n")]));
        });
        let accepted = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("accept finished while the store was locked")
            .unwrap();
        assert_eq!(accepted.usable_rows, 2);
        drop(guard);

        let report = accepted.commit(&mut shared.lock().unwrap());
        assert_eq!(shared.lock().unwrap().latest_dataset().unwrap().id, report.dataset_id);
    }
}
