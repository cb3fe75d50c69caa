use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::error::{Error, Result};
use crate::run::controller::RunRequest;
use crate::store::records::{
    Dataset, DatasetId, MetricPoint, ModelConfig, ModelId, ModelStatus, NewDataset, NewModel,
};

/// Process-wide container for models, datasets and the active model.
///
/// Entities are only changed through the methods below; accessors hand out
/// shared references or clones.
#[derive(Debug, Default)]
pub struct RunStore {
    models: Vec<ModelConfig>,
    datasets: Vec<Dataset>,
    active_model_id: Option<ModelId>,
}

/// Shared handle used when a run executes on its own thread.
pub type SharedRunStore = Arc<Mutex<RunStore>>;

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedRunStore {
        Arc::new(Mutex::new(self))
    }

    // -- mutation ----------------------------------------------------------

    pub fn add_dataset(&mut self, record: NewDataset) -> DatasetId {
        let id = DatasetId::generate();
        debug!(%id, name = %record.name, bytes = record.size_bytes, "dataset added");
        self.datasets.push(Dataset {
            id: id.clone(),
            name: record.name,
            mime_type: record.mime_type,
            size_bytes: record.size_bytes,
            created_at: record.created_at,
            raw: record.raw,
        });
        id
    }

    /// Removes a dataset; its bytes are freed once no run still holds them.
    pub fn remove_dataset(&mut self, id: &DatasetId) -> Option<Dataset> {
        let pos = self.datasets.iter().position(|d| &d.id == id)?;
        Some(self.datasets.remove(pos))
    }

    /// New models start `ready` with an empty metrics history.
    pub fn add_model(&mut self, config: NewModel) -> ModelId {
        let id = ModelId::generate();
        debug!(%id, name = %config.name, "model added");
        self.models.push(ModelConfig {
            id: id.clone(),
            name: config.name,
            kind: config.kind,
            framework: config.framework,
            status: ModelStatus::Ready,
            metrics_history: Vec::new(),
        });
        id
    }

    pub fn update_model_metrics(&mut self, id: &ModelId, point: MetricPoint) -> Result<()> {
        self.model_mut(id)?.metrics_history.push(point);
        Ok(())
    }

    pub fn update_model_status(&mut self, id: &ModelId, status: ModelStatus) -> Result<()> {
        self.model_mut(id)?.status = status;
        Ok(())
    }

    pub fn set_active_model(&mut self, id: &ModelId) -> Result<()> {
        self.model_mut(id)?;
        self.active_model_id = Some(id.clone());
        Ok(())
    }

    fn model_mut(&mut self, id: &ModelId) -> Result<&mut ModelConfig> {
        self.models
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| Error::UnknownModel(id.to_string()))
    }

    // -- access ------------------------------------------------------------

    pub fn models(&self) -> &[ModelConfig] {
        &self.models
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn model(&self, id: &ModelId) -> Option<&ModelConfig> {
        self.models.iter().find(|m| &m.id == id)
    }

    pub fn dataset(&self, id: &DatasetId) -> Option<&Dataset> {
        self.datasets.iter().find(|d| &d.id == id)
    }

    pub fn active_model_id(&self) -> Option<&ModelId> {
        self.active_model_id.as_ref()
    }

    pub fn active_model(&self) -> Option<&ModelConfig> {
        self.active_model_id.as_ref().and_then(|id| self.model(id))
    }

    /// Most recently added dataset.
    pub fn latest_dataset(&self) -> Option<&Dataset> {
        self.datasets.last()
    }

    /// The active model paired with the latest dataset, if both exist.
    pub fn run_request(&self) -> Option<RunRequest> {
        let model = self.active_model()?;
        let dataset = self.latest_dataset()?;
        Some(RunRequest {
            model_id: model.id.clone(),
            dataset: dataset.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// RunSink
// ---------------------------------------------------------------------------

/// The slice of the store a training run reads and writes.
pub trait RunSink {
    fn model_status(&self, id: &ModelId) -> Option<ModelStatus>;
    fn update_model_status(&mut self, id: &ModelId, status: ModelStatus) -> Result<()>;
    fn update_model_metrics(&mut self, id: &ModelId, point: MetricPoint) -> Result<()>;
}

impl RunSink for RunStore {
    fn model_status(&self, id: &ModelId) -> Option<ModelStatus> {
        self.model(id).map(|m| m.status)
    }

    fn update_model_status(&mut self, id: &ModelId, status: ModelStatus) -> Result<()> {
        RunStore::update_model_status(self, id, status)
    }

    fn update_model_metrics(&mut self, id: &ModelId, point: MetricPoint) -> Result<()> {
        RunStore::update_model_metrics(self, id, point)
    }
}

/// Locks per call, so a long run never holds the store between epochs.
impl RunSink for SharedRunStore {
    fn model_status(&self, id: &ModelId) -> Option<ModelStatus> {
        self.lock().unwrap_or_else(PoisonError::into_inner).model_status(id)
    }

    fn update_model_status(&mut self, id: &ModelId, status: ModelStatus) -> Result<()> {
        self.lock().unwrap_or_else(PoisonError::into_inner).update_model_status(id, status)
    }

    fn update_model_metrics(&mut self, id: &ModelId, point: MetricPoint) -> Result<()> {
        self.lock().unwrap_or_else(PoisonError::into_inner).update_model_metrics(id, point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::upload::UploadedFile;
    use crate::store::records::{Framework, ModelKind};

    fn new_model(name: &str) -> NewModel {
        NewModel { name: name.into(), kind: ModelKind::Regression, framework: Framework::Tensorflow }
    }

    #[test]
    fn models_start_ready_and_ids_are_unique() {
        let mut store = RunStore::new();
        let a = store.add_model(new_model("a"));
        let b = store.add_model(new_model("b"));
        assert_ne!(a, b);
        assert_eq!(store.model(&a).unwrap().status, ModelStatus::Ready);
        assert!(store.model(&a).unwrap().metrics_history.is_empty());
    }

    #[test]
    fn metrics_are_appended_in_order() {
        let mut store = RunStore::new();
        let id = store.add_model(new_model("m"));
        for epoch in 1..=3 {
            let point = MetricPoint {
                epoch,
                training_loss: 1.0,
                validation_loss: 1.0,
                training_accuracy: 0.0,
                validation_accuracy: 0.0,
            };
            store.update_model_metrics(&id, point).unwrap();
        }
        let epochs: Vec<usize> = store.model(&id).unwrap().metrics_history.iter().map(|p| p.epoch).collect();
        assert_eq!(epochs, vec![1, 2, 3]);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut store = RunStore::new();
        let ghost = ModelId("ghost".into());
        assert!(matches!(store.set_active_model(&ghost), Err(Error::UnknownModel(_))));
        assert!(matches!(store.update_model_status(&ghost, ModelStatus::Error), Err(Error::UnknownModel(_))));
        assert!(store.active_model_id().is_none());
        assert!(store.dataset(&DatasetId("nope".into())).is_none());
    }

    #[test]
    fn run_request_needs_active_model_and_dataset() {
        let mut store = RunStore::new();
        let id = store.add_model(new_model("m"));
        assert!(store.run_request().is_none());
        store.set_active_model(&id).unwrap();
        assert!(store.run_request().is_none());

        let first = UploadedFile::new("first.csv", "text/csv", b"a,b\n1,2\n".to_vec());
        let second = UploadedFile::new("second.csv", "text/csv", b"a,b\n3,4\n".to_vec());
        store.add_dataset(NewDataset::from_upload(&first));
        let latest = store.add_dataset(NewDataset::from_upload(&second));

        let request = store.run_request().unwrap();
        assert_eq!(request.model_id, id);
        assert_eq!(request.dataset.id, latest);

        let removed = store.remove_dataset(&latest).unwrap();
        assert_eq!(removed.name, "second.csv");
        assert_eq!(store.latest_dataset().unwrap().name, "first.csv");
    }
}
