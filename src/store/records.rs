use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::data::upload::{RawHandle, UploadedFile};
use crate::train::epoch_stats::EpochStats;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub String);

impl ModelId {
    pub fn generate() -> ModelId {
        ModelId(Uuid::new_v4().to_string())
    }
}

impl DatasetId {
    pub fn generate() -> DatasetId {
        DatasetId(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Ready,
    Training,
    Error,
}

/// Task label chosen when the model is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Classification,
    Regression,
    Clustering,
    Nlp,
}

/// Framework label chosen when the model is created. Training always uses
/// the built-in regressor regardless of this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    Tensorflow,
    Pytorch,
    ScikitLearn,
}

impl ModelKind {
    pub fn parse(s: &str) -> Option<ModelKind> {
        match s {
            "classification" => Some(ModelKind::Classification),
            "regression" => Some(ModelKind::Regression),
            "clustering" => Some(ModelKind::Clustering),
            "nlp" => Some(ModelKind::Nlp),
            _ => None,
        }
    }
}

impl Framework {
    pub fn parse(s: &str) -> Option<Framework> {
        match s {
            "tensorflow" => Some(Framework::Tensorflow),
            "pytorch" => Some(Framework::Pytorch),
            "scikit-learn" => Some(Framework::ScikitLearn),
            _ => None,
        }
    }
}

/// One recorded epoch. Accuracy fields are `1 - loss`, a proxy that can
/// leave [0, 1]; they are not classification accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPoint {
    pub epoch: usize,
    pub training_loss: f64,
    pub validation_loss: f64,
    pub training_accuracy: f64,
    pub validation_accuracy: f64,
}

impl MetricPoint {
    pub fn from_epoch(stats: &EpochStats) -> MetricPoint {
        MetricPoint {
            epoch: stats.epoch,
            training_loss: stats.loss,
            validation_loss: stats.val_loss,
            training_accuracy: 1.0 - stats.loss,
            validation_accuracy: 1.0 - stats.val_loss,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub id: ModelId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ModelKind,
    pub framework: Framework,
    pub status: ModelStatus,
    pub metrics_history: Vec<MetricPoint>,
}

/// Fields supplied by the creation form.
#[derive(Debug, Clone)]
pub struct NewModel {
    pub name: String,
    pub kind: ModelKind,
    pub framework: Framework,
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: DatasetId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub raw: RawHandle,
}

impl Dataset {
    /// The upload this dataset was created from, sharing the same bytes.
    pub fn source(&self) -> UploadedFile {
        UploadedFile {
            name: self.name.clone(),
            media_type: self.mime_type.clone(),
            raw: self.raw.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDataset {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub raw: RawHandle,
}

impl NewDataset {
    pub fn from_upload(file: &UploadedFile) -> NewDataset {
        NewDataset {
            name: file.name.clone(),
            mime_type: file.media_type.clone(),
            size_bytes: file.raw.len() as u64,
            created_at: Utc::now(),
            raw: file.raw.clone(),
        }
    }
}
