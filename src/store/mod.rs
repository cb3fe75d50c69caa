pub mod records;
pub mod run_store;

pub use records::{
    Dataset, DatasetId, Framework, MetricPoint, ModelConfig, ModelId, ModelKind, ModelStatus,
    NewDataset, NewModel,
};
pub use run_store::{RunSink, RunStore, SharedRunStore};
