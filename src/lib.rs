pub mod activation;
pub mod data;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod optim;
pub mod run;
pub mod store;
pub mod train;

// Convenience re-exports
pub use data::{ingest, prepare, validate, PreparedTrainingSet, UploadedFile, ValidationSummary};
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use network::builder::build;
pub use network::model::CompiledModel;
pub use run::{RunEvent, RunHandle, RunOutcome, RunRequest, RunState, TrainingController};
pub use store::{RunSink, RunStore, SharedRunStore};
pub use train::{fit, TrainConfig};
