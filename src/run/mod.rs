pub mod controller;
pub mod events;

pub use controller::{RunHandle, RunOutcome, RunReport, RunRequest, SkipReason, TrainingController};
pub use events::{MetricEvent, RunEvent, RunState};
