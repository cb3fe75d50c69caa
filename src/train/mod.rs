pub mod early_stop;
pub mod epoch_stats;
pub mod loop_fn;
pub mod train_config;
pub mod trainer;

pub use early_stop::EarlyStopping;
pub use epoch_stats::{EpochLosses, EpochStats};
pub use loop_fn::{fit, EpochRunner, FitSummary, StopReason};
pub use train_config::TrainConfig;
pub use trainer::SupervisedTrainer;
