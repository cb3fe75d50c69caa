use std::sync::{Arc, atomic::AtomicBool};

use crate::error::{Error, Result};
use crate::train::early_stop::EarlyStopping;

/// Configuration for a fit run.
///
/// # Fields
/// - `epochs`: upper bound on full passes over the training subset
/// - `batch_size`: samples per mini-batch
/// - `validation_split`: trailing fraction of the prepared rows held out
///   for validation loss, in (0, 1)
/// - `shuffle`: reshuffle the training rows every epoch
/// - `seed`: fixes weight init, shuffling and dropout; a fresh
///   random seed is drawn per run when `None`
/// - `early_stopping`: trailing-window loss check; `None` disables it
/// - `stop_flag`: when set to `true` from another thread the loop
///   terminates at the next epoch boundary
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub early_stopping: Option<EarlyStopping>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 50,
            batch_size: 32,
            validation_split: 0.2,
            shuffle: true,
            seed: None,
            early_stopping: Some(EarlyStopping::default()),
            stop_flag: None,
        }
    }
}

impl TrainConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::Training("epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Training("batch size must be at least 1".into()));
        }
        if !(self.validation_split > 0.0 && self.validation_split < 1.0) {
            return Err(Error::Training(format!(
                "validation split must be in (0, 1), got {}",
                self.validation_split
            )));
        }
        Ok(())
    }
}
