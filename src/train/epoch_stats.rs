use serde::{Serialize, Deserialize};

/// Losses produced by running one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochLosses {
    /// Sample-weighted mean of the mini-batch losses (dropout active).
    pub loss: f64,
    /// Inference-mode loss on the validation subset.
    pub val_loss: f64,
}

/// Per-epoch training statistics handed to the `fit` callback once every
/// completed epoch, before the next one begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Epoch limit for this run.
    pub total_epochs: usize,
    pub loss: f64,
    pub val_loss: f64,
    /// Tracked metric; the loss is MSE, so these mirror `loss`/`val_loss`.
    pub mse: f64,
    pub val_mse: f64,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
