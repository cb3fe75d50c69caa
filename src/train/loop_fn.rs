use std::sync::atomic::Ordering;
use std::time::Instant;

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::train::epoch_stats::{EpochLosses, EpochStats};
use crate::train::train_config::TrainConfig;

/// Something that can run one epoch of training and report its losses.
///
/// `SupervisedTrainer` is the real implementation; tests script the loss
/// sequence directly.
pub trait EpochRunner {
    /// Runs epoch `epoch_index` (0-based).
    fn run_epoch(&mut self, epoch_index: usize) -> Result<EpochLosses>;
}

/// Why a fit ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EpochLimit,
    EarlyStopped,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct FitSummary {
    pub epochs_completed: usize,
    pub stop_reason: StopReason,
    /// Training loss of every completed epoch, oldest first.
    pub loss_history: Vec<f64>,
}

impl FitSummary {
    pub fn final_loss(&self) -> Option<f64> {
        self.loss_history.last().copied()
    }
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Drives `runner` for at most `config.epochs` epochs.
///
/// `on_epoch_end` fires once per completed epoch, synchronously, before the
/// next epoch begins; an error from it aborts the fit.
///
/// # Early termination
/// The loop ends without error when:
/// - `config.stop_flag` is observed at an epoch boundary, **or**
/// - early stopping flagged the epoch that just completed.
///
/// # Errors
/// A non-finite loss, an error from the runner, or an error from the
/// callback.
pub fn fit<R, F>(runner: &mut R, config: &TrainConfig, mut on_epoch_end: F) -> Result<FitSummary>
where
    R: EpochRunner + ?Sized,
    F: FnMut(&EpochStats) -> Result<()>,
{
    config.validate()?;

    let mut loss_history: Vec<f64> = Vec::with_capacity(config.epochs);
    let mut stop_reason = StopReason::EpochLimit;

    for epoch_index in 0..config.epochs {
        if cancelled(config) {
            stop_reason = StopReason::Cancelled;
            break;
        }

        // Flag now, stop after this epoch completes.
        let stop_after = config
            .early_stopping
            .is_some_and(|es| es.should_stop(epoch_index, &loss_history));
        if stop_after {
            warn!(epoch = epoch_index + 1, "loss stopped improving; finishing this epoch and stopping");
        }

        let t_start = Instant::now();
        let losses = runner.run_epoch(epoch_index)?;
        let elapsed_ms = t_start.elapsed().as_millis() as u64;

        if !losses.loss.is_finite() || !losses.val_loss.is_finite() {
            return Err(Error::Training(format!(
                "loss diverged at epoch {} (loss {}, validation loss {})",
                epoch_index + 1,
                losses.loss,
                losses.val_loss
            )));
        }
        loss_history.push(losses.loss);

        let stats = EpochStats {
            epoch: epoch_index + 1,
            total_epochs: config.epochs,
            loss: losses.loss,
            val_loss: losses.val_loss,
            mse: losses.loss,
            val_mse: losses.val_loss,
            elapsed_ms,
        };
        debug!(epoch = stats.epoch, loss = stats.loss, val_loss = stats.val_loss, "epoch complete");
        on_epoch_end(&stats)?;

        if stop_after {
            stop_reason = StopReason::EarlyStopped;
            break;
        }
        if cancelled(config) {
            stop_reason = StopReason::Cancelled;
            break;
        }
    }

    Ok(FitSummary {
        epochs_completed: loss_history.len(),
        stop_reason,
        loss_history,
    })
}

fn cancelled(config: &TrainConfig) -> bool {
    config
        .stop_flag
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}
