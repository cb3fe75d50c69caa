use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::data::preprocess::prepare;
use crate::error::{Error, Result};
use crate::network::builder::build;
use crate::run::events::{MetricEvent, RunEvent, RunState};
use crate::store::records::{Dataset, MetricPoint, ModelId, ModelStatus};
use crate::store::run_store::RunSink;
use crate::train::loop_fn::{fit, EpochRunner, FitSummary, StopReason};
use crate::train::train_config::TrainConfig;
use crate::train::trainer::SupervisedTrainer;

/// What to train: a model id and the dataset to train it on.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub model_id: ModelId,
    pub dataset: Dataset,
}

/// Why a start request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No active model or no dataset.
    NothingSelected,
    /// This controller already has a run in progress.
    AlreadyRunning,
    /// The model is being trained elsewhere.
    ModelBusy,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub model_id: ModelId,
    pub epochs_completed: usize,
    pub stop_reason: StopReason,
    pub final_loss: Option<f64>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Ignored(SkipReason),
    Finished(RunReport),
}

// ---------------------------------------------------------------------------
// RunHandle
// ---------------------------------------------------------------------------

/// Cloneable view of a controller's run, usable from other threads.
#[derive(Debug, Clone)]
pub struct RunHandle {
    stop: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    epoch: Arc<AtomicUsize>,
}

impl RunHandle {
    fn new() -> RunHandle {
        RunHandle {
            stop: Arc::new(AtomicBool::new(false)),
            state: Arc::new(AtomicU8::new(RunState::Idle.to_u8())),
            epoch: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Asks the run to end at the next epoch boundary. Returns `false` when
    /// no run is in progress.
    pub fn stop(&self) -> bool {
        if self.state() != RunState::Running {
            return false;
        }
        self.stop.store(true, Ordering::Relaxed);
        warn!(epoch = self.current_epoch(), "stop requested");
        true
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Last completed epoch (1-based), 0 before the first.
    pub fn current_epoch(&self) -> usize {
        self.epoch.load(Ordering::Relaxed)
    }

    fn set_state(&self, state: RunState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    fn reset(&self) {
        self.stop.store(false, Ordering::Relaxed);
        self.epoch.store(0, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// TrainingController
// ---------------------------------------------------------------------------

/// Drives training runs against a store and reports progress.
///
/// Runs execute synchronously on the calling thread. Progress is visible
/// through the store (status and metric history), through `RunHandle`, and
/// through `subscribe` channels.
pub struct TrainingController {
    config: TrainConfig,
    handle: RunHandle,
    subscribers: Vec<Sender<RunEvent>>,
}

impl Default for TrainingController {
    fn default() -> Self {
        TrainingController::new(TrainConfig::default())
    }
}

impl TrainingController {
    pub fn new(config: TrainConfig) -> TrainingController {
        TrainingController {
            config,
            handle: RunHandle::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn handle(&self) -> RunHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> RunState {
        self.handle.state()
    }

    /// Receives every event published from now on. Dropped receivers are
    /// pruned on the next publish.
    pub fn subscribe(&mut self) -> Receiver<RunEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Trains `request.model_id` on `request.dataset` with the built-in
    /// regressor.
    ///
    /// # Errors
    /// `UnknownModel` before anything changes; otherwise any preprocessing,
    /// build or fit error, after the run has been marked failed.
    pub fn start<S: RunSink + ?Sized>(
        &mut self,
        sink: &mut S,
        request: Option<RunRequest>,
    ) -> Result<RunOutcome> {
        let Some(request) = request else {
            debug!("start ignored: no active model or dataset");
            return Ok(RunOutcome::Ignored(SkipReason::NothingSelected));
        };

        let seed = self.config.seed.unwrap_or_else(rand::random);
        let config = self.config.clone();
        let dataset = request.dataset;
        self.run(sink, &request.model_id, move || {
            let data = prepare(&dataset.source())?;
            info!(
                dataset = %dataset.name,
                rows = data.row_count(),
                features = data.feature_count(),
                dropped = data.dropped_rows,
                seed,
                "prepared dataset"
            );
            let model = build(data.feature_count(), seed)?;
            let trainer = SupervisedTrainer::new(model, &data, &config, seed)?;
            debug!(
                train = trainer.train_rows(),
                validation = trainer.validation_rows(),
                "split training rows"
            );
            Ok(trainer)
        })
    }

    /// Same lifecycle as `start` with a caller-supplied epoch runner.
    /// `setup` runs after the model is marked `training`, so its errors
    /// fail the run like any fit error.
    pub fn run<S, R, F>(&mut self, sink: &mut S, model_id: &ModelId, setup: F) -> Result<RunOutcome>
    where
        S: RunSink + ?Sized,
        R: EpochRunner,
        F: FnOnce() -> Result<R>,
    {
        if self.state() == RunState::Running {
            debug!(model = %model_id, "start ignored: a run is in progress");
            return Ok(RunOutcome::Ignored(SkipReason::AlreadyRunning));
        }
        match sink.model_status(model_id) {
            None => return Err(Error::UnknownModel(model_id.to_string())),
            Some(ModelStatus::Training) => {
                debug!(model = %model_id, "start ignored: model is already training");
                return Ok(RunOutcome::Ignored(SkipReason::ModelBusy));
            }
            Some(_) => {}
        }

        sink.update_model_status(model_id, ModelStatus::Training)?;
        self.handle.reset();
        self.handle.set_state(RunState::Running);
        info!(model = %model_id, epochs = self.config.epochs, "training run started");

        match self.execute(sink, model_id, setup) {
            Ok(summary) => {
                self.handle.set_state(RunState::Completed);
                sink.update_model_status(model_id, ModelStatus::Ready)?;
                if summary.stop_reason == StopReason::Cancelled {
                    warn!(model = %model_id, epochs = summary.epochs_completed, "training run stopped by request");
                }
                info!(
                    model = %model_id,
                    epochs = summary.epochs_completed,
                    reason = ?summary.stop_reason,
                    final_loss = ?summary.final_loss(),
                    "training run completed"
                );
                self.publish(RunEvent::Finished {
                    state: RunState::Completed,
                    epochs_completed: summary.epochs_completed,
                    reason: summary.stop_reason,
                });
                Ok(RunOutcome::Finished(RunReport {
                    model_id: model_id.clone(),
                    epochs_completed: summary.epochs_completed,
                    stop_reason: summary.stop_reason,
                    final_loss: summary.final_loss(),
                }))
            }
            Err(e) => {
                self.handle.set_state(RunState::Failed);
                if let Err(status_err) = sink.update_model_status(model_id, ModelStatus::Error) {
                    error!(model = %model_id, error = %status_err, "could not mark model as failed");
                }
                error!(model = %model_id, error = %e, "training run failed");
                self.publish(RunEvent::Failed { message: e.to_string() });
                Err(e)
            }
        }
    }

    fn execute<S, R, F>(&mut self, sink: &mut S, model_id: &ModelId, setup: F) -> Result<FitSummary>
    where
        S: RunSink + ?Sized,
        R: EpochRunner,
        F: FnOnce() -> Result<R>,
    {
        let mut runner = setup()?;
        let config = TrainConfig {
            stop_flag: Some(self.handle.stop.clone()),
            ..self.config.clone()
        };
        let handle = self.handle.clone();
        let subscribers = &mut self.subscribers;

        fit(&mut runner, &config, |stats| {
            let point = MetricPoint::from_epoch(stats);
            sink.update_model_metrics(model_id, point)?;
            handle.epoch.store(stats.epoch, Ordering::Relaxed);
            publish(subscribers, RunEvent::Epoch(MetricEvent::new(&point, stats.total_epochs)));
            Ok(())
        })
    }

    fn publish(&mut self, event: RunEvent) {
        publish(&mut self.subscribers, event);
    }
}

fn publish(subscribers: &mut Vec<Sender<RunEvent>>, event: RunEvent) {
    subscribers.retain(|tx| tx.send(event.clone()).is_ok());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_refused_when_idle() {
        let controller = TrainingController::default();
        let handle = controller.handle();
        assert_eq!(handle.state(), RunState::Idle);
        assert!(!handle.stop());
        assert_eq!(handle.current_epoch(), 0);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut controller = TrainingController::default();
        let kept = controller.subscribe();
        drop(controller.subscribe());
        controller.publish(RunEvent::Failed { message: "x".into() });
        assert_eq!(controller.subscribers.len(), 1);
        assert!(matches!(kept.try_recv(), Ok(RunEvent::Failed { .. })));
    }
}
