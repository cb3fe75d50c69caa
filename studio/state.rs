use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use nn_workbench::data::ValidationSummary;
use nn_workbench::run::{RunEvent, RunHandle, RunState};
use nn_workbench::store::{MetricPoint, ModelConfig, ModelId, RunStore, SharedRunStore};

use crate::config::StudioConfig;

// ---------------------------------------------------------------------------
// Active run
// ---------------------------------------------------------------------------

/// The run started from this dashboard, kept after it ends so the page can
/// show how it finished.
pub struct ActiveRun {
    pub handle: RunHandle,
    pub model_id: ModelId,
    pub model_name: String,
    /// Length of the model's metric history when the run was requested;
    /// this run's points start there.
    pub history_start: usize,
    /// Events from the controller running on the training thread.
    pub events: Arc<Mutex<mpsc::Receiver<RunEvent>>>,
}

impl ActiveRun {
    /// True from the start request until the run reaches a terminal state.
    /// The controller is still `Idle` in the instant before the training
    /// thread picks the request up; that counts as active.
    pub fn is_active(&self) -> bool {
        !self.handle.state().is_terminal()
    }

    pub fn state(&self) -> RunState {
        self.handle.state()
    }
}

/// The slice of `model`'s history worth charting: the points of `run` when
/// it trained this model, otherwise the most recent run (history is
/// append-only, so each retraining restarts at epoch 1).
pub fn visible_history<'a>(model: &'a ModelConfig, run: Option<&ActiveRun>) -> &'a [MetricPoint] {
    let history = model.metrics_history.as_slice();
    match run {
        Some(r) if r.model_id == model.id => history.get(r.history_start..).unwrap_or(&[]),
        _ => {
            let start = history.iter().rposition(|p| p.epoch == 1).unwrap_or(0);
            &history[start..]
        }
    }
}

// ---------------------------------------------------------------------------
// Flash messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum FlashKind { Success, Error }

#[derive(Debug, Clone)]
pub struct FlashMessage {
    pub kind: FlashKind,
    pub text: String,
}

impl FlashMessage {
    pub fn success(text: impl Into<String>) -> Self {
        FlashMessage { kind: FlashKind::Success, text: text.into() }
    }
    pub fn error(text: impl Into<String>) -> Self {
        FlashMessage { kind: FlashKind::Error, text: text.into() }
    }
}

// ---------------------------------------------------------------------------
// Main state struct
// ---------------------------------------------------------------------------

pub struct StudioState {
    /// Models, datasets and the active model.
    pub store:        SharedRunStore,
    /// Most recent run started here, if any.
    pub run:          Option<ActiveRun>,
    /// Validation summary of the last accepted upload.
    pub last_summary: Option<(String, ValidationSummary)>,
    /// One-shot flash message for the next page render.
    pub flash:        Option<FlashMessage>,
    pub config:       StudioConfig,
}

impl StudioState {
    pub fn new(config: StudioConfig) -> Self {
        StudioState {
            store:        RunStore::new().shared(),
            run:          None,
            last_summary: None,
            flash:        None,
            config,
        }
    }

    pub fn run_active(&self) -> bool {
        self.run.as_ref().is_some_and(ActiveRun::is_active)
    }

    /// Takes and returns the current flash message, clearing it.
    pub fn take_flash(&mut self) -> Option<FlashMessage> {
        self.flash.take()
    }
}

/// Shared state type: an `Arc<Mutex<StudioState>>` passed to every handler.
pub type SharedState = Arc<Mutex<StudioState>>;

/// Locks the dashboard state, recovering it if a handler thread panicked.
pub fn lock(state: &SharedState) -> MutexGuard<'_, StudioState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn lock_store(store: &SharedRunStore) -> MutexGuard<'_, RunStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}
