use serde::{Serialize, Deserialize};

use crate::store::records::MetricPoint;
use crate::train::loop_fn::StopReason;

/// Lifecycle of one training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            RunState::Idle => 0,
            RunState::Running => 1,
            RunState::Completed => 2,
            RunState::Failed => 3,
        }
    }

    pub(crate) fn from_u8(v: u8) -> RunState {
        match v {
            1 => RunState::Running,
            2 => RunState::Completed,
            3 => RunState::Failed,
            _ => RunState::Idle,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

/// Read-only view of one completed epoch for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricEvent {
    pub epoch: usize,
    pub total_epochs: usize,
    pub loss: f64,
    pub validation_loss: f64,
    pub accuracy: f64,
    pub validation_accuracy: f64,
}

impl MetricEvent {
    pub fn new(point: &MetricPoint, total_epochs: usize) -> MetricEvent {
        MetricEvent {
            epoch: point.epoch,
            total_epochs,
            loss: point.training_loss,
            validation_loss: point.validation_loss,
            accuracy: point.training_accuracy,
            validation_accuracy: point.validation_accuracy,
        }
    }
}

/// Everything a subscriber sees during a run, in order: zero or more
/// `Epoch` events followed by exactly one `Finished` or `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Epoch(MetricEvent),
    #[serde(rename_all = "camelCase")]
    Finished {
        state: RunState,
        epochs_completed: usize,
        reason: StopReason,
    },
    Failed {
        message: String,
    },
}

impl RunEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::Epoch(_) => "epoch",
            RunEvent::Finished { .. } => "finished",
            RunEvent::Failed { .. } => "failed",
        }
    }
}
