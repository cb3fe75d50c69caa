use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread;

use tiny_http::Response;

use nn_workbench::run::{RunOutcome, SkipReason, TrainingController};
use nn_workbench::train::StopReason;
use nn_workbench::TrainConfig;

use crate::state::{lock, lock_store, ActiveRun, FlashMessage, SharedState};

// ---------------------------------------------------------------------------
// POST /train/start
// ---------------------------------------------------------------------------

/// Trains the active model on the latest dataset in a background thread.
pub fn handle_start(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let mut st = lock(&state);

    // One run per dashboard; checked and claimed under the state lock.
    if st.run_active() {
        st.flash = Some(FlashMessage::error("A training run is already in progress."));
        drop(st);
        return crate::routes::redirect("/");
    }

    let store = st.store.clone();
    let selection = {
        let store = lock_store(&store);
        store.run_request().map(|request| {
            let model = store.model(&request.model_id);
            let name = model.map(|m| m.name.clone()).unwrap_or_default();
            let history_start = model.map_or(0, |m| m.metrics_history.len());
            (request, name, history_start)
        })
    };
    let Some((request, model_name, history_start)) = selection else {
        st.flash = Some(FlashMessage::error("Create a model and upload a dataset before training."));
        drop(st);
        return crate::routes::redirect("/");
    };

    let config = TrainConfig { seed: st.config.seed, ..TrainConfig::default() };
    let mut controller = TrainingController::new(config);
    let events = Arc::new(Mutex::new(controller.subscribe()));
    let handle = controller.handle();

    st.run = Some(ActiveRun {
        handle: handle.clone(),
        model_id: request.model_id.clone(),
        model_name: model_name.clone(),
        history_start,
        events,
    });
    drop(st);

    // Spawn background training thread.
    let state_clone = state.clone();
    thread::spawn(move || {
        let mut sink = store;
        let outcome = controller.start(&mut sink, Some(request));

        let flash = match outcome {
            Ok(RunOutcome::Finished(report)) => FlashMessage::success(format!(
                "Training {} finished after {} epoch(s) ({}); final loss {}.",
                model_name,
                report.epochs_completed,
                stop_reason_text(report.stop_reason),
                report.final_loss.map(|l| format!("{:.6}", l)).unwrap_or_else(|| "n/a".into()),
            )),
            Ok(RunOutcome::Ignored(reason)) => FlashMessage::error(skip_reason_text(reason)),
            Err(e) if e.is_data_error() => FlashMessage::error(format!("Training {} failed: {}", model_name, e)),
            Err(e) => FlashMessage::error(e.to_string()),
        };

        let mut st = lock(&state_clone);
        // A run that never left `idle` was refused; release the slot.
        if !handle.state().is_terminal() {
            st.run = None;
        }
        st.flash = Some(flash);
    });

    crate::routes::redirect("/")
}

fn stop_reason_text(reason: StopReason) -> &'static str {
    match reason {
        StopReason::EpochLimit   => "epoch limit reached",
        StopReason::EarlyStopped => "stopped early, loss no longer improving",
        StopReason::Cancelled    => "stopped by request",
    }
}

fn skip_reason_text(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NothingSelected => "Create a model and upload a dataset before training.",
        SkipReason::AlreadyRunning  => "A training run is already in progress.",
        SkipReason::ModelBusy       => "That model is already training.",
    }
}

// ---------------------------------------------------------------------------
// POST /train/stop
// ---------------------------------------------------------------------------

pub fn handle_stop(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let mut st = lock(&state);
    let accepted = st.run.as_ref().is_some_and(|r| r.handle.stop());
    if !accepted {
        st.flash = Some(FlashMessage::error("No training run is in progress."));
    }
    drop(st);
    crate::routes::redirect("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use nn_workbench::data::UploadedFile;
    use nn_workbench::store::{Framework, ModelKind, ModelStatus, NewDataset, NewModel};

    use crate::config::StudioConfig;
    use crate::state::StudioState;

    fn state_with_busy_model() -> SharedState {
        let state = Arc::new(Mutex::new(StudioState::new(StudioConfig::default())));
        {
            let st = lock(&state);
            let mut store = lock_store(&st.store);
            let id = store.add_model(NewModel {
                name: "busy".into(),
                kind: ModelKind::Regression,
                framework: Framework::Tensorflow,
            });
            store.set_active_model(&id).unwrap();
            store.update_model_status(&id, ModelStatus::Training).unwrap();
            let file = UploadedFile::new("d.csv", "text/csv", b"x,y\n1,2\n3,4\n5,6\n".to_vec());
            store.add_dataset(NewDataset::from_upload(&file));
        }
        state
    }

    fn flash_text(state: &SharedState) -> Option<String> {
        lock(state).flash.as_ref().map(|f| f.text.clone())
    }

    #[test]
    fn refused_start_releases_the_run_slot() {
        let state = state_with_busy_model();
        handle_start(state.clone());

        let deadline = Instant::now() + Duration::from_secs(10);
        while flash_text(&state).is_none() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(flash_text(&state).as_deref(), Some("That model is already training."));
        assert!(lock(&state).run.is_none());
        assert!(!lock(&state).run_active());
    }

    #[test]
    fn second_start_is_refused_while_a_run_is_active() {
        let state = state_with_busy_model();

        // A handle whose controller never leaves `idle` keeps the slot claimed.
        let mut controller = TrainingController::new(TrainConfig::default());
        let events = Arc::new(Mutex::new(controller.subscribe()));
        {
            let mut st = lock(&state);
            let model_id = lock_store(&st.store).active_model_id().cloned().unwrap();
            st.run = Some(ActiveRun {
                handle: controller.handle(),
                model_id,
                model_name: "busy".into(),
                history_start: 0,
                events,
            });
        }

        handle_start(state.clone());
        assert_eq!(flash_text(&state).as_deref(), Some("A training run is already in progress."));
        assert!(lock(&state).run_active());

        lock(&state).run = None;
        lock(&state).flash = None;
        handle_start(state.clone());
        let deadline = Instant::now() + Duration::from_secs(10);
        while flash_text(&state).is_none() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(flash_text(&state).as_deref(), Some("That model is already training."));
    }
}
