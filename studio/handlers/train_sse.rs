use std::sync::mpsc::RecvTimeoutError;
use std::sync::PoisonError;
use std::time::Duration;
use tiny_http::Request;

use nn_workbench::run::{MetricEvent, RunEvent, RunState};
use nn_workbench::TrainConfig;

use crate::state::{lock, lock_store, visible_history, SharedState};
use crate::util::sse::{format_run_event, format_sse_event, format_sse_keepalive, write_sse, SSE_RESPONSE_HEAD};

/// `GET /train/events`: Server-Sent Events handler.
///
/// Consumes `request` (so it can call `into_writer`) and:
/// 1. Replays the points already recorded by the run (or by the active
///    model's latest run when nothing was started here) as `epoch` events.
/// 2. If a run is in progress, forwards its events, skipping epochs already
///    replayed, with a keep-alive ping every 500 ms of silence.
/// 3. Ends after a `finished` or `failed` event, or with a `closed` event
///    carrying the run state when the training thread goes away. With no
///    run at all it sends `idle` and closes.
///
/// Client reconnection is handled natively by `EventSource`.
pub fn handle(request: Request, state: SharedState) {
    let mut writer = request.into_writer();
    if !write_sse(&mut writer, SSE_RESPONSE_HEAD) {
        return;
    }

    let (run, history) = {
        let st = lock(&state);
        let run = st
            .run
            .as_ref()
            .map(|r| (r.events.clone(), r.handle.clone(), r.is_active()));
        let store = lock_store(&st.store);
        let model = match &st.run {
            Some(r) => store.model(&r.model_id),
            None => store.active_model(),
        };
        let history = model
            .map(|m| visible_history(m, st.run.as_ref()).to_vec())
            .unwrap_or_default();
        (run, history)
    };

    // Replay.
    let total_epochs = TrainConfig::default().epochs;
    let mut last_epoch = 0;
    for point in &history {
        let event = RunEvent::Epoch(MetricEvent::new(point, total_epochs));
        if let Some(frame) = format_run_event(&event) {
            if !write_sse(&mut writer, &frame) { return; }
        }
        last_epoch = point.epoch;
    }

    let Some((events, handle, active)) = run else {
        let _ = write_sse(&mut writer, &format_sse_event("idle", "{}"));
        return;
    };
    let closed = |state: RunState| {
        let data = serde_json::json!({ "state": state }).to_string();
        format_sse_event("closed", &data)
    };
    if !active {
        let _ = write_sse(&mut writer, &closed(handle.state()));
        return;
    }

    // Main receive loop.
    loop {
        let result = {
            let rx = events.lock().unwrap_or_else(PoisonError::into_inner);
            rx.recv_timeout(Duration::from_millis(500))
        };

        match result {
            Ok(RunEvent::Epoch(m)) if m.epoch <= last_epoch => continue,
            Ok(event) => {
                let terminal = match &event {
                    RunEvent::Epoch(m) => {
                        last_epoch = m.epoch;
                        false
                    }
                    RunEvent::Finished { .. } | RunEvent::Failed { .. } => true,
                };
                if let Some(frame) = format_run_event(&event) {
                    if !write_sse(&mut writer, &frame) { return; }
                }
                if terminal { return; }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !write_sse(&mut writer, format_sse_keepalive()) { return; }
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Training thread finished; another client may have taken the
                // terminal event.
                let _ = write_sse(&mut writer, &closed(handle.state()));
                return;
            }
        }
    }
}
