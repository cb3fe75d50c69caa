//! Training run lifecycle against a real store.

use std::sync::mpsc::Receiver;
use std::thread;

use nn_workbench::data::UploadedFile;
use nn_workbench::run::{RunEvent, RunHandle, RunOutcome, RunState, SkipReason, TrainingController};
use nn_workbench::store::{Framework, ModelId, ModelKind, ModelStatus, NewDataset, NewModel, RunStore};
use nn_workbench::train::{EpochLosses, EpochRunner, StopReason, TrainConfig};
use nn_workbench::{Error, Result};

/// Replays a fixed loss sequence, optionally asking the run to stop after a
/// given epoch.
struct Scripted {
    losses: Vec<f64>,
    stop_after: Option<(RunHandle, usize)>,
}

impl Scripted {
    fn new(losses: Vec<f64>) -> Scripted {
        Scripted { losses, stop_after: None }
    }
}

impl EpochRunner for Scripted {
    fn run_epoch(&mut self, epoch_index: usize) -> Result<EpochLosses> {
        if let Some((handle, epoch)) = &self.stop_after {
            if epoch_index + 1 == *epoch {
                assert!(handle.stop());
            }
        }
        let loss = self.losses[epoch_index.min(self.losses.len() - 1)];
        Ok(EpochLosses { loss, val_loss: loss })
    }
}

fn store_with_model() -> (RunStore, ModelId) {
    let mut store = RunStore::new();
    let id = store.add_model(NewModel {
        name: "price".into(),
        kind: ModelKind::Regression,
        framework: Framework::Tensorflow,
    });
    store.set_active_model(&id).unwrap();
    (store, id)
}

fn add_csv(store: &mut RunStore, text: &str) {
    let upload = UploadedFile::new("data.csv", "text/csv", text.as_bytes().to_vec());
    store.add_dataset(NewDataset::from_upload(&upload));
}

fn linear_csv(rows: usize) -> String {
    let mut text = String::from("x1,x2,y\n");
    for i in 0..rows {
        let x1 = i as f64 / rows as f64;
        let x2 = (i % 5) as f64 / 5.0;
        text.push_str(&format!("{},{},{}\n", x1, x2, x1 + 2.0 * x2));
    }
    text
}

fn drain(rx: &Receiver<RunEvent>) -> Vec<RunEvent> {
    rx.try_iter().collect()
}

#[test]
fn seeded_run_records_one_point_per_epoch() {
    let (mut store, id) = store_with_model();
    add_csv(&mut store, &linear_csv(20));

    let mut controller = TrainingController::new(TrainConfig::default().with_seed(7));
    let events = controller.subscribe();
    let request = store.run_request();
    let outcome = controller.start(&mut store, request).unwrap();

    let RunOutcome::Finished(report) = outcome else { panic!("run was ignored") };
    let model = store.model(&id).unwrap();
    assert_eq!(model.status, ModelStatus::Ready);
    assert_eq!(controller.state(), RunState::Completed);

    let epochs: Vec<usize> = model.metrics_history.iter().map(|p| p.epoch).collect();
    assert!(!epochs.is_empty() && epochs.len() <= 50);
    assert_eq!(epochs, (1..=epochs.len()).collect::<Vec<_>>());
    assert_eq!(report.epochs_completed, epochs.len());
    assert_eq!(controller.handle().current_epoch(), epochs.len());

    for p in &model.metrics_history {
        assert!(p.training_loss.is_finite() && p.validation_loss.is_finite());
        assert_eq!(p.training_accuracy, 1.0 - p.training_loss);
        assert_eq!(p.validation_accuracy, 1.0 - p.validation_loss);
    }

    let events = drain(&events);
    assert_eq!(events.len(), epochs.len() + 1);
    assert!(matches!(events.last(), Some(RunEvent::Finished { state: RunState::Completed, .. })));
}

#[test]
fn same_seed_gives_the_same_history() {
    let run = || {
        let (mut store, id) = store_with_model();
        add_csv(&mut store, &linear_csv(24));
        let mut controller = TrainingController::new(TrainConfig { epochs: 5, ..TrainConfig::default() }.with_seed(11));
        let request = store.run_request();
        controller.start(&mut store, request).unwrap();
        store.model(&id).unwrap().metrics_history.clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn rising_loss_completes_before_the_epoch_limit() {
    let (mut store, id) = store_with_model();
    let losses = (0..50).map(|i| if i <= 10 { 20.0 - i as f64 } else { 10.0 + i as f64 }).collect();

    let mut controller = TrainingController::default();
    let outcome = controller.run(&mut store, &id, || Ok(Scripted::new(losses))).unwrap();

    let RunOutcome::Finished(report) = outcome else { panic!("run was ignored") };
    assert_eq!(report.stop_reason, StopReason::EarlyStopped);
    assert!(report.epochs_completed < 50);
    assert_eq!(store.model(&id).unwrap().metrics_history.len(), report.epochs_completed);
    assert_eq!(store.model(&id).unwrap().status, ModelStatus::Ready);
}

#[test]
fn busy_model_is_left_alone() {
    let (mut store, id) = store_with_model();
    add_csv(&mut store, &linear_csv(20));
    store.update_model_status(&id, ModelStatus::Training).unwrap();

    let mut controller = TrainingController::default();
    let request = store.run_request();
    let outcome = controller.start(&mut store, request).unwrap();

    assert!(matches!(outcome, RunOutcome::Ignored(SkipReason::ModelBusy)));
    assert!(store.model(&id).unwrap().metrics_history.is_empty());
    assert_eq!(store.model(&id).unwrap().status, ModelStatus::Training);
    assert_eq!(controller.state(), RunState::Idle);
}

#[test]
fn nothing_selected_is_ignored() {
    let mut store = RunStore::new();
    let mut controller = TrainingController::default();
    let outcome = controller.start(&mut store, None).unwrap();
    assert!(matches!(outcome, RunOutcome::Ignored(SkipReason::NothingSelected)));
}

#[test]
fn unknown_model_changes_nothing() {
    let mut store = RunStore::new();
    let mut controller = TrainingController::default();
    let ghost = ModelId("ghost".into());
    let err = controller.run(&mut store, &ghost, || Ok(Scripted::new(vec![1.0]))).unwrap_err();
    assert!(matches!(err, Error::UnknownModel(_)));
    assert_eq!(controller.state(), RunState::Idle);
}

#[test]
fn non_numeric_dataset_fails_the_run() {
    let (mut store, id) = store_with_model();
    add_csv(&mut store, "x,y\n1,2\n3,four\n");

    let mut controller = TrainingController::default();
    let events = controller.subscribe();
    let request = store.run_request();
    let err = controller.start(&mut store, request).unwrap_err();

    assert!(matches!(err, Error::NonNumeric { row: 3, .. }));
    assert_eq!(store.model(&id).unwrap().status, ModelStatus::Error);
    assert_eq!(controller.state(), RunState::Failed);
    assert!(matches!(drain(&events).as_slice(), [RunEvent::Failed { .. }]));
}

#[test]
fn too_few_rows_to_split_fail_the_run() {
    let (mut store, id) = store_with_model();
    add_csv(&mut store, "x,y\n1,2\n");

    let mut controller = TrainingController::default();
    let request = store.run_request();
    let err = controller.start(&mut store, request).unwrap_err();

    assert!(matches!(err, Error::Training(_)));
    assert_eq!(store.model(&id).unwrap().status, ModelStatus::Error);
}

#[test]
fn diverging_loss_marks_the_model_as_failed() {
    let (mut store, id) = store_with_model();
    let mut controller = TrainingController::default();
    let err = controller
        .run(&mut store, &id, || Ok(Scripted::new(vec![1.0, 0.9, f64::NAN])))
        .unwrap_err();

    assert!(matches!(err, Error::Training(_)));
    let model = store.model(&id).unwrap();
    assert_eq!(model.status, ModelStatus::Error);
    assert_eq!(model.metrics_history.len(), 2);
    assert_eq!(controller.state(), RunState::Failed);
}

#[test]
fn failed_model_can_be_trained_again() {
    let (mut store, id) = store_with_model();
    let mut controller = TrainingController::new(TrainConfig { epochs: 3, ..TrainConfig::default() });
    assert!(controller.run(&mut store, &id, || Ok(Scripted::new(vec![f64::INFINITY]))).is_err());

    let outcome = controller.run(&mut store, &id, || Ok(Scripted::new(vec![3.0, 2.0, 1.0]))).unwrap();
    assert!(matches!(outcome, RunOutcome::Finished(_)));
    assert_eq!(store.model(&id).unwrap().status, ModelStatus::Ready);
}

#[test]
fn stop_request_ends_the_run_at_the_next_boundary() {
    let (mut store, id) = store_with_model();
    let mut controller = TrainingController::default();
    let handle = controller.handle();
    let runner = Scripted {
        losses: (0..50).map(|i| 50.0 - i as f64).collect(),
        stop_after: Some((handle.clone(), 3)),
    };

    let outcome = controller.run(&mut store, &id, || Ok(runner)).unwrap();

    let RunOutcome::Finished(report) = outcome else { panic!("run was ignored") };
    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(report.epochs_completed, 3);
    assert_eq!(store.model(&id).unwrap().status, ModelStatus::Ready);
    assert!(!handle.stop());
}

#[test]
fn shared_store_run_on_a_worker_thread() {
    let (mut store, id) = store_with_model();
    add_csv(&mut store, &linear_csv(20));
    let shared = store.shared();

    let request = shared.lock().unwrap().run_request();
    let mut sink = shared.clone();
    let worker = thread::spawn(move || {
        let mut controller = TrainingController::new(TrainConfig { epochs: 4, ..TrainConfig::default() }.with_seed(3));
        controller.start(&mut sink, request)
    });
    let outcome = worker.join().unwrap().unwrap();

    assert!(matches!(outcome, RunOutcome::Finished(_)));
    let store = shared.lock().unwrap();
    assert_eq!(store.model(&id).unwrap().metrics_history.len(), 4);
}
