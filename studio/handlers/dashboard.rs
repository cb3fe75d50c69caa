use std::io::Cursor;

use serde::Serialize;
use tiny_http::Response;

use nn_workbench::activation::ActivationFunction;
use nn_workbench::data::ValidationSummary;
use nn_workbench::network::{LayerSpec, NetworkSpec};
use nn_workbench::run::RunState;
use nn_workbench::store::{Dataset, MetricPoint, ModelConfig, ModelId, ModelStatus};
use nn_workbench::TrainConfig;

use crate::render::{html_escape, render_flash_html, render_page};
use crate::state::{lock, lock_store, visible_history, SharedState};

/// Snapshot of the active run for rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunView {
    model_id: ModelId,
    model_name: String,
    state: RunState,
    current_epoch: usize,
}

/// Everything the page shows, copied out from under the locks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardView {
    models: Vec<ModelConfig>,
    datasets: Vec<Dataset>,
    active_model_id: Option<ModelId>,
    /// Points of the active model's current or latest run.
    active_history: Vec<MetricPoint>,
    run: Option<RunView>,
    run_active: bool,
    total_epochs: usize,
    last_upload: Option<UploadView>,
    /// Regressor the last upload would train; `None` without a feature column.
    architecture: Option<NetworkSpec>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadView {
    name: String,
    summary: ValidationSummary,
}

fn snapshot(state: &SharedState) -> DashboardView {
    let st = lock(state);
    let run = st.run.as_ref().map(|r| RunView {
        model_id: r.model_id.clone(),
        model_name: r.model_name.clone(),
        state: r.state(),
        current_epoch: r.handle.current_epoch(),
    });
    let last_upload = st
        .last_summary
        .as_ref()
        .map(|(name, summary)| UploadView { name: name.clone(), summary: summary.clone() });

    let architecture = last_upload
        .as_ref()
        .map(|u| u.summary.column_count.saturating_sub(1))
        .filter(|&n| n > 0)
        .map(NetworkSpec::regressor);

    let store = lock_store(&st.store);
    let active_history = store
        .active_model()
        .map(|m| visible_history(m, st.run.as_ref()).to_vec())
        .unwrap_or_default();
    DashboardView {
        models: store.models().to_vec(),
        datasets: store.datasets().to_vec(),
        active_model_id: store.active_model_id().cloned(),
        active_history,
        run,
        run_active: st.run_active(),
        total_epochs: TrainConfig::default().epochs,
        last_upload,
        architecture,
    }
}

// ---------------------------------------------------------------------------
// GET /api/state
// ---------------------------------------------------------------------------

pub fn handle_state_json(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    match serde_json::to_string(&snapshot(&state)) {
        Ok(json) => crate::routes::json_response(json),
        Err(e) => {
            tracing::error!(error = %e, "could not encode dashboard state");
            crate::routes::server_error("could not encode state")
        }
    }
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

pub fn handle_get(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let flash = lock(&state).take_flash();
    let view = snapshot(&state);

    let active = view
        .active_model_id
        .as_ref()
        .and_then(|id| view.models.iter().find(|m| &m.id == id));
    let history = view.active_history.as_slice();
    let history_json = serde_json::to_string(history).unwrap_or_else(|_| "[]".into());

    let can_start = !view.run_active
        && active.is_some_and(|m| m.status != ModelStatus::Training)
        && !view.datasets.is_empty();
    let disabled = |off: bool| if off { "disabled" } else { "" };

    let flash_html = render_flash_html(flash.as_ref());
    let models_html = models_table(&view.models, view.active_model_id.as_ref());
    let datasets_html = datasets_table(&view.datasets);
    let upload_html = upload_summary(view.last_upload.as_ref());
    let train_html = train_panel(&view, active);
    let metrics_html = metrics_rows(history);

    crate::routes::html_response(render_page(view.run_active, |tmpl| {
        tmpl
            .replace("{{FLASH}}", &flash_html)
            .replace("{{MODELS_TABLE}}", &models_html)
            .replace("{{DATASETS_TABLE}}", &datasets_html)
            .replace("{{UPLOAD_SUMMARY}}", &upload_html)
            .replace("{{TRAIN_PANEL}}", &train_html)
            .replace("{{METRICS_ROWS}}", &metrics_html)
            .replace("{{METRICS_JSON}}", &history_json)
            .replace("{{TOTAL_EPOCHS}}", &view.total_epochs.to_string())
            .replace("{{START_DISABLED}}", disabled(!can_start))
            .replace("{{STOP_DISABLED}}", disabled(!view.run_active))
    }))
}

fn status_badge(status: ModelStatus) -> &'static str {
    match status {
        ModelStatus::Ready    => r#"<span class="badge badge-ready">ready</span>"#,
        ModelStatus::Training => r#"<span class="badge badge-training">training</span>"#,
        ModelStatus::Error    => r#"<span class="badge badge-error">error</span>"#,
    }
}

fn json_label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default()
}

fn models_table(models: &[ModelConfig], active: Option<&ModelId>) -> String {
    if models.is_empty() {
        return "<p class=\"hint\">No models yet. Create one below.</p>".into();
    }
    let rows: String = models.iter().map(|m| {
        let is_active = active == Some(&m.id);
        let action = if is_active {
            "<span class=\"hint\">active</span>".to_owned()
        } else {
            format!(
                r#"<form method="post" action="/models/activate"><input type="hidden" name="id" value="{id}"><button class="btn btn-small">Activate</button></form>"#,
                id = html_escape(&m.id.0)
            )
        };
        format!(
            "<tr{cls}><td>{name}</td><td>{kind}</td><td>{fw}</td><td>{status}</td><td>{epochs}</td><td>{action}</td></tr>",
            cls    = if is_active { " class=\"active-row\"" } else { "" },
            name   = html_escape(&m.name),
            kind   = json_label(&m.kind),
            fw     = json_label(&m.framework),
            status = status_badge(m.status),
            epochs = m.metrics_history.len(),
            action = action,
        )
    }).collect();
    format!(
        "<table class=\"data-table\"><thead><tr><th>Name</th><th>Type</th><th>Framework</th><th>Status</th><th>Epochs</th><th></th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

fn datasets_table(datasets: &[Dataset]) -> String {
    if datasets.is_empty() {
        return "<p class=\"hint\">No datasets uploaded yet.</p>".into();
    }
    let rows: String = datasets.iter().rev().enumerate().map(|(i, d)| {
        format!(
            r#"<tr><td>{name}{latest}</td><td>{mime}</td><td>{size}</td><td>{at}</td><td><form method="post" action="/datasets/remove"><input type="hidden" name="id" value="{id}"><button class="btn btn-small btn-secondary">Remove</button></form></td></tr>"#,
            name   = html_escape(&d.name),
            latest = if i == 0 { " <span class=\"badge\">latest</span>" } else { "" },
            mime   = html_escape(&d.mime_type),
            size   = format_bytes(d.size_bytes),
            at     = d.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            id     = html_escape(&d.id.0),
        )
    }).collect();
    format!(
        "<table class=\"data-table\"><thead><tr><th>Name</th><th>Type</th><th>Size</th><th>Uploaded</th><th></th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

fn format_bytes(n: u64) -> String {
    match n {
        0..=1023 => format!("{} B", n),
        1024..=1_048_575 => format!("{:.1} KB", n as f64 / 1024.0),
        _ => format!("{:.1} MB", n as f64 / 1_048_576.0),
    }
}

fn upload_summary(upload: Option<&UploadView>) -> String {
    let Some(u) = upload else { return String::new() };
    let kinds: Vec<String> = u.summary.observed_data_types.iter().map(|k| k.to_string()).collect();
    let features: Vec<String> = u.summary.feature_names.iter().map(|f| html_escape(f)).collect();
    format!(
        r#"<div class="arch-summary-grid">
          <div class="arch-row"><span class="ar-lbl">File</span><span class="ar-val">{name}</span></div>
          <div class="arch-row"><span class="ar-lbl">Rows (preview)</span><span class="ar-val">{rows}</span></div>
          <div class="arch-row"><span class="ar-lbl">Columns</span><span class="ar-val">{cols}</span></div>
          <div class="arch-row"><span class="ar-lbl">Missing values</span><span class="ar-val">{missing}</span></div>
          <div class="arch-row"><span class="ar-lbl">Data types</span><span class="ar-val">{kinds}</span></div>
          <div class="arch-row"><span class="ar-lbl">Columns</span><span class="ar-val">{features}</span></div>
        </div>"#,
        name     = html_escape(&u.name),
        rows     = u.summary.row_count,
        cols     = u.summary.column_count,
        missing  = u.summary.missing_value_count,
        kinds    = kinds.join(", "),
        features = features.join(", "),
    )
}

fn train_panel(view: &DashboardView, active: Option<&ModelConfig>) -> String {
    let model = active
        .map(|m| html_escape(&m.name))
        .unwrap_or_else(|| "<span class=\"hint\">none selected</span>".into());
    let dataset = view
        .datasets
        .last()
        .map(|d| html_escape(&d.name))
        .unwrap_or_else(|| "<span class=\"hint\">none uploaded</span>".into());
    let arch = view
        .architecture
        .as_ref()
        .map(describe_network)
        .unwrap_or_else(|| "<span class=\"hint\">upload a dataset</span>".into());
    let run = match &view.run {
        Some(r) => format!(
            "{name}: {state} (epoch {epoch}/{total})",
            name  = html_escape(&r.model_name),
            state = json_label(&r.state),
            epoch = r.current_epoch,
            total = view.total_epochs,
        ),
        None => "idle".into(),
    };
    format!(
        r#"<div class="arch-summary-grid">
          <div class="arch-row"><span class="ar-lbl">Model</span><span class="ar-val">{model}</span></div>
          <div class="arch-row"><span class="ar-lbl">Dataset</span><span class="ar-val">{dataset}</span></div>
          <div class="arch-row"><span class="ar-lbl">Architecture</span><span class="ar-val">{arch}</span></div>
          <div class="arch-row"><span class="ar-lbl">Run</span><span class="ar-val" id="run-status">{run}</span></div>
        </div>"#,
        model = model,
        dataset = dataset,
        arch = arch,
        run = run,
    )
}

/// One-line topology, e.g. `4 → 128 relu → dropout 0.3 → … → 1 linear (adam, lr 0.001, mean_squared_error)`.
fn describe_network(spec: &NetworkSpec) -> String {
    let mut parts = Vec::new();
    if let Some(LayerSpec::Dense { input_size, .. }) = spec.layers.first() {
        parts.push(input_size.to_string());
    }
    for layer in &spec.layers {
        parts.push(match layer {
            LayerSpec::Dense { units, activation, .. } => {
                let act = match activation {
                    ActivationFunction::ReLU => "relu",
                    ActivationFunction::Linear => "linear",
                };
                format!("{} {}", units, act)
            }
            LayerSpec::Dropout { rate } => format!("dropout {}", rate),
        });
    }
    format!(
        "{} ({}, lr {}, {})",
        parts.join(" → "),
        spec.optimizer,
        spec.learning_rate,
        spec.loss
    )
}

fn metrics_rows(history: &[MetricPoint]) -> String {
    history.iter().map(|p| {
        format!(
            "<tr><td>{}</td><td>{:.6}</td><td>{:.6}</td><td>{:.4}</td><td>{:.4}</td></tr>",
            p.epoch, p.training_loss, p.validation_loss, p.training_accuracy, p.validation_accuracy
        )
    }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_sizes_are_human_readable() {
        assert_eq!(format_bytes(12), "12 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1_048_576), "3.0 MB");
    }

    #[test]
    fn enum_labels_use_their_wire_names() {
        assert_eq!(json_label(&ModelStatus::Training), "training");
        assert_eq!(json_label(&RunState::Completed), "completed");
    }

    #[test]
    fn regressor_topology_reads_left_to_right() {
        assert_eq!(
            describe_network(&NetworkSpec::regressor(4)),
            "4 → 128 relu → dropout 0.3 → 64 relu → dropout 0.2 → 32 relu → 1 linear (adam, lr 0.001, mean_squared_error)"
        );
    }

    #[test]
    fn user_text_cannot_fill_template_tokens() {
        let models = vec![ModelConfig {
            id: ModelId("m1".into()),
            name: "{{START_DISABLED}}{{TOTAL_EPOCHS}}".into(),
            kind: nn_workbench::store::ModelKind::Regression,
            framework: nn_workbench::store::Framework::Tensorflow,
            status: ModelStatus::Ready,
            metrics_history: Vec::new(),
        }];
        let table = models_table(&models, None);
        let page = render_page(false, |tmpl| {
            tmpl.replace("{{MODELS_TABLE}}", &table)
                .replace("{{TOTAL_EPOCHS}}", "50")
                .replace("{{START_DISABLED}}", "disabled")
        });
        assert!(page.contains("<td>&#123;&#123;START_DISABLED&#125;&#125;&#123;&#123;TOTAL_EPOCHS&#125;&#125;</td>"));
        assert!(!page.contains("<td>disabled50</td>"));
    }
}
