/// nn-workbench dashboard
///
/// Browser front end for the experiment workbench: upload a dataset, create
/// a model, train it and watch the loss curves update live. Served by a
/// synchronous tiny_http server; no JavaScript frameworks required.
///
/// Run with:
///   cargo run --bin workbench --release
/// Then open http://127.0.0.1:7878 (or `WORKBENCH_ADDR`).
///
/// State lives in memory only and is lost on restart.

mod config;
mod state;
mod render;
mod routes;
mod handlers;
mod util;

use std::sync::{Arc, Mutex};
use tiny_http::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::StudioConfig;
use state::StudioState;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = StudioConfig::from_env();
    let server = Server::http(config.addr.as_str())?;
    info!(addr = %config.addr, max_upload_bytes = config.max_upload_bytes, "workbench listening");

    let shared_state = Arc::new(Mutex::new(StudioState::new(config)));

    // One thread per request so the SSE stream, which blocks for the whole
    // run, does not stall page loads and form posts.
    for request in server.incoming_requests() {
        let state_clone = shared_state.clone();
        std::thread::spawn(move || {
            routes::dispatch(request, state_clone);
        });
    }
    Ok(())
}
