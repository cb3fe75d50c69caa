use std::io::Cursor;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::state::SharedState;
use crate::handlers;

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Builds headers from static name/value pairs, skipping any tiny_http
/// rejects.
pub fn headers(pairs: &[(&str, &str)]) -> Vec<Header> {
    pairs
        .iter()
        .filter_map(|(name, value)| Header::from_bytes(name.as_bytes(), value.as_bytes()).ok())
        .collect()
}

fn body_response(status: u16, content_type: &str, body: Vec<u8>) -> Response<Cursor<Vec<u8>>> {
    let len = body.len();
    Response::new(
        StatusCode(status),
        headers(&[("Content-Type", content_type)]),
        Cursor::new(body),
        Some(len),
        None,
    )
}

pub fn html_response(body: String) -> Response<Cursor<Vec<u8>>> {
    body_response(200, "text/html; charset=utf-8", body.into_bytes())
}

pub fn json_response(body: String) -> Response<Cursor<Vec<u8>>> {
    body_response(200, "application/json", body.into_bytes())
}

pub fn redirect(location: &str) -> Response<Cursor<Vec<u8>>> {
    Response::new(
        StatusCode(303),
        headers(&[("Location", location), ("Content-Length", "0")]),
        Cursor::new(Vec::new()),
        Some(0),
        None,
    )
}

pub fn not_found() -> Response<Cursor<Vec<u8>>> {
    body_response(404, "text/plain", b"404 Not Found".to_vec())
}

pub fn server_error(message: &str) -> Response<Cursor<Vec<u8>>> {
    body_response(500, "text/plain", message.as_bytes().to_vec())
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Dispatches incoming requests to the appropriate handler.
///
/// All handlers (except SSE) receive a `&mut Request` so that the dispatcher
/// retains ownership and can call `request.respond(response)` at the end.
/// The SSE handler takes ownership to perform long-lived streaming.
pub fn dispatch(mut request: Request, state: SharedState) {
    let method = request.method().clone();
    let url    = request.url().to_owned();
    let path   = url.split('?').next().unwrap_or("").to_owned();

    tracing::debug!(%method, %path, "request");

    // SSE: long-lived; handler takes ownership and drives the stream loop.
    if method == Method::Get && path == "/train/events" {
        handlers::train_sse::handle(request, state);
        return;
    }

    let response = match (method, path.as_str()) {
        // ── Dashboard ─────────────────────────────────────────────────────
        (Method::Get, "/")          => handlers::dashboard::handle_get(state),
        (Method::Get, "/api/state") => handlers::dashboard::handle_state_json(state),

        // ── Datasets ──────────────────────────────────────────────────────
        (Method::Post, "/datasets/upload") => handlers::dataset::handle_upload(&mut request, state),
        (Method::Post, "/datasets/remove") => handlers::dataset::handle_remove(&mut request, state),

        // ── Models ────────────────────────────────────────────────────────
        (Method::Post, "/models")          => handlers::models::handle_create(&mut request, state),
        (Method::Post, "/models/activate") => handlers::models::handle_activate(&mut request, state),

        // ── Train ─────────────────────────────────────────────────────────
        (Method::Post, "/train/start") => handlers::train::handle_start(state),
        (Method::Post, "/train/stop")  => handlers::train::handle_stop(state),

        // ── 404 ───────────────────────────────────────────────────────────
        _ => not_found(),
    };

    let _ = request.respond(response);
}
