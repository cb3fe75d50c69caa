use std::io::Write;

use nn_workbench::run::RunEvent;

/// Status line and headers for an SSE stream written straight to the
/// socket via `Request::into_writer`.
pub const SSE_RESPONSE_HEAD: &str = "HTTP/1.1 200 OK\r\n\
                                     Content-Type: text/event-stream\r\n\
                                     Cache-Control: no-cache\r\n\
                                     Connection: keep-alive\r\n\
                                     X-Accel-Buffering: no\r\n\
                                     \r\n";

/// Formats a named SSE event with a JSON data payload.
///
/// Output format:
/// ```text
/// event: <name>
/// data: <json>
///
/// ```
pub fn format_sse_event(event_name: &str, json_data: &str) -> String {
    format!("event: {}\ndata: {}\n\n", event_name, json_data)
}

/// Formats a run event under its own name; `None` if it cannot be encoded.
pub fn format_run_event(event: &RunEvent) -> Option<String> {
    let json = serde_json::to_string(event).ok()?;
    Some(format_sse_event(event.name(), &json))
}

/// SSE comment; ignored by `EventSource` but keeps the connection open.
pub fn format_sse_keepalive() -> &'static str {
    ": ping\n\n"
}

/// Writes a single SSE message to a writer, flushing immediately.
/// Returns `false` if the write failed (client disconnected).
pub fn write_sse<W: Write + ?Sized>(writer: &mut W, msg: &str) -> bool {
    writer.write_all(msg.as_bytes()).is_ok() && writer.flush().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_event_frame() {
        let frame = format_run_event(&RunEvent::Failed { message: "boom".into() }).unwrap();
        assert_eq!(frame, "event: failed\ndata: {\"event\":\"failed\",\"message\":\"boom\"}\n\n");
    }
}
