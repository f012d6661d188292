//! Display sinks and the HTTP status endpoint.
//!
//! The pipeline hands each applied tick's `StatusSnapshot` to a
//! `DisplaySink`. Sinks are write-only from the pipeline's point of view:
//! they render or serve the values but are never read back as state.
//!
//! Endpoints served by `start_endpoint_server`:
//! - GET /status - Latest drainage status and last in-app alert
//! - GET /health - Service health check

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::model::StatusSnapshot;

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

pub trait DisplaySink: Send + Sync {
    /// Receives the status computed for the latest applied tick.
    fn publish(&self, snapshot: &StatusSnapshot);

    /// Raises a blocking in-app alert.
    fn raise_alert(&self, message: &str);
}

/// Fans one snapshot out to several sinks.
pub struct SinkSet {
    sinks: Vec<Arc<dyn DisplaySink>>,
}

impl SinkSet {
    pub fn new(sinks: Vec<Arc<dyn DisplaySink>>) -> Self {
        Self { sinks }
    }
}

impl DisplaySink for SinkSet {
    fn publish(&self, snapshot: &StatusSnapshot) {
        for sink in &self.sinks {
            sink.publish(snapshot);
        }
    }

    fn raise_alert(&self, message: &str) {
        for sink in &self.sinks {
            sink.raise_alert(message);
        }
    }
}

/// Renders every snapshot to the log, like the app's status screen.
pub struct LogSink;

impl DisplaySink for LogSink {
    fn publish(&self, snapshot: &StatusSnapshot) {
        info!(
            tick = snapshot.tick,
            drainage = snapshot.drainage.label(),
            water_level = %snapshot.water_level,
            distance_cm = snapshot.distance_cm,
            "drainage status"
        );
    }

    fn raise_alert(&self, message: &str) {
        warn!("⚠ {}", message);
    }
}

// ---------------------------------------------------------------------------
// Status board
// ---------------------------------------------------------------------------

/// An in-app alert as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InAppAlert {
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Status response body for GET /status
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: Option<StatusSnapshot>,
    pub drainage_label: Option<&'static str>,
    pub last_alert: Option<InAppAlert>,
}

#[derive(Default)]
struct BoardState {
    latest: Option<StatusSnapshot>,
    last_alert: Option<InAppAlert>,
}

/// In-memory sink holding only the latest snapshot and the latest in-app
/// alert. Cloning shares the same board.
#[derive(Clone, Default)]
pub struct StatusBoard {
    state: Arc<RwLock<BoardState>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<StatusSnapshot> {
        self.state.read().ok().and_then(|s| s.latest.clone())
    }

    pub fn last_alert(&self) -> Option<InAppAlert> {
        self.state.read().ok().and_then(|s| s.last_alert.clone())
    }

    pub fn response(&self) -> StatusResponse {
        let status = self.latest();
        StatusResponse {
            drainage_label: status.as_ref().map(|s| s.drainage.label()),
            status,
            last_alert: self.last_alert(),
        }
    }
}

impl DisplaySink for StatusBoard {
    fn publish(&self, snapshot: &StatusSnapshot) {
        if let Ok(mut state) = self.state.write() {
            state.latest = Some(snapshot.clone());
        }
    }

    fn raise_alert(&self, message: &str) {
        if let Ok(mut state) = self.state.write() {
            state.last_alert = Some(InAppAlert {
                message: message.to_string(),
                raised_at: Utc::now(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP endpoint server on the specified port
pub fn start_endpoint_server(port: u16, board: StatusBoard) -> Result<(), String> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;

    info!(port, "status endpoint listening (GET /status, GET /health)");
    serve(server, board);
    Ok(())
}

/// Answers requests on `server` until it is closed.
pub fn serve(server: tiny_http::Server, board: StatusBoard) {
    for request in server.incoming_requests() {
        let response = route(request.method(), request.url(), &board);

        if let Err(e) = request.respond(response) {
            error!(error = %e, "failed to send response");
        }
    }
}

fn route(
    method: &tiny_http::Method,
    url: &str,
    board: &StatusBoard,
) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    if *method != tiny_http::Method::Get {
        return create_response(405, serde_json::json!({ "error": "Method not allowed" }));
    }

    match url {
        "/health" => handle_health(),
        "/status" => handle_status(board),
        _ => create_response(
            404,
            serde_json::json!({
                "error": "Not found",
                "available_endpoints": ["/health", "/status"]
            }),
        ),
    }
}

/// Handle /health endpoint
fn handle_health() -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    create_response(
        200,
        serde_json::json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        }),
    )
}

/// Handle /status endpoint. 503 until the first tick has been applied.
fn handle_status(board: &StatusBoard) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let response = board.response();
    let code = if response.status.is_some() { 200 } else { 503 };

    match serde_json::to_value(&response) {
        Ok(json) => create_response(code, json),
        Err(e) => create_response(500, serde_json::json!({ "error": e.to_string() })),
    }
}

/// Create HTTP response with JSON body
fn create_response(status_code: u16, json: serde_json::Value) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string());

    let response = tiny_http::Response::from_data(body.into_bytes())
        .with_status_code(tiny_http::StatusCode::from(status_code));

    match tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
