//! API route handlers
//!
//! - `health`: liveness, readiness and metrics
//! - `tickets`: attendee and email validation, refresh, snapshot views

pub mod health;
pub mod tickets;

use crate::error::ServerError;
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// Root endpoint
///
/// Doubles as a liveness probe, so it always answers `alive: true`.
///
/// # Response
///
/// ```json
/// {
///   "alive": true,
///   "name": "Ticketcheck Server",
///   "version": "0.1.0",
///   "backend": "fixture",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(json!({
        "alive": true,
        "name": "Ticketcheck Server",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.validator.backend_name(),
        "endpoints": [
            "/tickets/validate_attendee",
            "/tickets/validate_email",
            "/tickets/refresh_all",
            "/tickets/ticket_types",
            "/tickets/ticket_count",
            "/healthcheck/alive",
            "/ready",
            "/metrics"
        ]
    }))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound("no such route".into())
}
