use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::SystemTime;

/// Global server start time for uptime calculation
static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

fn uptime_secs() -> u64 {
    SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Liveness probe
pub async fn alive() -> impl IntoResponse {
    Json(json!({ "alive": true }))
}

/// Readiness probe
///
/// 503 until the first refresh has installed a snapshot.
pub async fn readiness_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let store = state.validator.store();
    let loaded = store.is_loaded();
    let status = if loaded {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = Json(json!({
        "status": if loaded { "ready" } else { "loading" },
        "service": "ticketcheck-server",
        "backend": state.validator.backend_name(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_secs(),
        "snapshot": store.stats(),
    }));

    (status, body)
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| ServerError::NotFound("metrics are disabled".into()))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
