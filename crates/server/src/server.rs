//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration with all API endpoints
//! - Middleware stack (request ids, logging, compression, CORS, timeout)
//! - The startup refresh and the periodic refresh task
//! - Graceful shutdown handling

use crate::config::ServerConfig;
use crate::middleware::{log_requests, request_id};
use crate::routes::{api_info, not_found};
use crate::routes::{health, tickets};
use crate::state::ServerState;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use validation::Validator;

/// Build the Axum router with all routes and middleware
///
/// Middleware stack (outermost first):
/// 1. Tracing
/// 2. Request ID tracking
/// 3. Request logging
/// 4. CORS
/// 5. Compression
/// 6. Timeout handling
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let health_routes = Router::new()
        .route("/", get(api_info))
        .route("/healthcheck/alive", get(health::alive))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    let ticket_routes = Router::new()
        .route("/tickets/validate_attendee", post(tickets::validate_attendee))
        .route("/tickets/validate_email", post(tickets::validate_email))
        .route("/tickets/refresh_all", get(tickets::refresh_all))
        .route("/tickets/ticket_types", get(tickets::ticket_types))
        .route("/tickets/ticket_count", get(tickets::ticket_count));

    Router::new()
        .merge(health_routes)
        .merge(ticket_routes)
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(state.config.timeout_secs),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Ticketcheck HTTP server
///
/// Blocks until the server is shut down via SIGTERM or Ctrl+C.
///
/// # Example
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
///
/// # Initialization
///
/// 1. Sets up structured JSON logging with the configured log level
/// 2. Installs the Prometheus recorder when metrics are enabled
/// 3. Loads the event config and selects the ticketing backend
/// 4. Runs the startup refresh; a failure is logged and the server starts
///    with an empty snapshot
/// 5. Logs the attribute coverage report
/// 6. Spawns the periodic refresh task, if configured
/// 7. Serves with graceful shutdown
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();

    let metrics = if config.metrics_enabled {
        Some(install_metrics_recorder()?)
    } else {
        None
    };

    let mut state = ServerState::from_config(config.clone()).await?;
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    let state = Arc::new(state);

    if config.refresh_on_startup {
        if let Err(error) = state.validator.refresh().await {
            tracing::error!(%error, "Startup refresh failed, serving with an empty snapshot");
        }
    }
    state.validator.coverage_report().log();

    let refresher = config
        .refresh_interval()
        .map(|period| spawn_periodic_refresh(state.validator.clone(), period));

    let app = build_router(state);
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        "Starting Ticketcheck server on {} with the {} backend",
        addr,
        config.effective_backend()
    );
    tracing::info!(
        "Timeout: {}s, upstream timeout: {}s, refresh interval: {:?}",
        config.timeout_secs,
        config.upstream_timeout_secs,
        config.refresh_interval()
    );
    tracing::info!(
        "CORS: {}, Metrics: {}",
        config.enable_cors,
        config.metrics_enabled
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = refresher {
        task.abort();
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn install_metrics_recorder() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Refresh the snapshot every `period`, skipping the immediate first tick.
///
/// A failed refresh keeps the previous snapshot in service.
pub fn spawn_periodic_refresh(validator: Arc<Validator>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(error) = validator.refresh().await {
                tracing::warn!(%error, "Periodic refresh failed, keeping the previous snapshot");
            }
        }
    })
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
