//! Ticketcheck Server - HTTP REST API for conference attendee validation
//!
//! This crate puts the validation engine behind an axum router. One
//! process serves one event from one ticketing provider (Tito, Pretix or a
//! JSON fixture), keeping an in-memory snapshot of every ticket that is
//! rebuilt on startup, on demand and optionally on a timer.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /tickets/validate_attendee` - Validate an attendee claim
//! - `POST /tickets/validate_email` - Check an email against in-scope tickets
//! - `GET /tickets/refresh_all` - Rebuild the snapshot from the provider
//! - `GET /tickets/ticket_types` - All ticket types in the snapshot
//! - `GET /tickets/ticket_count` - Number of tickets in the snapshot
//! - `GET /`, `GET /healthcheck/alive` - Liveness
//! - `GET /ready` - Readiness (snapshot loaded)
//! - `GET /metrics` - Prometheus metrics
//!
//! # Configuration
//!
//! Read from an optional `server.{toml,yaml,json}` file and `TICKETCHECK__*`
//! environment variables (a `.env` file is loaded first), e.g.
//! `TICKETCHECK__BACKEND=pretix`, `TICKETCHECK__API_TOKEN=...`,
//! `TICKETCHECK__REFRESH_INTERVAL_SECS=600`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, spawn_periodic_refresh, start_server};
pub use state::ServerState;
