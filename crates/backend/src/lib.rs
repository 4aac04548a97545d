//! Ticketing provider adapters.
//!
//! [`TicketingBackend`] is the seam between the validation engine and a
//! provider. Three implementations exist:
//!
//! - [`TitoBackend`]: per-ticket references, releases tagged with
//!   activities.
//! - [`PretixBackend`]: order positions (reference synthesized as
//!   `{order}-{position}`), items grouped into categories, ticket secrets.
//! - [`FixtureBackend`]: a JSON file, for running without credentials.
//!
//! HTTP adapters retry transient failures ([`RetryConfig`]); bounding the
//! whole operation in time is left to the caller.

pub mod error;
pub mod fixture;
mod http;
pub mod pretix;
pub mod provider;
pub mod retry;
pub mod tito;

use serde::{Deserialize, Serialize};

pub use crate::error::BackendError;
pub use crate::fixture::{FixtureBackend, FixtureData};
pub use crate::http::HttpSettings;
pub use crate::pretix::{PretixBackend, PretixConfig, PRETIX_API_URL};
pub use crate::provider::{TicketIdKind, TicketingBackend};
pub use crate::retry::{execute_with_retry, RetryConfig};
pub use crate::tito::{TitoBackend, TitoConfig, TITO_API_URL};

/// Provider selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Tito,
    Pretix,
    #[default]
    Fixture,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Tito => "tito",
            BackendKind::Pretix => "pretix",
            BackendKind::Fixture => "fixture",
        }
    }

    /// Whether the provider needs an API token.
    pub fn is_remote(&self) -> bool {
        !matches!(self, BackendKind::Fixture)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
