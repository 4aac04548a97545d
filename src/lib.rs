//! Workspace umbrella crate for Ticketcheck, a conference attendee
//! validation service.
//!
//! This crate re-exports the core crates so callers can wire a validator
//! from one dependency, and owns the YAML event configuration that ties
//! them together:
//!
//! - `matching`: name normalization and fuzzy comparison
//! - `snapshot`: ticket/sale records and the refreshable snapshot store
//! - `mapping`: attribute derivation, coverage report, reference overrides
//! - `backend`: the ticketing provider trait and its adapters
//! - `validation`: the claim validation engine
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use ticketcheck::{EventConfig, FixtureBackend, Validator};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let event = EventConfig::load_or_default("event_config.yml")?;
//! let backend = Arc::new(FixtureBackend::from_path("fixtures/event.json").await?);
//! let validator = Validator::new(
//!     Arc::new(event.snapshot_store()),
//!     backend,
//!     event.mapper(),
//!     event.validation_policy(Duration::from_secs(15)),
//! );
//! validator.refresh().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;

pub use config::{ConfigLoadError, EventConfig};

pub use backend::{
    BackendError, BackendKind, FixtureBackend, FixtureData, HttpSettings, PretixBackend,
    PretixConfig, RetryConfig, TicketIdKind, TicketingBackend, TitoBackend, TitoConfig,
};
pub use mapping::{
    AttributeMapper, AttributeSource, CombinationOverride, CoverageReport, MappingConfig,
    ReferenceOverrides,
};
pub use matching::{MatchKind, NameMatch, NameMatcher, NameThresholds, match_names};
pub use snapshot::{
    Attribute, AttributeSet, Category, Sale, SaleState, Snapshot, SnapshotError, SnapshotStats,
    SnapshotStore, TicketType,
};
pub use validation::{
    AttendeeClaim, ClaimError, Outcome, RefreshSummary, ValidationError, ValidationPolicy,
    Validator, Verdict,
};
