//! # Ticketcheck Validation (`validation`)
//!
//! ## Purpose
//!
//! `validation` decides whether a claimed identity belongs to a real,
//! correctly typed attendee. It reads the current snapshot held by a
//! [`snapshot::SnapshotStore`], falls back to the provider's live search on
//! a miss, scores names with the `matching` crate and decorates accepted
//! attendees with the attributes derived by `mapping`. It also owns the
//! refresh that rebuilds the snapshot from a [`backend::TicketingBackend`].
//!
//! A claim moves through these stages:
//!
//! - resolve the source: a reference or secret points at one ticket, an
//!   order code (or an email) at a list of candidates
//! - an exact (order, normalized name) hit skips scoring
//! - otherwise every candidate is scored; the first exact match wins, a
//!   close match rejects with a spelling hint
//! - the ticket type must be in scope
//! - the type's attributes, per-type overrides and reference overrides are
//!   merged into the verdict
//!
//! ## Core Types
//!
//! - [`AttendeeClaim`]: the submitted fields, checked into a
//!   [`ValidatedClaim`] (or a [`ClaimError`]).
//! - [`Verdict`]: an [`Outcome`] plus hint and attributes.
//! - [`ValidationError`]: upstream failures, timeouts and snapshot
//!   inconsistencies. Not-found and close-match are verdicts, not errors.
//! - [`ValidationPolicy`]: name thresholds, exclusion patterns, reference
//!   overrides and the upstream timeout.
//! - [`Validator`]: the engine.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use backend::{FixtureBackend, FixtureData};
//! use mapping::AttributeMapper;
//! use snapshot::SnapshotStore;
//! use validation::{AttendeeClaim, ValidationPolicy, Validator};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(FixtureBackend::from_data(FixtureData::default()));
//! let validator = Validator::new(
//!     Arc::new(SnapshotStore::default()),
//!     backend,
//!     AttributeMapper::default(),
//!     ValidationPolicy::default(),
//! );
//! validator.refresh().await?;
//!
//! let claim = AttendeeClaim::default().with_order("HLL1H").with_name("Sam Smith");
//! let verdict = validator.validate_attendee(&claim).await?;
//! println!("{:?}: {}", verdict.outcome, verdict.hint);
//! # Ok(())
//! # }
//! ```

mod engine;
mod types;

pub use crate::engine::Validator;
pub use crate::types::{
    normalize_email, AttendeeClaim, ClaimError, Outcome, RefreshSummary, TicketKey,
    ValidatedClaim, ValidationError, ValidationPolicy, Verdict, INVALID_ORDER_HINT,
    INVALID_TICKET_HINT, MISMATCH_HINT,
};
