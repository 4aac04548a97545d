//! Attribute Mapper: turns provider ticket types into attendee role and
//! access flags.
//!
//! Two derivation paths exist because the two providers model ticket
//! types differently:
//!
//! - [`AttributeSource::Rules`]: category, ticket-type-id and title
//!   keyword rules with an on-site default
//!   ([`AttributeMapper::derive_attributes`]). Legacy activity tags are
//!   produced from the result ([`activities_from_attributes`],
//!   [`day_pass_tag`]).
//! - [`AttributeSource::ActivityTags`]: title keywords plus flags mapped
//!   from the provider's own activity tags
//!   ([`AttributeMapper::derive_legacy`]).
//!
//! Both run once per refresh and the result is cached on the ticket type.
//! [`ReferenceOverrides`] layer per-person flags on top at validation time
//! and [`CoverageReport`] summarises rule coverage at startup.

pub mod config;
pub mod coverage;
pub mod mapper;
pub mod overrides;

pub use crate::config::{CategoryRules, KeywordRule, LegacyRules, MappingConfig, NamePattern};
pub use crate::coverage::{AttributeCoverage, CoverageReport};
pub use crate::mapper::{activities_from_attributes, day_pass_tag, AttributeMapper, AttributeSource};
pub use crate::overrides::{CombinationOverride, ReferenceOverrides};
