//! # Ticketcheck Name Matching (`matching`)
//!
//! ## Purpose
//!
//! `matching` decides whether the name an attendee types at validation time
//! corresponds to the name registered on their ticket. Registered names are
//! typed by buyers, often on someone else's behalf, so small variations in
//! spacing, case, accents and spelling are common; impostors typing an
//! unrelated name must still be rejected.
//!
//! ## Pipeline
//!
//! 1. Both names are normalized ([`normalize_name`]): whitespace collapsed,
//!    diacritics folded to ASCII, upper-cased.
//! 2. Equal normalized forms are an exact match with ratio `1.0`.
//! 3. Otherwise a Ratcliff/Obershelp similarity ratio
//!    ([`similarity_ratio`]) is classified against [`NameThresholds`]:
//!    above `exact_threshold` → [`MatchKind::Exact`], above
//!    `close_threshold` → [`MatchKind::Close`], else
//!    [`MatchKind::NoMatch`].
//!
//! ## Example Usage
//!
//! ```rust
//! use matching::{match_names, MatchKind, NameThresholds};
//!
//! let thresholds = NameThresholds::default(); // 0.95 / 0.8
//!
//! assert!(match_names("Sam Smith", " sam  SMITH ", &thresholds).is_match());
//!
//! let typo = match_names("Sam Smith", "Sam Smth", &thresholds);
//! assert_eq!(typo.kind, MatchKind::Close);
//! assert!(typo.hint.contains("close but not exact enough"));
//! ```
//!
//! Everything in this crate is a pure function; there is no shared state.

pub mod matcher;
pub mod normalize;
pub mod sequence;

pub use crate::matcher::{match_names, MatchKind, NameMatch, NameMatcher, NameThresholds};
pub use crate::normalize::{collapse_whitespace, fold_to_ascii, normalize_name};
pub use crate::sequence::similarity_ratio;
