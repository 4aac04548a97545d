use serde::{Deserialize, Serialize};

use crate::normalize::normalize_name;
use crate::sequence::similarity_ratio;

/// Similarity cut-offs used to classify a name comparison.
///
/// A ratio strictly above `exact` is a match; strictly above `close` (but not
/// above `exact`) is close-but-rejected; anything else is no match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NameThresholds {
    #[serde(default = "NameThresholds::default_exact")]
    pub exact_threshold: f64,
    #[serde(default = "NameThresholds::default_close")]
    pub close_threshold: f64,
}

impl NameThresholds {
    pub fn new(exact_threshold: f64, close_threshold: f64) -> Self {
        Self {
            exact_threshold,
            close_threshold,
        }
    }

    pub(crate) fn default_exact() -> f64 {
        0.95
    }

    pub(crate) fn default_close() -> f64 {
        0.8
    }

    /// `0 <= close <= exact <= 1`, both finite.
    pub fn is_valid(&self) -> bool {
        self.exact_threshold.is_finite()
            && self.close_threshold.is_finite()
            && (0.0..=1.0).contains(&self.exact_threshold)
            && (0.0..=1.0).contains(&self.close_threshold)
            && self.close_threshold <= self.exact_threshold
    }
}

impl Default for NameThresholds {
    fn default() -> Self {
        Self::new(Self::default_exact(), Self::default_close())
    }
}

/// Classification of a name comparison.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Close,
    NoMatch,
}

/// Result of comparing a stored name against a supplied one.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NameMatch {
    pub kind: MatchKind,
    /// Similarity in `[0, 1]`; `1.0` when the normalized forms are equal.
    pub ratio: f64,
    /// Empty on a match, otherwise a human-readable explanation naming the
    /// supplied name.
    pub hint: String,
}

impl NameMatch {
    pub fn is_match(&self) -> bool {
        self.kind == MatchKind::Exact
    }

    pub fn is_close(&self) -> bool {
        self.kind == MatchKind::Close
    }
}

/// Compares `stored` (the registered name) against `provided` (the name the
/// attendee typed).
///
/// Pure and deterministic: the same inputs always yield the same result.
pub fn match_names(stored: &str, provided: &str, thresholds: &NameThresholds) -> NameMatch {
    let stored_norm = normalize_name(stored);
    let provided_norm = normalize_name(provided);

    if stored_norm == provided_norm {
        return NameMatch {
            kind: MatchKind::Exact,
            ratio: 1.0,
            hint: String::new(),
        };
    }

    let ratio = similarity_ratio(&stored_norm, &provided_norm);
    let provided = provided.trim();

    if ratio > thresholds.exact_threshold {
        NameMatch {
            kind: MatchKind::Exact,
            ratio,
            hint: String::new(),
        }
    } else if ratio > thresholds.close_threshold {
        NameMatch {
            kind: MatchKind::Close,
            ratio,
            hint: format!("Name '{provided}' is close but not exact enough."),
        }
    } else {
        NameMatch {
            kind: MatchKind::NoMatch,
            ratio,
            hint: format!("Could not find '{provided}', check spelling."),
        }
    }
}

/// [`match_names`] bound to a fixed set of thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NameMatcher {
    thresholds: NameThresholds,
}

impl NameMatcher {
    pub fn new(thresholds: NameThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &NameThresholds {
        &self.thresholds
    }

    pub fn compare(&self, stored: &str, provided: &str) -> NameMatch {
        match_names(stored, provided, &self.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn defaults() -> NameThresholds {
        NameThresholds::default()
    }

    #[test]
    fn identical_names_match_with_full_ratio() {
        let result = match_names("Sam Smith", "Sam Smith", &defaults());
        assert!(result.is_match());
        assert_eq!(result.ratio, 1.0);
        assert!(result.hint.is_empty());
    }

    #[test]
    fn case_whitespace_and_accents_are_ignored() {
        let result = match_names("José  Müller", "jose muller", &defaults());
        assert!(result.is_match());
        assert_eq!(result.ratio, 1.0);
    }

    #[test]
    fn dropped_letter_is_close() {
        let result = match_names("Sam Smith", "Sam Smth", &defaults());
        assert_eq!(result.kind, MatchKind::Close);
        assert!(result.ratio > 0.9 && result.ratio < 0.95);
        assert!(result.hint.contains("close but not exact enough"));
        assert!(result.hint.contains("Sam Smth"));
    }

    #[test]
    fn long_name_with_single_typo_matches() {
        // 2 * 29 / 60 > 0.95
        let result = match_names(
            "Maximilian Alexander Rosenbaum",
            "Maximilian Alexander Rosenbaun",
            &defaults(),
        );
        assert!(result.is_match(), "ratio was {}", result.ratio);
        assert!(result.ratio < 1.0);
    }

    #[test]
    fn unrelated_name_is_no_match() {
        let result = match_names("Sam Smith", "Jane Doe", &defaults());
        assert_eq!(result.kind, MatchKind::NoMatch);
        assert!(result.hint.contains("check spelling"));
    }

    #[test]
    fn thresholds_are_strict_upper_bounds() {
        let ratio = match_names("Sam Smith", "Sam Smth", &defaults()).ratio;
        let at_exact = NameThresholds::new(ratio, 0.5);
        assert_eq!(match_names("Sam Smith", "Sam Smth", &at_exact).kind, MatchKind::Close);

        let below = NameThresholds::new(ratio - 1e-6, 0.5);
        assert!(match_names("Sam Smith", "Sam Smth", &below).is_match());
    }

    #[test]
    fn tunable_thresholds_change_classification() {
        let lenient = NameMatcher::new(NameThresholds::new(0.9, 0.5));
        assert!(lenient.compare("Sam Smith", "Sam Smth").is_match());

        let strict = NameMatcher::new(NameThresholds::new(0.99, 0.98));
        assert_eq!(strict.compare("Sam Smith", "Sam Smth").kind, MatchKind::NoMatch);
    }

    #[test]
    fn threshold_validation() {
        assert!(NameThresholds::default().is_valid());
        assert!(!NameThresholds::new(0.7, 0.8).is_valid());
        assert!(!NameThresholds::new(1.2, 0.8).is_valid());
        assert!(!NameThresholds::new(f64::NAN, 0.8).is_valid());
    }

    #[test]
    fn thresholds_deserialize_with_defaults() {
        let parsed: NameThresholds = serde_json::from_str(r#"{"exact_threshold": 0.9}"#).unwrap();
        assert_eq!(parsed.exact_threshold, 0.9);
        assert_eq!(parsed.close_threshold, 0.8);
    }

    fn name_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z]{1,10}( [A-Za-z]{1,10}){0,2}"
    }

    fn accent(name: &str) -> String {
        name.chars()
            .map(|c| match c {
                'a' => 'á',
                'e' => 'è',
                'o' => 'ö',
                'u' => 'ü',
                'c' => 'ç',
                'n' => 'ñ',
                'A' => 'Å',
                'E' => 'É',
                other => other,
            })
            .collect()
    }

    proptest! {
        #[test]
        fn reflexive(name in name_strategy()) {
            let result = match_names(&name, &name, &defaults());
            prop_assert!(result.is_match());
            prop_assert_eq!(result.ratio, 1.0);
        }

        #[test]
        fn invariant_under_case_whitespace_and_diacritics(name in name_strategy()) {
            let variant = format!("  {}  ", accent(&name.to_lowercase()).replace(' ', " \t "));
            let result = match_names(&name, &variant, &defaults());
            prop_assert!(result.is_match());
        }

        #[test]
        fn symmetric_ratio(a in name_strategy(), b in name_strategy()) {
            let forward = match_names(&a, &b, &defaults()).ratio;
            let backward = match_names(&b, &a, &defaults()).ratio;
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn ratio_in_unit_interval(a in "\\PC{0,20}", b in "\\PC{0,20}") {
            let ratio = match_names(&a, &b, &defaults()).ratio;
            prop_assert!((0.0..=1.0).contains(&ratio));
        }
    }
}
