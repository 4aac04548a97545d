//! YAML event configuration.
//!
//! One file describes everything the validation core needs to know about an
//! event: name-matching thresholds, the in-scope activity tags, ticket types
//! to ignore, the attribute mapping tables and reference-level overrides.
//! Every section has a default, so a missing file still yields a working
//! setup.
//!
//! ## Example
//!
//! ```yaml
//! version: "1.0"
//! name: "EuroPython 2025"
//!
//! name_matching:
//!   exact_threshold: 0.95
//!   close_threshold: 0.8
//!
//! include_activities: [on_site, remote_sale, online_access]
//! exclude_ticket_patterns: ["luggage", "childcare"]
//!
//! mapping:
//!   categories:
//!     by_id:
//!       "81310": { is_speaker: true }
//!     by_name:
//!       - pattern: "sponsor"
//!         attributes: { is_sponsor: true }
//!     by_ticket_id:
//!       "501": { is_organizer: true }
//!
//! overrides:
//!   combinations:
//!     - name: organizer_and_speaker
//!       references: ["HLL1H-1"]
//!     - name: speaker_add_keynote
//!       references: ["KEY01-1"]
//!   organizer_speakers: ["ORG01-2"]
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use mapping::{AttributeMapper, KeywordRule, MappingConfig, ReferenceOverrides};
use matching::NameThresholds;
use serde::{Deserialize, Serialize};
use snapshot::{DEFAULT_INCLUDE_ACTIVITIES, SnapshotStore};
use thiserror::Error;
use tracing::info;
use validation::ValidationPolicy;

/// Errors that can occur when loading the event configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level event configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct EventConfig {
    /// Configuration format version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Optional event name, used in logs only.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub name_matching: NameThresholds,

    /// Ticket types whose activities intersect this list are in scope.
    #[serde(default = "default_include_activities")]
    pub include_activities: Vec<String>,

    /// Case-insensitive title substrings; matching ticket types are dropped
    /// at refresh.
    #[serde(default)]
    pub exclude_ticket_patterns: Vec<String>,

    #[serde(default)]
    pub mapping: MappingConfig,

    #[serde(default)]
    pub overrides: ReferenceOverrides,
}

impl EventConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no event config file, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: EventConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        if !self.name_matching.is_valid() {
            return Err(ConfigLoadError::Validation(format!(
                "name_matching thresholds must satisfy 0 <= close ({}) <= exact ({}) <= 1",
                self.name_matching.close_threshold, self.name_matching.exact_threshold
            )));
        }

        if self.include_activities.iter().all(|tag| tag.trim().is_empty()) {
            return Err(ConfigLoadError::Validation(
                "include_activities must name at least one activity".into(),
            ));
        }

        if self.exclude_ticket_patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigLoadError::Validation(
                "exclude_ticket_patterns must not contain empty patterns".into(),
            ));
        }

        for rule in self
            .mapping
            .attendee_patterns
            .iter()
            .chain(&self.mapping.access_patterns)
            .chain(&self.mapping.legacy.title_keywords)
        {
            validate_keyword_rule(rule)?;
        }

        if let Some(pattern) = self
            .mapping
            .categories
            .by_name
            .iter()
            .find(|pattern| pattern.pattern.trim().is_empty())
        {
            return Err(ConfigLoadError::Validation(format!(
                "category name pattern with flags {:?} has an empty pattern",
                pattern.attributes
            )));
        }

        for combination in &self.overrides.combinations {
            if combination.effective_attributes().is_empty() {
                return Err(ConfigLoadError::Validation(format!(
                    "override '{}' is not a known combination and sets no attributes",
                    combination.name
                )));
            }
        }

        Ok(())
    }

    pub fn mapper(&self) -> AttributeMapper {
        AttributeMapper::new(self.mapping.clone())
    }

    /// An empty store scoped to this event's activities.
    pub fn snapshot_store(&self) -> SnapshotStore {
        SnapshotStore::new(
            self.include_activities
                .iter()
                .map(|tag| tag.trim())
                .filter(|tag| !tag.is_empty()),
        )
    }

    pub fn validation_policy(&self, upstream_timeout: Duration) -> ValidationPolicy {
        ValidationPolicy::default()
            .with_thresholds(self.name_matching)
            .with_exclude_patterns(self.exclude_ticket_patterns.iter().cloned())
            .with_overrides(self.overrides.clone())
            .with_upstream_timeout(upstream_timeout)
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            name_matching: NameThresholds::default(),
            include_activities: default_include_activities(),
            exclude_ticket_patterns: Vec::new(),
            mapping: MappingConfig::default(),
            overrides: ReferenceOverrides::default(),
        }
    }
}

fn validate_keyword_rule(rule: &KeywordRule) -> Result<(), ConfigLoadError> {
    if rule.keywords.is_empty() || rule.keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigLoadError::Validation(format!(
            "keyword rule '{}' needs at least one non-empty keyword",
            rule.name
        )));
    }
    Ok(())
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_include_activities() -> Vec<String> {
    DEFAULT_INCLUDE_ACTIVITIES
        .iter()
        .map(|tag| tag.to_string())
        .collect()
}
