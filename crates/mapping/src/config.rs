use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use snapshot::{Attribute, AttributeFlags, CategoryId, TicketTypeId};

/// Rule tables consumed by [`crate::AttributeMapper`].
///
/// Every table has a default so an empty `mapping:` section still derives
/// sensible roles from ticket titles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingConfig {
    #[serde(default)]
    pub categories: CategoryRules,
    /// Role keyword rules, all applied.
    #[serde(default = "default_attendee_patterns")]
    pub attendee_patterns: Vec<KeywordRule>,
    /// Access keyword rules, first hit wins.
    #[serde(default = "default_access_patterns")]
    pub access_patterns: Vec<KeywordRule>,
    #[serde(default)]
    pub legacy: LegacyRules,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            categories: CategoryRules::default(),
            attendee_patterns: default_attendee_patterns(),
            access_patterns: default_access_patterns(),
            legacy: LegacyRules::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryRules {
    /// Exact category id → flags.
    #[serde(default)]
    pub by_id: BTreeMap<CategoryId, AttributeFlags>,
    /// Case-insensitive category-name substring rules, first hit wins.
    #[serde(default)]
    pub by_name: Vec<NamePattern>,
    /// Ticket type id → flags, applied at derivation and again when a
    /// validated attendee is decorated.
    #[serde(default)]
    pub by_ticket_id: BTreeMap<TicketTypeId, AttributeFlags>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamePattern {
    pub pattern: String,
    pub attributes: AttributeFlags,
}

/// A named keyword list and the flags applied when any keyword occurs in a
/// ticket title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordRule {
    pub name: String,
    pub keywords: Vec<String>,
    pub attributes: AttributeFlags,
}

impl KeywordRule {
    pub fn new<K: Into<String>>(
        name: impl Into<String>,
        keywords: impl IntoIterator<Item = K>,
        attributes: &[Attribute],
    ) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            attributes: flags(attributes),
        }
    }

    /// Whether any keyword occurs in the already lower-cased `title`.
    pub fn matches(&self, title_lower: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && title_lower.contains(&keyword.to_lowercase()))
    }
}

/// Tag-based derivation used by providers whose ticket types carry
/// activity tags instead of categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegacyRules {
    /// Title keyword rules, all applied.
    #[serde(default = "default_legacy_title_keywords")]
    pub title_keywords: Vec<KeywordRule>,
    /// Activity tag → flags.
    #[serde(default = "default_activity_flags")]
    pub activity_flags: BTreeMap<String, AttributeFlags>,
}

impl Default for LegacyRules {
    fn default() -> Self {
        Self {
            title_keywords: default_legacy_title_keywords(),
            activity_flags: default_activity_flags(),
        }
    }
}

pub(crate) fn flags(attributes: &[Attribute]) -> AttributeFlags {
    attributes.iter().map(|attribute| (*attribute, true)).collect()
}

fn default_attendee_patterns() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new("speaker", ["speaker"], &[Attribute::Speaker]),
        KeywordRule::new("sponsor", ["sponsor"], &[Attribute::Sponsor]),
        KeywordRule::new("organizer", ["organizer", "organiser"], &[Attribute::Organizer]),
        KeywordRule::new("volunteer", ["volunteer"], &[Attribute::Volunteer]),
        KeywordRule::new("guest", ["guest", "vip"], &[Attribute::Guest]),
    ]
}

fn default_access_patterns() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            "remote",
            ["online", "remote", "virtual", "streaming"],
            &[Attribute::Remote, Attribute::OnlineAccess],
        ),
        KeywordRule::new(
            "onsite",
            ["in-person", "in person", "on-site", "onsite", "physical", "venue"],
            &[Attribute::Onsite, Attribute::OnlineAccess],
        ),
    ]
}

fn default_legacy_title_keywords() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new("speaker", ["speaker"], &[Attribute::Speaker]),
        KeywordRule::new("organizer", ["organiser", "organizer"], &[Attribute::Organizer]),
        KeywordRule::new("sponsor", ["sponsor", "day pass"], &[Attribute::Sponsor]),
        KeywordRule::new("volunteer", ["volunteer"], &[Attribute::Volunteer]),
    ]
}

fn default_activity_flags() -> BTreeMap<String, AttributeFlags> {
    BTreeMap::from([
        ("remote_sale".to_string(), flags(&[Attribute::Remote])),
        ("on_site".to_string(), flags(&[Attribute::Onsite])),
        ("online_access".to_string(), flags(&[Attribute::OnlineAccess])),
    ])
}
