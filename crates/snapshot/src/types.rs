use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Provider-native identifier (ticket type, category).
///
/// Providers hand out integers or strings; both are stored as text so ids
/// from either provider compare the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProviderId(String);

pub type TicketTypeId = ProviderId;
pub type CategoryId = ProviderId;

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for ProviderId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ProviderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Str(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(id) => ProviderId::from(id),
            RawId::Str(id) => ProviderId::from(id),
        })
    }
}

/// Boolean role/access flag carried by a resolved attendee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    #[serde(rename = "is_speaker")]
    Speaker,
    #[serde(rename = "is_sponsor")]
    Sponsor,
    #[serde(rename = "is_organizer")]
    Organizer,
    #[serde(rename = "is_volunteer")]
    Volunteer,
    #[serde(rename = "is_remote")]
    Remote,
    #[serde(rename = "is_onsite")]
    Onsite,
    #[serde(rename = "is_guest")]
    Guest,
    #[serde(rename = "online_access")]
    OnlineAccess,
    #[serde(rename = "is_keynote")]
    Keynote,
}

impl Attribute {
    pub const ALL: [Attribute; 9] = [
        Attribute::Speaker,
        Attribute::Sponsor,
        Attribute::Organizer,
        Attribute::Volunteer,
        Attribute::Remote,
        Attribute::Onsite,
        Attribute::Guest,
        Attribute::OnlineAccess,
        Attribute::Keynote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Speaker => "is_speaker",
            Attribute::Sponsor => "is_sponsor",
            Attribute::Organizer => "is_organizer",
            Attribute::Volunteer => "is_volunteer",
            Attribute::Remote => "is_remote",
            Attribute::Onsite => "is_onsite",
            Attribute::Guest => "is_guest",
            Attribute::OnlineAccess => "online_access",
            Attribute::Keynote => "is_keynote",
        }
    }

    /// Remote/on-site/online access flags, as opposed to roles.
    pub fn is_access(&self) -> bool {
        matches!(
            self,
            Attribute::Remote | Attribute::Onsite | Attribute::OnlineAccess
        )
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flag table as written in configuration: attribute name → bool.
pub type AttributeFlags = BTreeMap<Attribute, bool>;

/// Set of attributes asserted `true`.
///
/// Only ever grows: merging flag tables inserts the `true` entries and
/// ignores `false` ones, so no rule can clear what an earlier rule set.
/// Serializes as a full `attribute → bool` map with every known attribute
/// present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet(BTreeSet<Attribute>);

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attribute: Attribute) {
        self.0.insert(attribute);
    }

    pub fn contains(&self, attribute: Attribute) -> bool {
        self.0.contains(&attribute)
    }

    /// OR-merges another set into this one.
    pub fn union_with(&mut self, other: &AttributeSet) {
        self.0.extend(other.0.iter().copied());
    }

    /// OR-merges the `true` entries of a flag table.
    pub fn merge_flags(&mut self, flags: &AttributeFlags) {
        self.0
            .extend(flags.iter().filter(|(_, on)| **on).map(|(attr, _)| *attr));
    }

    pub fn is_subset(&self, other: &AttributeSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for AttributeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Attribute::ALL.len()))?;
        for attribute in Attribute::ALL {
            map.serialize_entry(attribute.as_str(), &self.contains(attribute))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flags = AttributeFlags::deserialize(deserializer)?;
        let mut set = AttributeSet::new();
        set.merge_flags(&flags);
        Ok(set)
    }
}

/// Product category of a ticket type (per-product provider only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub internal_name: String,
}

/// A purchasable ticket type ("release" / "item").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketType {
    pub id: TicketTypeId,
    pub title: String,
    #[serde(default)]
    pub activities: BTreeSet<String>,
    /// Derived once per refresh; never edited afterwards.
    #[serde(default)]
    pub attributes: AttributeSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl TicketType {
    pub fn new(id: impl Into<TicketTypeId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            activities: BTreeSet::new(),
            attributes: AttributeSet::new(),
            category: None,
        }
    }

    pub fn with_activities<I, S>(mut self, activities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.activities = activities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeSet) -> Self {
        self.attributes = attributes;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaleState {
    #[default]
    Complete,
    Pending,
    Canceled,
}

/// A sold ticket / order position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Unique per snapshot, upper-case. `{order}-{position}` for providers
    /// without a native per-ticket reference.
    pub reference: String,
    pub order: String,
    /// Lower-case; empty when unassigned.
    #[serde(default)]
    pub email: String,
    /// Registered attendee name; empty when unassigned.
    #[serde(default)]
    pub name: String,
    pub ticket_type_id: TicketTypeId,
    #[serde(default)]
    pub state: SaleState,
    #[serde(default)]
    pub assigned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl Sale {
    pub fn new(
        reference: impl Into<String>,
        order: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        ticket_type_id: impl Into<TicketTypeId>,
    ) -> Self {
        Self {
            reference: reference.into(),
            order: order.into(),
            email: email.into(),
            name: name.into(),
            ticket_type_id: ticket_type_id.into(),
            state: SaleState::Complete,
            assigned: false,
            secret: None,
        }
        .normalized()
    }

    pub fn with_state(mut self, state: SaleState) -> Self {
        self.state = state;
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Applies the key normalization rules. Idempotent.
    pub fn normalized(mut self) -> Self {
        self.reference = self.reference.trim().to_uppercase();
        self.order = self.order.trim().to_uppercase();
        self.email = self.email.trim().to_lowercase();
        self.name = self.name.trim().to_string();
        self.assigned = !self.email.is_empty();
        self.secret = self
            .secret
            .map(|secret| secret.trim().to_string())
            .filter(|secret| !secret.is_empty());
        self
    }

    pub fn is_canceled(&self) -> bool {
        self.state == SaleState::Canceled
    }
}
