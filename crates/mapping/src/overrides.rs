use serde::{Deserialize, Serialize};
use snapshot::{Attribute, AttributeFlags, AttributeSet};

use crate::config::flags;

/// Flags granted to a fixed list of ticket references, for people whose
/// ticket type does not tell the whole story (an organizer who also
/// speaks, a keynote speaker).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CombinationOverride {
    pub name: String,
    #[serde(default)]
    pub references: Vec<String>,
    /// When empty, the flags of the well-known list `name` are used.
    #[serde(default)]
    pub attributes: AttributeFlags,
}

impl CombinationOverride {
    pub fn new<R: Into<String>>(name: impl Into<String>, references: impl IntoIterator<Item = R>) -> Self {
        Self {
            name: name.into(),
            references: references.into_iter().map(Into::into).collect(),
            attributes: AttributeFlags::new(),
        }
    }

    pub fn effective_attributes(&self) -> AttributeFlags {
        if !self.attributes.is_empty() {
            return self.attributes.clone();
        }
        match self.name.as_str() {
            "organizer_and_speaker" => flags(&[Attribute::Organizer, Attribute::Speaker]),
            "organizer_and_sponsor" => flags(&[Attribute::Organizer, Attribute::Sponsor]),
            "speaker_and_sponsor" => flags(&[Attribute::Speaker, Attribute::Sponsor]),
            "speaker_add_keynote" => flags(&[Attribute::Speaker, Attribute::Keynote]),
            "add_speaker" => flags(&[Attribute::Speaker]),
            _ => AttributeFlags::new(),
        }
    }

    fn covers(&self, reference: &str) -> bool {
        self.references
            .iter()
            .any(|candidate| candidate.trim().eq_ignore_ascii_case(reference))
    }
}

/// Reference-level overrides applied after the ticket type's own
/// attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReferenceOverrides {
    #[serde(default)]
    pub combinations: Vec<CombinationOverride>,
    /// References that gain `is_speaker` only when already resolved as
    /// organizer.
    #[serde(default)]
    pub organizer_speakers: Vec<String>,
}

impl ReferenceOverrides {
    /// Merges every override covering `reference` into `attributes`.
    pub fn apply(&self, reference: &str, attributes: &mut AttributeSet) {
        let reference = reference.trim();
        for combination in &self.combinations {
            if combination.covers(reference) {
                attributes.merge_flags(&combination.effective_attributes());
            }
        }
        if attributes.contains(Attribute::Organizer)
            && self
                .organizer_speakers
                .iter()
                .any(|candidate| candidate.trim().eq_ignore_ascii_case(reference))
        {
            attributes.insert(Attribute::Speaker);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.organizer_speakers.is_empty()
            && self
                .combinations
                .iter()
                .all(|combination| combination.references.is_empty())
    }
}
