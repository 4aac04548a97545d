use serde::{Deserialize, Serialize};
use snapshot::{Attribute, AttributeFlags, AttributeSet, Category, TicketType, TicketTypeId};
use tracing::debug;

use crate::config::MappingConfig;

const WEEKDAYS: [(&str, &str); 7] = [
    ("mon", "monday"),
    ("tue", "tuesday"),
    ("wed", "wednesday"),
    ("thu", "thursday"),
    ("fri", "friday"),
    ("sat", "saturday"),
    ("sun", "sunday"),
];

/// Which derivation path a provider's ticket types go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeSource {
    /// Category, id and title rules ([`AttributeMapper::derive_attributes`]).
    Rules,
    /// Title keywords and activity tags ([`AttributeMapper::derive_legacy`]).
    ActivityTags,
}

/// Accumulates flags from successive rules.
///
/// Only `true` entries are inserted. A rule that mentions `is_remote` or
/// `is_onsite` at all, even as `false`, counts as having decided access.
#[derive(Debug, Default)]
struct Accumulator {
    attributes: AttributeSet,
    access_decided: bool,
}

impl Accumulator {
    fn merge(&mut self, flags: &AttributeFlags) {
        self.attributes.merge_flags(flags);
        self.access_decided |= flags.contains_key(&Attribute::Remote)
            || flags.contains_key(&Attribute::Onsite);
    }
}

/// Derives role/access attributes for ticket types from configured rules.
#[derive(Debug, Clone, Default)]
pub struct AttributeMapper {
    config: MappingConfig,
}

impl AttributeMapper {
    pub fn new(config: MappingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Rule-based derivation, applied in order:
    ///
    /// 1. category id flags, else the first category-name pattern hit
    /// 2. per-ticket-type-id flags
    /// 3. every role keyword rule hitting the title
    /// 4. the first access keyword rule hitting the title
    /// 5. on-site with online access when no rule decided access
    ///
    /// Flags only accumulate; a later rule never clears an earlier one.
    pub fn derive_attributes(
        &self,
        ticket_type: &TicketType,
        category: Option<&Category>,
    ) -> AttributeSet {
        let mut acc = Accumulator::default();
        let title = ticket_type.title.to_lowercase();

        if let Some(category) = category {
            if let Some(flags) = self.config.categories.by_id.get(&category.id) {
                debug!(category = %category.id, "category id rule applied");
                acc.merge(flags);
            } else if !category.name.is_empty() {
                let name = category.name.to_lowercase();
                if let Some(rule) = self
                    .config
                    .categories
                    .by_name
                    .iter()
                    .find(|rule| name.contains(&rule.pattern.to_lowercase()))
                {
                    debug!(category = %category.name, pattern = %rule.pattern, "category name rule applied");
                    acc.merge(&rule.attributes);
                }
            }
        }

        if let Some(flags) = self.config.categories.by_ticket_id.get(&ticket_type.id) {
            acc.merge(flags);
        }

        for rule in &self.config.attendee_patterns {
            if rule.matches(&title) {
                debug!(ticket_type = %ticket_type.title, rule = %rule.name, "role pattern applied");
                acc.merge(&rule.attributes);
            }
        }

        if let Some(rule) = self
            .config
            .access_patterns
            .iter()
            .find(|rule| rule.matches(&title))
        {
            debug!(ticket_type = %ticket_type.title, rule = %rule.name, "access pattern applied");
            acc.merge(&rule.attributes);
        }

        if !acc.access_decided {
            acc.attributes.insert(Attribute::Onsite);
            acc.attributes.insert(Attribute::OnlineAccess);
        }

        acc.attributes
    }

    /// Tag-based derivation: title keyword rules plus flags mapped from the
    /// ticket type's activity tags. No access default is applied.
    pub fn derive_legacy(&self, ticket_type: &TicketType) -> AttributeSet {
        let mut acc = Accumulator::default();
        let title = ticket_type.title.to_lowercase();

        for rule in &self.config.legacy.title_keywords {
            if rule.matches(&title) {
                acc.merge(&rule.attributes);
            }
        }
        for activity in &ticket_type.activities {
            if let Some(flags) = self.config.legacy.activity_flags.get(activity) {
                acc.merge(flags);
            }
        }
        acc.attributes
    }

    /// Per-ticket-type-id flags, merged into an already resolved set.
    pub fn apply_ticket_override(&self, ticket_type_id: &TicketTypeId, attributes: &mut AttributeSet) {
        if let Some(flags) = self.config.categories.by_ticket_id.get(ticket_type_id) {
            attributes.merge_flags(flags);
        }
    }

    /// Fills in `attributes` (and, on the rule path, the legacy activity
    /// tags) of a freshly loaded ticket type.
    pub fn annotate(&self, mut ticket_type: TicketType, source: AttributeSource) -> TicketType {
        match source {
            AttributeSource::Rules => {
                let attributes = self.derive_attributes(&ticket_type, ticket_type.category.as_ref());
                ticket_type
                    .activities
                    .extend(activities_from_attributes(&attributes));
                if let Some(tag) = day_pass_tag(&ticket_type.title) {
                    ticket_type.activities.insert(tag);
                }
                ticket_type.attributes.union_with(&attributes);
            }
            AttributeSource::ActivityTags => {
                let attributes = self.derive_legacy(&ticket_type);
                ticket_type.attributes.union_with(&attributes);
            }
        }
        ticket_type
    }
}

/// Legacy activity tags for the access flags of `attributes`.
pub fn activities_from_attributes(attributes: &AttributeSet) -> Vec<String> {
    [
        (Attribute::Remote, "remote_sale"),
        (Attribute::Onsite, "on_site"),
        (Attribute::OnlineAccess, "online_access"),
    ]
    .into_iter()
    .filter(|(attribute, _)| attributes.contains(*attribute))
    .map(|(_, tag)| tag.to_string())
    .collect()
}

/// `seat-person-{weekday}` for titles containing "day pass" and a weekday
/// token, full or abbreviated.
pub fn day_pass_tag(title: &str) -> Option<String> {
    let title = title.to_lowercase();
    if !title.contains("day pass") {
        return None;
    }
    let tokens: Vec<&str> = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();
    WEEKDAYS
        .iter()
        .find(|(short, long)| tokens.iter().any(|token| token == short || token == long))
        .map(|(_, long)| format!("seat-person-{long}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{flags, NamePattern};
    use proptest::prelude::*;
    use snapshot::CategoryId;

    fn mapper() -> AttributeMapper {
        AttributeMapper::default()
    }

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: CategoryId::from(id),
            name: name.to_string(),
            internal_name: String::new(),
        }
    }

    fn has(set: &AttributeSet, attrs: &[Attribute]) -> bool {
        attrs.iter().all(|attr| set.contains(*attr))
    }

    #[test]
    fn online_title_is_remote() {
        let attrs = mapper().derive_attributes(&TicketType::new("1", "Individual (Online)"), None);
        assert!(has(&attrs, &[Attribute::Remote, Attribute::OnlineAccess]));
        assert!(!attrs.contains(Attribute::Onsite));
    }

    #[test]
    fn plain_title_defaults_to_onsite() {
        let attrs = mapper().derive_attributes(&TicketType::new("1", "Business"), None);
        assert_eq!(
            attrs,
            [Attribute::Onsite, Attribute::OnlineAccess].into_iter().collect()
        );
    }

    #[test]
    fn role_patterns_accumulate() {
        let attrs = mapper().derive_attributes(
            &TicketType::new("1", "Speaker & Sponsor Pass (In-Person)"),
            None,
        );
        assert!(has(
            &attrs,
            &[Attribute::Speaker, Attribute::Sponsor, Attribute::Onsite]
        ));
    }

    #[test]
    fn first_access_pattern_wins() {
        // Both "online" and "venue" occur; the remote rule comes first.
        let attrs = mapper().derive_attributes(&TicketType::new("1", "Online + Venue"), None);
        assert!(attrs.contains(Attribute::Remote));
        assert!(!attrs.contains(Attribute::Onsite));
    }

    #[test]
    fn category_id_takes_precedence_over_name() {
        let mut config = MappingConfig::default();
        config
            .categories
            .by_id
            .insert(CategoryId::from("7"), flags(&[Attribute::Volunteer]));
        config.categories.by_name.push(NamePattern {
            pattern: "crew".into(),
            attributes: flags(&[Attribute::Organizer]),
        });
        let mapper = AttributeMapper::new(config);
        let ticket = TicketType::new("1", "Helper");

        let by_id = mapper.derive_attributes(&ticket, Some(&category("7", "Crew")));
        assert!(by_id.contains(Attribute::Volunteer));
        assert!(!by_id.contains(Attribute::Organizer));

        let by_name = mapper.derive_attributes(&ticket, Some(&category("8", "Core CREW")));
        assert!(by_name.contains(Attribute::Organizer));
    }

    #[test]
    fn false_access_flag_still_decides_access() {
        let mut config = MappingConfig::default();
        let mut rule_flags = flags(&[Attribute::Sponsor]);
        rule_flags.insert(Attribute::Onsite, false);
        config.categories.by_name.push(NamePattern {
            pattern: "sponsor".into(),
            attributes: rule_flags,
        });
        let attrs = AttributeMapper::new(config)
            .derive_attributes(&TicketType::new("1", "Booth"), Some(&category("3", "Sponsors")));
        assert_eq!(attrs, [Attribute::Sponsor].into_iter().collect());
    }

    #[test]
    fn ticket_id_override_adds_flags() {
        let mut config = MappingConfig::default();
        config
            .categories
            .by_ticket_id
            .insert("42".into(), flags(&[Attribute::Guest]));
        let mapper = AttributeMapper::new(config);
        let attrs = mapper.derive_attributes(&TicketType::new("42", "Regular"), None);
        assert!(attrs.contains(Attribute::Guest));

        let mut resolved = AttributeSet::new();
        mapper.apply_ticket_override(&"42".into(), &mut resolved);
        assert!(resolved.contains(Attribute::Guest));
    }

    #[test]
    fn legacy_derivation_uses_titles_and_tags() {
        let ticket = TicketType::new("1", "Day Pass Monday (In-Person)")
            .with_activities(["on_site", "seat-person-monday", "online_access"]);
        let attrs = mapper().derive_legacy(&ticket);
        assert!(has(
            &attrs,
            &[Attribute::Sponsor, Attribute::Onsite, Attribute::OnlineAccess]
        ));
        assert!(!attrs.contains(Attribute::Remote));

        let organiser = TicketType::new("2", "Organiser").with_activities(["social_event"]);
        assert_eq!(
            mapper().derive_legacy(&organiser),
            [Attribute::Organizer].into_iter().collect()
        );
    }

    #[test]
    fn annotate_rule_path_adds_legacy_tags() {
        let ticket = mapper().annotate(
            TicketType::new("1", "Day Pass Tue (In-Person)"),
            AttributeSource::Rules,
        );
        assert!(ticket.activities.contains("on_site"));
        assert!(ticket.activities.contains("online_access"));
        assert!(ticket.activities.contains("seat-person-tuesday"));
        assert!(ticket.attributes.contains(Attribute::Onsite));
    }

    #[test]
    fn activities_for_access_flags() {
        let attrs: AttributeSet = [Attribute::Remote, Attribute::OnlineAccess, Attribute::Speaker]
            .into_iter()
            .collect();
        assert_eq!(activities_from_attributes(&attrs), vec!["remote_sale", "online_access"]);
        assert!(activities_from_attributes(&AttributeSet::new()).is_empty());
    }

    #[test]
    fn day_pass_weekday_tokens() {
        assert_eq!(day_pass_tag("Day Pass Monday").as_deref(), Some("seat-person-monday"));
        assert_eq!(day_pass_tag("DAY PASS WED (IN-PERSON)").as_deref(), Some("seat-person-wednesday"));
        assert_eq!(day_pass_tag("Day Pass"), None);
        assert_eq!(day_pass_tag("Monday Workshop"), None);
        // "sun" must be a whole token.
        assert_eq!(day_pass_tag("Day Pass Sunrise"), None);
    }

    fn title_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop::sample::select(vec![
                "speaker", "sponsor", "organiser", "volunteer", "vip", "online", "venue",
                "pass", "day", "monday", "business", "remote", "in-person",
            ]),
            0..6,
        )
        .prop_map(|words| words.join(" "))
    }

    proptest! {
        #[test]
        fn later_rules_never_clear_earlier_flags(title in title_strategy()) {
            let ticket = TicketType::new("1", title.clone());
            let full = mapper().derive_attributes(&ticket, None);

            // Role rules alone, without access rules or default.
            let mut roles_only = MappingConfig::default();
            roles_only.access_patterns.clear();
            let roles = AttributeMapper::new(roles_only).derive_attributes(&ticket, None);
            for attribute in roles.iter().filter(|a| !a.is_access()) {
                prop_assert!(full.contains(attribute), "{} lost for '{}'", attribute, title);
            }
            prop_assert!(full.contains(Attribute::Remote) || full.contains(Attribute::Onsite));
        }
    }
}
