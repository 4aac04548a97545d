//! Startup report of how the configured rules cover the loaded ticket
//! types. Purely diagnostic: nothing here changes validation behavior.

use std::collections::BTreeMap;

use serde::Serialize;
use snapshot::{Attribute, AttributeSet, TicketType};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AttributeCoverage {
    pub count: usize,
    pub ticket_types: Vec<String>,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CoverageReport {
    pub total_ticket_types: usize,
    pub attributes: BTreeMap<Attribute, AttributeCoverage>,
    /// Role attributes no ticket type grants.
    pub unmapped_attributes: Vec<Attribute>,
    /// Ticket types that only received the access default, or nothing.
    pub unmapped_ticket_types: Vec<String>,
}

impl CoverageReport {
    /// Builds the report from ticket types whose attributes are already
    /// derived.
    pub fn compute(ticket_types: &[TicketType]) -> Self {
        let total = ticket_types.len();
        let default_only: AttributeSet = [Attribute::Onsite, Attribute::OnlineAccess]
            .into_iter()
            .collect();

        let mut attributes = BTreeMap::new();
        for attribute in reportable() {
            let titles: Vec<String> = ticket_types
                .iter()
                .filter(|ticket_type| ticket_type.attributes.contains(attribute))
                .map(|ticket_type| ticket_type.title.clone())
                .collect();
            let percentage = if total > 0 {
                titles.len() as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            attributes.insert(
                attribute,
                AttributeCoverage {
                    count: titles.len(),
                    ticket_types: titles,
                    percentage,
                },
            );
        }

        let unmapped_attributes = attributes
            .iter()
            .filter(|(attribute, coverage)| coverage.count == 0 && !attribute.is_access())
            .map(|(attribute, _)| *attribute)
            .collect();

        let unmapped_ticket_types = ticket_types
            .iter()
            .filter(|ticket_type| {
                ticket_type.attributes.is_empty() || ticket_type.attributes == default_only
            })
            .map(|ticket_type| ticket_type.title.clone())
            .collect();

        Self {
            total_ticket_types: total,
            attributes,
            unmapped_attributes,
            unmapped_ticket_types,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.unmapped_attributes.is_empty()
    }

    /// Emits the report through `tracing`; zero-coverage roles are warnings.
    pub fn log(&self) {
        info!(
            total_ticket_types = self.total_ticket_types,
            unmapped_ticket_types = self.unmapped_ticket_types.len(),
            "attribute coverage computed"
        );
        for (attribute, coverage) in &self.attributes {
            info!(
                attribute = %attribute,
                count = coverage.count,
                percentage = coverage.percentage,
                "attribute coverage"
            );
        }
        for attribute in &self.unmapped_attributes {
            warn!(attribute = %attribute, "no ticket type grants this attribute; check the mapping configuration");
        }
        if !self.unmapped_ticket_types.is_empty() {
            warn!(
                ticket_types = ?self.unmapped_ticket_types,
                "ticket types matched no mapping rule"
            );
        }
    }
}

/// Keynote is only granted by reference overrides, never by ticket type.
fn reportable() -> impl Iterator<Item = Attribute> {
    Attribute::ALL
        .into_iter()
        .filter(|attribute| *attribute != Attribute::Keynote)
}
