use std::time::Duration;

use backend::{BackendError, TicketIdKind};
use mapping::ReferenceOverrides;
use matching::NameThresholds;
use serde::{Deserialize, Serialize};
use snapshot::{AttributeSet, Sale, SnapshotError, TicketType, TicketTypeId};
use thiserror::Error;

/// Hint returned when an order code is unknown.
pub const INVALID_ORDER_HINT: &str = "Invalid order ID, must be five alphanumeric chars like 'HLL1H'";
/// Hint returned when a reference or secret resolves to nothing.
pub const INVALID_TICKET_HINT: &str = "invalid ticket id";
/// Hint returned when the order code and the ticket belong to different orders.
pub const MISMATCH_HINT: &str = "Order ID and ticket ID do not match";

const ORDER_CODE_LEN: usize = 5;
const MAX_SECRET_LEN: usize = 128;

/// Identity claim as submitted by a client.
///
/// Which fields are required depends on the combination; see
/// [`AttendeeClaim::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeClaim {
    #[serde(default, alias = "order_id", alias = "order_code")]
    pub order: Option<String>,
    /// A reference or a secret depending on the active provider.
    #[serde(default)]
    pub ticket_id: Option<String>,
    /// Always a reference, whatever the provider.
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl AttendeeClaim {
    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn with_ticket_id(mut self, ticket_id: impl Into<String>) -> Self {
        self.ticket_id = Some(ticket_id.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Checks the claim's shape and normalizes its fields.
    ///
    /// `kind` decides whether `ticket_id` is read as a reference or as a
    /// secret. A name may only be left out when both an order code and a
    /// secret are given.
    pub fn validate(&self, kind: TicketIdKind) -> Result<ValidatedClaim, ClaimError> {
        let order = present(&self.order).map(normalize_order).transpose()?;
        let email = present(&self.email).map(normalize_email).transpose()?;
        let name = present(&self.name).map(str::to_string);

        let ticket = match (present(&self.reference), present(&self.ticket_id)) {
            (Some(_), Some(_)) => return Err(ClaimError::ConflictingIdentifiers),
            (Some(reference), None) => Some(TicketKey::Reference(normalize_reference(reference)?)),
            (None, Some(ticket_id)) => Some(match kind {
                TicketIdKind::Reference => TicketKey::Reference(normalize_reference(ticket_id)?),
                TicketIdKind::Secret => TicketKey::Secret(normalize_secret(ticket_id)?),
            }),
            (None, None) => None,
        };

        if order.is_none() && ticket.is_none() && email.is_none() {
            return Err(ClaimError::MissingIdentifier);
        }
        let paired_secret = order.is_some() && matches!(ticket, Some(TicketKey::Secret(_)));
        if name.is_none() && !paired_secret {
            return Err(ClaimError::MissingName);
        }

        Ok(ValidatedClaim {
            order,
            ticket,
            email,
            name,
        })
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn normalize_order(order: &str) -> Result<String, ClaimError> {
    let order = order.to_uppercase();
    if order.len() != ORDER_CODE_LEN || !order.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ClaimError::InvalidOrder(order));
    }
    Ok(order)
}

/// `<alphanumeric order>-<position>`, e.g. `DROP-3` or `HLL1H-12`.
fn normalize_reference(reference: &str) -> Result<String, ClaimError> {
    let reference = reference.to_uppercase();
    let valid = match reference.rsplit_once('-') {
        Some((order, position)) => {
            (4..=ORDER_CODE_LEN).contains(&order.len())
                && order.chars().all(|c| c.is_ascii_alphanumeric())
                && !position.is_empty()
                && position.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    };
    if !valid {
        return Err(ClaimError::InvalidReference(reference));
    }
    Ok(reference)
}

fn normalize_secret(secret: &str) -> Result<String, ClaimError> {
    if secret.len() > MAX_SECRET_LEN || secret.chars().any(char::is_whitespace) {
        return Err(ClaimError::InvalidSecret);
    }
    Ok(secret.to_string())
}

/// Lower-cases and checks for a plausible `local@domain` shape.
pub fn normalize_email(email: &str) -> Result<String, ClaimError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ClaimError::InvalidEmail(email));
    }
    Ok(email)
}

/// How a claim points at a single ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketKey {
    Reference(String),
    Secret(String),
}

/// A claim that passed shape validation, with normalized fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedClaim {
    pub order: Option<String>,
    pub ticket: Option<TicketKey>,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Malformed claims, rejected before any lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Invalid order ID '{0}', must be five alphanumeric chars like 'HLL1H'")]
    InvalidOrder(String),
    #[error("Invalid ticket ID '{0}', must look like 'DROP-3'")]
    InvalidReference(String),
    #[error("Invalid ticket secret")]
    InvalidSecret,
    #[error("Invalid email address '{0}'")]
    InvalidEmail(String),
    #[error("Empty name, use full name e.g. Sam Smith")]
    MissingName,
    #[error("Either order_id, ticket_id or email must be provided")]
    MissingIdentifier,
    #[error("Provide either ticket_id or reference, not both")]
    ConflictingIdentifiers,
}

/// Terminal state of a validation that completed without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Accepted,
    NotFound,
    CloseNotExact,
    TypeOutOfScope,
    IdentifierMismatch,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Accepted => "accepted",
            Outcome::NotFound => "not_found",
            Outcome::CloseNotExact => "close_not_exact",
            Outcome::TypeOutOfScope => "type_out_of_scope",
            Outcome::IdentifierMismatch => "identifier_mismatch",
        }
    }

    /// HTTP status conventionally paired with this outcome.
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Accepted => 200,
            Outcome::NotFound => 404,
            Outcome::CloseNotExact | Outcome::TypeOutOfScope | Outcome::IdentifierMismatch => 406,
        }
    }
}

/// Result of validating one claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub outcome: Outcome,
    /// Empty on success.
    pub hint: String,
    /// Always empty unless accepted.
    pub attributes: AttributeSet,
    pub reference: Option<String>,
    pub order: Option<String>,
    pub name: Option<String>,
    pub ticket_type: Option<String>,
}

impl Verdict {
    pub(crate) fn accepted(sale: &Sale, ticket_type: &TicketType, attributes: AttributeSet) -> Self {
        Self {
            outcome: Outcome::Accepted,
            hint: String::new(),
            attributes,
            reference: Some(sale.reference.clone()),
            order: Some(sale.order.clone()),
            name: Some(sale.name.clone()),
            ticket_type: Some(ticket_type.title.clone()),
        }
    }

    pub(crate) fn rejected(outcome: Outcome, hint: impl Into<String>) -> Self {
        Self {
            outcome,
            hint: hint.into(),
            attributes: AttributeSet::new(),
            reference: None,
            order: None,
            name: None,
            ticket_type: None,
        }
    }

    pub fn is_attendee(&self) -> bool {
        self.outcome == Outcome::Accepted
    }
}

/// Summary of a completed refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub provider: &'static str,
    pub generation: u64,
    pub sales: usize,
    pub ticket_types: usize,
    /// Ticket types dropped by title exclusion patterns.
    pub excluded_ticket_types: usize,
    /// Canceled sales and sales of excluded types.
    pub dropped_sales: usize,
    pub elapsed_ms: u64,
}

/// Tunables of the validation engine.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    pub thresholds: NameThresholds,
    /// Case-insensitive title substrings; matching ticket types are
    /// dropped at refresh.
    pub exclude_ticket_patterns: Vec<String>,
    pub overrides: ReferenceOverrides,
    /// Bound on each live search and on each refresh fetch.
    pub upstream_timeout: Duration,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            thresholds: NameThresholds::default(),
            exclude_ticket_patterns: Vec::new(),
            overrides: ReferenceOverrides::default(),
            upstream_timeout: Duration::from_secs(15),
        }
    }
}

impl ValidationPolicy {
    pub fn with_thresholds(mut self, thresholds: NameThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_exclude_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_ticket_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_overrides(mut self, overrides: ReferenceOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    pub(crate) fn excludes(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.exclude_ticket_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && title.contains(&pattern.to_lowercase()))
    }
}

/// Failures that are not an answer about the claim.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid claim: {0}")]
    Claim(#[from] ClaimError),
    #[error("upstream {provider} unavailable during {operation}: {source}")]
    UpstreamUnavailable {
        provider: &'static str,
        operation: &'static str,
        #[source]
        source: BackendError,
    },
    #[error("upstream {provider} timed out after {timeout:?} during {operation}")]
    UpstreamTimeout {
        provider: &'static str,
        operation: &'static str,
        timeout: Duration,
    },
    #[error("ticket {reference} references unknown ticket type {ticket_type_id}")]
    InternalInconsistency {
        reference: String,
        ticket_type_id: TicketTypeId,
    },
    #[error("snapshot rejected: {0}")]
    Snapshot(#[from] SnapshotError),
}
