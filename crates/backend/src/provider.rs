use async_trait::async_trait;
use mapping::AttributeSource;
use serde::{Deserialize, Serialize};
use snapshot::{Sale, TicketType};

use crate::error::BackendError;

/// What the claim's `ticket_id` field means for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketIdKind {
    /// The per-ticket reference (`ABCD-1`).
    #[default]
    Reference,
    /// The ticket secret printed in the QR code.
    Secret,
}

/// A ticketing provider.
///
/// `load_all_*` feed snapshot refreshes; `search_*` are live lookups used
/// when the snapshot misses. Live results may include canceled sales and
/// are filtered by the caller.
#[async_trait]
pub trait TicketingBackend: Send + Sync {
    /// Short provider name used in logs and metrics.
    fn name(&self) -> &'static str;

    fn ticket_id_kind(&self) -> TicketIdKind;

    /// How this provider's ticket types turn into attributes.
    fn attribute_source(&self) -> AttributeSource;

    /// Every ticket type with its category attached; attributes not yet
    /// derived.
    async fn load_all_ticket_types(&self) -> Result<Vec<TicketType>, BackendError>;

    /// Every sale, canceled ones included.
    async fn load_all_tickets(&self) -> Result<Vec<Sale>, BackendError>;

    async fn search_by_reference(&self, reference: &str) -> Result<Option<Sale>, BackendError>;

    async fn search_by_order(&self, order: &str) -> Result<Vec<Sale>, BackendError>;

    async fn search_by_secret(&self, secret: &str) -> Result<Option<Sale>, BackendError>;

    /// Provider-side fuzzy search (email or name).
    async fn search_by_free_text(&self, text: &str) -> Result<Vec<Sale>, BackendError>;
}
