//! Offline provider serving a JSON fixture, used when no API token is
//! configured and in tests.
//!
//! ```json
//! {
//!   "ticket_id_kind": "reference",
//!   "attribute_source": "activity_tags",
//!   "ticket_types": [{"id": 1, "title": "Business", "activities": ["on_site"]}],
//!   "sales": [{"reference": "ABCD-1", "order": "ABCD", "name": "Sam Smith",
//!              "email": "sam@example.com", "ticket_type_id": 1}]
//! }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mapping::AttributeSource;
use serde::{Deserialize, Serialize};
use snapshot::{Sale, TicketType};
use tracing::debug;

use crate::error::BackendError;
use crate::provider::{TicketIdKind, TicketingBackend};

const PROVIDER: &str = "fixture";

fn default_attribute_source() -> AttributeSource {
    AttributeSource::ActivityTags
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub ticket_id_kind: TicketIdKind,
    #[serde(default = "default_attribute_source")]
    pub attribute_source: AttributeSource,
    #[serde(default)]
    pub ticket_types: Vec<TicketType>,
    #[serde(default)]
    pub sales: Vec<Sale>,
}

impl Default for FixtureData {
    fn default() -> Self {
        Self {
            ticket_id_kind: TicketIdKind::default(),
            attribute_source: default_attribute_source(),
            ticket_types: Vec::new(),
            sales: Vec::new(),
        }
    }
}

impl FixtureData {
    pub fn new(ticket_types: Vec<TicketType>, sales: Vec<Sale>) -> Self {
        Self {
            ticket_types,
            sales,
            ..Self::default()
        }
    }

    pub fn with_ticket_id_kind(mut self, kind: TicketIdKind) -> Self {
        self.ticket_id_kind = kind;
        self
    }

    pub fn with_attribute_source(mut self, source: AttributeSource) -> Self {
        self.attribute_source = source;
        self
    }

    fn parse(raw: &str, origin: &Path) -> Result<Self, BackendError> {
        let data: FixtureData = serde_json::from_str(raw)
            .map_err(|err| BackendError::Fixture(format!("{}: {err}", origin.display())))?;
        Ok(data.normalized())
    }

    fn normalized(mut self) -> Self {
        self.sales = self.sales.into_iter().map(Sale::normalized).collect();
        self
    }
}

#[derive(Debug, Clone)]
enum Source {
    /// Re-read on every call so edits show up on the next refresh.
    File(PathBuf),
    Inline(FixtureData),
}

#[derive(Debug, Clone)]
pub struct FixtureBackend {
    source: Source,
    ticket_id_kind: TicketIdKind,
    attribute_source: AttributeSource,
}

impl FixtureBackend {
    /// Loads the fixture once to validate it and read its settings.
    pub async fn from_path(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        let data = read_file(&path).await?;
        Ok(Self {
            ticket_id_kind: data.ticket_id_kind,
            attribute_source: data.attribute_source,
            source: Source::File(path),
        })
    }

    pub fn from_data(data: FixtureData) -> Self {
        let data = data.normalized();
        Self {
            ticket_id_kind: data.ticket_id_kind,
            attribute_source: data.attribute_source,
            source: Source::Inline(data),
        }
    }

    async fn data(&self) -> Result<FixtureData, BackendError> {
        match &self.source {
            Source::File(path) => read_file(path).await,
            Source::Inline(data) => Ok(data.clone()),
        }
    }

    async fn sales(&self) -> Result<Vec<Sale>, BackendError> {
        Ok(self.data().await?.sales)
    }
}

async fn read_file(path: &Path) -> Result<FixtureData, BackendError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| BackendError::Fixture(format!("{}: {err}", path.display())))?;
    FixtureData::parse(&raw, path)
}

#[async_trait]
impl TicketingBackend for FixtureBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn ticket_id_kind(&self) -> TicketIdKind {
        self.ticket_id_kind
    }

    fn attribute_source(&self) -> AttributeSource {
        self.attribute_source
    }

    async fn load_all_ticket_types(&self) -> Result<Vec<TicketType>, BackendError> {
        Ok(self.data().await?.ticket_types)
    }

    async fn load_all_tickets(&self) -> Result<Vec<Sale>, BackendError> {
        self.sales().await
    }

    async fn search_by_reference(&self, reference: &str) -> Result<Option<Sale>, BackendError> {
        let reference = reference.trim().to_uppercase();
        Ok(self
            .sales()
            .await?
            .into_iter()
            .find(|sale| sale.reference == reference))
    }

    async fn search_by_order(&self, order: &str) -> Result<Vec<Sale>, BackendError> {
        let order = order.trim().to_uppercase();
        Ok(self
            .sales()
            .await?
            .into_iter()
            .filter(|sale| sale.order == order)
            .collect())
    }

    async fn search_by_secret(&self, secret: &str) -> Result<Option<Sale>, BackendError> {
        let secret = secret.trim();
        Ok(self
            .sales()
            .await?
            .into_iter()
            .find(|sale| sale.secret.as_deref() == Some(secret)))
    }

    async fn search_by_free_text(&self, text: &str) -> Result<Vec<Sale>, BackendError> {
        let needle = text.trim().to_lowercase();
        let found: Vec<Sale> = self
            .sales()
            .await?
            .into_iter()
            .filter(|sale| {
                sale.email.contains(&needle) || sale.name.to_lowercase().contains(&needle)
            })
            .collect();
        debug!(results = found.len(), "fixture search");
        Ok(found)
    }
}
