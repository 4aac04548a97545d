//! Tito adapter: tickets carry their own reference, ticket types
//! ("releases") carry activity tags.

use async_trait::async_trait;
use mapping::AttributeSource;
use serde::Deserialize;
use snapshot::{ProviderId, Sale, SaleState, TicketType};
use tracing::{debug, info};

use crate::error::BackendError;
use crate::http::{ApiClient, HttpSettings};
use crate::provider::{TicketIdKind, TicketingBackend};

pub const TITO_API_URL: &str = "https://api.tito.io/v3";

const PROVIDER: &str = "tito";

#[derive(Debug, Clone)]
pub struct TitoConfig {
    pub account_slug: String,
    pub event_slug: String,
    pub http: HttpSettings,
}

impl TitoConfig {
    pub fn new(account_slug: impl Into<String>, event_slug: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            account_slug: account_slug.into(),
            event_slug: event_slug.into(),
            http: HttpSettings::new(TITO_API_URL, token),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    #[serde(default)]
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TicketsPage {
    tickets: Vec<TitoTicket>,
    #[serde(default)]
    meta: PageMeta,
}

#[derive(Debug, Deserialize)]
struct TitoTicket {
    reference: String,
    #[serde(default)]
    registration_reference: Option<String>,
    release_id: ProviderId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl TitoTicket {
    fn into_sale(self) -> Sale {
        let order = self
            .registration_reference
            .filter(|order| !order.trim().is_empty())
            .unwrap_or_else(|| order_of(&self.reference).to_string());
        let name = match self.name.filter(|name| !name.trim().is_empty()) {
            Some(name) => name,
            None => [self.first_name, self.last_name]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" "),
        };
        let state = match self.state.as_deref() {
            Some("void" | "canceled" | "cancelled") => SaleState::Canceled,
            Some("incomplete" | "pending") => SaleState::Pending,
            _ => SaleState::Complete,
        };
        Sale::new(
            self.reference,
            order,
            name,
            self.email.unwrap_or_default(),
            self.release_id,
        )
        .with_state(state)
    }
}

#[derive(Debug, Deserialize)]
struct ReleasesPage {
    releases: Vec<TitoRelease>,
    #[serde(default)]
    meta: PageMeta,
}

#[derive(Debug, Deserialize)]
struct TitoRelease {
    id: ProviderId,
    title: String,
    #[serde(default)]
    activities: Vec<TitoActivity>,
}

#[derive(Debug, Deserialize)]
struct TitoActivity {
    name: String,
}

/// Order code of a reference: everything before the last `-`.
fn order_of(reference: &str) -> &str {
    reference
        .rsplit_once('-')
        .map(|(order, _)| order)
        .unwrap_or(reference)
}

#[derive(Debug, Clone)]
pub struct TitoBackend {
    client: ApiClient,
    event_path: String,
}

impl TitoBackend {
    pub fn new(config: TitoConfig) -> Result<Self, BackendError> {
        if config.account_slug.is_empty() || config.event_slug.is_empty() {
            return Err(BackendError::Config(
                "tito requires an account slug and an event slug".into(),
            ));
        }
        let authorization = format!("Token token={}", config.http.token);
        Ok(Self {
            client: ApiClient::new(PROVIDER, &config.http, authorization)?,
            event_path: format!("{}/{}", config.account_slug, config.event_slug),
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<Sale>, BackendError> {
        let page: TicketsPage = self
            .client
            .get_json(
                &format!("{}/tickets", self.event_path),
                &[("search[q]", query.trim().to_string())],
            )
            .await?;
        debug!(query, results = page.tickets.len(), "tito search");
        Ok(page.tickets.into_iter().map(TitoTicket::into_sale).collect())
    }
}

/// Follows `meta.next_page` until it runs out or stops advancing.
fn next_page(meta: &PageMeta, current: u32) -> Option<u32> {
    meta.next_page.filter(|next| *next > current)
}

#[async_trait]
impl TicketingBackend for TitoBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn ticket_id_kind(&self) -> TicketIdKind {
        TicketIdKind::Reference
    }

    fn attribute_source(&self) -> AttributeSource {
        AttributeSource::ActivityTags
    }

    async fn load_all_ticket_types(&self) -> Result<Vec<TicketType>, BackendError> {
        let path = format!("{}/releases", self.event_path);
        let mut collected = Vec::new();
        let mut page = 1;
        loop {
            info!(page, "loading tito releases");
            let body: ReleasesPage = self
                .client
                .get_json(
                    &path,
                    &[
                        ("expand", "activities".to_string()),
                        ("version", "3.1".to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            collected.extend(body.releases.into_iter().map(|release| {
                TicketType::new(release.id, release.title)
                    .with_activities(release.activities.into_iter().map(|a| a.name))
            }));
            match next_page(&body.meta, page) {
                Some(next) => page = next,
                None => break,
            }
        }
        Ok(collected)
    }

    async fn load_all_tickets(&self) -> Result<Vec<Sale>, BackendError> {
        let path = format!("{}/tickets", self.event_path);
        let mut collected = Vec::new();
        let mut page = 1;
        loop {
            info!(page, "loading tito tickets");
            let body: TicketsPage = self
                .client
                .get_json(&path, &[("page", page.to_string())])
                .await?;
            collected.extend(body.tickets.into_iter().map(TitoTicket::into_sale));
            match next_page(&body.meta, page) {
                Some(next) => page = next,
                None => break,
            }
        }
        Ok(collected)
    }

    async fn search_by_reference(&self, reference: &str) -> Result<Option<Sale>, BackendError> {
        let reference = reference.trim().to_uppercase();
        Ok(self
            .search(&reference)
            .await?
            .into_iter()
            .find(|sale| sale.reference == reference))
    }

    async fn search_by_order(&self, order: &str) -> Result<Vec<Sale>, BackendError> {
        let order = order.trim().to_uppercase();
        Ok(self
            .search(&order)
            .await?
            .into_iter()
            .filter(|sale| sale.order == order)
            .collect())
    }

    async fn search_by_secret(&self, _secret: &str) -> Result<Option<Sale>, BackendError> {
        Err(BackendError::Unsupported {
            provider: PROVIDER,
            operation: "secret lookup",
        })
    }

    async fn search_by_free_text(&self, text: &str) -> Result<Vec<Sale>, BackendError> {
        self.search(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_reference_prefix() {
        assert_eq!(order_of("ABCD-12"), "ABCD");
        assert_eq!(order_of("NODASH"), "NODASH");
    }

    #[test]
    fn ticket_name_falls_back_to_parts() {
        let ticket: TitoTicket = serde_json::from_value(serde_json::json!({
            "reference": "abcd-1",
            "release_id": 1478124,
            "first_name": "Sam",
            "last_name": "Smith",
            "email": "Sam@Example.com",
            "state": "complete"
        }))
        .unwrap();
        let sale = ticket.into_sale();
        assert_eq!(sale.reference, "ABCD-1");
        assert_eq!(sale.order, "ABCD");
        assert_eq!(sale.name, "Sam Smith");
        assert_eq!(sale.email, "sam@example.com");
        assert_eq!(sale.ticket_type_id.as_str(), "1478124");
    }

    #[test]
    fn void_ticket_is_canceled() {
        let ticket: TitoTicket = serde_json::from_value(serde_json::json!({
            "reference": "ABCD-2",
            "registration_reference": "ABCD",
            "release_id": "7",
            "state": "void"
        }))
        .unwrap();
        assert_eq!(ticket.into_sale().state, SaleState::Canceled);
    }

    #[test]
    fn missing_slugs_rejected() {
        let err = TitoBackend::new(TitoConfig::new("", "event", "token")).unwrap_err();
        assert!(matches!(err, BackendError::Config(_)));
    }
}
