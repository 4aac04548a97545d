//! Pretix adapter: sales are order positions without a reference of their
//! own, ticket types ("items") are grouped into categories.

use std::collections::BTreeMap;

use async_trait::async_trait;
use mapping::AttributeSource;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use snapshot::{Category, ProviderId, Sale, SaleState, TicketType};
use tracing::{debug, info};

use crate::error::BackendError;
use crate::http::{ApiClient, HttpSettings};
use crate::provider::{TicketIdKind, TicketingBackend};

pub const PRETIX_API_URL: &str = "https://pretix.eu/api/v1";

const PROVIDER: &str = "pretix";

#[derive(Debug, Clone)]
pub struct PretixConfig {
    pub organizer_slug: String,
    pub event_slug: String,
    pub http: HttpSettings,
}

impl PretixConfig {
    pub fn new(
        organizer_slug: impl Into<String>,
        event_slug: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            organizer_slug: organizer_slug.into(),
            event_slug: event_slug.into(),
            http: HttpSettings::new(PRETIX_API_URL, token),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct Paged<T> {
    results: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

/// Plain string or a language → text map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LocalizedText {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl LocalizedText {
    fn resolve(self) -> String {
        match self {
            LocalizedText::Plain(text) => text,
            LocalizedText::Localized(mut texts) => texts
                .remove("en")
                .or_else(|| texts.into_values().next())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PretixCategory {
    id: ProviderId,
    name: LocalizedText,
    #[serde(default)]
    internal_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PretixItem {
    id: ProviderId,
    name: LocalizedText,
    #[serde(default)]
    category: Option<ProviderId>,
}

#[derive(Debug, Deserialize)]
struct PretixOrder {
    status: String,
    #[serde(default)]
    positions: Vec<PretixPosition>,
}

#[derive(Debug, Deserialize)]
struct PretixPosition {
    order: String,
    positionid: u32,
    item: ProviderId,
    #[serde(default)]
    attendee_name: Option<String>,
    #[serde(default)]
    attendee_email: Option<String>,
    #[serde(default)]
    secret: Option<String>,
    #[serde(default)]
    canceled: bool,
    /// Status of the owning order, present on position search results.
    #[serde(default, rename = "order__status")]
    order_status: Option<String>,
}

impl PretixPosition {
    fn into_sale(self, order_state: SaleState) -> Sale {
        let state = if self.canceled {
            SaleState::Canceled
        } else {
            order_state
        };
        let mut sale = Sale::new(
            format!("{}-{}", self.order, self.positionid),
            self.order,
            self.attendee_name.unwrap_or_default(),
            self.attendee_email.unwrap_or_default(),
            self.item,
        )
        .with_state(state);
        if let Some(secret) = self.secret {
            sale = sale.with_secret(secret).normalized();
        }
        sale
    }
}

/// Pretix order status codes: `c` canceled, `n` pending; paid and expired
/// orders are treated as complete.
fn order_state(status: &str) -> SaleState {
    match status {
        "c" => SaleState::Canceled,
        "n" => SaleState::Pending,
        _ => SaleState::Complete,
    }
}

#[derive(Debug, Clone)]
pub struct PretixBackend {
    client: ApiClient,
    event_path: String,
}

impl PretixBackend {
    pub fn new(config: PretixConfig) -> Result<Self, BackendError> {
        if config.organizer_slug.is_empty() || config.event_slug.is_empty() {
            return Err(BackendError::Config(
                "pretix requires an organizer slug and an event slug".into(),
            ));
        }
        let authorization = format!("Token {}", config.http.token);
        Ok(Self {
            client: ApiClient::new(PROVIDER, &config.http, authorization)?,
            event_path: format!(
                "organizers/{}/events/{}",
                config.organizer_slug, config.event_slug
            ),
        })
    }

    /// Collects every page of a paginated collection.
    async fn fetch_all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, BackendError> {
        let path = format!("{}/{collection}/", self.event_path);
        let mut collected = Vec::new();
        let mut page: u32 = 1;
        loop {
            info!(collection, page, "loading pretix page");
            let body: Paged<T> = self
                .client
                .get_json(&path, &[("page", page.to_string())])
                .await?;
            collected.extend(body.results);
            if body.next.is_none() {
                break;
            }
            page += 1;
        }
        Ok(collected)
    }

    async fn positions(&self, filter: &str, value: &str) -> Result<Vec<Sale>, BackendError> {
        let body: Paged<PretixPosition> = self
            .client
            .get_json(
                &format!("{}/orderpositions/", self.event_path),
                &[(filter, value.to_string())],
            )
            .await?;
        debug!(filter, results = body.results.len(), "pretix position search");
        Ok(body
            .results
            .into_iter()
            .map(|position| {
                let state = position
                    .order_status
                    .as_deref()
                    .map_or(SaleState::Complete, order_state);
                position.into_sale(state)
            })
            .collect())
    }

    async fn categories(&self) -> Result<BTreeMap<ProviderId, Category>, BackendError> {
        let categories: Vec<PretixCategory> = self.fetch_all("categories").await?;
        Ok(categories
            .into_iter()
            .map(|category| {
                let id = category.id.clone();
                (
                    id,
                    Category {
                        id: category.id,
                        name: category.name.resolve(),
                        internal_name: category.internal_name.unwrap_or_default(),
                    },
                )
            })
            .collect())
    }
}

#[async_trait]
impl TicketingBackend for PretixBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn ticket_id_kind(&self) -> TicketIdKind {
        TicketIdKind::Secret
    }

    fn attribute_source(&self) -> AttributeSource {
        AttributeSource::Rules
    }

    async fn load_all_ticket_types(&self) -> Result<Vec<TicketType>, BackendError> {
        let categories = self.categories().await?;
        let items: Vec<PretixItem> = self.fetch_all("items").await?;
        Ok(items
            .into_iter()
            .map(|item| {
                let category = item
                    .category
                    .as_ref()
                    .and_then(|id| categories.get(id))
                    .cloned();
                let ticket_type = TicketType::new(item.id, item.name.resolve());
                match category {
                    Some(category) => ticket_type.with_category(category),
                    None => ticket_type,
                }
            })
            .collect())
    }

    async fn load_all_tickets(&self) -> Result<Vec<Sale>, BackendError> {
        let orders: Vec<PretixOrder> = self.fetch_all("orders").await?;
        Ok(orders
            .into_iter()
            .flat_map(|order| {
                let state = order_state(&order.status);
                order
                    .positions
                    .into_iter()
                    .map(move |position| position.into_sale(state))
            })
            .collect())
    }

    async fn search_by_reference(&self, reference: &str) -> Result<Option<Sale>, BackendError> {
        let reference = reference.trim().to_uppercase();
        let Some((order, _)) = reference.rsplit_once('-') else {
            debug!(reference = %reference, "reference has no position suffix");
            return Ok(None);
        };
        Ok(self
            .positions("order__code", order)
            .await?
            .into_iter()
            .find(|sale| sale.reference == reference))
    }

    async fn search_by_order(&self, order: &str) -> Result<Vec<Sale>, BackendError> {
        self.positions("order__code", &order.trim().to_uppercase())
            .await
    }

    async fn search_by_secret(&self, secret: &str) -> Result<Option<Sale>, BackendError> {
        let secret = secret.trim();
        Ok(self
            .positions("secret", secret)
            .await?
            .into_iter()
            .find(|sale| sale.secret.as_deref() == Some(secret)))
    }

    async fn search_by_free_text(&self, text: &str) -> Result<Vec<Sale>, BackendError> {
        let text = text.trim();
        let by_email = self.positions("attendee_email__icontains", text).await?;
        if !by_email.is_empty() {
            return Ok(by_email);
        }
        self.positions("attendee_name__icontains", text).await
    }
}
