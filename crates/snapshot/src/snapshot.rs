use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hashbrown::{HashMap, HashSet};
use matching::normalize_name;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::SnapshotError;
use crate::types::{Sale, TicketType, TicketTypeId};

/// Activity tags that put a ticket type in scope when no allow-list is
/// configured.
pub const DEFAULT_INCLUDE_ACTIVITIES: [&str; 3] = ["on_site", "remote_sale", "online_access"];

/// Immutable view of every sale and ticket type of one event.
///
/// The raw collections are fixed at construction. Lookup indices are
/// derived on first use and cached inside the snapshot, so they can never
/// outlive the data they were built from: a refresh installs a whole new
/// `Snapshot` and the old indices go away with the old value.
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    loaded_at: DateTime<Utc>,
    include_activities: Arc<BTreeSet<String>>,
    /// Sorted by reference.
    sales: Vec<Sale>,
    /// In provider order.
    ticket_types: Vec<TicketType>,
    by_reference: HashMap<String, usize>,
    /// Ticket types removed from this snapshot by exclusion patterns.
    excluded_ticket_types: HashSet<TicketTypeId>,

    ticket_type_by_id: OnceCell<HashMap<TicketTypeId, usize>>,
    valid_ticket_type_ids: OnceCell<HashSet<TicketTypeId>>,
    order_to_sales: OnceCell<HashMap<String, Vec<usize>>>,
    email_to_sales: OnceCell<HashMap<String, Vec<usize>>>,
    order_name_to_sale: OnceCell<HashMap<(String, String), usize>>,
    secret_to_sale: OnceCell<HashMap<String, usize>>,
}

impl Snapshot {
    /// Snapshot with no sales and no ticket types, served before the first
    /// successful refresh.
    pub fn empty(include_activities: Arc<BTreeSet<String>>) -> Self {
        Self::assemble(0, include_activities, Vec::new(), Vec::new(), HashMap::new())
    }

    /// Validates and assembles a snapshot.
    ///
    /// Canceled sales are dropped here so no index can ever contain them.
    /// Duplicate ticket-type titles (case-insensitive), duplicate
    /// ticket-type ids and duplicate sale references are rejected.
    pub fn build(
        generation: u64,
        include_activities: Arc<BTreeSet<String>>,
        sales: Vec<Sale>,
        ticket_types: Vec<TicketType>,
    ) -> Result<Self, SnapshotError> {
        let mut titles = HashSet::with_capacity(ticket_types.len());
        let mut ids = HashSet::with_capacity(ticket_types.len());
        for ticket_type in &ticket_types {
            if !titles.insert(ticket_type.title.trim().to_lowercase()) {
                return Err(SnapshotError::DuplicateTitle {
                    title: ticket_type.title.clone(),
                });
            }
            if !ids.insert(ticket_type.id.clone()) {
                return Err(SnapshotError::DuplicateTicketTypeId {
                    id: ticket_type.id.to_string(),
                });
            }
        }

        let total = sales.len();
        let mut sales: Vec<Sale> = sales
            .into_iter()
            .map(Sale::normalized)
            .filter(|sale| !sale.is_canceled())
            .collect();
        sales.sort_by(|a, b| a.reference.cmp(&b.reference));

        let mut by_reference = HashMap::with_capacity(sales.len());
        for (position, sale) in sales.iter().enumerate() {
            if by_reference.insert(sale.reference.clone(), position).is_some() {
                return Err(SnapshotError::DuplicateReference {
                    reference: sale.reference.clone(),
                });
            }
        }

        debug!(
            generation,
            sales = sales.len(),
            canceled = total - sales.len(),
            ticket_types = ticket_types.len(),
            "snapshot assembled"
        );

        Ok(Self::assemble(
            generation,
            include_activities,
            sales,
            ticket_types,
            by_reference,
        ))
    }

    fn assemble(
        generation: u64,
        include_activities: Arc<BTreeSet<String>>,
        sales: Vec<Sale>,
        ticket_types: Vec<TicketType>,
        by_reference: HashMap<String, usize>,
    ) -> Self {
        Self {
            generation,
            loaded_at: Utc::now(),
            include_activities,
            sales,
            ticket_types,
            by_reference,
            excluded_ticket_types: HashSet::new(),
            ticket_type_by_id: OnceCell::new(),
            valid_ticket_type_ids: OnceCell::new(),
            order_to_sales: OnceCell::new(),
            email_to_sales: OnceCell::new(),
            order_name_to_sale: OnceCell::new(),
            secret_to_sale: OnceCell::new(),
        }
    }

    /// Records the ticket types left out of this snapshot, so live search
    /// results can be held against the same view as the indices.
    pub fn with_excluded_ticket_types<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = TicketTypeId>,
    {
        self.excluded_ticket_types = ids.into_iter().collect();
        self
    }

    pub fn is_excluded_ticket_type(&self, id: &TicketTypeId) -> bool {
        self.excluded_ticket_types.contains(id)
    }

    /// Monotonic counter assigned by the store; `0` for the initial empty
    /// snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn include_activities(&self) -> &BTreeSet<String> {
        &self.include_activities
    }

    pub fn sales(&self) -> &[Sale] {
        &self.sales
    }

    pub fn ticket_types(&self) -> &[TicketType] {
        &self.ticket_types
    }

    pub fn sale_count(&self) -> usize {
        self.sales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.is_empty() && self.ticket_types.is_empty()
    }

    /// Direct lookup by (upper-cased) reference.
    pub fn find_by_reference(&self, reference: &str) -> Option<&Sale> {
        self.by_reference
            .get(reference.trim().to_uppercase().as_str())
            .map(|&position| &self.sales[position])
    }

    pub fn get_ticket_type(&self, id: &TicketTypeId) -> Option<&TicketType> {
        self.ticket_type_index()
            .get(id)
            .map(|&position| &self.ticket_types[position])
    }

    /// Whether the type's activities intersect the in-scope allow-list.
    pub fn is_valid_ticket_type(&self, id: &TicketTypeId) -> bool {
        self.valid_ticket_type_ids
            .get_or_init(|| {
                let valid: HashSet<TicketTypeId> = self
                    .ticket_types
                    .iter()
                    .filter(|ticket_type| {
                        ticket_type
                            .activities
                            .iter()
                            .any(|activity| self.include_activities.contains(activity))
                    })
                    .map(|ticket_type| ticket_type.id.clone())
                    .collect();
                debug!(
                    generation = self.generation,
                    valid = valid.len(),
                    "valid ticket type index built"
                );
                valid
            })
            .contains(id)
    }

    /// All positions of an order, sorted by reference. Empty if unknown.
    pub fn find_by_order(&self, order: &str) -> Vec<&Sale> {
        let index = self.order_to_sales.get_or_init(|| {
            let mut index: HashMap<String, Vec<usize>> = HashMap::new();
            for (position, sale) in self.sales.iter().enumerate() {
                index.entry(sale.order.clone()).or_default().push(position);
            }
            debug!(generation = self.generation, orders = index.len(), "order index built");
            index
        });
        self.resolve_many(index.get(order.trim().to_uppercase().as_str()))
    }

    /// Sales assigned to `email` (compared lower-cased). Unassigned sales
    /// are not indexed.
    pub fn find_by_email(&self, email: &str) -> Vec<&Sale> {
        let index = self.email_to_sales.get_or_init(|| {
            let mut index: HashMap<String, Vec<usize>> = HashMap::new();
            for (position, sale) in self.sales.iter().enumerate() {
                if !sale.email.is_empty() {
                    index.entry(sale.email.clone()).or_default().push(position);
                }
            }
            debug!(generation = self.generation, emails = index.len(), "email index built");
            index
        });
        self.resolve_many(index.get(email.trim().to_lowercase().as_str()))
    }

    /// Exact lookup on (order, normalized name). When two positions of the
    /// same order carry the same name, one of an in-scope ticket type wins,
    /// then the lowest reference.
    pub fn find_by_order_and_name(&self, order: &str, name: &str) -> Option<&Sale> {
        let index = self.order_name_to_sale.get_or_init(|| {
            let mut index: HashMap<(String, String), usize> =
                HashMap::with_capacity(self.sales.len());
            for (position, sale) in self.sales.iter().enumerate() {
                if sale.name.is_empty() {
                    continue;
                }
                let slot = index
                    .entry((sale.order.clone(), normalize_name(&sale.name)))
                    .or_insert(position);
                let held = &self.sales[*slot];
                if !self.is_valid_ticket_type(&held.ticket_type_id)
                    && self.is_valid_ticket_type(&sale.ticket_type_id)
                {
                    *slot = position;
                }
            }
            debug!(
                generation = self.generation,
                entries = index.len(),
                "order/name index built"
            );
            index
        });
        let key = (order.trim().to_uppercase(), normalize_name(name));
        index.get(&key).map(|&position| &self.sales[position])
    }

    pub fn find_by_secret(&self, secret: &str) -> Option<&Sale> {
        let index = self.secret_to_sale.get_or_init(|| {
            let index: HashMap<String, usize> = self
                .sales
                .iter()
                .enumerate()
                .filter_map(|(position, sale)| {
                    sale.secret.as_ref().map(|secret| (secret.clone(), position))
                })
                .collect();
            debug!(generation = self.generation, secrets = index.len(), "secret index built");
            index
        });
        index
            .get(secret.trim())
            .map(|&position| &self.sales[position])
    }

    /// Number of lazily derived indices built so far.
    pub fn built_index_count(&self) -> usize {
        [
            self.ticket_type_by_id.get().is_some(),
            self.valid_ticket_type_ids.get().is_some(),
            self.order_to_sales.get().is_some(),
            self.email_to_sales.get().is_some(),
            self.order_name_to_sale.get().is_some(),
            self.secret_to_sale.get().is_some(),
        ]
        .into_iter()
        .filter(|built| *built)
        .count()
    }

    fn ticket_type_index(&self) -> &HashMap<TicketTypeId, usize> {
        self.ticket_type_by_id.get_or_init(|| {
            self.ticket_types
                .iter()
                .enumerate()
                .map(|(position, ticket_type)| (ticket_type.id.clone(), position))
                .collect()
        })
    }

    fn resolve_many(&self, positions: Option<&Vec<usize>>) -> Vec<&Sale> {
        positions
            .map(|positions| positions.iter().map(|&p| &self.sales[p]).collect())
            .unwrap_or_default()
    }
}
