use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::info;

use crate::error::SnapshotError;
use crate::snapshot::{Snapshot, DEFAULT_INCLUDE_ACTIVITIES};
use crate::types::{Sale, TicketType, TicketTypeId};

/// Counts reported after a snapshot swap.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SnapshotStats {
    pub generation: u64,
    pub sales: usize,
    pub ticket_types: usize,
}

impl SnapshotStats {
    fn of(snapshot: &Snapshot) -> Self {
        Self {
            generation: snapshot.generation(),
            sales: snapshot.sale_count(),
            ticket_types: snapshot.ticket_types().len(),
        }
    }
}

/// Holder of the current [`Snapshot`].
///
/// Readers clone the `Arc` and work on that value for as long as they
/// need; a replacement is assembled off to the side and installed with a
/// single pointer swap, so a reader sees either the old snapshot or the
/// new one in full.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
    include_activities: Arc<BTreeSet<String>>,
    next_generation: AtomicU64,
}

impl SnapshotStore {
    pub fn new<I, S>(include_activities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let include_activities: Arc<BTreeSet<String>> =
            Arc::new(include_activities.into_iter().map(Into::into).collect());
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty(include_activities.clone()))),
            include_activities,
            next_generation: AtomicU64::new(1),
        }
    }

    /// The snapshot in service right now.
    pub fn current(&self) -> Arc<Snapshot> {
        // Only a pointer is ever written under this lock, so a poisoned
        // guard still holds a complete snapshot.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn include_activities(&self) -> &BTreeSet<String> {
        &self.include_activities
    }

    /// Builds a snapshot from fresh collections and swaps it in.
    ///
    /// On error nothing is swapped and the previous snapshot stays in
    /// service.
    pub fn replace_snapshot(
        &self,
        sales: Vec<Sale>,
        ticket_types: Vec<TicketType>,
    ) -> Result<SnapshotStats, SnapshotError> {
        self.replace_snapshot_excluding(sales, ticket_types, Vec::new())
    }

    /// Like [`replace_snapshot`](Self::replace_snapshot), also recording the
    /// ticket types that were filtered out before the swap.
    pub fn replace_snapshot_excluding(
        &self,
        sales: Vec<Sale>,
        ticket_types: Vec<TicketType>,
        excluded: Vec<TicketTypeId>,
    ) -> Result<SnapshotStats, SnapshotError> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let snapshot = Snapshot::build(
            generation,
            self.include_activities.clone(),
            sales,
            ticket_types,
        )?
        .with_excluded_ticket_types(excluded);
        let stats = SnapshotStats::of(&snapshot);
        self.install(snapshot);
        info!(
            generation = stats.generation,
            sales = stats.sales,
            ticket_types = stats.ticket_types,
            "snapshot replaced"
        );
        Ok(stats)
    }

    fn install(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // A slower refresh must not overwrite a newer one.
        if guard.generation() < snapshot.generation() {
            *guard = snapshot;
        }
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats::of(&self.current())
    }

    /// Whether at least one refresh has been installed.
    pub fn is_loaded(&self) -> bool {
        self.current().generation() > 0
    }

    pub fn ticket_count(&self) -> usize {
        self.current().sale_count()
    }

    pub fn get_ticket_type(&self, id: &TicketTypeId) -> Option<TicketType> {
        self.current().get_ticket_type(id).cloned()
    }

    pub fn is_valid_ticket_type(&self, id: &TicketTypeId) -> bool {
        self.current().is_valid_ticket_type(id)
    }

    pub fn find_by_order(&self, order: &str) -> Vec<Sale> {
        self.current()
            .find_by_order(order)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find_by_email(&self, email: &str) -> Vec<Sale> {
        self.current()
            .find_by_email(email)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find_by_order_and_name(&self, order: &str, name: &str) -> Option<Sale> {
        self.current().find_by_order_and_name(order, name).cloned()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_INCLUDE_ACTIVITIES)
    }
}
