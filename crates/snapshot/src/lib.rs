//! Event snapshot: the in-memory copy of every sold ticket and every
//! ticket type of one event.
//!
//! [`SnapshotStore`] owns the current [`Snapshot`] behind an `Arc`. A
//! refresh builds a complete replacement and swaps it in; lookup indices
//! (by ticket type id, in-scope type ids, order, email, order + name and
//! secret) live inside the snapshot and are built on first access.
//!
//! ```rust
//! use snapshot::{Sale, SnapshotStore, TicketType};
//!
//! let store = SnapshotStore::default();
//! store
//!     .replace_snapshot(
//!         vec![Sale::new("HLL1H-1", "hll1h", "Sam Smith", "Sam@Example.com", "7")],
//!         vec![TicketType::new("7", "Individual (Online)").with_activities(["remote_sale"])],
//!     )
//!     .unwrap();
//!
//! let snapshot = store.current();
//! assert!(snapshot.find_by_order_and_name("HLL1H", "sam smith").is_some());
//! assert!(snapshot.is_valid_ticket_type(&"7".into()));
//! ```

pub mod error;
pub mod snapshot;
pub mod store;
pub mod types;

pub use crate::error::SnapshotError;
pub use crate::snapshot::{Snapshot, DEFAULT_INCLUDE_ACTIVITIES};
pub use crate::store::{SnapshotStats, SnapshotStore};
pub use crate::types::{
    Attribute, AttributeFlags, AttributeSet, Category, CategoryId, ProviderId, Sale, SaleState,
    TicketType, TicketTypeId,
};
