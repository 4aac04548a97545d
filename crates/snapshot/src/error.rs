use thiserror::Error;

/// Errors raised while assembling a snapshot. Any of them aborts the
/// refresh and leaves the previous snapshot in service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("duplicate ticket type title '{title}'")]
    DuplicateTitle { title: String },
    #[error("duplicate ticket type id '{id}'")]
    DuplicateTicketTypeId { id: String },
    #[error("duplicate sale reference '{reference}'")]
    DuplicateReference { reference: String },
}
