//! Error types for the metadata store.

use plume_types::LedgerId;

/// Errors returned by [`MetadataStore`](crate::MetadataStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// No ledger with the given id exists.
    #[error("unknown ledger: {0}")]
    UnknownLedger(LedgerId),

    /// A ledger with the given id already exists.
    #[error("ledger already exists: {0}")]
    AlreadyExists(LedgerId),

    /// Fjall database error.
    #[error("fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    /// I/O error (e.g. from Fjall guard operations).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] postcard::Error),
}
