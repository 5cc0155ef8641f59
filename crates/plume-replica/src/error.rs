//! Error types for replica storage operations.

use plume_types::{EntryId, LedgerId};

/// Errors that can occur while storing or retrieving entries on a replica.
#[derive(Debug, thiserror::Error)]
pub enum ReplicaError {
    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serde(#[from] postcard::Error),

    /// Stored entry data failed its integrity check on read.
    ///
    /// The copy is treated as missing so the reader falls over to
    /// another replica.
    #[error("corrupt entry on disk: ledger {ledger_id} entry {entry_id}")]
    CorruptEntry {
        /// Ledger the corrupt entry belongs to.
        ledger_id: LedgerId,
        /// Id of the corrupt entry.
        entry_id: EntryId,
    },
}
