//! Error types for digest verification.

use plume_types::{EntryId, LedgerId};

/// Errors raised while verifying an entry's authentication tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    /// The entry's tag does not match its contents.
    #[error("digest mismatch on ledger {ledger_id} entry {entry_id}")]
    Mismatch {
        /// Ledger the bad entry belongs to.
        ledger_id: LedgerId,
        /// Id of the bad entry.
        entry_id: EntryId,
    },

    /// The tag has the wrong length for the ledger's digest type.
    #[error("malformed digest on ledger {ledger_id} entry {entry_id}: expected {expected} bytes, got {actual}")]
    MalformedTag {
        /// Ledger the bad entry belongs to.
        ledger_id: LedgerId,
        /// Id of the bad entry.
        entry_id: EntryId,
        /// Tag length required by the digest type.
        expected: usize,
        /// Tag length actually present.
        actual: usize,
    },
}
