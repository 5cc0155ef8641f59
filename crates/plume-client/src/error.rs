//! Error taxonomy for the client core.

use std::time::Duration;

use plume_types::{EntryId, InvalidQuorumConfig, LedgerId};

/// Errors surfaced by ledger operations.
///
/// Transient per-replica faults are absorbed by retry and fallback inside
/// the quorum writer and read cursor; every variant here represents a
/// condition the caller must see.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The quorum invariant `1 ≤ A ≤ W ≤ E` was violated.
    ///
    /// Rejected before any collaborator is contacted.
    #[error(transparent)]
    Config(#[from] InvalidQuorumConfig),

    /// The replica pool is smaller than the requested ensemble.
    #[error("not enough replicas: ensemble needs {needed}, pool has {available}")]
    NotEnoughReplicas {
        /// Ensemble size requested.
        needed: usize,
        /// Replicas available in the pool.
        available: usize,
    },

    /// No ledger with this id exists.
    #[error("ledger not found: {0}")]
    NotFound(LedgerId),

    /// Password or digest type does not match the ledger's metadata.
    #[error("authentication failed for ledger {0}: password or digest type mismatch")]
    Auth(LedgerId),

    /// The operation requires an open, writable ledger.
    #[error("ledger {0} is closed")]
    ClosedLedger(LedgerId),

    /// The ack quorum could not be met: too few replicas reachable
    /// within the write deadline.
    #[error(
        "ack quorum unavailable on ledger {ledger_id} entry {entry_id}: \
         {acks} of {required} acks"
    )]
    QuorumUnavailable {
        /// Ledger being appended to.
        ledger_id: LedgerId,
        /// Entry whose quorum failed.
        entry_id: EntryId,
        /// Acknowledgements collected.
        acks: usize,
        /// Ack quorum size.
        required: usize,
    },

    /// The ack quorum was met but fewer than the write quorum of
    /// replicas accepted the entry.
    #[error(
        "insufficient replicas accepted ledger {ledger_id} entry {entry_id}: \
         write quorum {required}, permanent failures {failures}"
    )]
    InsufficientReplicas {
        /// Ledger being appended to.
        ledger_id: LedgerId,
        /// Entry whose write quorum failed.
        entry_id: EntryId,
        /// Write quorum size.
        required: usize,
        /// Replicas that permanently failed the send.
        failures: usize,
    },

    /// Read bounds are invalid for the ledger's confirmed state.
    #[error("invalid read range [{first}, {last}] (last confirmed: {last_confirmed:?})")]
    Range {
        /// Requested first entry id.
        first: EntryId,
        /// Requested last entry id.
        last: EntryId,
        /// The ledger's confirmed pointer at call time.
        last_confirmed: Option<EntryId>,
    },

    /// Every replica holding a copy returned a corrupt one.
    #[error("digest mismatch on ledger {ledger_id} entry {entry_id}: no replica has a valid copy")]
    DigestMismatch {
        /// Ledger being read.
        ledger_id: LedgerId,
        /// Entry with no valid copy.
        entry_id: EntryId,
    },

    /// No replica returned a copy of a confirmed entry.
    #[error("entry {entry_id} of ledger {ledger_id} unavailable on all replicas")]
    EntryUnavailable {
        /// Ledger being read.
        ledger_id: LedgerId,
        /// Entry no replica could serve.
        entry_id: EntryId,
    },

    /// A read exceeded its deadline. Retriable by the caller.
    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    /// Metadata collaborator failure.
    #[error("metadata error: {0}")]
    Meta(#[from] plume_meta::MetaError),
}
