//! Core trait for replica-side entry storage.

use plume_types::{Entry, EntryId, LedgerId};

use crate::error::ReplicaError;

/// Trait for a single replica's entry store.
///
/// All implementations must be `Send + Sync` for use across async tasks.
/// Storing an entry also advances the replica's per-ledger confirmed
/// pointer from the entry's piggy-backed last-add-confirmed value.
#[async_trait::async_trait]
pub trait ReplicaStore: Send + Sync {
    /// Store one entry. Overwriting an existing `(ledger, entry)` slot with
    /// identical content is permitted (writer retries), and idempotent.
    async fn put_entry(&self, entry: &Entry) -> Result<(), ReplicaError>;

    /// Retrieve an entry. Returns `None` if this replica has no copy.
    async fn get_entry(
        &self,
        ledger_id: LedgerId,
        entry_id: EntryId,
    ) -> Result<Option<Entry>, ReplicaError>;

    /// Check whether a copy of the entry exists.
    async fn contains(&self, ledger_id: LedgerId, entry_id: EntryId)
    -> Result<bool, ReplicaError>;

    /// Highest entry id this replica holds for a ledger.
    async fn last_entry_id(&self, ledger_id: LedgerId) -> Result<Option<EntryId>, ReplicaError>;

    /// This replica's view of the ledger's confirmed pointer, advanced
    /// from piggy-backed values on stored entries.
    async fn confirmed(&self, ledger_id: LedgerId) -> Result<Option<EntryId>, ReplicaError>;
}
