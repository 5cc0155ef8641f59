//! The [`Transport`] trait — point-to-point replica communication.

use plume_types::{Entry, EntryId, LedgerId, ReplicaId};

use crate::error::NetError;

/// Trait abstracting point-to-point communication with one replica.
///
/// This allows substituting transports in tests and keeps the real
/// network stack out of the client core. One transport instance is
/// shared by every ledger a process opens; implementations pool any
/// per-replica connection state internally.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send an entry to a replica and wait for its acknowledgement.
    ///
    /// Returning `Ok(())` means the replica has durably accepted the
    /// entry; the quorum writer counts it as one ack.
    async fn add_entry(&self, replica: ReplicaId, entry: &Entry) -> Result<(), NetError>;

    /// Fetch an entry from a replica. Returns `None` if that replica has
    /// no copy.
    async fn read_entry(
        &self,
        replica: ReplicaId,
        ledger_id: LedgerId,
        entry_id: EntryId,
    ) -> Result<Option<Entry>, NetError>;

    /// Fetch a replica's view of a ledger's confirmed pointer.
    async fn read_confirmed(
        &self,
        replica: ReplicaId,
        ledger_id: LedgerId,
    ) -> Result<Option<EntryId>, NetError>;
}
