//! The [`MetadataStore`] trait — the metadata coordination seam.

use plume_types::{EntryId, LedgerId, LedgerMetadata};

use crate::error::MetaError;

/// The metadata collaborator a Plume client coordinates through.
///
/// All implementations must be `Send + Sync`; one store is shared by every
/// ledger a process opens. The trait is async because a production
/// implementation sits behind a network hop, even though the bundled
/// implementations complete immediately.
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    /// Allocate the next ledger id. Ids are unique and monotonic across
    /// the lifetime of the store.
    async fn allocate_ledger_id(&self) -> Result<LedgerId, MetaError>;

    /// Persist the metadata record of a newly created ledger.
    ///
    /// Fails with [`MetaError::AlreadyExists`] if the id is taken.
    async fn create_ledger(&self, metadata: &LedgerMetadata) -> Result<(), MetaError>;

    /// Fetch a ledger's metadata. Returns `None` for an unknown id.
    async fn get_ledger(&self, id: LedgerId) -> Result<Option<LedgerMetadata>, MetaError>;

    /// Mark a ledger closed, recording its final confirmed entry.
    ///
    /// Idempotent: closing an already-closed ledger is a no-op and the
    /// originally recorded `last_confirmed` is kept. Fails with
    /// [`MetaError::UnknownLedger`] for an unknown id.
    async fn mark_closed(
        &self,
        id: LedgerId,
        last_confirmed: Option<EntryId>,
    ) -> Result<(), MetaError>;
}
