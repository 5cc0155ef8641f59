//! In-memory metadata store.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use plume_types::{EntryId, LedgerId, LedgerMetadata, LedgerState};
use tracing::debug;

use crate::error::MetaError;
use crate::traits::MetadataStore;

/// Volatile metadata store backed by a `RwLock<HashMap>`.
///
/// Useful for tests and for running the exerciser fully in memory.
#[derive(Default)]
pub struct MemoryMetaStore {
    ledgers: RwLock<HashMap<LedgerId, LedgerMetadata>>,
    next_id: AtomicU64,
}

impl MemoryMetaStore {
    /// Create an empty store; the first allocated id is 0.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MetadataStore for MemoryMetaStore {
    async fn allocate_ledger_id(&self) -> Result<LedgerId, MetaError> {
        let id = LedgerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        debug!(ledger_id = %id, "allocated ledger id");
        Ok(id)
    }

    async fn create_ledger(&self, metadata: &LedgerMetadata) -> Result<(), MetaError> {
        let mut map = self.ledgers.write().expect("lock poisoned");
        if map.contains_key(&metadata.ledger_id) {
            return Err(MetaError::AlreadyExists(metadata.ledger_id));
        }
        map.insert(metadata.ledger_id, metadata.clone());
        debug!(ledger_id = %metadata.ledger_id, "created ledger metadata");
        Ok(())
    }

    async fn get_ledger(&self, id: LedgerId) -> Result<Option<LedgerMetadata>, MetaError> {
        let map = self.ledgers.read().expect("lock poisoned");
        Ok(map.get(&id).cloned())
    }

    async fn mark_closed(
        &self,
        id: LedgerId,
        last_confirmed: Option<EntryId>,
    ) -> Result<(), MetaError> {
        let mut map = self.ledgers.write().expect("lock poisoned");
        let meta = map.get_mut(&id).ok_or(MetaError::UnknownLedger(id))?;
        if meta.state == LedgerState::Closed {
            return Ok(());
        }
        meta.state = LedgerState::Closed;
        meta.last_confirmed = last_confirmed;
        debug!(ledger_id = %id, ?last_confirmed, "marked ledger closed");
        Ok(())
    }
}
