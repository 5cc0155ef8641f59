//! In-memory replica storage backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use bytes::Bytes;
use plume_types::{Entry, EntryId, LedgerId};
use tracing::debug;

use crate::error::ReplicaError;
use crate::traits::ReplicaStore;

/// In-memory replica store backed by a `RwLock<HashMap>`.
///
/// Entries per ledger are kept in a `BTreeMap` so the highest id is a
/// cheap last-key lookup.
#[derive(Default)]
pub struct MemoryReplica {
    ledgers: RwLock<HashMap<LedgerId, BTreeMap<EntryId, Entry>>>,
    confirmed: RwLock<HashMap<LedgerId, EntryId>>,
}

impl MemoryReplica {
    /// Create an empty replica store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: overwrite a stored entry's payload in place without
    /// updating its digest, simulating on-replica corruption.
    ///
    /// Returns `false` if the replica holds no copy of the entry.
    pub fn corrupt_entry(&self, ledger_id: LedgerId, entry_id: EntryId, payload: &[u8]) -> bool {
        let mut map = self.ledgers.write().expect("lock poisoned");
        match map.get_mut(&ledger_id).and_then(|l| l.get_mut(&entry_id)) {
            Some(entry) => {
                entry.payload = Bytes::copy_from_slice(payload);
                true
            }
            None => false,
        }
    }

    /// Test hook: drop a stored entry, simulating loss of that copy.
    pub fn drop_entry(&self, ledger_id: LedgerId, entry_id: EntryId) -> bool {
        let mut map = self.ledgers.write().expect("lock poisoned");
        map.get_mut(&ledger_id)
            .and_then(|l| l.remove(&entry_id))
            .is_some()
    }
}

#[async_trait::async_trait]
impl ReplicaStore for MemoryReplica {
    async fn put_entry(&self, entry: &Entry) -> Result<(), ReplicaError> {
        {
            let mut map = self.ledgers.write().expect("lock poisoned");
            map.entry(entry.ledger_id)
                .or_default()
                .insert(entry.entry_id, entry.clone());
        }

        if let Some(lac) = entry.last_confirmed {
            let mut confirmed = self.confirmed.write().expect("lock poisoned");
            let slot = confirmed.entry(entry.ledger_id).or_insert(lac);
            if lac > *slot {
                *slot = lac;
            }
        }

        debug!(
            ledger_id = %entry.ledger_id,
            entry_id = %entry.entry_id,
            size = entry.payload.len(),
            "stored entry in memory"
        );
        Ok(())
    }

    async fn get_entry(
        &self,
        ledger_id: LedgerId,
        entry_id: EntryId,
    ) -> Result<Option<Entry>, ReplicaError> {
        let map = self.ledgers.read().expect("lock poisoned");
        Ok(map.get(&ledger_id).and_then(|l| l.get(&entry_id)).cloned())
    }

    async fn contains(
        &self,
        ledger_id: LedgerId,
        entry_id: EntryId,
    ) -> Result<bool, ReplicaError> {
        let map = self.ledgers.read().expect("lock poisoned");
        Ok(map
            .get(&ledger_id)
            .is_some_and(|l| l.contains_key(&entry_id)))
    }

    async fn last_entry_id(&self, ledger_id: LedgerId) -> Result<Option<EntryId>, ReplicaError> {
        let map = self.ledgers.read().expect("lock poisoned");
        Ok(map
            .get(&ledger_id)
            .and_then(|l| l.keys().next_back().copied()))
    }

    async fn confirmed(&self, ledger_id: LedgerId) -> Result<Option<EntryId>, ReplicaError> {
        let confirmed = self.confirmed.read().expect("lock poisoned");
        Ok(confirmed.get(&ledger_id).copied())
    }
}
