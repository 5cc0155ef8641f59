//! [`LocalTransport`] — an in-process replica ensemble.
//!
//! Routes requests to [`ReplicaStore`]s living in the same process,
//! through the same wire codec a networked transport would use, so the
//! encoding path is exercised end to end. Per-replica outage flags and
//! injected latency let tests stand in for a flaky network.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use plume_replica::ReplicaStore;
use plume_types::{Entry, EntryId, LedgerId, ReplicaId};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::NetError;
use crate::traits::Transport;

/// A pooled "connection": a handle to one replica's store.
type Connection = Arc<dyn ReplicaStore>;

/// In-process transport over a fixed set of replicas.
///
/// Connections are acquired from a pool shared by every ledger in the
/// process and are never owned by a single ledger. The pool is guarded
/// by a `Mutex` (not `RwLock`) so concurrent first users of the same
/// replica cannot race to establish duplicate connections.
pub struct LocalTransport {
    /// The known ensemble endpoints, fixed at construction.
    endpoints: HashMap<ReplicaId, Arc<dyn ReplicaStore>>,
    /// Lazily established connections, keyed by replica.
    connections: Mutex<HashMap<ReplicaId, Connection>>,
    /// Replicas currently marked unreachable (test hook).
    down: std::sync::RwLock<HashSet<ReplicaId>>,
    /// Artificial per-request latency (test hook).
    latency: std::sync::RwLock<HashMap<ReplicaId, Duration>>,
}

impl LocalTransport {
    /// Build a transport over the given replica endpoints.
    pub fn new(endpoints: HashMap<ReplicaId, Arc<dyn ReplicaStore>>) -> Self {
        Self {
            endpoints,
            connections: Mutex::new(HashMap::new()),
            down: std::sync::RwLock::new(HashSet::new()),
            latency: std::sync::RwLock::new(HashMap::new()),
        }
    }

    /// Build a transport over `count` fresh in-memory replicas,
    /// returning the stores for direct inspection in tests.
    pub fn in_memory(count: u32) -> (Self, Vec<Arc<plume_replica::MemoryReplica>>) {
        let replicas: Vec<Arc<plume_replica::MemoryReplica>> = (0..count)
            .map(|_| Arc::new(plume_replica::MemoryReplica::new()))
            .collect();
        let endpoints = replicas
            .iter()
            .enumerate()
            .map(|(i, r)| {
                (
                    ReplicaId(i as u32),
                    Arc::clone(r) as Arc<dyn ReplicaStore>,
                )
            })
            .collect();
        (Self::new(endpoints), replicas)
    }

    /// The replica ids this transport can reach.
    pub fn replica_ids(&self) -> Vec<ReplicaId> {
        let mut ids: Vec<ReplicaId> = self.endpoints.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Test hook: mark a replica unreachable (or reachable again).
    pub fn set_down(&self, replica: ReplicaId, down: bool) {
        let mut set = self.down.write().expect("lock poisoned");
        if down {
            set.insert(replica);
        } else {
            set.remove(&replica);
        }
    }

    /// Test hook: add artificial latency to every request to a replica.
    pub fn set_latency(&self, replica: ReplicaId, latency: Duration) {
        self.latency
            .write()
            .expect("lock poisoned")
            .insert(replica, latency);
    }

    /// Get or establish the pooled connection to a replica.
    ///
    /// Holds the pool lock across the whole lookup so concurrent callers
    /// cannot each establish a separate connection to the same replica.
    async fn get_connection(&self, replica: ReplicaId) -> Result<Connection, NetError> {
        if self.down.read().expect("lock poisoned").contains(&replica) {
            return Err(NetError::Unreachable(replica));
        }

        let mut pool = self.connections.lock().await;
        if let Some(conn) = pool.get(&replica) {
            return Ok(Arc::clone(conn));
        }

        let endpoint = self
            .endpoints
            .get(&replica)
            .ok_or(NetError::Unreachable(replica))?;
        debug!(%replica, "connecting to replica");
        let conn = Arc::clone(endpoint);
        pool.insert(replica, Arc::clone(&conn));
        Ok(conn)
    }

    async fn apply_latency(&self, replica: ReplicaId) {
        let latency = self
            .latency
            .read()
            .expect("lock poisoned")
            .get(&replica)
            .copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Run an entry through the wire codec, as a networked transport would.
    fn wire_roundtrip(entry: &Entry) -> Result<Entry, NetError> {
        let payload =
            postcard::to_allocvec(entry).map_err(|e| NetError::Serialization(e.to_string()))?;
        postcard::from_bytes(&payload).map_err(|e| NetError::Serialization(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Transport for LocalTransport {
    async fn add_entry(&self, replica: ReplicaId, entry: &Entry) -> Result<(), NetError> {
        let conn = self.get_connection(replica).await?;
        self.apply_latency(replica).await;

        let received = Self::wire_roundtrip(entry)?;
        conn.put_entry(&received)
            .await
            .map_err(|e| NetError::Remote {
                replica,
                detail: e.to_string(),
            })?;

        debug!(
            %replica,
            ledger_id = %entry.ledger_id,
            entry_id = %entry.entry_id,
            "entry acknowledged"
        );
        Ok(())
    }

    async fn read_entry(
        &self,
        replica: ReplicaId,
        ledger_id: LedgerId,
        entry_id: EntryId,
    ) -> Result<Option<Entry>, NetError> {
        let conn = self.get_connection(replica).await?;
        self.apply_latency(replica).await;

        let entry = conn
            .get_entry(ledger_id, entry_id)
            .await
            .map_err(|e| NetError::Remote {
                replica,
                detail: e.to_string(),
            })?;

        match entry {
            Some(entry) => Ok(Some(Self::wire_roundtrip(&entry)?)),
            None => Ok(None),
        }
    }

    async fn read_confirmed(
        &self,
        replica: ReplicaId,
        ledger_id: LedgerId,
    ) -> Result<Option<EntryId>, NetError> {
        let conn = self.get_connection(replica).await?;
        self.apply_latency(replica).await;

        conn.confirmed(ledger_id).await.map_err(|e| NetError::Remote {
            replica,
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn test_entry(id: u64) -> Entry {
        Entry {
            ledger_id: LedgerId(0),
            entry_id: EntryId(id),
            last_confirmed: id.checked_sub(1).map(EntryId),
            payload: Bytes::from(format!("entry-{id}")),
            digest: vec![0xab; 4],
        }
    }

    #[tokio::test]
    async fn test_add_then_read_roundtrip() {
        let (transport, _replicas) = LocalTransport::in_memory(3);
        let entry = test_entry(0);

        transport.add_entry(ReplicaId(1), &entry).await.unwrap();
        let got = transport
            .read_entry(ReplicaId(1), LedgerId(0), EntryId(0))
            .await
            .unwrap();
        assert_eq!(got, Some(entry));
    }

    #[tokio::test]
    async fn test_read_from_other_replica_returns_none() {
        let (transport, _replicas) = LocalTransport::in_memory(3);
        transport
            .add_entry(ReplicaId(0), &test_entry(0))
            .await
            .unwrap();

        let got = transport
            .read_entry(ReplicaId(2), LedgerId(0), EntryId(0))
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_down_replica_unreachable() {
        let (transport, _replicas) = LocalTransport::in_memory(2);
        transport.set_down(ReplicaId(0), true);

        let err = transport
            .add_entry(ReplicaId(0), &test_entry(0))
            .await
            .unwrap_err();
        assert!(matches!(err, NetError::Unreachable(ReplicaId(0))));

        // Recovery: bring it back up.
        transport.set_down(ReplicaId(0), false);
        transport
            .add_entry(ReplicaId(0), &test_entry(0))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_replica_unreachable() {
        let (transport, _replicas) = LocalTransport::in_memory(2);
        let err = transport
            .read_entry(ReplicaId(9), LedgerId(0), EntryId(0))
            .await
            .unwrap_err();
        assert!(matches!(err, NetError::Unreachable(ReplicaId(9))));
    }

    #[tokio::test]
    async fn test_confirmed_propagates_from_lac() {
        let (transport, _replicas) = LocalTransport::in_memory(1);
        transport
            .add_entry(ReplicaId(0), &test_entry(0))
            .await
            .unwrap();
        transport
            .add_entry(ReplicaId(0), &test_entry(1))
            .await
            .unwrap();

        let confirmed = transport
            .read_confirmed(ReplicaId(0), LedgerId(0))
            .await
            .unwrap();
        assert_eq!(confirmed, Some(EntryId(0)));
    }

    #[tokio::test]
    async fn test_replica_ids_sorted() {
        let (transport, _replicas) = LocalTransport::in_memory(3);
        assert_eq!(
            transport.replica_ids(),
            vec![ReplicaId(0), ReplicaId(1), ReplicaId(2)]
        );
    }
}
