//! Shared harness for Plume integration tests.

use std::sync::Arc;

use plume_client::PlumeClient;
use plume_meta::MemoryMetaStore;
use plume_net::LocalTransport;
use plume_replica::MemoryReplica;
use plume_types::ClientConfig;

/// An in-process ensemble plus a client wired over it.
///
/// The metadata store and transport are exposed so tests can build a
/// second client over the same collaborators (standing in for another
/// process of the same service) or inject replica faults.
pub struct TestEnsemble {
    pub client: PlumeClient,
    pub meta: Arc<MemoryMetaStore>,
    pub transport: Arc<LocalTransport>,
    pub replicas: Vec<Arc<MemoryReplica>>,
}

impl TestEnsemble {
    /// Build an ensemble of `replica_count` in-memory replicas.
    pub fn new(replica_count: u32) -> Self {
        Self::with_config(replica_count, ClientConfig::default())
    }

    /// Build an ensemble with custom client tuning.
    pub fn with_config(replica_count: u32, config: ClientConfig) -> Self {
        let (transport, replicas) = LocalTransport::in_memory(replica_count);
        let transport = Arc::new(transport);
        let meta = Arc::new(MemoryMetaStore::new());
        let client = PlumeClient::new(
            meta.clone(),
            transport.clone(),
            transport.replica_ids(),
            config,
        );
        Self {
            client,
            meta,
            transport,
            replicas,
        }
    }

    /// A second client over the same metadata store and transport, as a
    /// separate process of the same service would hold.
    pub fn second_client(&self) -> PlumeClient {
        PlumeClient::new(
            self.meta.clone(),
            self.transport.clone(),
            self.transport.replica_ids(),
            ClientConfig::default(),
        )
    }
}

/// Generate deterministic, seed-varying test data.
pub fn test_data_seeded(size: usize, seed: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state: u32 = 0xDEAD_BEEF ^ seed;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}
