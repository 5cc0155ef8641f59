//! Integration test: many ledgers, one entry each, plus metadata
//! persistence across client rebuilds.

use std::collections::HashMap;
use std::sync::Arc;

use plume_client::PlumeClient;
use plume_integration_tests::TestEnsemble;
use plume_meta::FjallMetaStore;
use plume_net::LocalTransport;
use plume_replica::{FileReplica, ReplicaStore};
use plume_types::{ClientConfig, DigestType, EntryId, LedgerId, QuorumConfig, ReplicaId};

const PASSWORD: &[u8] = b"integration-password";

/// Create 20 ledgers with one entry each, then read every one back.
/// Ledger ids are distinct and monotonic; ensembles rotate across the
/// replica pool.
#[tokio::test]
async fn test_twenty_ledgers_one_entry_each() {
    let env = TestEnsemble::new(5);
    let quorum = QuorumConfig::new(3, 2, 2).unwrap();

    let mut ledger_ids = Vec::new();
    for i in 0..20u64 {
        let handle = env
            .client
            .create_ledger(quorum, DigestType::Mac, PASSWORD)
            .await
            .unwrap();
        let entry_id = handle
            .append(format!("greeting from ledger {i}").into_bytes())
            .await
            .unwrap();
        assert_eq!(entry_id, EntryId(0));
        handle.close().await.unwrap();
        ledger_ids.push(handle.id());
    }

    // Ids are unique and strictly increasing.
    for pair in ledger_ids.windows(2) {
        assert!(pair[0] < pair[1]);
    }

    for (i, &ledger_id) in ledger_ids.iter().enumerate() {
        let reader = env
            .client
            .open_ledger(ledger_id, DigestType::Mac, PASSWORD)
            .await
            .unwrap();
        assert_eq!(reader.last_confirmed(), Some(EntryId(0)));

        let mut cursor = reader.read_range(EntryId(0), EntryId(0)).unwrap();
        let entry = cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(entry.payload, format!("greeting from ledger {i}").as_bytes());
    }
}

fn file_backed_client(dir: &std::path::Path) -> PlumeClient {
    let meta = Arc::new(FjallMetaStore::open(dir.join("meta")).unwrap());
    let mut endpoints: HashMap<ReplicaId, Arc<dyn ReplicaStore>> = HashMap::new();
    for i in 0..3u32 {
        let path = dir.join("replicas").join(format!("r{i}"));
        endpoints.insert(ReplicaId(i), Arc::new(FileReplica::new(&path).unwrap()));
    }
    let transport = Arc::new(LocalTransport::new(endpoints));
    let replicas = transport.replica_ids();
    PlumeClient::new(meta, transport, replicas, ClientConfig::default())
}

/// Write with one client over file-backed collaborators, drop it, then
/// rebuild the whole stack over the same directory and read everything
/// back — the exerciser's write-then-read-in-a-new-process flow.
#[tokio::test]
async fn test_survives_client_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let quorum = QuorumConfig::new(3, 2, 2).unwrap();

    let written_id;
    {
        let client = file_backed_client(dir.path());
        let handle = client
            .create_ledger(quorum, DigestType::Mac, PASSWORD)
            .await
            .unwrap();
        for i in 0..5u64 {
            handle.append(format!("persisted-{i}").into_bytes()).await.unwrap();
        }
        handle.close().await.unwrap();
        written_id = handle.id();
    }

    let client = file_backed_client(dir.path());
    let reader = client
        .open_ledger(written_id, DigestType::Mac, PASSWORD)
        .await
        .unwrap();
    assert_eq!(reader.last_confirmed(), Some(EntryId(4)));

    let mut cursor = reader.read_range(EntryId(0), EntryId(4)).unwrap();
    for i in 0..5u64 {
        let entry = cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(entry.payload, format!("persisted-{i}").as_bytes());
    }

    // The id allocator also persisted: the next ledger gets a fresh id.
    let next = client
        .create_ledger(quorum, DigestType::Mac, PASSWORD)
        .await
        .unwrap();
    assert!(next.id() > written_id);
    next.close().await.unwrap();
}

/// Ledger id 0 is a real, readable id (the allocator starts at zero).
#[tokio::test]
async fn test_first_ledger_id_is_zero() {
    let env = TestEnsemble::new(3);
    let handle = env
        .client
        .create_ledger(QuorumConfig::new(3, 2, 2).unwrap(), DigestType::Mac, PASSWORD)
        .await
        .unwrap();
    assert_eq!(handle.id(), LedgerId(0));
    handle.close().await.unwrap();
}
