//! Integration test: corrupted copies and digest-mismatch fallback.

use std::collections::HashMap;
use std::sync::Arc;

use plume_client::{ClientError, PlumeClient};
use plume_integration_tests::TestEnsemble;
use plume_meta::MemoryMetaStore;
use plume_net::LocalTransport;
use plume_replica::{FileReplica, ReplicaStore};
use plume_types::{ClientConfig, DigestType, EntryId, QuorumConfig, ReplicaId};

const PASSWORD: &[u8] = b"integration-password";

fn full_replication(e: u8) -> QuorumConfig {
    QuorumConfig::new(e, e, e).unwrap()
}

/// A corrupted payload on the preferred replica is served transparently
/// from a fallback replica with identical logical content.
#[tokio::test]
async fn test_preferred_corruption_transparent_to_reader() {
    let env = TestEnsemble::new(3);
    let handle = env
        .client
        .create_ledger(full_replication(3), DigestType::Mac, PASSWORD)
        .await
        .unwrap();

    for i in 0..6u64 {
        handle.append(format!("clean-{i}").into_bytes()).await.unwrap();
    }

    // Corrupt every entry on its preferred replica (entry id rotates the
    // preference, ledger 0 starts the ensemble at r0).
    for i in 0..6u64 {
        let preferred = (i % 3) as usize;
        assert!(env.replicas[preferred].corrupt_entry(handle.id(), EntryId(i), b"flipped"));
    }

    let mut cursor = handle.read_range(EntryId(0), EntryId(5)).unwrap();
    for i in 0..6u64 {
        let entry = cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(entry.payload, format!("clean-{i}").as_bytes());
    }

    handle.close().await.unwrap();
}

/// When every copy of an entry is corrupt, the read surfaces a digest
/// mismatch instead of returning tampered bytes.
#[tokio::test]
async fn test_total_corruption_surfaced() {
    let env = TestEnsemble::new(3);
    let handle = env
        .client
        .create_ledger(full_replication(3), DigestType::Crc32, PASSWORD)
        .await
        .unwrap();
    handle.append(&b"precious"[..]).await.unwrap();

    for replica in &env.replicas {
        replica.corrupt_entry(handle.id(), EntryId(0), b"ruined");
    }

    let mut cursor = handle.read_range(EntryId(0), EntryId(0)).unwrap();
    let err = cursor.next_entry().await.unwrap_err();
    assert!(matches!(err, ClientError::DigestMismatch { .. }));
}

/// On-disk corruption with file-backed replicas: the replica detects the
/// damaged record on read and the cursor falls over to an intact copy.
#[tokio::test]
async fn test_file_replica_disk_corruption_fallback() {
    let dir = tempfile::tempdir().unwrap();

    let mut endpoints: HashMap<ReplicaId, Arc<dyn ReplicaStore>> = HashMap::new();
    for i in 0..3u32 {
        let path = dir.path().join(format!("r{i}"));
        endpoints.insert(ReplicaId(i), Arc::new(FileReplica::new(&path).unwrap()));
    }
    let transport = Arc::new(LocalTransport::new(endpoints));
    let client = PlumeClient::new(
        Arc::new(MemoryMetaStore::new()),
        transport.clone(),
        transport.replica_ids(),
        ClientConfig::default(),
    );

    let handle = client
        .create_ledger(full_replication(3), DigestType::Mac, PASSWORD)
        .await
        .unwrap();
    handle.append(&b"on disk"[..]).await.unwrap();

    // Entry 0 prefers replica r0: damage its entry file directly.
    let entry_file = dir
        .path()
        .join("r0")
        .join(handle.id().to_string())
        .join(format!("{:020}.ent", 0));
    let mut bytes = std::fs::read(&entry_file).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&entry_file, &bytes).unwrap();

    let mut cursor = handle.read_range(EntryId(0), EntryId(0)).unwrap();
    let entry = cursor.next_entry().await.unwrap().unwrap();
    assert_eq!(entry.payload, &b"on disk"[..]);

    handle.close().await.unwrap();
}
