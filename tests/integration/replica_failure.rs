//! Integration test: replica outages around the quorum boundary.

use std::time::Duration;

use plume_client::ClientError;
use plume_integration_tests::TestEnsemble;
use plume_types::{ClientConfig, DigestType, EntryId, QuorumConfig, ReplicaId};

const PASSWORD: &[u8] = b"integration-password";

/// With E=5, A=3: drop exactly E-A=2 replicas mid-stream and keep
/// appending; bring them back and keep appending again.
#[tokio::test]
async fn test_outage_at_boundary_then_recovery() {
    let env = TestEnsemble::new(5);
    let handle = env
        .client
        .create_ledger(
            QuorumConfig::new(5, 3, 3).unwrap(),
            DigestType::Mac,
            PASSWORD,
        )
        .await
        .unwrap();

    for i in 0..5u64 {
        handle.append(format!("pre-{i}").into_bytes()).await.unwrap();
    }

    env.transport.set_down(ReplicaId(0), true);
    env.transport.set_down(ReplicaId(1), true);

    for i in 5..10u64 {
        handle.append(format!("mid-{i}").into_bytes()).await.unwrap();
    }
    assert_eq!(handle.last_confirmed(), Some(EntryId(9)));

    env.transport.set_down(ReplicaId(0), false);
    env.transport.set_down(ReplicaId(1), false);

    for i in 10..15u64 {
        handle.append(format!("post-{i}").into_bytes()).await.unwrap();
    }
    assert_eq!(handle.last_confirmed(), Some(EntryId(14)));

    // The whole ledger reads back despite the outage window: entries
    // written during it live on the surviving replicas.
    let mut cursor = handle.read_range(EntryId(0), EntryId(14)).unwrap();
    let mut count = 0;
    while let Some(_entry) = cursor.next_entry().await.unwrap() {
        count += 1;
    }
    assert_eq!(count, 15);

    handle.close().await.unwrap();
}

/// Dropping one replica more than E-A makes the ack quorum unmeetable;
/// the error is surfaced, never silently downgraded.
#[tokio::test]
async fn test_outage_beyond_boundary_fails_append() {
    let env = TestEnsemble::new(5);
    let handle = env
        .client
        .create_ledger(
            QuorumConfig::new(5, 3, 3).unwrap(),
            DigestType::Mac,
            PASSWORD,
        )
        .await
        .unwrap();

    handle.append(&b"durable"[..]).await.unwrap();

    for i in 0..3 {
        env.transport.set_down(ReplicaId(i), true);
    }

    let err = handle.append(&b"undeliverable"[..]).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::QuorumUnavailable { required: 3, .. }
    ));

    // The confirmed pointer is untouched by the failed append.
    assert_eq!(handle.last_confirmed(), Some(EntryId(0)));
}

/// A replica that only answers after the write deadline contributes
/// nothing; with too few fast replicas the append times out as a quorum
/// failure.
#[tokio::test]
async fn test_slow_replicas_count_as_unavailable() {
    let config = ClientConfig {
        write_timeout_ms: 100,
        ..ClientConfig::default()
    };
    let env = TestEnsemble::with_config(3, config);
    let handle = env
        .client
        .create_ledger(
            QuorumConfig::new(3, 2, 2).unwrap(),
            DigestType::Mac,
            PASSWORD,
        )
        .await
        .unwrap();

    // One fast replica is not enough for A=2 when the others straggle
    // past the deadline.
    env.transport
        .set_latency(ReplicaId(1), Duration::from_millis(1_000));
    env.transport
        .set_latency(ReplicaId(2), Duration::from_millis(1_000));

    let err = handle.append(&b"stragglers"[..]).await.unwrap_err();
    assert!(matches!(err, ClientError::QuorumUnavailable { .. }));
}

/// Reads fall over to surviving replicas when the preferred one is down.
#[tokio::test]
async fn test_read_falls_over_on_down_replica() {
    let env = TestEnsemble::new(3);
    let handle = env
        .client
        .create_ledger(
            QuorumConfig::new(3, 3, 3).unwrap(),
            DigestType::Mac,
            PASSWORD,
        )
        .await
        .unwrap();

    for i in 0..6u64 {
        handle.append(format!("r{i}").into_bytes()).await.unwrap();
    }

    // Take down one replica; every entry whose preferred replica this
    // was must transparently come from the others.
    env.transport.set_down(ReplicaId(1), true);

    let mut cursor = handle.read_range(EntryId(0), EntryId(5)).unwrap();
    for i in 0..6u64 {
        let entry = cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(entry.payload, format!("r{i}").as_bytes());
    }

    handle.close().await.unwrap();
}
