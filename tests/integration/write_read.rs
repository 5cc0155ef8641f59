//! Integration test: write/read round trips.
//!
//! Three-replica ensemble. Append batches of varying sizes, read them
//! back in order, and verify the confirmed pointer tracks every append.

use plume_integration_tests::{TestEnsemble, test_data_seeded};
use plume_types::{DigestType, EntryId, QuorumConfig};

const PASSWORD: &[u8] = b"integration-password";

fn default_quorum() -> QuorumConfig {
    QuorumConfig::new(3, 2, 2).unwrap()
}

/// Append 50 entries of varying sizes (64 B to ~50 KB), then read the
/// full range back and compare payloads byte for byte.
#[tokio::test]
async fn test_varying_sizes_round_trip() {
    let env = TestEnsemble::new(3);
    let handle = env
        .client
        .create_ledger(default_quorum(), DigestType::Mac, PASSWORD)
        .await
        .unwrap();

    let mut expected = Vec::new();
    for i in 0..50u32 {
        let data = test_data_seeded(64 + (i as usize) * 1000, i);
        let id = handle.append(data.clone()).await.unwrap();
        assert_eq!(id, EntryId(u64::from(i)));
        assert_eq!(handle.last_confirmed(), Some(id));
        expected.push(data);
    }

    let mut cursor = handle.read_range(EntryId(0), EntryId(49)).unwrap();
    for (i, want) in expected.iter().enumerate() {
        let entry = cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(entry.entry_id, EntryId(i as u64));
        assert_eq!(&entry.payload[..], &want[..], "payload mismatch at {i}");
    }
    assert!(cursor.next_entry().await.unwrap().is_none());

    handle.close().await.unwrap();
}

/// Close the ledger, then read it through a second client sharing the
/// same metadata store and transport — the view another process of the
/// service would have.
#[tokio::test]
async fn test_read_from_second_client_after_close() {
    let env = TestEnsemble::new(3);
    let handle = env
        .client
        .create_ledger(default_quorum(), DigestType::Mac, PASSWORD)
        .await
        .unwrap();
    let ledger_id = handle.id();

    for i in 0..10u32 {
        handle.append(test_data_seeded(256, i)).await.unwrap();
    }
    handle.close().await.unwrap();

    let other = env.second_client();
    let reader = other
        .open_ledger(ledger_id, DigestType::Mac, PASSWORD)
        .await
        .unwrap();
    assert_eq!(reader.last_confirmed(), Some(EntryId(9)));

    let mut cursor = reader.read_range(EntryId(0), EntryId(9)).unwrap();
    for i in 0..10u32 {
        let entry = cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(&entry.payload[..], &test_data_seeded(256, i)[..]);
    }
}

/// Sub-ranges and re-reads: a cursor is restartable and holds no state
/// across `read_range` calls.
#[tokio::test]
async fn test_sub_ranges_and_re_reads() {
    let env = TestEnsemble::new(3);
    let handle = env
        .client
        .create_ledger(default_quorum(), DigestType::Crc32, PASSWORD)
        .await
        .unwrap();

    for i in 0..20u64 {
        handle.append(format!("entry-{i}").into_bytes()).await.unwrap();
    }

    // Middle sub-range.
    let mut cursor = handle.read_range(EntryId(5), EntryId(8)).unwrap();
    for i in 5..=8u64 {
        let entry = cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(entry.payload, format!("entry-{i}").as_bytes());
    }
    assert!(cursor.next_entry().await.unwrap().is_none());

    // Same range again: all reads re-issued from scratch.
    let mut cursor = handle.read_range(EntryId(5), EntryId(8)).unwrap();
    assert_eq!(
        cursor.next_entry().await.unwrap().unwrap().entry_id,
        EntryId(5)
    );

    handle.close().await.unwrap();
}

/// Reads run concurrently with the single writer and never observe an
/// unconfirmed entry.
#[tokio::test]
async fn test_reads_concurrent_with_writer() {
    let env = TestEnsemble::new(3);
    let handle = std::sync::Arc::new(
        env.client
            .create_ledger(default_quorum(), DigestType::Mac, PASSWORD)
            .await
            .unwrap(),
    );

    let writer = {
        let handle = handle.clone();
        tokio::spawn(async move {
            for i in 0..30u64 {
                handle.append(format!("w{i}").into_bytes()).await.unwrap();
            }
        })
    };

    // Poll the confirmed snapshot while the writer runs; any range up to
    // the snapshot must be fully readable.
    for _ in 0..10 {
        if let Some(confirmed) = handle.last_confirmed() {
            let mut cursor = handle.read_range(EntryId(0), confirmed).unwrap();
            let mut seen = 0u64;
            while let Some(entry) = cursor.next_entry().await.unwrap() {
                assert_eq!(entry.entry_id, EntryId(seen));
                seen += 1;
            }
            assert_eq!(seen, confirmed.0 + 1);
        }
        tokio::task::yield_now().await;
    }

    writer.await.unwrap();
    assert_eq!(handle.last_confirmed(), Some(EntryId(29)));
}
