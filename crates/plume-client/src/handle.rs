//! [`LedgerHandle`] — one ledger's write/read state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use bytes::Bytes;
use plume_digest::Digester;
use plume_meta::MetadataStore;
use plume_net::Transport;
use plume_types::{ClientConfig, EntryId, LedgerId, QuorumConfig, ReplicaId};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::ack::AckTracker;
use crate::cursor::ReadCursor;
use crate::error::ClientError;
use crate::quorum::QuorumWriter;

/// Sentinel in the confirmed-pointer cell while nothing is confirmed.
const UNCONFIRMED: i64 = -1;

/// Writer-side bookkeeping, serialized by the handle's append mutex.
struct WriterState {
    /// Next entry id to assign.
    next_entry_id: u64,
    /// Acknowledged ids and in-order confirmation.
    acks: AckTracker,
}

/// A handle to one ledger.
///
/// Created writable by [`PlumeClient::create_ledger`]; opened read-only
/// by [`PlumeClient::open_ledger`]. Appends on one handle are serialized
/// first-in-first-out internally; reads run in parallel with the writer
/// against a point-in-time confirmed-pointer snapshot.
///
/// Closing releases only per-ledger state — the metadata store, transport
/// and its pooled connections stay shared with every other ledger of the
/// owning client.
///
/// [`PlumeClient::create_ledger`]: crate::PlumeClient::create_ledger
/// [`PlumeClient::open_ledger`]: crate::PlumeClient::open_ledger
pub struct LedgerHandle {
    ledger_id: LedgerId,
    quorum: QuorumConfig,
    digester: Digester,
    ensemble: Vec<ReplicaId>,
    meta: Arc<dyn MetadataStore>,
    transport: Arc<dyn Transport>,
    writer: QuorumWriter,
    config: ClientConfig,
    /// Only handles returned by `create_ledger` may append.
    writable: bool,
    writer_state: Mutex<WriterState>,
    /// Confirmed-pointer snapshot readable without taking the writer lock.
    confirmed: AtomicI64,
    closed: AtomicBool,
    /// Set after a quorum write fails. A failed append may have left
    /// copies of its entry id on a minority of replicas; reusing the id
    /// could let those stale copies masquerade as the real entry, so the
    /// handle stops accepting appends. Reads and close still work.
    write_failed: AtomicBool,
}

impl std::fmt::Debug for LedgerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerHandle")
            .field("ledger_id", &self.ledger_id)
            .field("ensemble", &self.ensemble)
            .field("writable", &self.writable)
            .field("confirmed", &self.confirmed.load(Ordering::Relaxed))
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl LedgerHandle {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        ledger_id: LedgerId,
        quorum: QuorumConfig,
        digester: Digester,
        ensemble: Vec<ReplicaId>,
        meta: Arc<dyn MetadataStore>,
        transport: Arc<dyn Transport>,
        config: ClientConfig,
        writable: bool,
        last_confirmed: Option<EntryId>,
    ) -> Self {
        let writer = QuorumWriter::new(
            Arc::clone(&transport),
            ensemble.clone(),
            quorum,
            config,
        );
        let next_entry_id = last_confirmed.map_or(0, |c| c.0 + 1);
        let mut acks = AckTracker::new();
        if let Some(confirmed) = last_confirmed {
            for id in 0..=confirmed.0 {
                acks.ack(EntryId(id));
            }
        }
        Self {
            ledger_id,
            quorum,
            digester,
            ensemble,
            meta,
            transport,
            writer,
            config,
            writable,
            writer_state: Mutex::new(WriterState {
                next_entry_id,
                acks,
            }),
            confirmed: AtomicI64::new(last_confirmed.map_or(UNCONFIRMED, |c| c.0 as i64)),
            closed: AtomicBool::new(false),
            write_failed: AtomicBool::new(false),
        }
    }

    /// The ledger's identifier.
    pub fn id(&self) -> LedgerId {
        self.ledger_id
    }

    /// The ledger's replication parameters.
    pub fn quorum(&self) -> QuorumConfig {
        self.quorum
    }

    /// Point-in-time snapshot of the confirmed pointer.
    ///
    /// Safe to call concurrently with an in-flight append; never exposes
    /// an entry whose predecessors are unconfirmed.
    pub fn last_confirmed(&self) -> Option<EntryId> {
        let raw = self.confirmed.load(Ordering::Acquire);
        (raw >= 0).then(|| EntryId(raw as u64))
    }

    /// Append a payload, suspending until the ack quorum is reached.
    ///
    /// Returns the assigned entry id. Appends on this handle are
    /// serialized first-in-first-out; callers may invoke this
    /// concurrently and will be queued fairly.
    ///
    /// A failed append leaves the handle write-poisoned: subsequent
    /// appends fail with [`ClientError::ClosedLedger`], while reads and
    /// [`close`](Self::close) continue to work.
    pub async fn append(&self, payload: impl Into<Bytes>) -> Result<EntryId, ClientError> {
        if !self.writable
            || self.closed.load(Ordering::Acquire)
            || self.write_failed.load(Ordering::Acquire)
        {
            return Err(ClientError::ClosedLedger(self.ledger_id));
        }

        let mut state = self.writer_state.lock().await;
        // Re-check under the lock: a concurrent close or a failed append
        // may have won the race.
        if self.closed.load(Ordering::Acquire) || self.write_failed.load(Ordering::Acquire) {
            return Err(ClientError::ClosedLedger(self.ledger_id));
        }

        let entry_id = EntryId(state.next_entry_id);
        let entry = self.digester.seal(
            self.ledger_id,
            entry_id,
            self.last_confirmed(),
            payload.into(),
        );

        let acks = match self.writer.write(&entry).await {
            Ok(acks) => acks,
            Err(err) => {
                self.write_failed.store(true, Ordering::Release);
                return Err(err);
            }
        };
        state.next_entry_id += 1;

        if let Some(confirmed) = state.acks.ack(entry_id) {
            self.confirmed.store(confirmed.0 as i64, Ordering::Release);
        }

        debug!(
            ledger_id = %self.ledger_id,
            %entry_id,
            acks,
            last_confirmed = ?self.last_confirmed(),
            "entry appended"
        );
        Ok(entry_id)
    }

    /// Close the ledger.
    ///
    /// Waits out any in-flight append, records the final confirmed
    /// pointer in metadata (writable handles only), and rejects further
    /// appends. Idempotent — repeated close is a no-op.
    pub async fn close(&self) -> Result<(), ClientError> {
        // Taking the writer lock flushes the in-flight append, if any.
        let _state = self.writer_state.lock().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if self.writable {
            self.meta
                .mark_closed(self.ledger_id, self.last_confirmed())
                .await?;
        }

        info!(
            ledger_id = %self.ledger_id,
            last_confirmed = ?self.last_confirmed(),
            "ledger closed"
        );
        Ok(())
    }

    /// Build a lazy cursor over `[first, last]` (inclusive).
    ///
    /// Bounds are validated against the confirmed pointer snapshot taken
    /// now; no replica is contacted before the first
    /// [`next_entry`](ReadCursor::next_entry) call. The cursor is
    /// independent of this handle's position — calling `read_range`
    /// again re-issues all reads.
    pub fn read_range(&self, first: EntryId, last: EntryId) -> Result<ReadCursor, ClientError> {
        let last_confirmed = self.last_confirmed();
        let in_bounds = last_confirmed.is_some_and(|c| last <= c);
        if first > last || !in_bounds {
            return Err(ClientError::Range {
                first,
                last,
                last_confirmed,
            });
        }

        Ok(ReadCursor::new(
            Arc::clone(&self.transport),
            self.digester.clone(),
            self.ensemble.clone(),
            self.ledger_id,
            first,
            last,
            self.config.read_timeout(),
        ))
    }
}

impl Drop for LedgerHandle {
    fn drop(&mut self) {
        if self.writable && !self.closed.load(Ordering::Acquire) {
            warn!(
                ledger_id = %self.ledger_id,
                "writable ledger handle dropped without close; ledger left open in metadata"
            );
        }
    }
}
