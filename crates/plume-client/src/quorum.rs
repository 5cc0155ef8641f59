//! [`QuorumWriter`] — entry fan-out and acknowledgement counting.

use std::sync::Arc;
use std::time::Duration;

use plume_net::{NetError, Transport};
use plume_types::{ClientConfig, Entry, QuorumConfig, ReplicaId};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Delivers one entry to the ensemble and tracks the ack quorum.
///
/// Sends run as independent concurrent tasks, one per replica; the writer
/// returns as soon as the first `ack_quorum` distinct acknowledgements
/// arrive. Stragglers past the quorum are not awaited — their results
/// land on a channel whose receiver is gone and are discarded harmlessly.
pub struct QuorumWriter {
    transport: Arc<dyn Transport>,
    ensemble: Vec<ReplicaId>,
    quorum: QuorumConfig,
    config: ClientConfig,
}

impl QuorumWriter {
    /// Build a writer for one ledger's ensemble.
    pub fn new(
        transport: Arc<dyn Transport>,
        ensemble: Vec<ReplicaId>,
        quorum: QuorumConfig,
        config: ClientConfig,
    ) -> Self {
        Self {
            transport,
            ensemble,
            quorum,
            config,
        }
    }

    /// Fan the entry out and wait for the ack quorum.
    ///
    /// Returns the number of acknowledgements collected when the quorum
    /// was met (at least `ack_quorum`; more if stragglers raced the
    /// decision). Acks are order-independent — any `ack_quorum` distinct
    /// replicas satisfy the quorum.
    pub async fn write(&self, entry: &Entry) -> Result<usize, ClientError> {
        let required = usize::from(self.quorum.ack_quorum);
        let write_quorum = usize::from(self.quorum.write_quorum);
        let ensemble_size = self.ensemble.len();
        // One failure beyond these and the respective quorum is unmeetable.
        let ack_headroom = ensemble_size - required;
        let write_headroom = ensemble_size - write_quorum;

        let (tx, mut rx) = mpsc::channel::<(ReplicaId, Result<(), NetError>)>(ensemble_size);

        for &replica in &self.ensemble {
            let transport = Arc::clone(&self.transport);
            let entry = entry.clone();
            let backoff = self.config.retry_backoff();
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = send_with_retry(transport.as_ref(), replica, &entry, backoff).await;
                // The receiver is dropped once the quorum is decided;
                // a failed send here is a late straggler being discarded.
                let _ = tx.send((replica, result)).await;
            });
        }
        drop(tx);

        let deadline = Instant::now() + self.config.write_timeout();
        let mut acks = 0usize;
        let mut failures = 0usize;

        loop {
            let outcome = match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(outcome)) => outcome,
                // Channel drained: every send task finished below quorum.
                Ok(None) => {
                    return Err(ClientError::QuorumUnavailable {
                        ledger_id: entry.ledger_id,
                        entry_id: entry.entry_id,
                        acks,
                        required,
                    });
                }
                // Write deadline elapsed; outstanding sends are abandoned.
                Err(_) => {
                    warn!(
                        ledger_id = %entry.ledger_id,
                        entry_id = %entry.entry_id,
                        acks, required,
                        "write deadline elapsed before ack quorum"
                    );
                    return Err(ClientError::QuorumUnavailable {
                        ledger_id: entry.ledger_id,
                        entry_id: entry.entry_id,
                        acks,
                        required,
                    });
                }
            };

            match outcome {
                (replica, Ok(())) => {
                    acks += 1;
                    debug!(
                        %replica,
                        ledger_id = %entry.ledger_id,
                        entry_id = %entry.entry_id,
                        acks,
                        "replica ack"
                    );
                    if acks >= required {
                        if failures > write_headroom {
                            // Quorum met, but fewer than the write quorum
                            // of replicas can ever accept this entry.
                            return Err(ClientError::InsufficientReplicas {
                                ledger_id: entry.ledger_id,
                                entry_id: entry.entry_id,
                                required: write_quorum,
                                failures,
                            });
                        }
                        return Ok(acks);
                    }
                }
                (replica, Err(e)) => {
                    failures += 1;
                    warn!(
                        %replica,
                        ledger_id = %entry.ledger_id,
                        entry_id = %entry.entry_id,
                        failures,
                        %e,
                        "replica send permanently failed"
                    );
                    if failures > ack_headroom {
                        return Err(ClientError::QuorumUnavailable {
                            ledger_id: entry.ledger_id,
                            entry_id: entry.entry_id,
                            acks,
                            required,
                        });
                    }
                }
            }
        }
    }
}

/// Send an entry to one replica, retrying once with jittered backoff.
async fn send_with_retry(
    transport: &dyn Transport,
    replica: ReplicaId,
    entry: &Entry,
    backoff: Duration,
) -> Result<(), NetError> {
    match transport.add_entry(replica, entry).await {
        Ok(()) => Ok(()),
        Err(first) => {
            debug!(%replica, error = %first, "send failed, retrying once");
            tokio::time::sleep(jittered(backoff)).await;
            transport.add_entry(replica, entry).await
        }
    }
}

/// Backoff plus up to 50% random jitter, so retries against a struggling
/// replica do not land in lockstep.
fn jittered(backoff: Duration) -> Duration {
    let base = backoff.as_millis() as u64;
    if base == 0 {
        return backoff;
    }
    let jitter = rand::rng().random_range(0..=base / 2);
    Duration::from_millis(base + jitter)
}
