//! [`ReadCursor`] — lazy, in-order range reads with replica fallback.

use std::sync::Arc;
use std::time::Duration;

use plume_digest::Digester;
use plume_net::Transport;
use plume_types::{Entry, EntryId, LedgerId, ReplicaId};
use tracing::{debug, warn};

use crate::error::ClientError;

/// A lazy cursor over a closed range of confirmed entries.
///
/// Produced by [`LedgerHandle::read_range`]; yields entries in increasing
/// id order via [`next_entry`](Self::next_entry). The cursor holds no
/// position state beyond its own bounds — calling `read_range` again
/// produces a fresh cursor that re-issues all underlying reads.
///
/// [`LedgerHandle::read_range`]: crate::LedgerHandle::read_range
pub struct ReadCursor {
    transport: Arc<dyn Transport>,
    digester: Digester,
    ensemble: Vec<ReplicaId>,
    ledger_id: LedgerId,
    /// Next id to yield.
    next: u64,
    /// Inclusive upper bound.
    last: u64,
    read_timeout: Duration,
}

impl std::fmt::Debug for ReadCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadCursor")
            .field("ledger_id", &self.ledger_id)
            .field("ensemble", &self.ensemble)
            .field("next", &self.next)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl ReadCursor {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        digester: Digester,
        ensemble: Vec<ReplicaId>,
        ledger_id: LedgerId,
        first: EntryId,
        last: EntryId,
        read_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            digester,
            ensemble,
            ledger_id,
            next: first.0,
            last: last.0,
            read_timeout,
        }
    }

    /// Fetch the next entry of the range, or `None` past the end.
    ///
    /// Each call runs under the read deadline and falls over between
    /// replicas on transport failure, missing copy, or digest mismatch.
    pub async fn next_entry(&mut self) -> Result<Option<Entry>, ClientError> {
        if self.next > self.last {
            return Ok(None);
        }
        let entry_id = EntryId(self.next);

        let entry = tokio::time::timeout(self.read_timeout, self.read_one(entry_id))
            .await
            .map_err(|_| ClientError::Timeout(self.read_timeout))??;

        self.next += 1;
        Ok(Some(entry))
    }

    /// Read one entry, trying replicas in preference order.
    ///
    /// The preferred replica rotates with the entry id so sequential
    /// range reads spread across the ensemble instead of hammering one
    /// member.
    async fn read_one(&self, entry_id: EntryId) -> Result<Entry, ClientError> {
        let n = self.ensemble.len();
        let preferred = (entry_id.0 as usize) % n;
        let mut saw_mismatch = false;

        for i in 0..n {
            let replica = self.ensemble[(preferred + i) % n];
            match self
                .transport
                .read_entry(replica, self.ledger_id, entry_id)
                .await
            {
                Ok(Some(entry)) => match self.digester.verify(&entry) {
                    Ok(()) => {
                        debug!(
                            %replica,
                            ledger_id = %self.ledger_id,
                            %entry_id,
                            "entry read"
                        );
                        return Ok(entry);
                    }
                    Err(e) => {
                        // This copy is bad for good; fall over, don't retry it.
                        warn!(
                            %replica,
                            ledger_id = %self.ledger_id,
                            %entry_id,
                            %e,
                            "digest mismatch, falling over to next replica"
                        );
                        saw_mismatch = true;
                    }
                },
                Ok(None) => {
                    debug!(%replica, %entry_id, "replica has no copy");
                }
                Err(e) => {
                    warn!(%replica, %entry_id, %e, "replica read failed, falling over");
                }
            }
        }

        if saw_mismatch {
            Err(ClientError::DigestMismatch {
                ledger_id: self.ledger_id,
                entry_id,
            })
        } else {
            Err(ClientError::EntryUnavailable {
                ledger_id: self.ledger_id,
                entry_id,
            })
        }
    }
}
