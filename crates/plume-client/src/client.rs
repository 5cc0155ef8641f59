//! [`PlumeClient`] — process-wide client state shared by all ledgers.

use std::sync::Arc;

use plume_digest::Digester;
use plume_meta::MetadataStore;
use plume_net::Transport;
use plume_types::{
    ClientConfig, DigestType, EntryId, LedgerId, LedgerMetadata, LedgerState, QuorumConfig,
    ReplicaId,
};
use tracing::{debug, info};

use crate::error::ClientError;
use crate::handle::LedgerHandle;

/// The shared client a process creates once and opens all ledgers through.
///
/// Owns the metadata collaborator, the transport (with its pooled
/// connections), the replica pool ensembles are drawn from, and the
/// client-wide tuning. Handles returned by [`create_ledger`] and
/// [`open_ledger`] share these resources; closing a handle never tears
/// them down.
///
/// [`create_ledger`]: Self::create_ledger
/// [`open_ledger`]: Self::open_ledger
pub struct PlumeClient {
    meta: Arc<dyn MetadataStore>,
    transport: Arc<dyn Transport>,
    /// Replicas available for ensemble selection, in id order.
    replicas: Vec<ReplicaId>,
    config: ClientConfig,
}

impl PlumeClient {
    /// Build a client over the given collaborators and replica pool.
    pub fn new(
        meta: Arc<dyn MetadataStore>,
        transport: Arc<dyn Transport>,
        replicas: Vec<ReplicaId>,
        config: ClientConfig,
    ) -> Self {
        Self {
            meta,
            transport,
            replicas,
            config,
        }
    }

    /// Create a new ledger and return a writable handle to it.
    ///
    /// The quorum invariant is checked before the metadata collaborator
    /// is contacted. The ensemble is drawn from the replica pool,
    /// rotated by ledger id so consecutive ledgers spread across
    /// replicas.
    pub async fn create_ledger(
        &self,
        quorum: QuorumConfig,
        digest_type: DigestType,
        password: &[u8],
    ) -> Result<LedgerHandle, ClientError> {
        quorum.validate()?;

        let needed = usize::from(quorum.ensemble);
        if self.replicas.len() < needed {
            return Err(ClientError::NotEnoughReplicas {
                needed,
                available: self.replicas.len(),
            });
        }

        let ledger_id = self.meta.allocate_ledger_id().await?;
        let ensemble = self.select_ensemble(ledger_id, needed);

        let metadata = LedgerMetadata {
            ledger_id,
            quorum,
            digest_type,
            password_hash: LedgerMetadata::hash_password(password),
            ensemble: ensemble.clone(),
            state: LedgerState::Open,
            last_confirmed: None,
        };
        self.meta.create_ledger(&metadata).await?;

        info!(
            %ledger_id,
            ensemble = quorum.ensemble,
            write_quorum = quorum.write_quorum,
            ack_quorum = quorum.ack_quorum,
            %digest_type,
            "created ledger"
        );

        Ok(LedgerHandle::new(
            ledger_id,
            quorum,
            Digester::new(digest_type, password),
            ensemble,
            Arc::clone(&self.meta),
            Arc::clone(&self.transport),
            self.config,
            true,
            None,
        ))
    }

    /// Open an existing ledger for reading.
    ///
    /// Fails with [`ClientError::NotFound`] for an unknown id and
    /// [`ClientError::Auth`] when the digest type or password does not
    /// match the stored metadata. For a closed ledger the confirmed
    /// pointer comes from metadata; for a ledger still open elsewhere it
    /// is discovered as the highest confirmed pointer any ensemble
    /// replica reports.
    pub async fn open_ledger(
        &self,
        ledger_id: LedgerId,
        digest_type: DigestType,
        password: &[u8],
    ) -> Result<LedgerHandle, ClientError> {
        let metadata = self
            .meta
            .get_ledger(ledger_id)
            .await?
            .ok_or(ClientError::NotFound(ledger_id))?;

        if metadata.digest_type != digest_type
            || metadata.password_hash != LedgerMetadata::hash_password(password)
        {
            return Err(ClientError::Auth(ledger_id));
        }

        let last_confirmed = match metadata.state {
            LedgerState::Closed => metadata.last_confirmed,
            LedgerState::Open => self.discover_confirmed(ledger_id, &metadata.ensemble).await,
        };

        info!(%ledger_id, ?last_confirmed, state = ?metadata.state, "opened ledger");

        Ok(LedgerHandle::new(
            ledger_id,
            metadata.quorum,
            Digester::new(digest_type, password),
            metadata.ensemble,
            Arc::clone(&self.meta),
            Arc::clone(&self.transport),
            self.config,
            false,
            last_confirmed,
        ))
    }

    /// Draw an ensemble from the pool, starting at an offset rotated by
    /// ledger id and wrapping around.
    fn select_ensemble(&self, ledger_id: LedgerId, size: usize) -> Vec<ReplicaId> {
        let n = self.replicas.len();
        let start = (ledger_id.0 as usize) % n;
        (0..size)
            .map(|i| self.replicas[(start + i) % n])
            .collect()
    }

    /// Highest confirmed pointer any reachable ensemble replica reports.
    ///
    /// Unreachable replicas are skipped; the pointer a replica holds can
    /// trail the writer's by one entry, since it is advanced from values
    /// piggy-backed on subsequent adds.
    async fn discover_confirmed(
        &self,
        ledger_id: LedgerId,
        ensemble: &[ReplicaId],
    ) -> Option<EntryId> {
        let mut best: Option<EntryId> = None;
        for &replica in ensemble {
            match self.transport.read_confirmed(replica, ledger_id).await {
                Ok(Some(confirmed)) if best.is_none_or(|b| confirmed > b) => {
                    best = Some(confirmed);
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(%replica, %ledger_id, %e, "confirmed-pointer probe failed");
                }
            }
        }
        best
    }
}
