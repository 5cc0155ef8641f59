//! Shared types and identifiers for Plume.
//!
//! This crate defines the core vocabulary used across the Plume workspace:
//! identifiers ([`LedgerId`], [`EntryId`], [`ReplicaId`]), the quorum
//! configuration ([`QuorumConfig`]), ledger metadata ([`LedgerMetadata`],
//! [`LedgerState`]), the entry record ([`Entry`]), and client-side tuning
//! ([`ClientConfig`]).

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ID types
// ---------------------------------------------------------------------------

/// Identifier of a ledger, allocated monotonically by the metadata store.
///
/// Unique across the service for its lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct LedgerId(pub u64);

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerId({})", self.0)
    }
}

/// Identifier of an entry within a ledger.
///
/// Assigned sequentially by the writer, starting at 0. The position before
/// the first entry ("nothing confirmed yet") is represented as
/// `Option::<EntryId>::None` throughout the workspace.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl EntryId {
    /// The id following this one.
    pub fn next(self) -> EntryId {
        EntryId(self.0 + 1)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

/// Identifier of a replica in a ledger's ensemble.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ReplicaId(pub u32);

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl fmt::Debug for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReplicaId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Quorum configuration
// ---------------------------------------------------------------------------

/// The quorum invariant `1 ≤ ack ≤ write ≤ ensemble` was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error(
    "invalid quorum configuration: ensemble={ensemble}, write={write_quorum}, ack={ack_quorum} \
     (requires 1 <= ack <= write <= ensemble)"
)]
pub struct InvalidQuorumConfig {
    /// Requested ensemble size.
    pub ensemble: u8,
    /// Requested write quorum.
    pub write_quorum: u8,
    /// Requested ack quorum.
    pub ack_quorum: u8,
}

/// Replication parameters of a ledger.
///
/// Every entry is fanned out to the `ensemble` replicas; an append is
/// durable once `ack_quorum` distinct replicas acknowledge it, and fails
/// outright if fewer than `write_quorum` replicas ever accept it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumConfig {
    /// Number of replicas assigned to the ledger (E).
    pub ensemble: u8,
    /// Number of replicas an entry must be accepted by (W).
    pub write_quorum: u8,
    /// Number of acknowledgements required for durability (A).
    pub ack_quorum: u8,
}

impl QuorumConfig {
    /// Build a validated quorum configuration.
    pub fn new(ensemble: u8, write_quorum: u8, ack_quorum: u8) -> Result<Self, InvalidQuorumConfig> {
        let config = Self {
            ensemble,
            write_quorum,
            ack_quorum,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the `1 ≤ A ≤ W ≤ E` invariant.
    pub fn validate(&self) -> Result<(), InvalidQuorumConfig> {
        if self.ack_quorum >= 1
            && self.ack_quorum <= self.write_quorum
            && self.write_quorum <= self.ensemble
        {
            Ok(())
        } else {
            Err(InvalidQuorumConfig {
                ensemble: self.ensemble,
                write_quorum: self.write_quorum,
                ack_quorum: self.ack_quorum,
            })
        }
    }

    /// Maximum number of replicas that may fail while the ack quorum
    /// remains reachable.
    pub fn max_failures(&self) -> usize {
        usize::from(self.ensemble) - usize::from(self.ack_quorum)
    }
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            ensemble: 3,
            write_quorum: 2,
            ack_quorum: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Digest type
// ---------------------------------------------------------------------------

/// Which authentication tag protects a ledger's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigestType {
    /// Keyed BLAKE3 MAC; the key is derived from the ledger password.
    Mac,
    /// CRC32 checksum; detects corruption but not tampering.
    Crc32,
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestType::Mac => write!(f, "mac"),
            DigestType::Crc32 => write!(f, "crc32"),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger metadata
// ---------------------------------------------------------------------------

/// Lifecycle state of a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerState {
    /// The ledger accepts appends from its single writer.
    Open,
    /// The ledger has been closed; its contents are immutable.
    Closed,
}

/// Metadata record of a ledger, held by the metadata store.
///
/// Mutated only by `mark_closed`; everything else is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMetadata {
    /// The ledger's identifier.
    pub ledger_id: LedgerId,
    /// Replication parameters.
    pub quorum: QuorumConfig,
    /// Digest type protecting the entries.
    pub digest_type: DigestType,
    /// BLAKE3 hash of the ledger password. The password itself is never
    /// persisted.
    pub password_hash: [u8; 32],
    /// The replicas assigned to store this ledger's entries.
    pub ensemble: Vec<ReplicaId>,
    /// Open/closed state.
    pub state: LedgerState,
    /// Last confirmed entry id recorded at close time; `None` while open
    /// or if the ledger was closed empty.
    pub last_confirmed: Option<EntryId>,
}

impl LedgerMetadata {
    /// Hash a password for storage/comparison.
    pub fn hash_password(password: &[u8]) -> [u8; 32] {
        blake3::hash(password).into()
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A single ledger entry as sent to and stored on replicas.
///
/// `last_confirmed` carries the writer's confirmed pointer at the time of
/// the write, letting replicas advance their own view without extra
/// round-trips. The digest binds `(ledger_id, entry_id, last_confirmed,
/// payload)` and is verified by replicas on add and by readers on fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The ledger this entry belongs to.
    pub ledger_id: LedgerId,
    /// Position within the ledger.
    pub entry_id: EntryId,
    /// The writer's last confirmed entry at the time of this write.
    pub last_confirmed: Option<EntryId>,
    /// Opaque payload bytes.
    pub payload: Bytes,
    /// Authentication tag over id + payload (see `plume-digest`).
    pub digest: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Client-side tuning knobs shared by all ledgers of one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Deadline for one quorum write, in milliseconds.
    pub write_timeout_ms: u64,
    /// Deadline for one per-entry read, in milliseconds.
    pub read_timeout_ms: u64,
    /// Base backoff before retrying a failed replica send, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl ClientConfig {
    /// The write deadline as a [`Duration`].
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// The read deadline as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// The retry backoff as a [`Duration`].
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            write_timeout_ms: 5_000,
            read_timeout_ms: 5_000,
            retry_backoff_ms: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
