//! TOML configuration for the Plume exerciser.
//!
//! Every section has defaults suitable for a local three-replica
//! ensemble, so the binary runs without any config file at all.

use std::path::{Path, PathBuf};

use plume_types::{ClientConfig, DigestType, QuorumConfig};
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Replica pool and storage backend.
    pub storage: StorageSection,
    /// Replication parameters for new ledgers.
    pub quorum: QuorumSection,
    /// Digest type and ledger password.
    pub digest: DigestSection,
    /// Write/read deadlines and retry tuning.
    pub timeouts: TimeoutsSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[storage]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Backend type: `"file"` (default) or `"memory"`.
    pub backend: String,
    /// Directory for persistent data (metadata DB, replica entry files).
    pub data_dir: PathBuf,
    /// Number of replicas in the local pool.
    pub replicas: u32,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            data_dir: PathBuf::from(".plume"),
            replicas: 3,
        }
    }
}

/// `[quorum]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QuorumSection {
    /// Ensemble size (E).
    pub ensemble: u8,
    /// Write quorum (W).
    pub write: u8,
    /// Ack quorum (A).
    pub ack: u8,
}

impl Default for QuorumSection {
    fn default() -> Self {
        Self {
            ensemble: 3,
            write: 2,
            ack: 2,
        }
    }
}

/// `[digest]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DigestSection {
    /// Digest type: `"mac"` (default) or `"crc32"`.
    pub kind: String,
    /// Ledger password for entry authentication.
    pub password: String,
}

impl Default for DigestSection {
    fn default() -> Self {
        Self {
            kind: "mac".to_string(),
            password: "some-password".to_string(),
        }
    }
}

/// `[timeouts]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimeoutsSection {
    /// Deadline for one quorum write, in milliseconds.
    pub write_ms: u64,
    /// Deadline for one per-entry read, in milliseconds.
    pub read_ms: u64,
    /// Base backoff before retrying a failed replica send, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        let defaults = ClientConfig::default();
        Self {
            write_ms: defaults.write_timeout_ms,
            read_ms: defaults.read_timeout_ms,
            retry_backoff_ms: defaults.retry_backoff_ms,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)?;
                Ok(toml::from_str(&text)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// The quorum configuration for new ledgers.
    pub fn quorum_config(&self) -> QuorumConfig {
        QuorumConfig {
            ensemble: self.quorum.ensemble,
            write_quorum: self.quorum.write,
            ack_quorum: self.quorum.ack,
        }
    }

    /// The configured digest type.
    pub fn digest_type(&self) -> anyhow::Result<DigestType> {
        match self.digest.kind.as_str() {
            "mac" => Ok(DigestType::Mac),
            "crc32" => Ok(DigestType::Crc32),
            other => anyhow::bail!("unknown digest type {other:?} (expected \"mac\" or \"crc32\")"),
        }
    }

    /// The client-side timeout tuning.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            write_timeout_ms: self.timeouts.write_ms,
            read_timeout_ms: self.timeouts.read_ms,
            retry_backoff_ms: self.timeouts.retry_backoff_ms,
        }
    }
}
