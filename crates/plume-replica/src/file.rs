//! File-based replica storage backend.
//!
//! Stores one file per entry under `{base_dir}/{ledger_id}/{entry_id}.ent`,
//! plus a per-ledger `confirmed` pointer file. Writes are atomic: data is
//! written to a temporary file first, then renamed into place, so partial
//! writes never leave a half-written entry visible.

use std::path::{Path, PathBuf};

use plume_types::{Entry, EntryId, LedgerId};
use tracing::{debug, error};

use crate::error::ReplicaError;
use crate::traits::ReplicaStore;

/// File-based replica store.
///
/// Each entry file starts with a 32-byte BLAKE3 checksum of the serialized
/// record; the checksum is re-verified on every read and a mismatch is
/// reported as [`ReplicaError::CorruptEntry`], so a damaged copy is never
/// returned to the reader.
pub struct FileReplica {
    base_dir: PathBuf,
}

impl FileReplica {
    /// Create a replica store rooted at the given directory.
    ///
    /// The directory is created if it does not exist.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, ReplicaError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn ledger_dir(&self, ledger_id: LedgerId) -> PathBuf {
        self.base_dir.join(ledger_id.0.to_string())
    }

    /// Zero-padded so lexicographic file order matches entry id order.
    fn entry_path(&self, ledger_id: LedgerId, entry_id: EntryId) -> PathBuf {
        self.ledger_dir(ledger_id)
            .join(format!("{:020}.ent", entry_id.0))
    }

    fn confirmed_path(&self, ledger_id: LedgerId) -> PathBuf {
        self.ledger_dir(ledger_id).join("confirmed")
    }

    async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), ReplicaError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    async fn read_confirmed(&self, ledger_id: LedgerId) -> Result<Option<EntryId>, ReplicaError> {
        match tokio::fs::read(self.confirmed_path(ledger_id)).await {
            Ok(bytes) if bytes.len() == 8 => {
                let arr: [u8; 8] = bytes[..8].try_into().expect("checked length");
                Ok(Some(EntryId(u64::from_be_bytes(arr))))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ReplicaError::Io(e)),
        }
    }
}

#[async_trait::async_trait]
impl ReplicaStore for FileReplica {
    async fn put_entry(&self, entry: &Entry) -> Result<(), ReplicaError> {
        let record = postcard::to_allocvec(entry)?;
        let checksum = blake3::hash(&record);

        let mut data = Vec::with_capacity(32 + record.len());
        data.extend_from_slice(checksum.as_bytes());
        data.extend_from_slice(&record);

        let path = self.entry_path(entry.ledger_id, entry.entry_id);
        Self::write_atomic(&path, &data).await?;

        // Advance the confirmed pointer from the piggy-backed lac.
        if let Some(lac) = entry.last_confirmed {
            let current = self.read_confirmed(entry.ledger_id).await?;
            if current.is_none_or(|c| lac > c) {
                Self::write_atomic(
                    &self.confirmed_path(entry.ledger_id),
                    &lac.0.to_be_bytes(),
                )
                .await?;
            }
        }

        debug!(
            ledger_id = %entry.ledger_id,
            entry_id = %entry.entry_id,
            path = %path.display(),
            size = entry.payload.len(),
            "stored entry to file"
        );
        Ok(())
    }

    async fn get_entry(
        &self,
        ledger_id: LedgerId,
        entry_id: EntryId,
    ) -> Result<Option<Entry>, ReplicaError> {
        let path = self.entry_path(ledger_id, entry_id);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ReplicaError::Io(e)),
        };

        if data.len() < 32 {
            error!(%ledger_id, %entry_id, "entry file truncated below checksum header");
            return Err(ReplicaError::CorruptEntry {
                ledger_id,
                entry_id,
            });
        }

        let (checksum, record) = data.split_at(32);
        if blake3::hash(record).as_bytes() != checksum {
            error!(%ledger_id, %entry_id, "entry corruption detected on read");
            return Err(ReplicaError::CorruptEntry {
                ledger_id,
                entry_id,
            });
        }

        Ok(Some(postcard::from_bytes(record)?))
    }

    async fn contains(
        &self,
        ledger_id: LedgerId,
        entry_id: EntryId,
    ) -> Result<bool, ReplicaError> {
        let path = self.entry_path(ledger_id, entry_id);
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ReplicaError::Io(e)),
        }
    }

    async fn last_entry_id(&self, ledger_id: LedgerId) -> Result<Option<EntryId>, ReplicaError> {
        let dir = self.ledger_dir(ledger_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ReplicaError::Io(e)),
        };

        let mut last: Option<EntryId> = None;
        while let Some(dirent) = entries.next_entry().await? {
            let name = dirent.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".ent") else {
                continue;
            };
            if let Ok(id) = stem.parse::<u64>() {
                let id = EntryId(id);
                if last.is_none_or(|l| id > l) {
                    last = Some(id);
                }
            }
        }
        Ok(last)
    }

    async fn confirmed(&self, ledger_id: LedgerId) -> Result<Option<EntryId>, ReplicaError> {
        self.read_confirmed(ledger_id).await
    }
}
