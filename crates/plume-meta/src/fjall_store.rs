//! [`FjallMetaStore`] — persistent metadata store on Fjall keyspaces.

use std::path::Path;
use std::sync::Mutex;

use fjall::{Database, Keyspace, KeyspaceCreateOptions};
use plume_types::{EntryId, LedgerId, LedgerMetadata, LedgerState};
use tracing::debug;

use crate::error::MetaError;
use crate::traits::MetadataStore;

type Result<T> = std::result::Result<T, MetaError>;

/// Key of the id counter in the `allocator` keyspace.
const NEXT_ID_KEY: &[u8] = b"next_ledger_id";

/// Persistent metadata store backed by Fjall.
///
/// Two keyspaces:
/// - `ledgers` — ledger id (8 bytes big-endian) → serialized [`LedgerMetadata`].
/// - `allocator` — the monotonic ledger id counter.
pub struct FjallMetaStore {
    /// The underlying Fjall database handle.
    #[allow(dead_code)]
    db: Database,
    ledgers: Keyspace,
    allocator: Keyspace,
    /// Serializes the read-modify-write of the id counter.
    alloc_lock: Mutex<()>,
}

impl FjallMetaStore {
    /// Open a persistent store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::builder(path).open()?;
        Self::init_keyspaces(db)
    }

    /// Open a temporary store that is cleaned up on drop.
    ///
    /// Useful for tests.
    pub fn open_temporary() -> Result<Self> {
        let tmp = tempfile::tempdir().map_err(std::io::Error::other)?;
        let db = Database::builder(tmp.path()).temporary(true).open()?;
        Self::init_keyspaces(db)
    }

    fn init_keyspaces(db: Database) -> Result<Self> {
        let ledgers = db.keyspace("ledgers", KeyspaceCreateOptions::default)?;
        let allocator = db.keyspace("allocator", KeyspaceCreateOptions::default)?;
        Ok(Self {
            db,
            ledgers,
            allocator,
            alloc_lock: Mutex::new(()),
        })
    }

    fn ledger_key(id: LedgerId) -> [u8; 8] {
        id.0.to_be_bytes()
    }

    fn read_metadata(&self, id: LedgerId) -> Result<Option<LedgerMetadata>> {
        match self.ledgers.get(Self::ledger_key(id))? {
            Some(bytes) => Ok(Some(postcard::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_metadata(&self, metadata: &LedgerMetadata) -> Result<()> {
        let value = postcard::to_allocvec(metadata)?;
        self.ledgers
            .insert(Self::ledger_key(metadata.ledger_id), value.as_slice())?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MetadataStore for FjallMetaStore {
    async fn allocate_ledger_id(&self) -> Result<LedgerId> {
        let _guard = self.alloc_lock.lock().expect("allocator lock poisoned");

        let next = match self.allocator.get(NEXT_ID_KEY)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes[..8].try_into().expect("counter is 8 bytes");
                u64::from_be_bytes(arr)
            }
            None => 0,
        };

        self.allocator
            .insert(NEXT_ID_KEY, (next + 1).to_be_bytes().as_slice())?;

        let id = LedgerId(next);
        debug!(ledger_id = %id, "allocated ledger id");
        Ok(id)
    }

    async fn create_ledger(&self, metadata: &LedgerMetadata) -> Result<()> {
        if self.read_metadata(metadata.ledger_id)?.is_some() {
            return Err(MetaError::AlreadyExists(metadata.ledger_id));
        }
        self.write_metadata(metadata)?;
        debug!(ledger_id = %metadata.ledger_id, "created ledger metadata");
        Ok(())
    }

    async fn get_ledger(&self, id: LedgerId) -> Result<Option<LedgerMetadata>> {
        self.read_metadata(id)
    }

    async fn mark_closed(&self, id: LedgerId, last_confirmed: Option<EntryId>) -> Result<()> {
        let mut meta = self.read_metadata(id)?.ok_or(MetaError::UnknownLedger(id))?;
        if meta.state == LedgerState::Closed {
            return Ok(());
        }
        meta.state = LedgerState::Closed;
        meta.last_confirmed = last_confirmed;
        self.write_metadata(&meta)?;
        debug!(ledger_id = %id, ?last_confirmed, "marked ledger closed");
        Ok(())
    }
}
