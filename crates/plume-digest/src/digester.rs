//! [`Digester`] — computes and verifies entry authentication tags.

use bytes::Bytes;
use plume_types::{DigestType, Entry, EntryId, LedgerId};

use crate::error::DigestError;

/// Sentinel encoded in the digest frame when no entry is confirmed yet.
///
/// Entry ids are writer-assigned and far below this value in any real
/// ledger, so the sentinel cannot collide with a confirmed id.
const NO_LAC: u64 = u64::MAX;

/// Computes and verifies the authentication tag of entries for one ledger.
///
/// Cheap to clone; the MAC key is derived once from the ledger password at
/// construction time.
#[derive(Clone)]
pub struct Digester {
    digest_type: DigestType,
    /// Keyed-BLAKE3 key, derived as `blake3(password)`. Unused for CRC32.
    mac_key: [u8; 32],
}

impl Digester {
    /// Create a digester for the given digest type and ledger password.
    pub fn new(digest_type: DigestType, password: &[u8]) -> Self {
        Self {
            digest_type,
            mac_key: blake3::hash(password).into(),
        }
    }

    /// Tag length in bytes for this digester's type.
    pub fn tag_len(&self) -> usize {
        match self.digest_type {
            DigestType::Mac => 32,
            DigestType::Crc32 => 4,
        }
    }

    /// Compute the tag over `(ledger_id, entry_id, last_confirmed, payload)`.
    pub fn compute(
        &self,
        ledger_id: LedgerId,
        entry_id: EntryId,
        last_confirmed: Option<EntryId>,
        payload: &[u8],
    ) -> Vec<u8> {
        let lac = last_confirmed.map_or(NO_LAC, |id| id.0);
        match self.digest_type {
            DigestType::Mac => {
                let mut hasher = blake3::Hasher::new_keyed(&self.mac_key);
                hasher.update(&ledger_id.0.to_be_bytes());
                hasher.update(&entry_id.0.to_be_bytes());
                hasher.update(&lac.to_be_bytes());
                hasher.update(payload);
                hasher.finalize().as_bytes().to_vec()
            }
            DigestType::Crc32 => {
                let mut hasher = crc32fast::Hasher::new();
                hasher.update(&ledger_id.0.to_be_bytes());
                hasher.update(&entry_id.0.to_be_bytes());
                hasher.update(&lac.to_be_bytes());
                hasher.update(payload);
                hasher.finalize().to_be_bytes().to_vec()
            }
        }
    }

    /// Build a sealed [`Entry`] with its tag filled in.
    pub fn seal(
        &self,
        ledger_id: LedgerId,
        entry_id: EntryId,
        last_confirmed: Option<EntryId>,
        payload: Bytes,
    ) -> Entry {
        let digest = self.compute(ledger_id, entry_id, last_confirmed, &payload);
        Entry {
            ledger_id,
            entry_id,
            last_confirmed,
            payload,
            digest,
        }
    }

    /// Verify an entry's tag against its contents.
    pub fn verify(&self, entry: &Entry) -> Result<(), DigestError> {
        if entry.digest.len() != self.tag_len() {
            return Err(DigestError::MalformedTag {
                ledger_id: entry.ledger_id,
                entry_id: entry.entry_id,
                expected: self.tag_len(),
                actual: entry.digest.len(),
            });
        }

        let expected = self.compute(
            entry.ledger_id,
            entry.entry_id,
            entry.last_confirmed,
            &entry.payload,
        );
        if expected == entry.digest {
            Ok(())
        } else {
            Err(DigestError::Mismatch {
                ledger_id: entry.ledger_id,
                entry_id: entry.entry_id,
            })
        }
    }
}
