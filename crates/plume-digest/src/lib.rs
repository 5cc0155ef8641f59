//! Entry authentication tags.
//!
//! Every entry carries a digest binding `(ledger_id, entry_id,
//! last_confirmed, payload)`. Replicas verify it before acknowledging an
//! add, and readers verify it before trusting a fetched copy, so a
//! corrupted or tampered entry is detected at both ends of the pipeline.
//!
//! Two tag types are supported:
//! - [`DigestType::Mac`] — keyed BLAKE3 with a password-derived key.
//! - [`DigestType::Crc32`] — plain CRC32, corruption detection only.
//!
//! [`DigestType::Mac`]: plume_types::DigestType::Mac
//! [`DigestType::Crc32`]: plume_types::DigestType::Crc32

mod digester;
mod error;

pub use digester::Digester;
pub use error::DigestError;
