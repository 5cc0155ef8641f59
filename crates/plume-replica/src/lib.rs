//! Replica-side entry storage.
//!
//! Each member of a ledger's ensemble stores its copy of the entries
//! through the [`ReplicaStore`] trait. Two backends are provided:
//!
//! - [`MemoryReplica`] — volatile, with corruption-injection hooks for
//!   exercising the read path's fallback behavior.
//! - [`FileReplica`] — one file per entry with atomic writes and
//!   verify-on-read.
//!
//! Replicas also track a per-ledger confirmed pointer, advanced from the
//! last-add-confirmed value piggy-backed on incoming entries.

mod error;
mod file;
mod memory;
mod traits;

pub use error::ReplicaError;
pub use file::FileReplica;
pub use memory::MemoryReplica;
pub use traits::ReplicaStore;
