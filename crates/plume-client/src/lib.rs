//! Single-writer replicated-log client core.
//!
//! This crate ties the Plume collaborators together into the client
//! primitive:
//!
//! - [`PlumeClient`] — process-wide shared state (metadata store,
//!   transport, replica pool, tuning); creates and opens ledgers.
//! - [`LedgerHandle`] — one ledger's write/read cursor and durability
//!   bookkeeping.
//! - [`QuorumWriter`] — fans an entry out to the ensemble and collects
//!   acknowledgements until the ack quorum is met.
//! - [`ReadCursor`] — lazy in-order range reads with automatic replica
//!   fallback and digest verification.
//!
//! The append path is single-writer: appends on one handle are
//! serialized first-in-first-out internally; reads run unrestricted
//! against a confirmed-pointer snapshot.

mod ack;
mod client;
mod cursor;
mod error;
mod handle;
mod quorum;

pub use ack::AckTracker;
pub use client::PlumeClient;
pub use cursor::ReadCursor;
pub use error::ClientError;
pub use handle::LedgerHandle;
pub use quorum::QuorumWriter;
