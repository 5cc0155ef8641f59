//! Transport seam between the client and a ledger's replica ensemble.
//!
//! This crate defines the point-to-point [`Transport`] trait the quorum
//! writer and read cursor talk through, and [`LocalTransport`] — an
//! in-process ensemble that routes postcard-encoded entries to
//! [`ReplicaStore`]s through a shared connection pool, with per-replica
//! outage and latency injection for tests.
//!
//! Real network transport to storage nodes is an external collaborator;
//! the trait keeps that seam substitutable.
//!
//! [`ReplicaStore`]: plume_replica::ReplicaStore

mod error;
mod local;
mod traits;

pub use error::NetError;
pub use local::LocalTransport;
pub use traits::Transport;
