//! Error types for transport operations.

use plume_types::ReplicaId;

/// Errors that can occur while talking to a replica.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The replica could not be reached (down, or unknown to the pool).
    #[error("replica {0} unreachable")]
    Unreachable(ReplicaId),

    /// Wire encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The replica reported a failure while handling the request.
    #[error("replica {replica} error: {detail}")]
    Remote {
        /// The replica that failed.
        replica: ReplicaId,
        /// Replica-side error description.
        detail: String,
    },
}
