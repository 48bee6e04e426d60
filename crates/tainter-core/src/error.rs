use thiserror::Error;

use tainter_model::ModelError;

/// Failure reported by a [`crate::ClusterClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Failure reported by a [`crate::Notifier`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Cycle-fatal reconciliation errors.
///
/// Script failures never show up here: they turn a policy into `Failed` and the cycle goes on.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("node {0} not found")]
    NodeNotFound(String),

    #[error("unknown cluster state: {0}")]
    UnknownClusterState(#[source] ClusterError),

    #[error("failed to commit node {node}: {source}")]
    NodeWriteConflict {
        node: String,
        #[source]
        source: ClusterError,
    },

    #[error("configuration error: {0}")]
    Configuration(#[from] ModelError),
}
