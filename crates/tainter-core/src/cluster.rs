use async_trait::async_trait;
use tainter_model::NodeState;

use crate::error::ClusterError;

/// Read/write access to cluster node records.
///
/// The cluster is the only source of truth: implementations must not cache between calls.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetches one node by name.
    async fn get_node(&self, name: &str) -> Result<NodeState, ClusterError>;

    /// Lists every node in the cluster.
    async fn list_nodes(&self) -> Result<Vec<NodeState>, ClusterError>;

    /// Replaces the node's taints and labels in a single write.
    ///
    /// `node.resource_version`, when set, is a precondition; a mismatch yields [`ClusterError::Conflict`].
    async fn update_node(&self, node: &NodeState) -> Result<(), ClusterError>;
}
