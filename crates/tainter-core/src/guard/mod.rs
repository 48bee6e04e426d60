//! Cluster-wide saturation guard.
//!
//! A node is *affected* by a policy when it carries any of the policy's taint keys
//! (value and effect are not compared) or any of its labels with the same value.

use tainter_model::{Labels, NodeState, Policy, Taint};
use tracing::debug;

use crate::{cluster::ClusterClient, error::ReconcileError};

/// Number of nodes carrying any part of the marker.
pub fn affected_count(nodes: &[NodeState], taints: &[Taint], labels: &Labels) -> usize {
    nodes
        .iter()
        .filter(|node| {
            taints.iter().any(|t| node.has_taint_key(&t.key))
                || labels.iter().any(|(k, v)| node.has_label(k, v))
        })
        .count()
}

/// `true` once strictly more than `threshold` nodes are affected.
pub fn exceeded(nodes: &[NodeState], threshold: usize, taints: &[Taint], labels: &Labels) -> bool {
    affected_count(nodes, taints, labels) > threshold
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardDecision {
    pub affected: usize,
    pub threshold: usize,
    pub exceeded: bool,
}

/// Node listing taken once per cycle.
///
/// The snapshot is never adjusted for decisions made later in the same cycle.
#[derive(Debug, Clone)]
pub struct PolicyGuard {
    nodes: Vec<NodeState>,
}

impl PolicyGuard {
    pub fn new(nodes: Vec<NodeState>) -> Self {
        Self { nodes }
    }

    /// Lists cluster nodes; any failure is [`ReconcileError::UnknownClusterState`].
    pub async fn load(cluster: &dyn ClusterClient) -> Result<Self, ReconcileError> {
        let nodes = cluster
            .list_nodes()
            .await
            .map_err(ReconcileError::UnknownClusterState)?;
        debug!(target: "tainter_core::guard", nodes = nodes.len(), "cluster snapshot loaded");
        Ok(Self::new(nodes))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn check(&self, policy: &Policy) -> GuardDecision {
        let affected = affected_count(&self.nodes, &policy.taints, &policy.labels);
        GuardDecision {
            affected,
            threshold: policy.max_affected_node_count,
            exceeded: affected > policy.max_affected_node_count,
        }
    }
}
