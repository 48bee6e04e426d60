use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Labels, Taint};

/// Terminal state of one policy within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyStatus {
    /// Not yet evaluated.
    Pending,
    /// The node does not match the policy's target selector.
    NotApplicable,
    /// The affected node ceiling is already exceeded; nothing was run or changed.
    Skipped,
    /// All scripts succeeded; the marker is cleared.
    Passed,
    /// A script failed or timed out; the marker is applied.
    Failed,
}

impl PolicyStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PolicyStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyStatus::Pending => "pending",
            PolicyStatus::NotApplicable => "not-applicable",
            PolicyStatus::Skipped => "skipped",
            PolicyStatus::Passed => "passed",
            PolicyStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyReport {
    pub name: String,
    pub status: PolicyStatus,
    /// Failure or skip reason, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of one successful reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationOutcome {
    pub node: String,
    pub policies: Vec<PolicyReport>,
    /// Target taint set after folding every policy.
    pub taints: Vec<Taint>,
    /// Target label map after folding every policy.
    pub labels: Labels,
    /// At least one policy was skipped by the saturation guard.
    pub saturated: bool,
    /// The target state was written to the cluster.
    pub committed: bool,
    /// Markers that were absent on the node and are present in the target.
    pub newly_marked: Vec<String>,
}

impl ReconciliationOutcome {
    pub fn count(&self, status: PolicyStatus) -> usize {
        self.policies.iter().filter(|p| p.status == status).count()
    }

    pub fn status_of(&self, policy: &str) -> Option<PolicyStatus> {
        self.policies
            .iter()
            .find(|p| p.name == policy)
            .map(|p| p.status)
    }
}
