use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Labels, ModelError, Taint};

/// Ceiling used when a policy does not set one.
pub const DEFAULT_MAX_AFFECTED_NODE_COUNT: usize = 1;

/// One health check together with the marker it controls.
///
/// Scripts run in declared order. When any of them fails the node gets `taints` and `labels`;
/// when all succeed they are removed. `max_affected_node_count` caps how many cluster nodes may
/// carry the marker before the policy stops acting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub name: String,
    pub script_paths: Vec<PathBuf>,
    pub max_affected_node_count: usize,
    /// Only nodes carrying all of these labels are evaluated.
    #[serde(default)]
    pub target_node_labels: Labels,
    #[serde(default)]
    pub taints: Vec<Taint>,
    #[serde(default)]
    pub labels: Labels,
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script_paths: Vec::new(),
            max_affected_node_count: DEFAULT_MAX_AFFECTED_NODE_COUNT,
            target_node_labels: Labels::new(),
            taints: Vec::new(),
            labels: Labels::new(),
        }
    }

    pub fn with_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_paths.push(path.into());
        self
    }

    pub fn with_max_affected(mut self, count: usize) -> Self {
        self.max_affected_node_count = count;
        self
    }

    pub fn with_taint(mut self, taint: Taint) -> Self {
        self.taints.push(taint);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_target_node_label(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.target_node_labels.insert(key.into(), value.into());
        self
    }

    /// Checks that the marker definition is usable.
    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |reason: &str| ModelError::InvalidPolicy {
            policy: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.taints.is_empty() && self.labels.is_empty() {
            return Err(invalid("no taints or labels declared"));
        }
        if self.taints.iter().any(|t| t.key.trim().is_empty()) {
            return Err(invalid("taint with empty key"));
        }
        if self.labels.keys().any(|k| k.trim().is_empty()) {
            return Err(invalid("label with empty key"));
        }
        Ok(())
    }
}
