use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Taint;

/// Node labels, ordered by key.
pub type Labels = BTreeMap<String, String>;

/// Snapshot of one cluster node as far as markers are concerned.
///
/// The cluster owns the record; a snapshot is read at the start of a cycle and never reused by the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub taints: Vec<Taint>,
    /// Opaque version observed on read; used as a write precondition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl NodeState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_taint(mut self, taint: Taint) -> Self {
        self.taints.push(taint);
        self
    }

    /// Returns `true` if any taint on the node uses `key`.
    pub fn has_taint_key(&self, key: &str) -> bool {
        self.taints.iter().any(|t| t.key == key)
    }

    /// Returns `true` if the node carries `key` with exactly `value`.
    pub fn has_label(&self, key: &str, value: &str) -> bool {
        self.labels.get(key).is_some_and(|v| v == value)
    }

    /// Returns `true` if every `selector` entry is present with the same value.
    ///
    /// An empty selector matches every node.
    pub fn matches_selector(&self, selector: &Labels) -> bool {
        selector.iter().all(|(k, v)| self.has_label(k, v))
    }
}
