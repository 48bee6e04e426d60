//! Taint/label set algebra.
//!
//! Taints are removed by their full `{key, value, effect}` identity and added per
//! `{key, effect}` slot, so a node never carries two taints the API server would reject.
//! Labels are keyed by key. Every operation is idempotent.

use tainter_model::{Labels, NodeState, Policy, Taint};

/// Adds `to_add` to `current`, replacing whatever occupies the same `{key, effect}` slot.
///
/// Re-adding an identical taint keeps its server-set `time_added` unless the new one carries its own.
/// A taint with a different value in the slot is dropped together with its `time_added`.
pub fn add_taints(current: &[Taint], to_add: &[Taint]) -> Vec<Taint> {
    let mut out = dedup_taints(current);
    for taint in to_add {
        let kept_time = out
            .iter()
            .find(|t| t.same_identity(taint))
            .and_then(|t| t.time_added.clone());
        let time_added = taint.time_added.clone().or(kept_time);
        let replacement = Taint {
            time_added,
            ..taint.clone()
        };

        match out.iter().position(|t| t.same_slot(taint)) {
            Some(idx) => {
                out[idx] = replacement;
                let mut i = idx + 1;
                while i < out.len() {
                    if out[i].same_slot(taint) {
                        out.remove(i);
                    } else {
                        i += 1;
                    }
                }
            }
            None => out.push(replacement),
        }
    }
    out
}

/// Removes every entry of `current` whose identity appears in `to_remove`.
pub fn remove_taints(current: &[Taint], to_remove: &[Taint]) -> Vec<Taint> {
    dedup_taints(current)
        .into_iter()
        .filter(|t| !to_remove.iter().any(|r| r.same_identity(t)))
        .collect()
}

pub fn add_labels(current: &Labels, to_add: &Labels) -> Labels {
    let mut out = current.clone();
    out.extend(to_add.iter().map(|(k, v)| (k.clone(), v.clone())));
    out
}

/// Removes labels by key; the value in `to_remove` is not compared.
pub fn remove_labels(current: &Labels, to_remove: &Labels) -> Labels {
    current
        .iter()
        .filter(|(k, _)| !to_remove.contains_key(*k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// First occurrence wins.
fn dedup_taints(taints: &[Taint]) -> Vec<Taint> {
    let mut out: Vec<Taint> = Vec::with_capacity(taints.len());
    for taint in taints {
        if !out.iter().any(|t| t.same_identity(taint)) {
            out.push(taint.clone());
        }
    }
    out
}

/// Running taint/label state of one node during a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSet {
    taints: Vec<Taint>,
    labels: Labels,
}

impl MarkerSet {
    pub fn new(taints: &[Taint], labels: Labels) -> Self {
        Self {
            taints: dedup_taints(taints),
            labels,
        }
    }

    pub fn from_node(node: &NodeState) -> Self {
        Self::new(&node.taints, node.labels.clone())
    }

    pub fn taints(&self) -> &[Taint] {
        &self.taints
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn add_taints(&mut self, to_add: &[Taint]) {
        self.taints = add_taints(&self.taints, to_add);
    }

    pub fn remove_taints(&mut self, to_remove: &[Taint]) {
        self.taints = remove_taints(&self.taints, to_remove);
    }

    pub fn add_labels(&mut self, to_add: &Labels) {
        self.labels = add_labels(&self.labels, to_add);
    }

    pub fn remove_labels(&mut self, to_remove: &Labels) {
        self.labels = remove_labels(&self.labels, to_remove);
    }

    /// Applies the policy's marker (unhealthy).
    pub fn mark(&mut self, policy: &Policy) {
        self.add_taints(&policy.taints);
        self.add_labels(&policy.labels);
    }

    /// Clears the policy's marker (healthy).
    pub fn clear(&mut self, policy: &Policy) {
        self.remove_taints(&policy.taints);
        self.remove_labels(&policy.labels);
    }

    /// Markers present here but absent (or different) in `before`.
    pub fn newly_marked(&self, before: &MarkerSet) -> Vec<String> {
        let taints = self
            .taints
            .iter()
            .filter(|t| !before.taints.iter().any(|b| b.same_identity(t)))
            .map(|t| format!("taint {t}"));
        let labels = self
            .labels
            .iter()
            .filter(|(k, v)| before.labels.get(*k) != Some(*v))
            .map(|(k, v)| format!("label {k}={v}"));
        taints.chain(labels).collect()
    }

    pub fn into_parts(self) -> (Vec<Taint>, Labels) {
        (self.taints, self.labels)
    }
}
