//! Subset of the `v1/Node` object the client reads and writes.

use serde::{Deserialize, Serialize};
use tainter_model::{Labels, NodeState, Taint};

#[derive(Debug, Deserialize)]
pub(crate) struct Node {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: NodeSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub resource_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NodeSpec {
    #[serde(default)]
    pub taints: Vec<Taint>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeList {
    #[serde(default)]
    pub items: Vec<Node>,
}

/// Kubernetes `Status` body returned with non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct Status {
    #[serde(default)]
    pub message: String,
}

impl From<Node> for NodeState {
    fn from(node: Node) -> Self {
        NodeState {
            name: node.metadata.name,
            labels: node.metadata.labels,
            taints: node.spec.taints,
            resource_version: node.metadata.resource_version,
        }
    }
}

/// RFC 6902 operation.
#[derive(Debug, Serialize)]
pub(crate) struct PatchOp {
    pub op: &'static str,
    pub path: &'static str,
    pub value: serde_json::Value,
}

impl PatchOp {
    fn new(op: &'static str, path: &'static str, value: serde_json::Value) -> Self {
        Self { op, path, value }
    }
}

/// Full replacement of labels and taints, guarded by the observed version.
///
/// `add` on an existing member replaces it; `replace` on `resourceVersion` makes the
/// server reject the write with 409 when the node changed since it was read.
pub(crate) fn node_patch(node: &NodeState) -> Result<Vec<PatchOp>, serde_json::Error> {
    let mut ops = Vec::with_capacity(3);
    if let Some(version) = &node.resource_version {
        ops.push(PatchOp::new(
            "replace",
            "/metadata/resourceVersion",
            serde_json::Value::String(version.clone()),
        ));
    }
    ops.push(PatchOp::new(
        "add",
        "/metadata/labels",
        serde_json::to_value(&node.labels)?,
    ));
    ops.push(PatchOp::new(
        "add",
        "/spec/taints",
        serde_json::to_value(&node.taints)?,
    ));
    Ok(ops)
}
