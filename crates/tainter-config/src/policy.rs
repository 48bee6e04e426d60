use std::path::{Path, PathBuf};

use serde::Deserialize;
use tainter_model::{DEFAULT_MAX_AFFECTED_NODE_COUNT, Labels, Policy, Taint};
use tracing::debug;

use crate::error::ConfigError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    script_path: Vec<PathBuf>,
    #[serde(default = "default_max_affected")]
    max_affected_node_count: usize,
    #[serde(default)]
    target_node_labels: Labels,
    #[serde(default)]
    taints: Vec<TaintEntry>,
    #[serde(default)]
    labels: Labels,
}

fn default_max_affected() -> usize {
    DEFAULT_MAX_AFFECTED_NODE_COUNT
}

/// `key=value:Effect` or `{key, value?, effect}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaintEntry {
    Short(String),
    Full(Taint),
}

impl TaintEntry {
    fn into_taint(self) -> Result<Taint, tainter_model::ModelError> {
        match self {
            TaintEntry::Short(s) => s.parse(),
            TaintEntry::Full(t) => Ok(t),
        }
    }
}

/// Parses and validates one policy document.
///
/// `fallback_name` is used when the document has no `name`.
pub fn parse_policy(fallback_name: &str, yaml: &str) -> Result<Policy, ConfigError> {
    let file: PolicyFile = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
        name: fallback_name.to_string(),
        source,
    })?;

    let name = file.name.unwrap_or_else(|| fallback_name.to_string());
    let invalid = |source| ConfigError::Invalid {
        name: name.clone(),
        source,
    };

    let taints = file
        .taints
        .into_iter()
        .map(TaintEntry::into_taint)
        .collect::<Result<Vec<_>, _>>()
        .map_err(invalid)?;

    let policy = Policy {
        name: name.clone(),
        script_paths: file.script_path,
        max_affected_node_count: file.max_affected_node_count,
        target_node_labels: file.target_node_labels,
        taints,
        labels: file.labels,
    };
    policy.validate().map_err(invalid)?;
    Ok(policy)
}

/// Reads one policy file; the name defaults to the file stem.
pub fn load_policy(path: &Path) -> Result<Policy, ConfigError> {
    let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let policy = parse_policy(&stem, &yaml)?;
    debug!(
        target: "tainter_config::policy",
        path = %path.display(),
        policy = %policy.name,
        scripts = policy.script_paths.len(),
        max_affected = policy.max_affected_node_count,
        "policy loaded"
    );
    Ok(policy)
}

/// Loads every file in order; the first failure aborts.
pub fn load_policies<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Policy>, ConfigError> {
    paths.iter().map(|p| load_policy(p.as_ref())).collect()
}
