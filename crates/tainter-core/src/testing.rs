//! In-memory collaborators for tests.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tainter_model::NodeState;

use crate::{
    cluster::ClusterClient,
    error::{ClusterError, NotifyError},
    notify::Notifier,
    runner::{DEFAULT_SCRIPT_TIMEOUT, ScriptError, ScriptOutput, ScriptRunner},
};

/// Cluster held in memory. Versions are numeric strings bumped on each write.
#[derive(Default)]
pub struct MemoryCluster {
    nodes: Mutex<BTreeMap<String, NodeState>>,
    list_error: Option<ClusterError>,
    update_error: Option<ClusterError>,
    gets: AtomicUsize,
    lists: AtomicUsize,
    updates: AtomicUsize,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node; a missing resource version is set to `"1"`.
    pub fn with_node(self, mut node: NodeState) -> Self {
        node.resource_version.get_or_insert_with(|| "1".to_string());
        self.nodes.lock().unwrap().insert(node.name.clone(), node);
        self
    }

    pub fn fail_list(mut self, err: ClusterError) -> Self {
        self.list_error = Some(err);
        self
    }

    pub fn fail_update(mut self, err: ClusterError) -> Self {
        self.update_error = Some(err);
        self
    }

    pub fn node(&self, name: &str) -> Option<NodeState> {
        self.nodes.lock().unwrap().get(name).cloned()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterClient for MemoryCluster {
    async fn get_node(&self, name: &str) -> Result<NodeState, ClusterError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.node(name)
            .ok_or_else(|| ClusterError::NotFound(name.to_string()))
    }

    async fn list_nodes(&self) -> Result<Vec<NodeState>, ClusterError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.list_error {
            return Err(err.clone());
        }
        Ok(self.nodes.lock().unwrap().values().cloned().collect())
    }

    async fn update_node(&self, node: &NodeState) -> Result<(), ClusterError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.update_error {
            return Err(err.clone());
        }

        let mut nodes = self.nodes.lock().unwrap();
        let stored = nodes
            .get_mut(&node.name)
            .ok_or_else(|| ClusterError::NotFound(node.name.clone()))?;
        if node.resource_version.is_some() && node.resource_version != stored.resource_version {
            return Err(ClusterError::Conflict(format!(
                "resource version {:?} is stale",
                node.resource_version
            )));
        }

        let next = stored
            .resource_version
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        stored.taints = node.taints.clone();
        stored.labels = node.labels.clone();
        stored.resource_version = Some(next.to_string());
        Ok(())
    }
}

/// Script runner answering from a fixed table.
///
/// Unknown paths fail with [`ScriptError::Spawn`].
#[derive(Default)]
pub struct ScriptedRunner {
    results: HashMap<PathBuf, Result<ScriptOutput, ScriptError>>,
    invoked: Mutex<Vec<PathBuf>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(mut self, path: impl Into<PathBuf>) -> Self {
        self.results.insert(path.into(), Ok(ScriptOutput::default()));
        self
    }

    pub fn fail(mut self, path: impl Into<PathBuf>, code: i32) -> Self {
        let path = path.into();
        let err = ScriptError::ExecutionFailed {
            path: path.clone(),
            status: format!("exit code: {code}"),
            output: String::new(),
        };
        self.results.insert(path, Err(err));
        self
    }

    pub fn timeout(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let err = ScriptError::Timeout {
            path: path.clone(),
            timeout: DEFAULT_SCRIPT_TIMEOUT,
        };
        self.results.insert(path, Err(err));
        self
    }

    pub fn invocations(&self) -> Vec<PathBuf> {
        self.invoked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScriptRunner for ScriptedRunner {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn run(&self, path: &Path) -> Result<ScriptOutput, ScriptError> {
        self.invoked.lock().unwrap().push(path.to_path_buf());
        self.results
            .get(path)
            .cloned()
            .unwrap_or_else(|| {
                Err(ScriptError::Spawn {
                    path: path.to_path_buf(),
                    reason: "no such file or directory".into(),
                })
            })
    }
}

/// Notifier that keeps every message.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records messages but reports every delivery as failed.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        self.messages.lock().unwrap().push(message.to_string());
        if self.fail {
            return Err(NotifyError("webhook returned 500".into()));
        }
        Ok(())
    }
}
