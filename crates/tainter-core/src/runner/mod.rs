use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, trace};

/// Per-script execution limit.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Captured result of a successful script run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutput {
    /// stdout followed by stderr.
    pub output: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script {} timed out after {:?}", path.display(), timeout)]
    Timeout { path: PathBuf, timeout: Duration },

    #[error("script {} failed ({status})", path.display())]
    ExecutionFailed {
        path: PathBuf,
        /// `exit code: N` or `terminated by signal`.
        status: String,
        output: String,
    },

    #[error("failed to start script {}: {reason}", path.display())]
    Spawn { path: PathBuf, reason: String },
}

impl ScriptError {
    pub fn path(&self) -> &Path {
        match self {
            ScriptError::Timeout { path, .. }
            | ScriptError::ExecutionFailed { path, .. }
            | ScriptError::Spawn { path, .. } => path,
        }
    }
}

/// Executes one health-check program under a bounded timeout.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, path: &Path) -> Result<ScriptOutput, ScriptError>;
}

/// Runs `paths` in order and stops at the first failure.
///
/// Scripts before the failing one have already run; that is accepted.
pub async fn execute_scripts(
    runner: &dyn ScriptRunner,
    paths: &[PathBuf],
) -> Result<(), ScriptError> {
    for path in paths {
        trace!(target: "tainter_core::scripts", runner = runner.name(), path = %path.display(), "run");
        if let Err(e) = runner.run(path).await {
            debug!(target: "tainter_core::scripts", path = %path.display(), error = %e, "script failed; aborting sequence");
            return Err(e);
        }
    }
    Ok(())
}
