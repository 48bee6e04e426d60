use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use tainter_core::{DEFAULT_SCRIPT_TIMEOUT, ScriptError, ScriptOutput, ScriptRunner};
use tokio::process::Command;
use tracing::{debug, info, trace, warn};

use crate::util::{describe_status, kill_graceful, read_pipe};

/// Process settings shared by every script the runner executes.
#[derive(Clone, Debug)]
pub struct ProcConfig {
    /// Wall-clock limit per script; on expiry the process is killed.
    pub timeout: Duration,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    /// Emit captured output at info level after each run.
    pub log_output: bool,
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SCRIPT_TIMEOUT,
            env: Vec::new(),
            cwd: None,
            log_output: false,
        }
    }
}

/// Runs health-check scripts as child processes.
///
/// The script path is executed directly (no shell), with stdin closed and stdout/stderr captured.
/// On unix each script leads its own process group; a timeout kills the whole group.
/// A cancelled run only kills the direct child (`kill_on_drop`).
pub struct ProcessRunner {
    name: &'static str,
    cfg: ProcConfig,
}

impl ProcessRunner {
    pub fn new(cfg: ProcConfig) -> Self {
        Self { name: "proc", cfg }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn config(&self) -> &ProcConfig {
        &self.cfg
    }

    fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(path);
        if let Some(cwd) = &self.cfg.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &self.cfg.env {
            cmd.env(k, v);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(ProcConfig::default())
    }
}

#[async_trait]
impl ScriptRunner for ProcessRunner {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, path: &Path) -> Result<ScriptOutput, ScriptError> {
        trace!(target: "tainter_exec::script", path = %path.display(), "spawn");
        let mut child = self
            .command(path)
            .spawn()
            .map_err(|e| ScriptError::Spawn {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let finished = tokio::time::timeout(self.cfg.timeout, async {
            tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr))
        })
        .await;

        let Ok((status, out, err)) = finished else {
            warn!(target: "tainter_exec::script", path = %path.display(), timeout = ?self.cfg.timeout, "timed out; killing child");
            let _ = kill_graceful(&mut child).await;
            return Err(ScriptError::Timeout {
                path: path.to_path_buf(),
                timeout: self.cfg.timeout,
            });
        };

        let output = out + &err;
        if self.cfg.log_output {
            info!(target: "tainter_exec::script", path = %path.display(), %output, "script output");
        }

        let status = status.map_err(|e| ScriptError::ExecutionFailed {
            path: path.to_path_buf(),
            status: format!("wait: {e}"),
            output: output.clone(),
        })?;

        if !status.success() {
            let status = describe_status(status);
            debug!(target: "tainter_exec::script", path = %path.display(), %status, "exit non-zero");
            return Err(ScriptError::ExecutionFailed {
                path: path.to_path_buf(),
                status,
                output,
            });
        }

        debug!(target: "tainter_exec::script", path = %path.display(), "exit success");
        Ok(ScriptOutput { output })
    }
}
