use std::{sync::Arc, time::Duration};

use tainter_model::{PolicyStatus, ReconciliationOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{error::ReconcileError, reconcile::Reconciler};

/// Sleep between cycles in daemon mode.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One cycle; its error is returned to the caller.
    Once,
    /// Cycle, sleep, repeat until cancelled. Cycle errors are logged only.
    Daemon,
}

/// Drives a [`Reconciler`] for one node on a fixed interval.
pub struct DaemonLoop {
    reconciler: Arc<Reconciler>,
    node: String,
    mode: RunMode,
    interval: Duration,
}

impl DaemonLoop {
    pub fn new(reconciler: Arc<Reconciler>, node: impl Into<String>) -> Self {
        Self {
            reconciler,
            node: node.into(),
            mode: RunMode::Daemon,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs until the mode says stop or `cancel` fires.
    ///
    /// Cancellation drops the in-flight cycle. The node write is the last step of a cycle,
    /// so a dropped cycle never leaves a partial write behind.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ReconcileError> {
        match self.mode {
            RunMode::Once => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!(target: "tainter_core::daemon", "cancelled before cycle completed");
                        Ok(())
                    }
                    res = self.reconciler.reconcile_once(&self.node) => {
                        let outcome = res?;
                        log_outcome(&outcome, self.reconciler.is_dry_run());
                        Ok(())
                    }
                }
            }
            RunMode::Daemon => {
                info!(target: "tainter_core::daemon", node = %self.node, interval = ?self.interval, "daemon started");
                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        res = self.reconciler.reconcile_once(&self.node) => match res {
                            Ok(outcome) => log_outcome(&outcome, self.reconciler.is_dry_run()),
                            Err(e) => error!(target: "tainter_core::daemon", node = %self.node, error = %e, "reconciliation cycle failed"),
                        },
                    }

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.interval) => {}
                    }
                }
                info!(target: "tainter_core::daemon", node = %self.node, "daemon stopped");
                Ok(())
            }
        }
    }
}

fn log_outcome(outcome: &ReconciliationOutcome, dry_run: bool) {
    info!(
        target: "tainter_core::daemon",
        node = %outcome.node,
        passed = outcome.count(PolicyStatus::Passed),
        failed = outcome.count(PolicyStatus::Failed),
        skipped = outcome.count(PolicyStatus::Skipped),
        not_applicable = outcome.count(PolicyStatus::NotApplicable),
        committed = outcome.committed,
        dry_run,
        "reconciliation cycle finished"
    );
}
