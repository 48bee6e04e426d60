pub mod error;
pub use error::{ClusterError, NotifyError, ReconcileError};

pub mod cluster;
pub use cluster::ClusterClient;

pub mod runner;
pub use runner::{DEFAULT_SCRIPT_TIMEOUT, ScriptError, ScriptOutput, ScriptRunner, execute_scripts};

pub mod notify;
pub use notify::Notifier;

pub mod marker;
pub use marker::MarkerSet;

pub mod guard;
pub use guard::{GuardDecision, PolicyGuard};

pub mod reconcile;
pub use reconcile::Reconciler;

pub mod daemon;
pub use daemon::{DEFAULT_INTERVAL, DaemonLoop, RunMode};

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
