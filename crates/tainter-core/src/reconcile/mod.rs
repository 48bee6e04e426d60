use std::{sync::Arc, time::Duration};

use tainter_model::{NodeState, Policy, PolicyReport, PolicyStatus, ReconciliationOutcome};
use tracing::{debug, info, instrument, warn};

use crate::{
    cluster::ClusterClient,
    error::{ClusterError, ReconcileError},
    guard::{PolicyGuard, affected_count},
    marker::MarkerSet,
    notify::Notifier,
    runner::{ScriptRunner, execute_scripts},
};

/// Upper bound on a single notification attempt.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs every policy against one node and commits the folded result.
///
/// Collaborators are injected at construction; the reconciler holds no state between cycles.
pub struct Reconciler {
    policies: Vec<Policy>,
    cluster: Arc<dyn ClusterClient>,
    runner: Arc<dyn ScriptRunner>,
    notifier: Option<Arc<dyn Notifier>>,
    dry_run: bool,
}

impl Reconciler {
    pub fn new(
        policies: Vec<Policy>,
        cluster: Arc<dyn ClusterClient>,
        runner: Arc<dyn ScriptRunner>,
    ) -> Self {
        Self {
            policies,
            cluster,
            runner,
            notifier: None,
            dry_run: false,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// One full cycle for `node`.
    ///
    /// Reading the node, listing the cluster, an invalid policy, or the final write abort the cycle.
    /// Script failures only fail their own policy.
    #[instrument(level = "debug", target = "tainter_core::reconcile", skip(self), fields(dry_run = self.dry_run))]
    pub async fn reconcile_once(&self, node: &str) -> Result<ReconciliationOutcome, ReconcileError> {
        let current = self.cluster.get_node(node).await.map_err(|e| match e {
            ClusterError::NotFound(_) => ReconcileError::NodeNotFound(node.to_string()),
            other => ReconcileError::UnknownClusterState(other),
        })?;

        let before = MarkerSet::from_node(&current);
        let mut target = before.clone();
        let mut guard: Option<PolicyGuard> = None;
        let mut outcome = ReconciliationOutcome {
            node: node.to_string(),
            ..Default::default()
        };

        for policy in &self.policies {
            policy.validate()?;

            let mut report = PolicyReport {
                name: policy.name.clone(),
                status: PolicyStatus::Pending,
                reason: None,
            };

            if !current.matches_selector(&policy.target_node_labels) {
                debug!(target: "tainter_core::reconcile", policy = %policy.name, "node does not match target labels");
                report.status = PolicyStatus::NotApplicable;
                outcome.policies.push(report);
                continue;
            }

            let snapshot = match guard.take() {
                Some(g) => g,
                None => PolicyGuard::load(self.cluster.as_ref()).await?,
            };
            let decision = snapshot.check(policy);
            guard = Some(snapshot);
            // Saturation only blocks marking a new node; a marked node may still recover.
            let already_marked =
                affected_count(std::slice::from_ref(&current), &policy.taints, &policy.labels) > 0;
            if decision.exceeded && !already_marked {
                info!(
                    target: "tainter_core::reconcile",
                    policy = %policy.name,
                    affected = decision.affected,
                    max = decision.threshold,
                    "affected node count exceeded"
                );
                report.status = PolicyStatus::Skipped;
                report.reason = Some(format!(
                    "{} nodes affected, max {}",
                    decision.affected, decision.threshold
                ));
                outcome.saturated = true;
                outcome.policies.push(report);
                continue;
            }

            match execute_scripts(self.runner.as_ref(), &policy.script_paths).await {
                Ok(()) => {
                    debug!(target: "tainter_core::reconcile", policy = %policy.name, "healthy");
                    target.clear(policy);
                    report.status = PolicyStatus::Passed;
                }
                Err(e) => {
                    info!(target: "tainter_core::reconcile", policy = %policy.name, error = %e, "unhealthy");
                    target.mark(policy);
                    report.status = PolicyStatus::Failed;
                    report.reason = Some(e.to_string());
                }
            }
            outcome.policies.push(report);
        }

        outcome.newly_marked = target.newly_marked(&before);
        let changed = target != before;
        let (taints, labels) = target.into_parts();
        outcome.taints = taints;
        outcome.labels = labels;

        if self.dry_run {
            info!(
                target: "tainter_core::reconcile",
                node,
                changed,
                taints = ?outcome.taints,
                labels = ?outcome.labels,
                "dry-run: target state not written"
            );
            self.notify_marked(&outcome).await;
            return Ok(outcome);
        }

        if !changed {
            debug!(target: "tainter_core::reconcile", node, "node already in target state");
            return Ok(outcome);
        }

        let desired = NodeState {
            name: current.name.clone(),
            labels: outcome.labels.clone(),
            taints: outcome.taints.clone(),
            resource_version: current.resource_version.clone(),
        };
        self.cluster
            .update_node(&desired)
            .await
            .map_err(|source| ReconcileError::NodeWriteConflict {
                node: node.to_string(),
                source,
            })?;
        outcome.committed = true;
        info!(target: "tainter_core::reconcile", node, taints = outcome.taints.len(), labels = outcome.labels.len(), "node updated");

        self.notify_marked(&outcome).await;
        Ok(outcome)
    }

    /// Fire-and-forget: failures and timeouts are logged only.
    async fn notify_marked(&self, outcome: &ReconciliationOutcome) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if outcome.newly_marked.is_empty() {
            return;
        }

        let mut message = format!("Node *{}* has been tainted", outcome.node);
        for marker in &outcome.newly_marked {
            message.push_str("\n• ");
            message.push_str(marker);
        }

        match tokio::time::timeout(NOTIFY_TIMEOUT, notifier.notify(&message)).await {
            Ok(Ok(())) => {
                debug!(target: "tainter_core::reconcile", notifier = notifier.name(), "notification sent")
            }
            Ok(Err(e)) => {
                warn!(target: "tainter_core::reconcile", notifier = notifier.name(), error = %e, "notification failed")
            }
            Err(_) => {
                warn!(target: "tainter_core::reconcile", notifier = notifier.name(), "notification timed out")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryCluster, RecordingNotifier, ScriptedRunner};
    use tainter_model::{Labels, Taint, TaintEffect};

    const NODE: &str = "worker-1";

    fn disk_taint() -> Taint {
        Taint::new("node.example.com/disk", "full", TaintEffect::NoSchedule)
    }

    fn disk_policy() -> Policy {
        Policy::new("disk")
            .with_script("/checks/disk.sh")
            .with_taint(disk_taint())
            .with_label("disk-ok", "false")
            .with_max_affected(2)
    }

    fn net_policy() -> Policy {
        Policy::new("net")
            .with_script("/checks/net.sh")
            .with_taint(Taint::new("node.example.com/net", "down", TaintEffect::NoExecute))
            .with_max_affected(2)
    }

    fn reconciler(
        policies: Vec<Policy>,
        cluster: &Arc<MemoryCluster>,
        runner: &Arc<ScriptedRunner>,
    ) -> Reconciler {
        Reconciler::new(policies, cluster.clone(), runner.clone())
    }

    #[tokio::test]
    async fn failing_policy_marks_node_with_single_write() {
        let cluster = Arc::new(MemoryCluster::new().with_node(NodeState::new(NODE)));
        let runner = Arc::new(
            ScriptedRunner::new()
                .fail("/checks/disk.sh", 1)
                .fail("/checks/net.sh", 2),
        );

        let outcome = reconciler(vec![disk_policy(), net_policy()], &cluster, &runner)
            .reconcile_once(NODE)
            .await
            .unwrap();

        assert!(outcome.committed);
        assert_eq!(outcome.count(PolicyStatus::Failed), 2);
        assert_eq!(cluster.update_count(), 1);

        let node = cluster.node(NODE).unwrap();
        assert_eq!(node.taints.len(), 2);
        assert_eq!(node.taints[0], disk_taint());
        assert!(node.has_label("disk-ok", "false"));
        assert_eq!(outcome.taints, node.taints);
        assert_eq!(outcome.labels, node.labels);
    }

    #[tokio::test]
    async fn passing_policy_clears_existing_marker() {
        let node = NodeState::new(NODE)
            .with_taint(disk_taint())
            .with_label("disk-ok", "false")
            .with_label("zone", "a");
        let cluster = Arc::new(MemoryCluster::new().with_node(node));
        let runner = Arc::new(ScriptedRunner::new().ok("/checks/disk.sh"));

        let outcome = reconciler(vec![disk_policy()], &cluster, &runner)
            .reconcile_once(NODE)
            .await
            .unwrap();

        assert_eq!(outcome.status_of("disk"), Some(PolicyStatus::Passed));
        assert!(outcome.committed);
        let node = cluster.node(NODE).unwrap();
        assert!(node.taints.is_empty());
        assert_eq!(node.labels.len(), 1);
        assert!(node.has_label("zone", "a"));
    }

    #[tokio::test]
    async fn healthy_node_is_not_written() {
        let cluster = Arc::new(MemoryCluster::new().with_node(NodeState::new(NODE)));
        let runner = Arc::new(ScriptedRunner::new().ok("/checks/disk.sh"));

        let outcome = reconciler(vec![disk_policy()], &cluster, &runner)
            .reconcile_once(NODE)
            .await
            .unwrap();

        assert!(!outcome.committed);
        assert_eq!(cluster.update_count(), 0);
    }

    #[tokio::test]
    async fn dry_run_never_writes() {
        let cluster = Arc::new(MemoryCluster::new().with_node(NodeState::new(NODE)));
        let runner = Arc::new(ScriptedRunner::new().fail("/checks/disk.sh", 1));

        let outcome = reconciler(vec![disk_policy()], &cluster, &runner)
            .with_dry_run(true)
            .reconcile_once(NODE)
            .await
            .unwrap();

        assert!(!outcome.committed);
        assert_eq!(cluster.update_count(), 0);
        assert_eq!(outcome.taints, vec![disk_taint()]);
        assert!(cluster.node(NODE).unwrap().taints.is_empty());
    }

    #[tokio::test]
    async fn saturated_policy_is_skipped_without_running_scripts() {
        let mut cluster = MemoryCluster::new().with_node(NodeState::new(NODE));
        for i in 0..3 {
            cluster = cluster.with_node(
                NodeState::new(format!("other-{i}")).with_taint(Taint::new(
                    "node.example.com/disk",
                    "full",
                    TaintEffect::NoSchedule,
                )),
            );
        }
        let cluster = Arc::new(cluster);
        let runner = Arc::new(
            ScriptedRunner::new()
                .fail("/checks/disk.sh", 1)
                .fail("/checks/net.sh", 1),
        );

        let outcome = reconciler(vec![disk_policy(), net_policy()], &cluster, &runner)
            .reconcile_once(NODE)
            .await
            .unwrap();

        assert!(outcome.saturated);
        assert_eq!(outcome.status_of("disk"), Some(PolicyStatus::Skipped));
        assert_eq!(outcome.status_of("net"), Some(PolicyStatus::Failed));
        assert_eq!(runner.invocations(), vec![std::path::PathBuf::from("/checks/net.sh")]);

        let node = cluster.node(NODE).unwrap();
        assert_eq!(node.taints.len(), 1);
        assert_eq!(node.taints[0].key, "node.example.com/net");
        assert!(!node.labels.contains_key("disk-ok"));
    }

    fn saturated_cluster_with_marked_target() -> MemoryCluster {
        let mut cluster = MemoryCluster::new().with_node(NodeState::new(NODE).with_taint(disk_taint()));
        for i in 0..2 {
            cluster = cluster.with_node(NodeState::new(format!("other-{i}")).with_taint(disk_taint()));
        }
        cluster
    }

    #[tokio::test]
    async fn saturated_policy_still_clears_recovered_marked_node() {
        let cluster = Arc::new(saturated_cluster_with_marked_target());
        let runner = Arc::new(ScriptedRunner::new().ok("/checks/disk.sh"));

        let outcome = reconciler(vec![disk_policy()], &cluster, &runner)
            .reconcile_once(NODE)
            .await
            .unwrap();

        assert_eq!(outcome.status_of("disk"), Some(PolicyStatus::Passed));
        assert!(!outcome.saturated);
        assert_eq!(runner.invocations(), vec![std::path::PathBuf::from("/checks/disk.sh")]);
        assert!(outcome.committed);
        assert!(cluster.node(NODE).unwrap().taints.is_empty());
    }

    #[tokio::test]
    async fn saturated_policy_keeps_marker_on_still_failing_node() {
        let cluster = Arc::new(saturated_cluster_with_marked_target());
        let runner = Arc::new(ScriptedRunner::new().fail("/checks/disk.sh", 1));

        let outcome = reconciler(vec![disk_policy()], &cluster, &runner)
            .reconcile_once(NODE)
            .await
            .unwrap();

        assert_eq!(outcome.status_of("disk"), Some(PolicyStatus::Failed));
        let node = cluster.node(NODE).unwrap();
        assert_eq!(node.taints, vec![disk_taint()]);
        assert!(node.has_label("disk-ok", "false"));
    }

    #[tokio::test]
    async fn dry_run_still_notifies_without_writing() {
        let cluster = Arc::new(MemoryCluster::new().with_node(NodeState::new(NODE)));
        let runner = Arc::new(ScriptedRunner::new().fail("/checks/disk.sh", 1));
        let notifier = Arc::new(RecordingNotifier::new());

        let outcome = reconciler(vec![disk_policy()], &cluster, &runner)
            .with_dry_run(true)
            .with_notifier(notifier.clone())
            .reconcile_once(NODE)
            .await
            .unwrap();

        assert!(!outcome.committed);
        assert_eq!(cluster.update_count(), 0);
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Node *worker-1* has been tainted"));
    }

    #[tokio::test]
    async fn guard_counts_cluster_once_per_cycle() {
        let cluster = Arc::new(MemoryCluster::new().with_node(NodeState::new(NODE)));
        let runner = Arc::new(
            ScriptedRunner::new()
                .fail("/checks/disk.sh", 1)
                .fail("/checks/net.sh", 1),
        );
        let r = reconciler(vec![disk_policy(), net_policy()], &cluster, &runner);

        r.reconcile_once(NODE).await.unwrap();
        assert_eq!(cluster.list_count(), 1);

        r.reconcile_once(NODE).await.unwrap();
        assert_eq!(cluster.list_count(), 2);
    }

    #[tokio::test]
    async fn policies_fold_in_declared_order() {
        let cluster = Arc::new(MemoryCluster::new().with_node(NodeState::new(NODE)));
        let runner = Arc::new(
            ScriptedRunner::new()
                .fail("/checks/a.sh", 1)
                .ok("/checks/b.sh"),
        );
        let shared = Labels::from([("state".to_string(), "bad".to_string())]);
        let a = Policy::new("a")
            .with_script("/checks/a.sh")
            .with_label("state", "bad")
            .with_max_affected(5);
        let b = Policy {
            name: "b".into(),
            script_paths: vec!["/checks/b.sh".into()],
            labels: shared,
            max_affected_node_count: 5,
            ..Policy::new("b")
        };

        let outcome = reconciler(vec![a, b], &cluster, &runner)
            .reconcile_once(NODE)
            .await
            .unwrap();

        assert!(!outcome.labels.contains_key("state"));
        assert_eq!(cluster.update_count(), 0);
    }

    #[tokio::test]
    async fn non_matching_target_labels_make_policy_not_applicable() {
        let cluster = Arc::new(MemoryCluster::new().with_node(NodeState::new(NODE).with_label("pool", "cpu")));
        let runner = Arc::new(ScriptedRunner::new().fail("/checks/disk.sh", 1));
        let policy = disk_policy().with_target_node_label("pool", "gpu");

        let outcome = reconciler(vec![policy], &cluster, &runner)
            .reconcile_once(NODE)
            .await
            .unwrap();

        assert_eq!(outcome.status_of("disk"), Some(PolicyStatus::NotApplicable));
        assert!(runner.invocations().is_empty());
        assert_eq!(cluster.list_count(), 0);
        assert_eq!(cluster.update_count(), 0);
    }

    #[tokio::test]
    async fn missing_node_aborts_cycle() {
        let cluster = Arc::new(MemoryCluster::new());
        let runner = Arc::new(ScriptedRunner::new());

        let err = reconciler(vec![disk_policy()], &cluster, &runner)
            .reconcile_once(NODE)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::NodeNotFound(ref n) if n == NODE));
        assert_eq!(cluster.update_count(), 0);
    }

    #[tokio::test]
    async fn unreachable_cluster_listing_aborts_cycle() {
        let cluster = Arc::new(
            MemoryCluster::new()
                .with_node(NodeState::new(NODE))
                .fail_list(ClusterError::Transport("connection refused".into())),
        );
        let runner = Arc::new(ScriptedRunner::new().fail("/checks/disk.sh", 1));

        let err = reconciler(vec![disk_policy()], &cluster, &runner)
            .reconcile_once(NODE)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::UnknownClusterState(_)));
        assert!(runner.invocations().is_empty());
        assert_eq!(cluster.update_count(), 0);
    }

    #[tokio::test]
    async fn write_conflict_is_propagated() {
        let cluster = Arc::new(
            MemoryCluster::new()
                .with_node(NodeState::new(NODE))
                .fail_update(ClusterError::Conflict("stale resourceVersion".into())),
        );
        let runner = Arc::new(ScriptedRunner::new().fail("/checks/disk.sh", 1));

        let err = reconciler(vec![disk_policy()], &cluster, &runner)
            .reconcile_once(NODE)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::NodeWriteConflict { source: ClusterError::Conflict(_), .. }
        ));
    }

    #[tokio::test]
    async fn invalid_policy_is_cycle_fatal() {
        let cluster = Arc::new(MemoryCluster::new().with_node(NodeState::new(NODE)));
        let runner = Arc::new(ScriptedRunner::new());

        let err = reconciler(vec![Policy::new("empty")], &cluster, &runner)
            .reconcile_once(NODE)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Configuration(_)));
        assert_eq!(cluster.update_count(), 0);
    }

    #[tokio::test]
    async fn newly_marked_node_triggers_notification() {
        let cluster = Arc::new(MemoryCluster::new().with_node(NodeState::new(NODE)));
        let runner = Arc::new(ScriptedRunner::new().fail("/checks/disk.sh", 1));
        let notifier = Arc::new(RecordingNotifier::new());

        reconciler(vec![disk_policy()], &cluster, &runner)
            .with_notifier(notifier.clone())
            .reconcile_once(NODE)
            .await
            .unwrap();

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Node *worker-1* has been tainted"));
        assert!(messages[0].contains("taint node.example.com/disk=full:NoSchedule"));
    }

    #[tokio::test]
    async fn already_marked_node_is_not_renotified() {
        let node = NodeState::new(NODE)
            .with_taint(disk_taint())
            .with_label("disk-ok", "false");
        let cluster = Arc::new(MemoryCluster::new().with_node(node));
        let runner = Arc::new(ScriptedRunner::new().fail("/checks/disk.sh", 1));
        let notifier = Arc::new(RecordingNotifier::new());

        let outcome = reconciler(vec![disk_policy()], &cluster, &runner)
            .with_notifier(notifier.clone())
            .reconcile_once(NODE)
            .await
            .unwrap();

        assert!(outcome.newly_marked.is_empty());
        assert!(notifier.messages().is_empty());
        assert_eq!(cluster.update_count(), 0);
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_cycle() {
        let cluster = Arc::new(MemoryCluster::new().with_node(NodeState::new(NODE)));
        let runner = Arc::new(ScriptedRunner::new().fail("/checks/disk.sh", 1));
        let notifier = Arc::new(RecordingNotifier::failing());

        let outcome = reconciler(vec![disk_policy()], &cluster, &runner)
            .with_notifier(notifier)
            .reconcile_once(NODE)
            .await
            .unwrap();

        assert!(outcome.committed);
    }
}
