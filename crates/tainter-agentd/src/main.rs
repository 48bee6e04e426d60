use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tainter_config::load_policies;
use tainter_core::{DaemonLoop, Reconciler};
use tainter_exec::ProcessRunner;
use tainter_kube::KubeClient;
use tainter_observe::logger_init;

mod cli;
use cli::Args;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 1) Logger, while the process is still single-threaded so the local UTC offset resolves.
    logger_init(&args.logger_config()).context("failed to initialize logger")?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?
        .block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    // 2) Policies
    let node = args.node_name()?;
    let policies = load_policies(args.config.as_slice()).context("failed to load policies")?;
    if policies.is_empty() {
        bail!("no policies configured");
    }
    info!(
        node = %node,
        policies = policies.len(),
        dry_run = args.dry_run,
        once = args.once,
        "node-tainter starting"
    );

    // 3) Collaborators
    let cluster = KubeClient::new(args.kube_config()?).context("failed to build kubernetes client")?;
    let runner = ProcessRunner::new(args.proc_config());

    let mut reconciler = Reconciler::new(policies, Arc::new(cluster), Arc::new(runner))
        .with_dry_run(args.dry_run);
    match args.slack() {
        Some(slack) => {
            info!(channel = ?args.slack_channel, "slack notifications enabled");
            reconciler = reconciler.with_notifier(Arc::new(slack));
        }
        None => info!("slack notifications disabled"),
    }

    // 4) Loop
    let daemon = DaemonLoop::new(Arc::new(reconciler), node)
        .with_mode(args.mode())
        .with_interval(args.interval());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        on_signal.cancel();
    });

    daemon.run(cancel).await?;
    info!("node-tainter stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
