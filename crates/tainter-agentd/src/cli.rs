use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::Parser;
use tainter_core::RunMode;
use tainter_exec::ProcConfig;
use tainter_kube::KubeConfig;
use tainter_notify::SlackNotifier;
use tainter_observe::{LoggerConfig, LoggerFormat};

/// Runs health-check scripts on this node and taints/labels it when they fail.
#[derive(Debug, Parser)]
#[command(name = "node-tainter", version)]
pub struct Args {
    /// Node to reconcile; defaults to the host name.
    #[arg(long, env = "NODE_NAME")]
    pub node_name: Option<String>,

    /// Policy file (YAML); repeat for several policies.
    #[arg(short, long = "config", required = true)]
    pub config: Vec<PathBuf>,

    /// Run a single cycle and exit with its result.
    #[arg(long)]
    pub once: bool,

    /// Evaluate and log, never write to the cluster.
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, default_value_t = 300)]
    pub interval_secs: u64,

    #[arg(long, default_value_t = 10)]
    pub script_timeout_secs: u64,

    /// Log each script's captured output at info level.
    #[arg(long, env = "ENABLE_EXEC_LOG")]
    pub log_script_output: bool,

    /// text, json or journald.
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,

    /// Filter directive, e.g. `info,tainter_exec=debug`.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "SLACK_WEBHOOK_URL")]
    pub slack_webhook_url: Option<String>,

    #[arg(long, env = "SLACK_CHANNEL")]
    pub slack_channel: Option<String>,

    /// API server URL; in-cluster service-account settings are used when unset.
    #[arg(long, env = "KUBERNETES_API_SERVER")]
    pub api_server: Option<String>,

    #[arg(long)]
    pub token_file: Option<PathBuf>,

    #[arg(long)]
    pub ca_file: Option<PathBuf>,

    #[arg(long)]
    pub insecure_skip_tls_verify: bool,

    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl Args {
    pub fn node_name(&self) -> anyhow::Result<String> {
        if let Some(name) = &self.node_name {
            return Ok(name.clone());
        }
        let host = hostname::get().context("failed to read host name; set --node-name")?;
        Ok(host.to_string_lossy().into_owned())
    }

    pub fn mode(&self) -> RunMode {
        if self.once { RunMode::Once } else { RunMode::Daemon }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig::default()
            .with_format(self.log_format)
            .with_level(self.log_level.clone())
    }

    pub fn proc_config(&self) -> ProcConfig {
        ProcConfig {
            timeout: Duration::from_secs(self.script_timeout_secs),
            log_output: self.log_script_output,
            ..ProcConfig::default()
        }
    }

    /// Explicit `--api-server` settings, or the pod's service account.
    pub fn kube_config(&self) -> anyhow::Result<KubeConfig> {
        let mut cfg = match &self.api_server {
            Some(url) => KubeConfig::new(url.clone()),
            None => KubeConfig::in_cluster()
                .context("no --api-server given and in-cluster configuration unavailable")?,
        };
        if let Some(path) = &self.token_file {
            cfg = cfg.with_token_file(path)?;
        }
        if let Some(path) = &self.ca_file {
            cfg = cfg.with_ca_file(path)?;
        }
        Ok(cfg
            .with_insecure(self.insecure_skip_tls_verify)
            .with_timeout(Duration::from_secs(self.request_timeout_secs)))
    }

    /// Only built when both webhook and channel are set.
    pub fn slack(&self) -> Option<SlackNotifier> {
        match (&self.slack_webhook_url, &self.slack_channel) {
            (Some(url), Some(channel)) if !url.is_empty() && !channel.is_empty() => {
                Some(SlackNotifier::new(url.clone(), channel.clone()).with_dry_run(self.dry_run))
            }
            _ => None,
        }
    }
}
