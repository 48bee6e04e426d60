use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tainter_core::{Notifier, NotifyError};
use tracing::trace;

pub const USERNAME: &str = "node-tainter";
pub const DRY_RUN_USERNAME: &str = "[DRY-RUN] node-tainter";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct Payload<'a> {
    channel: &'a str,
    username: &'a str,
    blocks: [Block<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Block<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: Text<'a>,
}

#[derive(Debug, Serialize)]
struct Text<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// Posts messages to a Slack incoming webhook as a single mrkdwn section.
pub struct SlackNotifier {
    http: reqwest::Client,
    webhook_url: String,
    channel: String,
    dry_run: bool,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
            channel: channel.into(),
            dry_run: false,
        }
    }

    /// Dry-run messages are posted under [`DRY_RUN_USERNAME`].
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn username(&self) -> &'static str {
        if self.dry_run { DRY_RUN_USERNAME } else { USERNAME }
    }

    fn payload<'a>(&'a self, message: &'a str) -> Payload<'a> {
        Payload {
            channel: &self.channel,
            username: self.username(),
            blocks: [Block {
                kind: "section",
                text: Text {
                    kind: "mrkdwn",
                    text: message,
                },
            }],
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(&self.webhook_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| NotifyError(format!("slack request failed: {e}")))?;

        let status = resp.status();
        trace!(target: "tainter_notify::slack", %status, channel = %self.channel, "webhook response");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError(format!("slack returned {status}: {body}")));
        }
        Ok(())
    }
}
