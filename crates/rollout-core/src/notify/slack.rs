//! Slack incoming-webhook delivery.

use anyhow::Context;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::{Notification, Notifier, NotifyStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackPayload {
    pub text: String,
    pub attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackAttachment {
    pub color: &'static str,
    pub fields: Vec<SlackField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl SlackField {
    fn short(title: &str, value: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            value: value.into(),
            short: true,
        }
    }
}

impl SlackPayload {
    pub fn from_notification(notification: &Notification) -> Self {
        let (icon, color) = match notification.status {
            NotifyStatus::Success => (":white_check_mark:", "good"),
            NotifyStatus::Failure => (":x:", "danger"),
        };

        let target = match (&notification.environment, &notification.hostname) {
            (Some(env), Some(host)) => format!(" to {env} ({host})"),
            (Some(env), None) => format!(" to {env}"),
            _ => String::new(),
        };
        let text = format!(
            "{icon} {} pipeline {}{target}",
            notification.app_name, notification.status
        );

        let short_commit: String = notification.commit.chars().take(7).collect();
        let mut fields = vec![
            SlackField::short("Status", notification.status.to_string()),
            SlackField::short("Repository", notification.repository.clone()),
            SlackField::short("Branch", notification.branch.clone()),
            SlackField::short("Commit", short_commit),
            SlackField::short("Triggered by", notification.actor.clone()),
        ];
        if let Some(stage) = &notification.failed_stage {
            fields.push(SlackField::short("Failed stage", stage.clone()));
        }

        Self {
            text,
            attachments: vec![SlackAttachment { color, fields }],
        }
    }
}

/// Posts notifications to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    webhook: Url,
}

impl SlackNotifier {
    pub fn new(webhook: Url) -> Self {
        Self { webhook }
    }

    async fn post(&self, payload: &SlackPayload) -> anyhow::Result<()> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rollout/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .post(self.webhook.clone())
            .json(payload)
            .send()
            .await
            .context("Failed to reach Slack webhook")?;

        if !response.status().is_success() {
            anyhow::bail!("Slack webhook returned HTTP {}", response.status());
        }
        Ok(())
    }
}

impl Notifier for SlackNotifier {
    fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        let payload = SlackPayload::from_notification(notification);
        debug!(host = ?self.webhook.host_str(), "posting Slack notification");

        let runtime =
            tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
        runtime.block_on(self.post(&payload))
    }
}
