//! Run status notifications.

pub mod slack;

use serde::Serialize;

use crate::environment::EnvironmentSelection;
use crate::trigger::RunMetadata;
use crate::types::Environment;

pub use slack::{SlackNotifier, SlackPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyStatus {
    Success,
    Failure,
}

impl std::fmt::Display for NotifyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyStatus::Success => f.write_str("success"),
            NotifyStatus::Failure => f.write_str("failure"),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub status: NotifyStatus,
    pub app_name: String,
    pub repository: String,
    pub branch: String,
    pub commit: String,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
}

impl Notification {
    pub fn new(
        status: NotifyStatus,
        app_name: &str,
        run: &RunMetadata,
        selection: Option<&EnvironmentSelection>,
    ) -> Self {
        Self {
            status,
            app_name: app_name.to_string(),
            repository: run.repository.clone(),
            branch: run.branch.clone(),
            commit: run.commit.clone(),
            actor: run.actor.clone(),
            environment: selection.map(|s| s.environment),
            hostname: selection.map(|s| s.hostname.clone()),
            failed_stage: None,
        }
    }

    pub fn with_failed_stage(mut self, stage: impl Into<String>) -> Self {
        self.failed_stage = Some(stage.into());
        self
    }
}

pub trait Notifier {
    fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}
