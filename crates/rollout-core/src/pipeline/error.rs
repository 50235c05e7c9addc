use std::time::Duration;

use thiserror::Error;

use super::Stage;

/// Failures that stop the approval stage without a decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("No approval received within {}", format_wait(.timeout))]
    TimedOut { timeout: Duration },

    #[error("Approval channel closed before a decision was made")]
    Disconnected,

    #[error("Approval prompt failed: {0}")]
    Prompt(String),
}

fn format_wait(wait: &Duration) -> String {
    if wait.subsec_millis() == 0 {
        format!("{}s", wait.as_secs())
    } else {
        format!("{}ms", wait.as_millis())
    }
}

/// Why a pipeline run failed.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} failed: {reason}")]
    StageFailed { stage: Stage, reason: String },

    #[error("Deployment to {environment} was rejected by {approver}{}", .reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    ApprovalRejected {
        environment: String,
        approver: String,
        reason: Option<String>,
    },

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error("Another deploy of branch '{branch}' is in progress{}", .holder.as_ref().map(|h| format!(" ({h})")).unwrap_or_default())]
    LockBusy {
        branch: String,
        holder: Option<String>,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
