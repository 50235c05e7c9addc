//! Manual approval checkpoint before gated deployments.
//!
//! The pipeline blocks in [`ApprovalGate::wait`] until a decision arrives.
//! Where the decision comes from (a channel, a terminal prompt, a flag) is
//! up to the implementation.

use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use serde::Serialize;

use crate::environment::EnvironmentSelection;
use crate::trigger::RunMetadata;
use crate::types::Environment;

use super::error::ApprovalError;

/// What an approver is asked to allow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalRequest {
    pub app_name: String,
    pub environment: Environment,
    pub hostname: String,
    pub branch: String,
    pub commit: String,
    pub actor: String,
}

impl ApprovalRequest {
    pub fn new(app_name: &str, selection: &EnvironmentSelection, run: &RunMetadata) -> Self {
        Self {
            app_name: app_name.to_string(),
            environment: selection.environment,
            hostname: selection.hostname.clone(),
            branch: run.branch.clone(),
            commit: run.commit.clone(),
            actor: run.actor.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approved {
        approver: String,
    },
    Rejected {
        approver: String,
        reason: Option<String>,
    },
}

impl ApprovalDecision {
    pub fn approve(approver: impl Into<String>) -> Self {
        ApprovalDecision::Approved {
            approver: approver.into(),
        }
    }

    pub fn reject(approver: impl Into<String>, reason: Option<String>) -> Self {
        ApprovalDecision::Rejected {
            approver: approver.into(),
            reason,
        }
    }

    pub fn approver(&self) -> &str {
        match self {
            ApprovalDecision::Approved { approver } | ApprovalDecision::Rejected { approver, .. } => {
                approver
            }
        }
    }
}

pub trait ApprovalGate {
    /// Block until an approver decides.
    fn wait(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError>;
}

/// Approval delivered over a channel by an [`ApprovalHandle`].
#[derive(Debug)]
pub struct ChannelApproval {
    receiver: Mutex<Receiver<Result<ApprovalDecision, ApprovalError>>>,
    timeout: Option<Duration>,
}

/// Sending half of a [`ChannelApproval`]. Cloneable; dropping every handle
/// without deciding unblocks the gate with `Disconnected`.
#[derive(Debug, Clone)]
pub struct ApprovalHandle {
    sender: Sender<Result<ApprovalDecision, ApprovalError>>,
}

impl ChannelApproval {
    /// `timeout: None` waits indefinitely.
    pub fn pair(timeout: Option<Duration>) -> (ApprovalHandle, ChannelApproval) {
        let (sender, receiver) = mpsc::channel();
        (
            ApprovalHandle { sender },
            ChannelApproval {
                receiver: Mutex::new(receiver),
                timeout,
            },
        )
    }
}

impl ApprovalHandle {
    /// Returns false if the gate is gone.
    pub fn decide(&self, decision: ApprovalDecision) -> bool {
        self.sender.send(Ok(decision)).is_ok()
    }

    /// Unblock the gate with an error instead of a decision.
    pub fn fail(&self, error: ApprovalError) -> bool {
        self.sender.send(Err(error)).is_ok()
    }

    pub fn approve(&self, approver: impl Into<String>) -> bool {
        self.decide(ApprovalDecision::approve(approver))
    }

    pub fn reject(&self, approver: impl Into<String>, reason: Option<String>) -> bool {
        self.decide(ApprovalDecision::reject(approver, reason))
    }
}

impl ApprovalGate for ChannelApproval {
    fn wait(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError> {
        let receiver = self
            .receiver
            .lock()
            .map_err(|_| ApprovalError::Disconnected)?;
        let received = match self.timeout {
            None => receiver.recv().map_err(|_| ApprovalError::Disconnected),
            Some(timeout) => receiver.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => ApprovalError::TimedOut { timeout },
                RecvTimeoutError::Disconnected => ApprovalError::Disconnected,
            }),
        };
        received?
    }
}

/// Approves every request immediately.
#[derive(Debug, Clone)]
pub struct AutoApprove {
    approver: String,
}

impl AutoApprove {
    pub fn new(approver: impl Into<String>) -> Self {
        Self {
            approver: approver.into(),
        }
    }
}

impl ApprovalGate for AutoApprove {
    fn wait(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError> {
        Ok(ApprovalDecision::approve(self.approver.clone()))
    }
}

/// Rejects every request with a fixed reason.
#[derive(Debug, Clone)]
pub struct DenyApproval {
    reason: String,
}

impl DenyApproval {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ApprovalGate for DenyApproval {
    fn wait(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError> {
        Ok(ApprovalDecision::reject(
            "rollout",
            Some(self.reason.clone()),
        ))
    }
}
