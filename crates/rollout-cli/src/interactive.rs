//! Terminal approval prompt for gated deployments.
//!
//! The prompt runs on its own thread and answers through a
//! [`ChannelApproval`], so the configured approval timeout still applies
//! while the operator is thinking.

use std::io::{self, Write};
use std::time::Duration;

use console::{Term, style};
use dialoguer::{Confirm, Input, theme::ColorfulTheme};

use rollout_core::pipeline::{
    ApprovalDecision, ApprovalError, ApprovalGate, ApprovalRequest, ChannelApproval,
};

/// Asks the operator on the terminal whether to proceed.
pub struct PromptApproval {
    approver: String,
    timeout: Option<Duration>,
}

impl PromptApproval {
    pub fn new(approver: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            approver: approver.into(),
            timeout,
        }
    }

    /// Whether a prompt can be shown at all.
    pub fn available() -> bool {
        Term::stderr().features().is_attended()
    }
}

/// Approver name for prompts and auto-approval.
pub fn local_approver() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "operator".to_string())
}

/// Summary shown above the prompt.
pub fn write_request<W: Write>(writer: &mut W, request: &ApprovalRequest) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(
        writer,
        "{}",
        style(format!("Deployment to {} needs approval", request.environment)).bold()
    )?;
    writeln!(writer)?;
    writeln!(writer, "  App:      {}", style(&request.app_name).green())?;
    writeln!(writer, "  Host:     {}", style(&request.hostname).green())?;
    writeln!(writer, "  Branch:   {}", style(&request.branch).green())?;
    if !request.commit.is_empty() {
        writeln!(writer, "  Commit:   {}", style(&request.commit).green())?;
    }
    if !request.actor.is_empty() {
        writeln!(writer, "  Actor:    {}", style(&request.actor).green())?;
    }
    writeln!(writer)?;
    Ok(())
}

fn prompt(approver: &str, environment: &str) -> Result<ApprovalDecision, ApprovalError> {
    let theme = ColorfulTheme::default();
    let approved = Confirm::with_theme(&theme)
        .with_prompt(format!("Deploy to {environment}?"))
        .default(false)
        .interact()
        .map_err(|e| ApprovalError::Prompt(e.to_string()))?;

    if approved {
        return Ok(ApprovalDecision::approve(approver));
    }

    let reason: String = Input::with_theme(&theme)
        .with_prompt("Reason (optional)")
        .allow_empty(true)
        .interact_text()
        .map_err(|e| ApprovalError::Prompt(e.to_string()))?;
    let reason = Some(reason.trim().to_string()).filter(|r| !r.is_empty());
    Ok(ApprovalDecision::reject(approver, reason))
}

impl ApprovalGate for PromptApproval {
    fn wait(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError> {
        write_request(&mut io::stderr(), request)
            .map_err(|e| ApprovalError::Prompt(e.to_string()))?;

        let (handle, gate) = ChannelApproval::pair(self.timeout);
        let approver = self.approver.clone();
        let environment = request.environment.to_string();

        // An abandoned prompt thread dies with the process.
        std::thread::spawn(move || match prompt(&approver, &environment) {
            Ok(decision) => {
                handle.decide(decision);
            }
            Err(e) => {
                tracing::warn!(error = %e, "approval prompt failed");
                handle.fail(e);
            }
        });

        gate.wait(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollout_core::types::Environment;

    fn request() -> ApprovalRequest {
        ApprovalRequest {
            app_name: "billing".to_string(),
            environment: Environment::Production,
            hostname: "prod01".to_string(),
            branch: "main".to_string(),
            commit: "0123456789abcdef".to_string(),
            actor: "octocat".to_string(),
        }
    }

    #[test]
    fn test_write_request_lists_target() {
        console::set_colors_enabled(false);
        let mut buf = Vec::new();
        write_request(&mut buf, &request()).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Deployment to Production needs approval"));
        assert!(text.contains("Host:     prod01"));
        assert!(text.contains("Branch:   main"));
        assert!(text.contains("Actor:    octocat"));
    }

    #[test]
    fn test_write_request_omits_empty_fields() {
        console::set_colors_enabled(false);
        let mut req = request();
        req.commit.clear();
        req.actor.clear();

        let mut buf = Vec::new();
        write_request(&mut buf, &req).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(!text.contains("Commit:"));
        assert!(!text.contains("Actor:"));
    }
}
