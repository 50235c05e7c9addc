//! systemd queries through the step runner.

use serde::Serialize;

use crate::steps::{StepCommand, StepRunner};

/// State reported by `systemctl is-active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum ServiceState {
    Active,
    Inactive(String),
}

pub fn service_status(runner: &dyn StepRunner, unit: &str) -> anyhow::Result<ServiceState> {
    let command = StepCommand::new("systemctl").args(["is-active", unit]);
    let output = runner.run(&command)?;
    let state = output.stdout.trim();

    if output.success && state == "active" {
        return Ok(ServiceState::Active);
    }
    let detail = if state.is_empty() {
        output.summary()
    } else {
        state.to_string()
    };
    Ok(ServiceState::Inactive(detail))
}

/// Tail of the unit's journal. Informational only.
pub fn recent_logs(runner: &dyn StepRunner, unit: &str, lines: u32) -> anyhow::Result<String> {
    let command = StepCommand::new("journalctl").args([
        "-u".to_string(),
        unit.to_string(),
        "-n".to_string(),
        lines.to_string(),
        "--no-pager".to_string(),
    ]);
    let output = runner.run(&command)?;
    if !output.success {
        anyhow::bail!("journalctl failed ({})", output.summary());
    }
    Ok(output.stdout)
}
