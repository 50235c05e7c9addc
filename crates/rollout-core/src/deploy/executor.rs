//! Execute the deployment playbook for a resolved environment.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::config::RolloutConfig;
use crate::config::schema::{DEFAULT_INVENTORY, DEFAULT_PLAYBOOK};
use crate::environment::EnvironmentSelection;
use crate::inputs::PipelineInputs;
use crate::steps::{StepCommand, StepOutput, StepRunner};

#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub hostname: String,
    pub command: String,
    #[serde(skip)]
    pub output: StepOutput,
}

/// `ansible-playbook` invocation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsibleDeploy {
    project_root: PathBuf,
    playbook: PathBuf,
    inventory: PathBuf,
    extra_args: Vec<String>,
}

impl AnsibleDeploy {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            playbook: PathBuf::from(DEFAULT_PLAYBOOK),
            inventory: PathBuf::from(DEFAULT_INVENTORY),
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(config: &RolloutConfig, project_root: impl Into<PathBuf>) -> Self {
        let mut deploy = Self::new(project_root);
        if let Some(playbook) = &config.deploy.playbook {
            deploy.playbook = playbook.clone();
        }
        if let Some(inventory) = &config.deploy.inventory {
            deploy.inventory = inventory.clone();
        }
        if let Some(extra) = &config.deploy.extra_args {
            deploy.extra_args = extra.clone();
        }
        deploy
    }

    /// Per-environment inventory wins over the deploy-wide default.
    pub fn inventory_for(&self, selection: &EnvironmentSelection) -> PathBuf {
        let inventory = selection.inventory.as_deref().unwrap_or(&self.inventory);
        resolve_project_path(&self.project_root, inventory)
    }

    pub fn playbook(&self) -> PathBuf {
        resolve_project_path(&self.project_root, &self.playbook)
    }

    pub fn command(&self, selection: &EnvironmentSelection, inputs: &PipelineInputs) -> StepCommand {
        StepCommand::new("ansible-playbook")
            .arg("-i")
            .arg(self.inventory_for(selection).to_string_lossy())
            .arg(self.playbook().to_string_lossy())
            .arg("--limit")
            .arg(selection.hostname.clone())
            .args(extra_var("app_name", &inputs.app_name))
            .args(extra_var("app_port", &inputs.app_port.to_string()))
            .args(extra_var("python_version", &inputs.python_version))
            .args(extra_var("deploy_env", selection.key))
            .args(self.extra_args.iter().cloned())
            .env("ANSIBLE_FORCE_COLOR", "0")
    }
}

fn extra_var(name: &str, value: &str) -> [String; 2] {
    ["-e".to_string(), format!("{name}={value}")]
}

fn resolve_project_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

/// Run the playbook. A non-zero exit is reported as an error carrying the
/// last line of Ansible's output.
pub fn run_deploy(
    deploy: &AnsibleDeploy,
    runner: &dyn StepRunner,
    selection: &EnvironmentSelection,
    inputs: &PipelineInputs,
) -> anyhow::Result<DeployReport> {
    let command = deploy.command(selection, inputs);
    info!(
        environment = %selection.environment,
        hostname = %selection.hostname,
        "deploying {}",
        inputs.app_name
    );

    let output = runner
        .run(&command)
        .with_context(|| format!("Failed to run {}", command.display()))?;
    if !output.success {
        anyhow::bail!("ansible-playbook failed ({})", output.summary());
    }

    Ok(DeployReport {
        hostname: selection.hostname.clone(),
        command: command.display(),
        output,
    })
}
