//! Configuration schema for rollout.toml
//!
//! Both layers share this structure:
//! - Global: ~/.config/rollout/rollout.toml
//! - Project: ./rollout.toml
//!
//! Every field is optional so layers merge field by field; defaults are
//! applied when the merged config is turned into pipeline settings.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::environment::{EnvironmentTable, EnvironmentTarget};
use crate::health::is_valid_health_path;
use crate::types::Environment;

pub const DEFAULT_APP_PORT: u16 = 7868;
pub const DEFAULT_PYTHON_VERSION: &str = "3.12";
pub const DEFAULT_HEALTH_CHECK_PATH: &str = "/health";
pub const DEFAULT_PLAYBOOK: &str = "deploy.yml";
pub const DEFAULT_INVENTORY: &str = "inventory/hosts.yml";
pub const DEFAULT_SETTLE_SECS: u64 = 5;
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOG_LINES: u32 = 50;
pub const DEFAULT_LOCK_WAIT_SECS: u64 = 600;

/// Root configuration structure for rollout.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RolloutConfig {
    #[serde(default)]
    pub app: AppSection,

    /// Per-environment targets keyed by `dev`, `test`, `prod`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environments: BTreeMap<String, EnvironmentEntry>,

    #[serde(default)]
    pub commands: CommandsSection,

    #[serde(default)]
    pub deploy: DeploySection,

    #[serde(default)]
    pub health: HealthSection,

    #[serde(default)]
    pub notify: NotifySection,

    #[serde(default)]
    pub approval: ApprovalSection,

    #[serde(default)]
    pub concurrency: ConcurrencySection,
}

/// Application inputs passed to every pipeline run
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_path: Option<String>,

    /// `dev=host,test=host,prod=host`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_hostnames: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct EnvironmentEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Runner label the deploy job is expected to run on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,

    /// Ansible inventory for this environment only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<PathBuf>,
}

/// External lint and test commands as argv arrays
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CommandsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DeploySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playbook: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct HealthSection {
    /// Fixed delay between deploy and the HTTP probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_lines: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NotifySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_webhook_url: Option<String>,

    /// `always` or `failure`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<NotifyPolicy>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifyPolicy {
    #[default]
    Always,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ApprovalSection {
    /// Give up waiting for approval after this long; unset waits forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ConcurrencySection {
    /// How long a run queues behind another deploy of the same branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_wait_secs: Option<u64>,
}

impl RolloutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values that serde cannot check.
    pub fn validate(&self) -> anyhow::Result<()> {
        for key in self.environments.keys() {
            if Environment::from_key(key).is_none() {
                anyhow::bail!(
                    "Unknown environment '{}' in [environments]. Use dev, test or prod",
                    key
                );
            }
        }

        if let Some(lint) = &self.commands.lint
            && lint.is_empty()
        {
            anyhow::bail!("commands.lint must not be empty");
        }
        if let Some(test) = &self.commands.test
            && test.is_empty()
        {
            anyhow::bail!("commands.test must not be empty");
        }

        if let Some(path) = &self.app.health_check_path
            && !is_valid_health_path(path)
        {
            anyhow::bail!(
                "app.health_check_path must be an absolute path starting with a single '/': {}",
                path
            );
        }

        if self.app.port == Some(0) {
            anyhow::bail!("app.port must be between 1 and 65535");
        }

        Ok(())
    }

    /// Build the environment table: built-in targets overlaid with
    /// `[environments.*]` entries.
    pub fn environment_table(&self) -> EnvironmentTable {
        let mut table = EnvironmentTable::default();
        for env in Environment::ALL {
            let Some(entry) = self.environments.get(env.key()) else {
                continue;
            };
            let target = table.target_mut(env);
            if let Some(hostname) = &entry.hostname {
                target.hostname = hostname.clone();
            }
            if let Some(runner) = &entry.runner {
                target.runner = runner.clone();
            }
            if let Some(inventory) = &entry.inventory {
                target.inventory = Some(inventory.clone());
            }
        }
        table
    }

    /// Starter config written by `rollout init`.
    pub fn starter(app_name: &str) -> Self {
        let mut environments = BTreeMap::new();
        for env in Environment::ALL {
            let target = EnvironmentTarget::builtin(env);
            environments.insert(
                env.key().to_string(),
                EnvironmentEntry {
                    hostname: Some(target.hostname),
                    runner: Some(target.runner),
                    inventory: None,
                },
            );
        }

        Self {
            app: AppSection {
                name: Some(app_name.to_string()),
                port: Some(DEFAULT_APP_PORT),
                python_version: Some(DEFAULT_PYTHON_VERSION.to_string()),
                health_check_path: Some(DEFAULT_HEALTH_CHECK_PATH.to_string()),
                environment_hostnames: None,
            },
            environments,
            deploy: DeploySection {
                playbook: Some(PathBuf::from(DEFAULT_PLAYBOOK)),
                inventory: Some(PathBuf::from(DEFAULT_INVENTORY)),
                extra_args: None,
            },
            ..Self::default()
        }
    }
}
