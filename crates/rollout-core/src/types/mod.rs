//! Shared core types used across resolution, configuration and pipeline layers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Configuration scope levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigScope {
    /// Global/user-wide configuration.
    Global,
    /// Per-project configuration, checked into version control.
    Project,
}

/// Deployment environments a branch can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Feature, bug and refactor work plus the `dev` branch.
    Development,
    /// The `test` branch.
    Test,
    /// The `main` branch. Always gated behind manual approval.
    Production,
}

impl Environment {
    pub const ALL: [Environment; 3] = [
        Environment::Development,
        Environment::Test,
        Environment::Production,
    ];

    /// Short key used in override strings, config tables and playbook vars.
    pub fn key(self) -> &'static str {
        match self {
            Environment::Development => "dev",
            Environment::Test => "test",
            Environment::Production => "prod",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|env| env.key() == key)
    }

    pub fn default_hostname(self) -> &'static str {
        match self {
            Environment::Development => "dev01",
            Environment::Test => "test01",
            Environment::Production => "prod01",
        }
    }

    pub fn default_runner(self) -> &'static str {
        self.key()
    }

    pub fn requires_approval(self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "Development",
            Environment::Test => "Test",
            Environment::Production => "Production",
        };
        f.write_str(name)
    }
}

/// The kind of event that triggered a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    #[default]
    Push,
    PullRequest,
}

impl TriggerEvent {
    /// Parse a GitHub event name or CLI spelling.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "push" => Some(TriggerEvent::Push),
            "pull_request" | "pull-request" | "pr" | "pull_request_target" => {
                Some(TriggerEvent::PullRequest)
            }
            _ => None,
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerEvent::Push => f.write_str("push"),
            TriggerEvent::PullRequest => f.write_str("pull_request"),
        }
    }
}
