//! Environment selection for a branch.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::types::{Environment, TriggerEvent};

use super::hostnames::HostnameOverrides;
use super::rules::{BranchRule, match_branch};

/// Where an environment deploys to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentTarget {
    pub hostname: String,
    pub runner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<PathBuf>,
}

impl EnvironmentTarget {
    pub fn builtin(env: Environment) -> Self {
        Self {
            hostname: env.default_hostname().to_string(),
            runner: env.default_runner().to_string(),
            inventory: None,
        }
    }
}

/// Targets for every environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentTable {
    targets: BTreeMap<Environment, EnvironmentTarget>,
}

impl Default for EnvironmentTable {
    fn default() -> Self {
        let targets = Environment::ALL
            .into_iter()
            .map(|env| (env, EnvironmentTarget::builtin(env)))
            .collect();
        Self { targets }
    }
}

impl EnvironmentTable {
    pub fn target(&self, env: Environment) -> &EnvironmentTarget {
        // Every environment is populated by Default and never removed.
        &self.targets[&env]
    }

    pub fn target_mut(&mut self, env: Environment) -> &mut EnvironmentTarget {
        self.targets
            .entry(env)
            .or_insert_with(|| EnvironmentTarget::builtin(env))
    }
}

/// The outcome of resolving a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSelection {
    pub environment: Environment,
    pub key: &'static str,
    pub hostname: String,
    pub runner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<PathBuf>,
    pub approval_required: bool,
    pub rule: BranchRule,
}

/// Resolves branches against a configured environment table.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentResolver {
    table: EnvironmentTable,
}

impl EnvironmentResolver {
    pub fn new(table: EnvironmentTable) -> Self {
        Self { table }
    }

    /// Resolve a branch. Returns `None` for branches no rule covers.
    pub fn resolve(
        &self,
        branch: &str,
        overrides: &HostnameOverrides,
    ) -> Option<EnvironmentSelection> {
        let (rule, environment) = match_branch(branch)?;
        let target = self.table.target(environment);
        let hostname = overrides
            .get(environment)
            .map(str::to_string)
            .unwrap_or_else(|| target.hostname.clone());

        Some(EnvironmentSelection {
            environment,
            key: environment.key(),
            hostname,
            runner: target.runner.clone(),
            inventory: target.inventory.clone(),
            approval_required: environment.requires_approval(),
            rule,
        })
    }
}

/// Resolve a branch against the built-in environment table.
pub fn resolve_environment(
    branch: &str,
    overrides: &HostnameOverrides,
) -> Option<EnvironmentSelection> {
    EnvironmentResolver::default().resolve(branch, overrides)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No branch rule matched.
    NoEnvironment,
    /// Pull requests never deploy.
    PullRequest,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoEnvironment => f.write_str("branch does not map to an environment"),
            SkipReason::PullRequest => f.write_str("pull request runs do not deploy"),
        }
    }
}

/// Whether the deploy stage runs for this trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DeploymentDecision {
    Deploy(EnvironmentSelection),
    Skip { reason: SkipReason },
}

impl DeploymentDecision {
    pub fn decide(selection: Option<EnvironmentSelection>, event: TriggerEvent) -> Self {
        match (event, selection) {
            (TriggerEvent::PullRequest, _) => DeploymentDecision::Skip {
                reason: SkipReason::PullRequest,
            },
            (TriggerEvent::Push, Some(selection)) => DeploymentDecision::Deploy(selection),
            (TriggerEvent::Push, None) => DeploymentDecision::Skip {
                reason: SkipReason::NoEnvironment,
            },
        }
    }

    pub fn selection(&self) -> Option<&EnvironmentSelection> {
        match self {
            DeploymentDecision::Deploy(selection) => Some(selection),
            DeploymentDecision::Skip { .. } => None,
        }
    }
}
