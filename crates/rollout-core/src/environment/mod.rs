//! Branch-to-environment resolution and deployment gating.

pub mod hostnames;
pub mod resolver;
pub mod rules;

pub use hostnames::{HostnameOverrides, OverrideError};
pub use resolver::{
    DeploymentDecision, EnvironmentResolver, EnvironmentSelection, EnvironmentTable,
    EnvironmentTarget, SkipReason, resolve_environment,
};
pub use rules::{BRANCH_RULES, BranchRule, match_branch, normalize_branch};
