//! Configuration management for rollout.toml
//!
//! Supports two configuration scopes:
//! - Global: user-wide defaults (webhook URLs, runner labels)
//! - Project: checked into the application repository

pub mod merge;
pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use merge::merge_configs;
pub use parser::{parse_rollout_toml, parse_rollout_toml_str, to_toml};
pub use paths::{CONFIG_FILE_NAME, config_path_for_scope};
pub use schema::{
    AppSection, ApprovalSection, CommandsSection, ConcurrencySection, DeploySection,
    EnvironmentEntry, HealthSection, NotifyPolicy, NotifySection, RolloutConfig,
};
pub use store::ConfigStore;

pub use crate::types::ConfigScope;
