//! Config store for loading and saving rollout.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::types::ConfigScope;

use super::{RolloutConfig, parser, paths::config_path_for_scope};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    scope: ConfigScope,
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_paths(scope: ConfigScope, global_dir: PathBuf, project_root: PathBuf) -> Self {
        let config_path = config_path_for_scope(scope, &global_dir, &project_root);
        Self { scope, config_path }
    }

    pub fn scope(&self) -> ConfigScope {
        self.scope
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    /// Load the config; a missing file is an empty config.
    pub fn load(&self) -> anyhow::Result<RolloutConfig> {
        if !self.config_path.exists() {
            return Ok(RolloutConfig::new());
        }
        parser::parse_rollout_toml(&self.config_path)
    }

    /// Load the config, or `None` when the file does not exist.
    pub fn load_optional(&self) -> anyhow::Result<Option<RolloutConfig>> {
        if !self.config_path.exists() {
            return Ok(None);
        }
        parser::parse_rollout_toml(&self.config_path).map(Some)
    }

    pub fn save(&self, config: &RolloutConfig) -> anyhow::Result<()> {
        let content = parser::to_toml(config).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
