//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::{ConfigStore, RolloutConfig, merge_configs};
use crate::pipeline::{PipelineSettings, lock_dir};
use crate::steps::ProcessRunner;
use crate::types::ConfigScope;

/// Paths shared by every command.
///
/// Frontends create this once and pass it to commands.
#[derive(Debug, Clone)]
pub struct AppContext {
    project_root: PathBuf,
    state_dir: PathBuf,
    global_config_dir: PathBuf,
}

impl AppContext {
    /// Create a context rooted at `project_root`, using the platform config
    /// and state directories.
    pub fn new(project_root: PathBuf) -> anyhow::Result<Self> {
        let global_config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("rollout");
        let state_dir = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .context("Could not determine state directory")?
            .join("rollout");

        Ok(Self {
            project_root,
            state_dir,
            global_config_dir,
        })
    }

    /// Create a context with explicit paths (for testing).
    pub fn with_paths(
        project_root: PathBuf,
        state_dir: PathBuf,
        global_config_dir: PathBuf,
    ) -> Self {
        Self {
            project_root,
            state_dir,
            global_config_dir,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn global_config_dir(&self) -> &Path {
        &self.global_config_dir
    }

    pub fn lock_dir(&self) -> PathBuf {
        lock_dir(&self.state_dir)
    }

    pub fn config_store(&self, scope: ConfigScope) -> ConfigStore {
        ConfigStore::from_paths(
            scope,
            self.global_config_dir.clone(),
            self.project_root.clone(),
        )
    }

    /// Global config overlaid with the project config, validated.
    pub fn load_merged_config(&self) -> anyhow::Result<RolloutConfig> {
        let global = self.config_store(ConfigScope::Global).load_optional()?;
        let project = self.config_store(ConfigScope::Project).load_optional()?;
        let merged = merge_configs(global, project);
        merged.validate()?;
        Ok(merged)
    }

    pub fn pipeline_settings(&self, config: &RolloutConfig) -> anyhow::Result<PipelineSettings> {
        PipelineSettings::from_config(config, &self.project_root, &self.state_dir)
    }

    /// Runs commands from the project root.
    pub fn process_runner(&self) -> ProcessRunner {
        ProcessRunner::new(self.project_root.clone())
    }
}
