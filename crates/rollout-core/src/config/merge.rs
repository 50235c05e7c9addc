//! Configuration layer merging logic
//!
//! Implements the 2-layer merge strategy: Global -> Project.
//! A value set in the project layer replaces the global one; unset values
//! fall through.

use super::schema::{
    AppSection, ApprovalSection, CommandsSection, ConcurrencySection, DeploySection,
    EnvironmentEntry, HealthSection, NotifySection, RolloutConfig,
};

/// Merge configuration layers
///
/// # Arguments
/// * `global` - Global configuration from ~/.config/rollout/rollout.toml
/// * `project` - Project configuration from ./rollout.toml
pub fn merge_configs(global: Option<RolloutConfig>, project: Option<RolloutConfig>) -> RolloutConfig {
    let mut merged = global.unwrap_or_default();
    if let Some(project) = project {
        merge_rollout_config(&mut merged, project);
    }
    merged
}

fn merge_rollout_config(base: &mut RolloutConfig, layer: RolloutConfig) {
    merge_app(&mut base.app, layer.app);

    for (key, entry) in layer.environments {
        base.environments
            .entry(key)
            .and_modify(|existing| merge_environment(existing, entry.clone()))
            .or_insert(entry);
    }

    merge_commands(&mut base.commands, layer.commands);
    merge_deploy(&mut base.deploy, layer.deploy);
    merge_health(&mut base.health, layer.health);
    merge_notify(&mut base.notify, layer.notify);
    merge_approval(&mut base.approval, layer.approval);
    merge_concurrency(&mut base.concurrency, layer.concurrency);
}

fn overlay<T>(base: &mut Option<T>, layer: Option<T>) {
    if layer.is_some() {
        *base = layer;
    }
}

fn merge_app(base: &mut AppSection, layer: AppSection) {
    overlay(&mut base.name, layer.name);
    overlay(&mut base.port, layer.port);
    overlay(&mut base.python_version, layer.python_version);
    overlay(&mut base.health_check_path, layer.health_check_path);
    overlay(&mut base.environment_hostnames, layer.environment_hostnames);
}

fn merge_environment(base: &mut EnvironmentEntry, layer: EnvironmentEntry) {
    overlay(&mut base.hostname, layer.hostname);
    overlay(&mut base.runner, layer.runner);
    overlay(&mut base.inventory, layer.inventory);
}

fn merge_commands(base: &mut CommandsSection, layer: CommandsSection) {
    overlay(&mut base.lint, layer.lint);
    overlay(&mut base.test, layer.test);
}

fn merge_deploy(base: &mut DeploySection, layer: DeploySection) {
    overlay(&mut base.playbook, layer.playbook);
    overlay(&mut base.inventory, layer.inventory);
    overlay(&mut base.extra_args, layer.extra_args);
}

fn merge_health(base: &mut HealthSection, layer: HealthSection) {
    overlay(&mut base.settle_secs, layer.settle_secs);
    overlay(&mut base.timeout_secs, layer.timeout_secs);
    overlay(&mut base.log_lines, layer.log_lines);
}

fn merge_notify(base: &mut NotifySection, layer: NotifySection) {
    overlay(&mut base.slack_webhook_url, layer.slack_webhook_url);
    overlay(&mut base.on, layer.on);
}

fn merge_approval(base: &mut ApprovalSection, layer: ApprovalSection) {
    overlay(&mut base.timeout_secs, layer.timeout_secs);
}

fn merge_concurrency(base: &mut ConcurrencySection, layer: ConcurrencySection) {
    overlay(&mut base.lock_wait_secs, layer.lock_wait_secs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_rollout_toml_str;

    #[test]
    fn project_values_win() {
        let global = parse_rollout_toml_str(
            r#"
[app]
name = "global-app"
port = 9000

[environments.prod]
hostname = "prod-global"
runner = "prod-runner"
"#,
        )
        .unwrap();
        let project = parse_rollout_toml_str(
            r#"
[app]
name = "svc"

[environments.prod]
hostname = "prod-project"
"#,
        )
        .unwrap();

        let merged = merge_configs(Some(global), Some(project));

        assert_eq!(merged.app.name.as_deref(), Some("svc"));
        assert_eq!(merged.app.port, Some(9000));
        let prod = &merged.environments["prod"];
        assert_eq!(prod.hostname.as_deref(), Some("prod-project"));
        assert_eq!(prod.runner.as_deref(), Some("prod-runner"));
    }

    #[test]
    fn missing_layers_yield_empty_config() {
        assert_eq!(merge_configs(None, None), RolloutConfig::new());
    }

    #[test]
    fn webhook_from_global_survives_project_without_notify() {
        let global = parse_rollout_toml_str(
            r#"
[notify]
slack_webhook_url = "https://hooks.slack.com/services/a"
"#,
        )
        .unwrap();
        let project = parse_rollout_toml_str("[app]\nname = \"svc\"\n").unwrap();

        let merged = merge_configs(Some(global), Some(project));
        assert_eq!(
            merged.notify.slack_webhook_url.as_deref(),
            Some("https://hooks.slack.com/services/a")
        );
    }
}
