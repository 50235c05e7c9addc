//! TOML parser with helpful error messages

use super::schema::RolloutConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse rollout.toml with detailed error messages
pub fn parse_rollout_toml(path: &Path) -> Result<RolloutConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_rollout_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse rollout.toml content from string
pub fn parse_rollout_toml_str(content: &str) -> Result<RolloutConfig> {
    let config: RolloutConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config)
}

/// Enhance TOML parsing errors with the surrounding lines
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    let line_hint = error.span().map(|span| {
        content.as_bytes()[..span.start.min(content.len())]
            .iter()
            .filter(|b| **b == b'\n')
            .count()
            + 1
    });

    if let Some(line_num) = line_hint {
        let context = get_line_context(content, line_num);
        anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            context,
            error_msg
        )
    } else {
        anyhow::anyhow!("TOML parsing error: {}", error_msg)
    }
}

fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());
    if start >= end {
        return String::new();
    }

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a configuration to TOML string
pub fn to_toml(config: &RolloutConfig) -> Result<String> {
    toml::to_string_pretty(config).with_context(|| "Failed to serialize configuration to TOML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::NotifyPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
[app]
name = "inventory-api"
port = 8080

[environments.prod]
hostname = "prod-eu-01"
runner = "prod-eu"

[commands]
lint = ["ruff", "check", "."]

[notify]
slack_webhook_url = "https://hooks.slack.com/services/T000/B000/XXXX"
on = "failure"
"#;

        let config = parse_rollout_toml_str(toml).unwrap();
        assert_eq!(config.app.name.as_deref(), Some("inventory-api"));
        assert_eq!(config.app.port, Some(8080));
        assert_eq!(
            config.environments["prod"].hostname.as_deref(),
            Some("prod-eu-01")
        );
        assert_eq!(config.commands.lint.as_ref().unwrap().len(), 3);
        assert_eq!(config.notify.on, Some(NotifyPolicy::Failure));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_rollout_toml_str("").unwrap();
        assert_eq!(config, RolloutConfig::new());
    }

    #[test]
    fn test_parse_invalid_toml() {
        let toml = r#"
[app
name = "x"
"#;
        assert!(parse_rollout_toml_str(toml).is_err());
    }

    #[test]
    fn test_unknown_environment_rejected() {
        let toml = r#"
[environments.staging]
hostname = "stage01"
"#;
        let err = parse_rollout_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("Unknown environment 'staging'"));
    }

    #[test]
    fn test_empty_command_rejected() {
        let toml = r#"
[commands]
test = []
"#;
        let err = parse_rollout_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("commands.test"));
    }

    #[test]
    fn test_unknown_notify_policy_rejected() {
        let toml = r#"
[notify]
on = "sometimes"
"#;
        assert!(parse_rollout_toml_str(toml).is_err());
    }

    #[test]
    fn test_health_path_must_be_absolute() {
        let toml = r#"
[app]
health_check_path = "health"
"#;
        assert!(parse_rollout_toml_str(toml).is_err());
    }

    #[test]
    fn test_error_mentions_line() {
        let toml = "[app]\nport = \"not a number\"\n";
        let err = parse_rollout_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("line 2") || err.contains("TOML parsing error"));
    }

    #[test]
    fn test_starter_roundtrip() {
        let original = RolloutConfig::starter("inventory-api");
        let parsed = parse_rollout_toml_str(&to_toml(&original).unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[app]\nname = \"svc\"").unwrap();

        let config = parse_rollout_toml(temp_file.path()).unwrap();
        assert_eq!(config.app.name.as_deref(), Some("svc"));
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = parse_rollout_toml(Path::new("/nonexistent/path/rollout.toml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
