//! Pipeline inputs: the values a workflow invocation passes in.

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::config::RolloutConfig;
use crate::config::schema::{DEFAULT_APP_PORT, DEFAULT_HEALTH_CHECK_PATH, DEFAULT_PYTHON_VERSION};
use crate::environment::{HostnameOverrides, OverrideError};
use crate::health::is_valid_health_path;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("app_name is required. Pass --app-name or set app.name in rollout.toml")]
    MissingAppName,

    #[error("app_port '{value}' is not a valid port (1-65535)")]
    InvalidPort { value: String },

    #[error("health_check_path '{value}' must be an absolute path starting with a single '/'")]
    InvalidHealthPath { value: String },

    #[error("slack_webhook_url '{value}' is not a valid http(s) URL: {reason}")]
    InvalidWebhookUrl { value: String, reason: String },

    #[error("environment_hostnames: {0}")]
    Hostnames(#[from] OverrideError),
}

/// Raw input values given on the command line. Each one replaces the
/// corresponding config value.
#[derive(Debug, Clone, Default)]
pub struct InputOverrides {
    pub app_name: Option<String>,
    pub app_port: Option<String>,
    pub python_version: Option<String>,
    pub environment_hostnames: Option<String>,
    pub health_check_path: Option<String>,
    pub slack_webhook_url: Option<String>,
}

/// Validated pipeline inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineInputs {
    pub app_name: String,
    pub app_port: u16,
    pub python_version: String,
    #[serde(serialize_with = "serialize_overrides")]
    pub environment_hostnames: HostnameOverrides,
    pub health_check_path: String,
    #[serde(skip_serializing)]
    pub slack_webhook_url: Option<Url>,
}

fn serialize_overrides<S: serde::Serializer>(
    overrides: &HostnameOverrides,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&overrides.to_override_string())
}

impl PipelineInputs {
    /// Inputs with defaults for everything but the app name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            app_port: DEFAULT_APP_PORT,
            python_version: DEFAULT_PYTHON_VERSION.to_string(),
            environment_hostnames: HostnameOverrides::default(),
            health_check_path: DEFAULT_HEALTH_CHECK_PATH.to_string(),
            slack_webhook_url: None,
        }
    }

    /// Resolve inputs: CLI value, else config value, else default.
    pub fn resolve(config: &RolloutConfig, overrides: &InputOverrides) -> Result<Self, InputError> {
        let app_name = overrides
            .app_name
            .clone()
            .or_else(|| config.app.name.clone())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(InputError::MissingAppName)?;

        let app_port = match &overrides.app_port {
            Some(raw) => parse_port(raw)?,
            None => config.app.port.unwrap_or(DEFAULT_APP_PORT),
        };

        let python_version = overrides
            .python_version
            .clone()
            .or_else(|| config.app.python_version.clone())
            .unwrap_or_else(|| DEFAULT_PYTHON_VERSION.to_string());

        let hostnames = overrides
            .environment_hostnames
            .as_deref()
            .or(config.app.environment_hostnames.as_deref());
        let environment_hostnames = HostnameOverrides::parse_opt(hostnames)?;

        let health_check_path = overrides
            .health_check_path
            .clone()
            .or_else(|| config.app.health_check_path.clone())
            .unwrap_or_else(|| DEFAULT_HEALTH_CHECK_PATH.to_string());
        if !is_valid_health_path(&health_check_path) {
            return Err(InputError::InvalidHealthPath {
                value: health_check_path,
            });
        }

        let slack_webhook_url = overrides
            .slack_webhook_url
            .as_deref()
            .or(config.notify.slack_webhook_url.as_deref())
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_webhook_url)
            .transpose()?;

        Ok(Self {
            app_name,
            app_port,
            python_version,
            environment_hostnames,
            health_check_path,
            slack_webhook_url,
        })
    }

    pub fn with_hostnames(mut self, overrides: HostnameOverrides) -> Self {
        self.environment_hostnames = overrides;
        self
    }
}

fn parse_port(raw: &str) -> Result<u16, InputError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(InputError::InvalidPort {
            value: raw.to_string(),
        }),
    }
}

fn parse_webhook_url(raw: &str) -> Result<Url, InputError> {
    let url = Url::parse(raw.trim()).map_err(|e| InputError::InvalidWebhookUrl {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InputError::InvalidWebhookUrl {
            value: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}
