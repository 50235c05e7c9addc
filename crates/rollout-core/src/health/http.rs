//! HTTP health probe.

use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::RolloutConfig;
use crate::config::schema::{DEFAULT_HEALTH_TIMEOUT_SECS, DEFAULT_SETTLE_SECS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub url: String,
    pub status: Option<u16>,
    pub passed: bool,
    pub detail: String,
}

/// A single-shot HTTP check. Implementations never retry.
pub trait HttpProbe {
    fn probe(&self, url: &Url) -> ProbeOutcome;
}

/// An absolute path on the probed host. `//x` would name another host.
pub fn is_valid_health_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//")
}

/// `http://<hostname>:<port><path>`
pub fn health_url(hostname: &str, port: u16, path: &str) -> anyhow::Result<Url> {
    if !is_valid_health_path(path) {
        anyhow::bail!("Invalid health check path '{path}': must be an absolute path");
    }
    let base = Url::parse(&format!("http://{hostname}:{port}/"))
        .with_context(|| format!("Invalid health check host '{hostname}'"))?;
    base.join(path)
        .with_context(|| format!("Invalid health check path '{path}'"))
}

/// Waits a fixed settle delay, then performs one GET with a timeout.
#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    settle: Duration,
    timeout: Duration,
}

impl Default for ReqwestProbe {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(DEFAULT_SETTLE_SECS),
            timeout: Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECS),
        }
    }
}

impl ReqwestProbe {
    pub fn new(settle: Duration, timeout: Duration) -> Self {
        Self { settle, timeout }
    }

    pub fn from_config(config: &RolloutConfig) -> Self {
        Self::new(
            Duration::from_secs(config.health.settle_secs.unwrap_or(DEFAULT_SETTLE_SECS)),
            Duration::from_secs(
                config
                    .health
                    .timeout_secs
                    .unwrap_or(DEFAULT_HEALTH_TIMEOUT_SECS),
            ),
        )
    }

    async fn fetch(&self, url: &Url) -> anyhow::Result<u16> {
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("rollout/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .no_proxy()
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Health check request to {url} failed"))?;

        Ok(response.status().as_u16())
    }
}

impl HttpProbe for ReqwestProbe {
    fn probe(&self, url: &Url) -> ProbeOutcome {
        debug!(%url, settle_secs = self.settle.as_secs(), "probing health endpoint");

        let result = tokio::runtime::Runtime::new()
            .context("Failed to create tokio runtime")
            .and_then(|runtime| runtime.block_on(self.fetch(url)));

        match result {
            Ok(status) if (200..300).contains(&status) => ProbeOutcome {
                url: url.to_string(),
                status: Some(status),
                passed: true,
                detail: format!("HTTP {status}"),
            },
            Ok(status) => ProbeOutcome {
                url: url.to_string(),
                status: Some(status),
                passed: false,
                detail: format!("HTTP {status}, expected 2xx"),
            },
            Err(e) => ProbeOutcome {
                url: url.to_string(),
                status: None,
                passed: false,
                detail: format!("{e:#}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_url_joins_path() {
        let url = health_url("dev01", 7868, "/health").unwrap();
        assert_eq!(url.as_str(), "http://dev01:7868/health");
    }

    #[test]
    fn health_url_keeps_query() {
        let url = health_url("prod01", 80, "/status?deep=1").unwrap();
        assert_eq!(url.as_str(), "http://prod01/status?deep=1");
    }

    #[test]
    fn health_path_must_be_local_absolute() {
        assert!(is_valid_health_path("/health"));
        assert!(!is_valid_health_path("health"));
        assert!(!is_valid_health_path("//other/x"));
        assert!(health_url("dev01", 7868, "//health").is_err());
    }
}
