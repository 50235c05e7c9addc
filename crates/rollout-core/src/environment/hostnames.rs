//! Parsing of `env=hostname,...` override strings.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::types::Environment;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverrideError {
    #[error("Hostname override '{segment}' is missing '='. Expected env=hostname")]
    MissingSeparator { segment: String },

    #[error("Unknown environment '{key}' in hostname override '{segment}'. Use dev, test or prod")]
    UnknownEnvironment { key: String, segment: String },

    #[error("Hostname override '{segment}' has an empty hostname")]
    EmptyHostname { segment: String },

    #[error("Environment '{key}' is overridden more than once")]
    DuplicateEnvironment { key: String },
}

/// Hostname overrides keyed by environment.
///
/// Environments without an entry keep whatever hostname the environment
/// table provides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostnameOverrides {
    hosts: BTreeMap<Environment, String>,
}

impl HostnameOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `dev=custom-dev01,test=custom-test01,prod=custom-prod01`.
    ///
    /// Whitespace is trimmed and empty segments are skipped. Every other
    /// malformed segment is rejected.
    pub fn parse(input: &str) -> Result<Self, OverrideError> {
        let mut hosts = BTreeMap::new();

        for segment in input.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (key, host) =
                segment
                    .split_once('=')
                    .ok_or_else(|| OverrideError::MissingSeparator {
                        segment: segment.to_string(),
                    })?;
            let key = key.trim();
            let host = host.trim();

            let env = Environment::from_key(key).ok_or_else(|| {
                OverrideError::UnknownEnvironment {
                    key: key.to_string(),
                    segment: segment.to_string(),
                }
            })?;
            if host.is_empty() {
                return Err(OverrideError::EmptyHostname {
                    segment: segment.to_string(),
                });
            }
            if hosts.insert(env, host.to_string()).is_some() {
                return Err(OverrideError::DuplicateEnvironment {
                    key: key.to_string(),
                });
            }
        }

        Ok(Self { hosts })
    }

    /// Parse an optional override string; `None` yields no overrides.
    pub fn parse_opt(input: Option<&str>) -> Result<Self, OverrideError> {
        input.map(Self::parse).transpose().map(Option::unwrap_or_default)
    }

    pub fn with(mut self, env: Environment, host: impl Into<String>) -> Self {
        self.hosts.insert(env, host.into());
        self
    }

    pub fn get(&self, env: Environment) -> Option<&str> {
        self.hosts.get(&env).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Render back to the `env=host,...` form in environment order.
    pub fn to_override_string(&self) -> String {
        self.hosts
            .iter()
            .map(|(env, host)| format!("{}={}", env.key(), host))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_first_equals_only() {
        let overrides = HostnameOverrides::parse("dev=host=odd").unwrap();
        assert_eq!(overrides.get(Environment::Development), Some("host=odd"));
    }

    #[test]
    fn parse_opt_none_is_empty() {
        assert!(HostnameOverrides::parse_opt(None).unwrap().is_empty());
    }

    #[test]
    fn render_in_environment_order() {
        let overrides = HostnameOverrides::parse("prod=p,dev=d").unwrap();
        assert_eq!(overrides.to_override_string(), "dev=d,prod=p");
    }
}
