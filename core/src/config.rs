//! Executor configuration.
//!
//! # Design
//! `ClientConfig` is plain data so it can come from a config file through
//! serde or from the environment through `from_env`. The naming convention is
//! read-only once an executor is built from it.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::naming::NamingConvention;

pub const ENV_BASE_URL: &str = "TYPED_HTTP_BASE_URL";
pub const ENV_NAMING: &str = "TYPED_HTTP_NAMING";
pub const ENV_TIMEOUT_MS: &str = "TYPED_HTTP_TIMEOUT_MS";

/// Settings shared by an `Executor` and the transport it drives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Prefix joined literally with every request path.
    pub base_url: String,
    #[serde(default)]
    pub naming: NamingConvention,
    /// Transport-level request timeout. The pipeline itself enforces none.
    #[serde(default, deserialize_with = "millis::deserialize")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            naming: NamingConvention::default(),
            timeout: None,
            user_agent: None,
        }
    }

    pub fn naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Load from `TYPED_HTTP_BASE_URL`, `TYPED_HTTP_NAMING` and
    /// `TYPED_HTTP_TIMEOUT_MS`. Only the base URL is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(ENV_BASE_URL).ok_or(ConfigError::MissingVar(ENV_BASE_URL))?;
        let mut config = Self::new(base_url);
        if let Some(naming) = lookup(ENV_NAMING) {
            config.naming = naming.parse()?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let ms: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: ENV_TIMEOUT_MS,
                value: raw.clone(),
            })?;
            config.timeout = Some(Duration::from_millis(ms));
        }
        Ok(config)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn env_requires_base_url() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ENV_BASE_URL)));
    }

    #[test]
    fn env_reads_all_settings() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost:3000/api"),
            (ENV_NAMING, "camelCase"),
            (ENV_TIMEOUT_MS, "1500"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:3000/api");
        assert_eq!(config.naming, NamingConvention::CamelCase);
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn env_rejects_bad_timeout() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_BASE_URL, "http://x"), (ENV_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: ENV_TIMEOUT_MS, .. }));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"base_url":"http://x"}"#).unwrap();
        assert_eq!(config, ClientConfig::new("http://x"));

        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://x","naming":"verbatim","timeout":250}"#).unwrap();
        assert_eq!(config.naming, NamingConvention::Verbatim);
        assert_eq!(config.timeout, Some(Duration::from_millis(250)));
    }
}
