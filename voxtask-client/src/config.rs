use crate::errors::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 1500;
pub const DEFAULT_DATABASE_URL: &str = "sqlite:voxtask.db?mode=rwc";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub health_timeout_ms: u64,
    pub database_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            health_timeout_ms: DEFAULT_HEALTH_TIMEOUT_MS,
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `VOXTASK_*` environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("VOXTASK_API_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ms) = lookup("VOXTASK_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = parse_millis("VOXTASK_REQUEST_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("VOXTASK_HEALTH_TIMEOUT_MS") {
            config.health_timeout_ms = parse_millis("VOXTASK_HEALTH_TIMEOUT_MS", &ms)?;
        }
        if let Some(url) = lookup("VOXTASK_DATABASE_URL") {
            config.database_url = url;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }
}

fn parse_millis(key: &str, value: &str) -> ClientResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ClientError::Config(format!("{} must be milliseconds, got {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.request_timeout(), Duration::from_millis(3000));
        assert_eq!(config.health_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("VOXTASK_API_URL", "https://tasks.example.com/"),
            ("VOXTASK_REQUEST_TIMEOUT_MS", "5000"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.base_url, "https://tasks.example.com");
        assert_eq!(config.request_timeout_ms, 5000);
        assert_eq!(config.health_timeout_ms, DEFAULT_HEALTH_TIMEOUT_MS);
    }

    #[test]
    fn test_malformed_timeout_is_config_error() {
        let result = ClientConfig::from_lookup(|k| {
            (k == "VOXTASK_HEALTH_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url": "http://10.0.0.2:8000"}"#).unwrap();
        assert_eq!(config.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
    }
}
