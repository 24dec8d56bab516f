//! Client configuration: base URL, global timeout and default headers.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout", with = "millis")]
    pub timeout: Duration,
    #[serde(default = "default_headers")]
    pub default_headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            default_headers: default_headers(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_millis(DEFAULT_TIMEOUT_MS)
}

fn default_headers() -> Vec<(String, String)> {
    vec![("accept".to_string(), "application/json".to_string())]
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `API_URL` and `API_TIMEOUT` (milliseconds) from the environment,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut config = Self::default();
        if let Some(url) = lookup("API_URL").filter(|u| !u.trim().is_empty()) {
            config.base_url = url;
        }
        if let Some(raw) = lookup("API_TIMEOUT") {
            let ms: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ApiError::validation("API_TIMEOUT", format!("not a number of milliseconds: {raw}")))?;
            // Zero falls back to the default, matching a falsy timeout.
            if ms > 0 {
                config.timeout = Duration::from_millis(ms);
            }
        }
        Ok(config)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(300));
    }

    #[test]
    fn env_overrides_url_and_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("API_URL", "https://api.example.test/"),
            ("API_TIMEOUT", "1500"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://api.example.test/");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn zero_timeout_keeps_default() {
        let config = ClientConfig::from_lookup(lookup(&[("API_TIMEOUT", "0")])).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(300));
    }

    #[test]
    fn garbage_timeout_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("API_TIMEOUT", "soon")])).unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "API_TIMEOUT", .. }));
    }

    #[test]
    fn deserializes_with_field_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://10.0.2.2:3000","timeout":2000}"#).unwrap();
        assert_eq!(config.base_url, "http://10.0.2.2:3000");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.default_headers.len(), 1);
    }
}
