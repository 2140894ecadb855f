use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::api_client::DEFAULT_TOKEN_ENV;
use crate::metrics::MetricKey;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

/// File-backed settings; every field has a built-in default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    /// Name of the environment variable holding the API bearer token.
    pub token_env: String,
    pub default_metrics: Vec<MetricKey>,
    /// Maximum number of per-query stat records kept by one session.
    pub cache_capacity: usize,
    pub timeouts: Timeouts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    #[serde(with = "humantime_serde")]
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(10),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            default_metrics: MetricKey::ALL.to_vec(),
            cache_capacity: 256,
            timeouts: Timeouts::default(),
        }
    }
}

impl Config {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        if self.token_env.trim().is_empty() {
            return Err(ConfigError::Invalid("token_env must not be empty".into()));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "cache_capacity must be at least 1".into(),
            ));
        }
        if self.timeouts.request.is_zero() {
            return Err(ConfigError::Invalid(
                "timeouts.request must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        parse_base_url(&self.api_base_url)
    }

    pub fn enabled_metrics(&self) -> BTreeSet<MetricKey> {
        self.default_metrics.iter().copied().collect()
    }
}

/// Accept only absolute http(s) URLs.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::Invalid(format!("api_base_url '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid(format!(
            "api_base_url '{raw}': unsupported scheme '{other}' (expected http or https)"
        ))),
    }
}
