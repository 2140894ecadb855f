use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use h2h_lib::config::parse_base_url;
use h2h_lib::{parse_metric_keys, Config, H2hError, MetricKey};
use url::Url;

pub fn load_config(path: Option<&Path>) -> Result<Config, H2hError> {
    let cfg = if let Some(p) = path {
        Config::from_toml_file(p).map_err(|e| {
            H2hError::Config(format!("Failed to read config {}: {}", p.display(), e))
        })?
    } else {
        Config::default()
    };

    cfg.validate()
        .map_err(|e| H2hError::Config(format!("Invalid config: {}", e)))?;
    Ok(cfg)
}

/// Settings after applying CLI overrides on top of the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    pub base_url: Url,
    pub token_env: String,
    pub metrics: BTreeSet<MetricKey>,
    pub cache_capacity: usize,
    pub request_timeout: Duration,
}

pub fn resolve_settings(
    config: &Config,
    cli_api_url: Option<&str>,
    cli_metrics: Option<&[String]>,
) -> Result<ResolvedSettings, H2hError> {
    let base_url = match cli_api_url {
        Some(raw) => parse_base_url(raw).map_err(|e| H2hError::Config(e.to_string()))?,
        None => config
            .base_url()
            .map_err(|e| H2hError::Config(e.to_string()))?,
    };
    let metrics = match cli_metrics {
        Some(items) => parse_metric_keys(items).map_err(H2hError::selection)?,
        None => config.enabled_metrics(),
    };

    Ok(ResolvedSettings {
        base_url,
        token_env: config.token_env.clone(),
        metrics,
        cache_capacity: config.cache_capacity,
        request_timeout: config.timeouts.request,
    })
}

pub fn format_effective_config(settings: &ResolvedSettings, config_source: Option<&Path>) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let metrics: Vec<&str> = settings.metrics.iter().map(|k| k.as_str()).collect();
    format!(
        "Effective config [{source}]: api={}, token-env={}, cache={} entries, timeout={}s, metrics=[{}]",
        settings.base_url,
        settings.token_env,
        settings.cache_capacity,
        settings.request_timeout.as_secs_f32(),
        metrics.join(",")
    )
}
