use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub retention: RetentionConfig,
    pub self_log: SelfLogConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
    /// Maximum accepted request body, in bytes
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            body_limit_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:./data/logs.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub search_ttl_seconds: u64,
    pub service_list_ttl_seconds: u64,
    pub purge_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_ttl_seconds: 60,
            service_list_ttl_seconds: 300,
            purge_interval_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Run the scheduled cleanup task
    pub enabled: bool,
    /// Age threshold for the scheduled cleanup
    pub days: u32,
    /// Smallest retention window callers may request
    pub min_days: u32,
    /// Hour of day (UTC) to run the scheduled cleanup
    pub cleanup_hour: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            days: 30,
            min_days: 7,
            cleanup_hour: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SelfLogConfig {
    pub service_name: String,
}

impl Default for SelfLogConfig {
    fn default() -> Self {
        Self {
            service_name: "log-hub".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "/metrics".to_string(),
        }
    }
}

/// Load configuration from `path` (optional) layered with `LOG_HUB__*` env vars
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("LOG_HUB").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.database.url.is_empty() {
        anyhow::bail!("database.url cannot be empty");
    }

    if cfg.database.max_connections == 0 {
        anyhow::bail!("database.max_connections must be at least 1");
    }

    if cfg.cache.search_ttl_seconds == 0 || cfg.cache.service_list_ttl_seconds == 0 {
        anyhow::bail!("Cache TTLs must be greater than 0");
    }

    if cfg.cache.purge_interval_seconds == 0 {
        anyhow::bail!("cache.purge_interval_seconds must be greater than 0");
    }

    if cfg.retention.min_days == 0 {
        anyhow::bail!("retention.min_days must be at least 1");
    }

    if cfg.retention.days < cfg.retention.min_days {
        anyhow::bail!(
            "retention.days ({}) cannot be lower than retention.min_days ({})",
            cfg.retention.days,
            cfg.retention.min_days
        );
    }

    if cfg.retention.cleanup_hour > 23 {
        anyhow::bail!("retention.cleanup_hour must be between 0 and 23");
    }

    match cfg.server.log_format.as_str() {
        "text" | "json" => {}
        other => anyhow::bail!("Invalid server.log_format: {} (expected text or json)", other),
    }

    if cfg.self_log.service_name.trim().is_empty() {
        anyhow::bail!("self_log.service_name cannot be empty");
    }

    if !cfg.metrics.endpoint.starts_with('/') {
        anyhow::bail!("metrics.endpoint must start with '/'");
    }

    Ok(())
}
