//! Configuration management for lagoon
//!
//! Settings come from `LAGOON_*` environment variables (plus the
//! conventional `REDIS_URL`, `SCRAPERAPI_KEY`, `TIDEAPI_KEY`,
//! `DATABASE_URL`, `DATABASE_AUTH`) or from a TOML file. Library components
//! only ever receive the typed sections below.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::cache::CacheConfig;
use crate::crawler::batch::BatchConfig;
use crate::crawler::fetcher::{FetchConfig, ProxyConfig};
use crate::crawler::url::SourcesConfig;
use crate::storage::SinkConfig;
use crate::time::parse_timezone;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Civil time settings
    pub time: TimeConfig,

    /// Cache store settings
    pub cache: CacheConfig,

    /// HTTP fetch settings
    pub fetch: FetchConfig,

    /// Batch scheduling settings
    pub batch: BatchConfig,

    /// Upstream endpoints and stop lists
    pub sources: SourcesConfig,

    /// Record store settings
    pub sink: SinkConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Civil time configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// IANA zone all wall-clock math runs in
    pub timezone: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Rome".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_string(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let proxy = env_string("SCRAPERAPI_KEY").map(|key| {
            let base = ProxyConfig::default();
            ProxyConfig {
                url: env_string("LAGOON_PROXY_URL").unwrap_or(base.url),
                username: env_string("LAGOON_PROXY_USER").unwrap_or(base.username),
                password: key,
                accept_invalid_certs: base.accept_invalid_certs,
            }
        });

        let fetch = FetchConfig {
            proxy,
            proxy_delay_min_ms: env_parse("LAGOON_PROXY_DELAY_MIN_MS", defaults.fetch.proxy_delay_min_ms),
            proxy_delay_max_ms: env_parse("LAGOON_PROXY_DELAY_MAX_MS", defaults.fetch.proxy_delay_max_ms),
            stagger_min_ms: env_parse("LAGOON_STAGGER_MIN_MS", defaults.fetch.stagger_min_ms),
            stagger_max_ms: env_parse("LAGOON_STAGGER_MAX_MS", defaults.fetch.stagger_max_ms),
            timeout_secs: env_parse("LAGOON_REQUEST_TIMEOUT", defaults.fetch.timeout_secs),
        };

        let cache = CacheConfig {
            url: env_string("REDIS_URL"),
            pool_size: env_parse("LAGOON_REDIS_POOL_SIZE", defaults.cache.pool_size),
            key_prefix: env_string("LAGOON_CACHE_PREFIX").unwrap_or(defaults.cache.key_prefix),
        };

        let batch = BatchConfig {
            concurrency: env_parse("LAGOON_BATCH_CONCURRENCY", defaults.batch.concurrency),
            cooldown_ms: env_parse("LAGOON_BATCH_COOLDOWN_MS", defaults.batch.cooldown_ms),
        };

        let sources = SourcesConfig {
            tide_api_key: env_string("TIDEAPI_KEY").unwrap_or_default(),
            ..defaults.sources
        };

        let sink = SinkConfig {
            url: env_string("DATABASE_URL"),
            auth: env_string("DATABASE_AUTH"),
            timeout_secs: env_parse("LAGOON_SINK_TIMEOUT", defaults.sink.timeout_secs),
        };

        Ok(Self {
            time: TimeConfig {
                timezone: env_string("LAGOON_TIMEZONE").unwrap_or(defaults.time.timezone),
            },
            cache,
            fetch,
            batch,
            sources,
            sink,
            logging: LoggingConfig {
                level: env_string("LAGOON_LOG_LEVEL").unwrap_or(defaults.logging.level),
                format: env_string("LAGOON_LOG_FORMAT").unwrap_or(defaults.logging.format),
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.batch.concurrency == 0 {
            anyhow::bail!("batch concurrency must be greater than 0");
        }

        if self.fetch.proxy_delay_min_ms > self.fetch.proxy_delay_max_ms {
            anyhow::bail!("proxy delay range is inverted");
        }

        if self.fetch.stagger_min_ms > self.fetch.stagger_max_ms {
            anyhow::bail!("stagger delay range is inverted");
        }

        if self.fetch.timeout_secs == 0 {
            anyhow::bail!("request timeout must be greater than 0");
        }

        if self.cache.pool_size == 0 {
            anyhow::bail!("cache pool_size must be greater than 0");
        }

        parse_timezone(&self.time.timezone)
            .with_context(|| format!("Invalid timezone: {}", self.time.timezone))?;

        Ok(())
    }
}
