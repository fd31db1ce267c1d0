//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable, ANSI colored lines
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// TTL in seconds applied to cache writes; also the staleness bound of list views
    pub cache_ttl: u64,
    /// Upper bound in milliseconds for a single cache backend round-trip
    pub cache_timeout_ms: u64,
    /// Maximum number of entries the in-memory backend can hold
    pub max_entries: usize,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Shared Redis backend; the in-memory backend is used when unset
    pub redis_url: Option<String>,
    /// Prefix of the exported metric names
    pub service_name: String,
    /// Log line format
    pub log_format: LogFormat,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_SECS` - Cache entry TTL in seconds (default: 300)
    /// - `CACHE_TIMEOUT_MS` - Cache round-trip bound in milliseconds (default: 250)
    /// - `MAX_ENTRIES` - Maximum in-memory cache entries (default: 10000)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 30)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `REDIS_URL` - Redis connection URL (default: unset)
    /// - `SERVICE_NAME` - Metric name prefix (default: "saldo")
    /// - `LOG_FORMAT` - `pretty` or `json` (default: pretty)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_ttl: parse_var("CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl),
            cache_timeout_ms: parse_var("CACHE_TIMEOUT_MS").unwrap_or(defaults.cache_timeout_ms),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            service_name: env::var("SERVICE_NAME")
                .ok()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.service_name),
            log_format: parse_var("LOG_FORMAT").unwrap_or(defaults.log_format),
        }
    }

    /// Cache entry TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    /// Cache round-trip bound as a Duration.
    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl: 300,
            cache_timeout_ms: 250,
            max_entries: 10_000,
            cleanup_interval: 30,
            server_port: 3000,
            redis_url: None,
            service_name: "saldo".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
