//! Configuration management for Marquee.
//!
//! Settings are layered: built-in defaults, then an optional YAML file,
//! then `MARQUEE__`-prefixed environment variables. Command-line flags are
//! applied on top by the binary.

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{MarqueeError, Result};

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "MARQUEE";
/// Separator between the prefix and nested keys, e.g. `MARQUEE__LIMITER__RPS`.
const ENV_SEPARATOR: &str = "__";

/// Main configuration for the Marquee service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Per-client rate limiting configuration
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_addr")]
    pub addr: SocketAddr,

    /// Deployment environment name, reported by the healthcheck
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Honour `X-Forwarded-For` / `X-Real-IP` when identifying clients
    #[serde(default)]
    pub trust_proxy: bool,

    /// Maximum accepted request body size
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            environment: default_environment(),
            trust_proxy: false,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 4000))
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_max_body_bytes() -> usize {
    1_048_576
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path (`:memory:` for a throwaway database)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "marquee.db".to_string()
}

/// Per-client rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Globally bypass limiting when false
    #[serde(default = "default_limiter_enabled")]
    pub enabled: bool,

    /// Sustained requests per second per client
    #[serde(default = "default_rps")]
    pub rps: f64,

    /// Maximum instantaneous burst per client
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Seconds between idle-client sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Seconds a client may stay idle before being forgotten
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold_secs: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: default_limiter_enabled(),
            rps: default_rps(),
            burst: default_burst(),
            sweep_interval_secs: default_sweep_interval(),
            idle_threshold_secs: default_idle_threshold(),
        }
    }
}

impl LimiterConfig {
    /// Interval between sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Idle time after which a client is evicted.
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs)
    }
}

fn default_limiter_enabled() -> bool {
    true
}

fn default_rps() -> f64 {
    2.0
}

fn default_burst() -> u32 {
    4
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_idle_threshold() -> u64 {
    180
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from defaults, an optional YAML file and the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`AppConfig::load`], reading overrides from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let defaults = Config::try_from(&AppConfig::default()).map_err(config_error)?;

        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            let path = path.to_str().ok_or_else(|| {
                MarqueeError::Config(format!("config path is not valid UTF-8: {}", path.display()))
            })?;
            builder = builder.add_source(File::new(path, FileFormat::Yaml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize::<AppConfig>())
            .map_err(config_error)
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| MarqueeError::Config(e.to_string()))
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        let limiter = &self.limiter;
        if limiter.enabled {
            if !limiter.rps.is_finite() || limiter.rps <= 0.0 {
                return Err(MarqueeError::Config(format!(
                    "limiter.rps must be a positive number, got {}",
                    limiter.rps
                )));
            }
            if limiter.burst == 0 {
                return Err(MarqueeError::Config(
                    "limiter.burst must be at least 1".to_string(),
                ));
            }
        }
        if limiter.sweep_interval_secs == 0 {
            return Err(MarqueeError::Config(
                "limiter.sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        if limiter.idle_threshold_secs == 0 {
            return Err(MarqueeError::Config(
                "limiter.idle_threshold_secs must be greater than zero".to_string(),
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(MarqueeError::Config(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.database.path.is_empty() {
            return Err(MarqueeError::Config("database.path must not be empty".to_string()));
        }
        Ok(())
    }
}

fn config_error(e: config::ConfigError) -> MarqueeError {
    MarqueeError::Config(e.to_string())
}
