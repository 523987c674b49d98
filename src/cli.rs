//! Command-line interface.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::{AppConfig, LogFormat};

/// Movie catalogue JSON API.
#[derive(Debug, Parser)]
#[command(name = "marquee", version, about)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    pub addr: Option<SocketAddr>,

    /// Environment name (development|staging|production)
    #[arg(long = "env")]
    pub environment: Option<String>,

    /// SQLite database path
    #[arg(long)]
    pub db: Option<String>,

    /// Enable per-client rate limiting
    #[arg(long)]
    pub limiter_enabled: Option<bool>,

    /// Rate limiter sustained requests per second
    #[arg(long)]
    pub limiter_rps: Option<f64>,

    /// Rate limiter maximum burst
    #[arg(long)]
    pub limiter_burst: Option<u32>,

    /// Identify clients by X-Forwarded-For / X-Real-IP
    #[arg(long)]
    pub trust_proxy: bool,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Apply flags given on the command line over `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(addr) = self.addr {
            config.server.addr = addr;
        }
        if let Some(ref env) = self.environment {
            config.server.environment = env.clone();
        }
        if let Some(ref db) = self.db {
            config.database.path = db.clone();
        }
        if let Some(enabled) = self.limiter_enabled {
            config.limiter.enabled = enabled;
        }
        if let Some(rps) = self.limiter_rps {
            config.limiter.rps = rps;
        }
        if let Some(burst) = self.limiter_burst {
            config.limiter.burst = burst;
        }
        if self.trust_proxy {
            config.server.trust_proxy = true;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}
