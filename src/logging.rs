//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{MarqueeError, Result};

/// Build the log filter. `RUST_LOG` wins over the configured level.
fn env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    parse_filter(level)
}

fn parse_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| MarqueeError::Config(format!("invalid log level {:?}: {}", level, e)))
}

/// Install the global tracing subscriber.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(&config.level)?;

    let installed = match config.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init(),
    };

    installed.map_err(|e| MarqueeError::Config(format!("failed to install logger: {}", e)))
}
