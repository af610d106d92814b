//! Process-wide logging setup.
//!
//! `log` records are bridged into `tracing`, so pipeline spans and plain
//! log lines end up in the same subscriber.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::schema::{LogFormat, LoggingConfig};
use crate::error::ConfigError;

/// Builds the level filter. `RUST_LOG` wins over the configured level.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            ConfigError::Logging(format!("Invalid log level '{}': {}", config.level, e))
        }),
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = env_filter(config)?;

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
        LogFormat::Text => fmt::layer().with_target(true).boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(fmt_layer).with(filter);

    tracing_log::LogTracer::init()
        .map_err(|e| ConfigError::Logging(format!("Failed to bridge log records: {}", e)))?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ConfigError::Logging(format!("Failed to set subscriber: {}", e)))?;

    log::debug!("Logging initialized ({:?}, level {})", config.format, config.level);
    Ok(())
}
