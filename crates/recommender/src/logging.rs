//! Structured logging setup

use crate::config::LoggingConfig;
use crate::error::{RecommenderError, Result};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. An unparsable
/// `RUST_LOG` falls back to the configured level with a warning.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, rejected) = build_filter(rust_log.as_deref(), &config.level)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| RecommenderError::configuration(format!("logging already initialized: {}", e)))?;

    if let Some(reason) = rejected {
        warn!(
            rust_log = rust_log.as_deref().unwrap_or_default(),
            error = %reason,
            level = %config.level,
            "ignoring invalid RUST_LOG, using configured level"
        );
    }

    Ok(())
}

/// Pick the filter; the second value is why `rust_log` was rejected, if it was
fn build_filter(rust_log: Option<&str>, level: &str) -> Result<(EnvFilter, Option<String>)> {
    let rejected = match rust_log {
        Some(directives) => match EnvFilter::try_new(directives) {
            Ok(filter) => return Ok((filter, None)),
            Err(e) => Some(e.to_string()),
        },
        None => None,
    };

    let filter = EnvFilter::try_new(level).map_err(|e| {
        RecommenderError::configuration_key(
            format!("invalid log level {:?}: {}", level, e),
            "logging.level",
        )
    })?;

    Ok((filter, rejected))
}
