//! # Logging Setup
//!
//! Structured logging configuration built on `tracing-subscriber`.
//!
//! The filter is assembled from [`LoggingConfig`](crate::config::LoggingConfig)
//! but can always be overridden through the standard `RUST_LOG` environment
//! variable.

use crate::config::LoggingConfig;
use crate::error::{BleError, Result};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber from the given configuration.
///
/// # Errors
/// Returns `BleError::Config` if a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let default_directive = format!("{}={}", env!("CARGO_CRATE_NAME"), config.log_level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| BleError::Config(format!("Failed to install tracing subscriber: {e}")))
}

/// Install a plain subscriber for tests and examples; double init is ignored.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
