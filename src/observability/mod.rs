//! # Observability Infrastructure
//!
//! Structured logging bootstrap for the access-control core, built on the
//! tracing ecosystem. Services annotate their methods with `#[instrument]`;
//! this module installs the subscriber that renders those spans and events.

use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;
use crate::errors::{AnteroomError, Result};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured log level so operators can
/// raise verbosity without touching configuration. Safe to call once per
/// process; a second call reports an error from the subscriber registry.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| AnteroomError::internal(format!("Invalid log level filter: {}", e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json_logging {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| {
        AnteroomError::internal(format!("Failed to initialize tracing subscriber: {}", e))
    })?;

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logging = config.json_logging,
        "Observability initialized"
    );

    Ok(())
}
