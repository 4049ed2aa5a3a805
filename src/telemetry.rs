//! Telemetry setup for dns-supervisor.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;
use crate::error::BoxError;

/// Initialize tracing with configurable log levels.
///
/// `RUST_LOG` takes precedence over the configured level. Returns an error
/// if a global subscriber is already installed.
pub fn init(config: &TelemetryConfig) -> Result<(), BoxError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
