//! Telemetry initialisation for hosts of the crypto core.
//!
//! The core itself only emits `tracing` events; hosts that already install
//! a subscriber skip this module entirely. What it provides is the
//! lightweight default: structured JSON logs to stdout.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialise a process-wide tracing subscriber.
///
/// Outputs structured JSON logs to stdout at the configured log level;
/// `RUST_LOG` overrides `log_level` when set.
///
/// # Errors
///
/// Returns an error if a subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise lockbox tracing subscriber: {e}"))
}
