//! Configuration loading and validation for hosts of the crypto core.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::keys::MASTER_KEY_ENTRY;

/// Validated subsystem configuration.
///
/// Every field has a default, so loading succeeds in an empty environment;
/// hosts override via `LOCKBOX_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Key-store entry name the master key is persisted under
    /// (`LOCKBOX_KEY_ENTRY_NAME`). Must stay stable across runs of a
    /// deployment or the persisted key becomes unreachable.
    #[serde(default = "default_key_entry_name")]
    pub key_entry_name: String,

    /// Tracing log level (`LOCKBOX_LOG_LEVEL`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_key_entry_name() -> String {
    MASTER_KEY_ENTRY.into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_entry_name: default_key_entry_name(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("LOCKBOX"))
            .build()
            .context("failed to build lockbox configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise lockbox configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.key_entry_name.trim().is_empty() {
            anyhow::bail!("LOCKBOX_KEY_ENTRY_NAME must not be empty");
        }
        Ok(())
    }
}
