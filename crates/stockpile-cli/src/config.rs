//! Optional runtime configuration file.
//!
//! ```toml
//! [cache]
//! initial_slot_capacity = 256
//!
//! [bridge]
//! change_tolerance = 1e-9
//! verify_capacity = true
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use stockpile::prelude::*;

/// Settings read from `--config`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Cache settings.
    pub cache: CacheConfig,
    /// Bridge settings.
    pub bridge: BridgeConfig,
}

impl CliConfig {
    /// Load the file at `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Build a runtime from these settings.
    pub fn runtime(&self) -> Result<StockpileRuntime> {
        Stockpile::builder()
            .with_cache_config(self.cache.clone())
            .with_bridge_config(self.bridge.clone())
            .build()
            .context("Failed to create runtime")
    }
}
