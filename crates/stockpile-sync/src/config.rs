//! Configuration for the synchronization bridge.

use serde::{Deserialize, Serialize};
use stockpile_core::CacheConfig;

/// Configuration for a [`SyncBridge`](crate::bridge::SyncBridge).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Smallest stored-amount difference reported as a change.
    ///
    /// A difference must exceed this value to count. Defaults to `0.0`, so
    /// any difference counts.
    pub change_tolerance: f64,

    /// Leave a container untouched when its id at a position no longer
    /// matches the pulled one.
    ///
    /// Defaults to `true`. When `false` the cached slots are written into
    /// whatever container now sits at that position.
    pub skip_mismatched_containers: bool,

    /// Write the cached resource type over a disagreeing external one.
    ///
    /// Defaults to `false`: a mismatched position keeps the group's resource
    /// type while its stored and reserved amounts are still written back and
    /// checked for changes.
    pub overwrite_mismatched_types: bool,

    /// Report capacity changes made to the group since the pull.
    ///
    /// Defaults to `false`.
    pub verify_capacity: bool,

    /// Configuration for caches created by `pull`.
    pub cache: CacheConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            change_tolerance: 0.0,
            skip_mismatched_containers: true,
            overwrite_mismatched_types: false,
            verify_capacity: false,
            cache: CacheConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Create a new bridge configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the change tolerance.
    pub fn with_change_tolerance(mut self, tolerance: f64) -> Self {
        self.change_tolerance = tolerance.abs();
        self
    }

    /// Enable or disable skipping of containers whose id changed.
    pub fn with_skip_mismatched_containers(mut self, enabled: bool) -> Self {
        self.skip_mismatched_containers = enabled;
        self
    }

    /// Enable or disable overwriting of disagreeing resource types.
    pub fn with_overwrite_mismatched_types(mut self, enabled: bool) -> Self {
        self.overwrite_mismatched_types = enabled;
        self
    }

    /// Enable or disable capacity verification.
    pub fn with_verify_capacity(mut self, enabled: bool) -> Self {
        self.verify_capacity = enabled;
        self
    }

    /// Set the cache configuration used by `pull`.
    pub fn with_cache_config(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Exact change detection with every consistency check enabled.
    pub fn strict() -> Self {
        Self {
            change_tolerance: 0.0,
            skip_mismatched_containers: true,
            overwrite_mismatched_types: false,
            verify_capacity: true,
            cache: CacheConfig::default(),
        }
    }

    /// Ignore floating-point noise and write the cache back unconditionally.
    pub fn lenient() -> Self {
        Self {
            change_tolerance: 1e-9,
            skip_mismatched_containers: false,
            overwrite_mismatched_types: true,
            verify_capacity: false,
            cache: CacheConfig::default(),
        }
    }
}
