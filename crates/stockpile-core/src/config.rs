//! Configuration types for the aggregation cache.

use serde::{Deserialize, Serialize};

/// Configuration for an [`AggregationCache`](crate::cache::AggregationCache).
///
/// The cache's slot arena is meant to live across many simulation ticks, so
/// these settings mostly control how its allocation is sized and reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of slots to reserve room for when the arena is created.
    ///
    /// Defaults to 64.
    pub initial_slot_capacity: usize,

    /// Release the arena's allocation on `clear` instead of keeping it.
    ///
    /// Defaults to `false`, so a cleared cache can be refilled without
    /// reallocating.
    pub shrink_on_clear: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_slot_capacity: 64,
            shrink_on_clear: false,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial slot capacity.
    pub fn with_initial_slot_capacity(mut self, slots: usize) -> Self {
        self.initial_slot_capacity = slots;
        self
    }

    /// Enable or disable shrinking on clear.
    pub fn with_shrink_on_clear(mut self, enabled: bool) -> Self {
        self.shrink_on_clear = enabled;
        self
    }

    /// Configuration for small groups or short-lived caches.
    pub fn compact() -> Self {
        Self {
            initial_slot_capacity: 8,
            shrink_on_clear: true,
        }
    }

    /// Standard configuration.
    pub fn standard() -> Self {
        Self::default()
    }

    /// Configuration for large groups reused every tick.
    pub fn large() -> Self {
        Self {
            initial_slot_capacity: 4096,
            shrink_on_clear: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.initial_slot_capacity, 64);
        assert!(!config.shrink_on_clear);
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new()
            .with_initial_slot_capacity(16)
            .with_shrink_on_clear(true);

        assert_eq!(config.initial_slot_capacity, 16);
        assert!(config.shrink_on_clear);
    }

    #[test]
    fn test_cache_config_presets() {
        let compact = CacheConfig::compact();
        let standard = CacheConfig::standard();
        let large = CacheConfig::large();

        assert!(compact.initial_slot_capacity < standard.initial_slot_capacity);
        assert!(standard.initial_slot_capacity < large.initial_slot_capacity);
    }
}
