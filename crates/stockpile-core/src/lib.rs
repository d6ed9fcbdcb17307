//! Stockpile Core - Resource Aggregation
//!
//! This crate provides the accounting core of Stockpile:
//!
//! - [`ResourceSlot`]: capacity, stored amount and reservation ledger of one
//!   resource type in one container
//! - [`AggregationCache`]: a flat snapshot of a container group with per-type
//!   aggregates and group-level mutations
//! - [`SlotArena`]: the owned, reusable slot buffer behind a cache
//!
//! # Quick Start
//!
//! ```
//! use stockpile_core::prelude::*;
//!
//! let fuel = ResourceTypeId::new(1);
//! let mut cache = AggregationCache::new(CacheConfig::compact());
//! cache.append_container(ContainerId::new(1), [ResourceSlot::new(fuel, 10.0).with_stored(7.0)]);
//!
//! assert_eq!(cache.add(fuel, 100.0), 3.0);
//! assert_eq!(cache.stored(fuel), Ok(10.0));
//! ```
//!
//! # Accounting Model
//!
//! 1. **Stored**: the only durable quantity, always within `[0, capacity]`
//! 2. **Capacity**: fixed per slot, owned by the external group
//! 3. **Reserved**: a signed scratch ledger of pending store and consume
//!    intentions, zeroed by `reset` and reconciled by `dump_reserved`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            stockpile (facade)           │
//! ├─────────────────────────────────────────┤
//! │  stockpile-sync   │  stockpile-observe  │
//! ├─────────────────────────────────────────┤
//! │             stockpile-core              │
//! └─────────────────────────────────────────┘
//! ```

pub mod arena;
pub mod cache;
pub mod config;
pub mod error;
pub mod slot;
pub mod types;

// Re-export main types at crate root
pub use arena::{ArenaStats, ContainerSpan, SlotArena};
pub use cache::AggregationCache;
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult, SlotError, SlotResult};
pub use slot::ResourceSlot;
pub use types::{ContainerId, ResourceTypeId};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use stockpile_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cache::AggregationCache;
    pub use crate::config::CacheConfig;
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::slot::ResourceSlot;
    pub use crate::types::{ContainerId, ResourceTypeId};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_end_to_end() {
        let fuel = ResourceTypeId::new(1);
        let oxidizer = ResourceTypeId::new(2);

        let mut cache = AggregationCache::with_defaults();
        cache.append_container(
            ContainerId::new(10),
            [
                ResourceSlot::new(fuel, 360.0).with_stored(360.0),
                ResourceSlot::new(oxidizer, 440.0).with_stored(440.0),
            ],
        );
        cache.append_container(
            ContainerId::new(11),
            [ResourceSlot::new(fuel, 180.0).with_stored(90.0)],
        );

        assert_eq!(cache.remove(oxidizer, 40.0), 40.0);
        assert_eq!(cache.stored(oxidizer), Ok(400.0));
        assert_eq!(cache.add(fuel, 500.0), 90.0);
        assert_eq!(cache.stored(fuel), Ok(540.0));
    }
}
