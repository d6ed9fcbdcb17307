//! Stockpile Sync - Container Group Bridge
//!
//! This crate connects an [`AggregationCache`](stockpile_core::AggregationCache)
//! to the external system that owns the containers:
//!
//! - [`ContainerGroup`]: the narrow, index-stable read/write contract a group
//!   must provide
//! - [`InMemoryGroup`]: a plain group used by tools and tests
//! - [`SyncBridge`]: pulls a group into a cache and pushes the cache back,
//!   reporting which `(container, resource)` pairs changed
//!
//! # Cycle
//!
//! ```text
//!   ContainerGroup ──pull──▶ AggregationCache ──mutate──▶ AggregationCache
//!         ▲                                                      │
//!         └──────────────────────push (PushReport)───────────────┘
//! ```
//!
//! A push matches positions by `(container, index)` in pull order. It writes
//! resource type, stored amount and reservation ledger, and never capacity.
//! Disagreements found on the way are reported as [`ConsistencyWarning`]s
//! and never abort the push.

pub mod bridge;
pub mod config;
pub mod error;
pub mod group;

// Re-export main types
pub use bridge::{ChangedPair, PushReport, SyncBridge};
pub use config::BridgeConfig;
pub use error::{ConsistencyWarning, SyncError, SyncResult};
pub use group::{ContainerGroup, InMemoryContainer, InMemoryGroup, SlotWrite};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bridge::{PushReport, SyncBridge};
    pub use crate::config::BridgeConfig;
    pub use crate::error::{ConsistencyWarning, SyncError, SyncResult};
    pub use crate::group::{ContainerGroup, InMemoryContainer, InMemoryGroup, SlotWrite};
}
