//! # Stockpile - Resource Aggregation Cache
//!
//! Stockpile treats a group of containers, each holding several resource
//! slots, as one logical store. Queries and mutations are addressed by
//! resource type and spread across every slot of that type.
//!
//! ## Features
//!
//! - **Aggregation**: Per-type capacity, stored and reserved totals
//! - **Distribution**: Proportional add, remove, store and consume
//! - **Synchronization**: Pull from and push to an external group with change
//!   detection
//! - **Observability**: Events, metrics and cycle reports
//!
//! ## Quick Start
//!
//! ```
//! use stockpile::prelude::*;
//!
//! let fuel = ResourceTypeId::new(1);
//! let mut group = InMemoryGroup::new()
//!     .with_container(
//!         InMemoryContainer::new(ContainerId::new(1))
//!             .with_slot(ResourceSlot::new(fuel, 800.0).with_stored(700.0)),
//!     )
//!     .with_container(
//!         InMemoryContainer::new(ContainerId::new(2))
//!             .with_slot(ResourceSlot::new(fuel, 5120.0).with_stored(4000.0)),
//!     );
//!
//! let mut runtime = Stockpile::builder().build()?;
//! let outcome = runtime.run_cycle(&mut group, |cache| cache.add(fuel, 9001.0));
//!
//! assert_eq!(outcome.value, 1220.0);
//! assert_eq!(outcome.report.changed.len(), 2);
//! # Ok::<(), StockpileError>(())
//! ```
//!
//! ## Cycle Model
//!
//! 1. **Pull**: Snapshot the group into the runtime's reusable cache
//! 2. **Mutate**: Run caller code against the cache
//! 3. **Push**: Write stored amounts and reservations back, never capacity
//! 4. **Notify**: Emit one `AmountChanged` event per changed pair
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Your Application                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     stockpile (facade)                      │
//! │                    ┌───────────────────┐                    │
//! │                    │ Stockpile Builder │                    │
//! │                    └─────────┬─────────┘                    │
//! │                              │                              │
//! │   ┌────────────────┬────────────────┬───────────────────┐   │
//! │   │ stockpile-core │ stockpile-sync │ stockpile-observe │   │
//! │   │ (slots, cache, │ (group,        │ (events, metrics, │   │
//! │   │  arena)        │  bridge)       │  reports)         │   │
//! │   └────────────────┴────────────────┴───────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Instant;

use stockpile_core::{AggregationCache, ArenaStats, CacheConfig};
use stockpile_observe::{EventDispatcher, EventSubscriber, MetricsCollector, SyncEvent, SyncReport};
use stockpile_sync::{BridgeConfig, ContainerGroup, PushReport, SyncBridge};
use tracing::{debug, info};

// Re-export from sub-crates
pub use stockpile_core;
pub use stockpile_observe;
pub use stockpile_sync;

/// Main entry point for Stockpile.
pub struct Stockpile;

impl Stockpile {
    /// Create a new runtime builder.
    pub fn builder() -> StockpileBuilder {
        StockpileBuilder::new()
    }

    /// Create a runtime with default configuration.
    pub fn with_defaults() -> Result<StockpileRuntime, StockpileError> {
        StockpileBuilder::new().build()
    }
}

/// Builder for configuring the runtime.
pub struct StockpileBuilder {
    cache_config: CacheConfig,
    bridge_config: BridgeConfig,
    event_subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl StockpileBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            cache_config: CacheConfig::default(),
            bridge_config: BridgeConfig::default(),
            event_subscribers: Vec::new(),
        }
    }

    /// Set the cache configuration.
    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Set the bridge configuration.
    pub fn with_bridge_config(mut self, config: BridgeConfig) -> Self {
        self.bridge_config = config;
        self
    }

    /// Set the change tolerance of the bridge.
    pub fn with_change_tolerance(mut self, tolerance: f64) -> Self {
        self.bridge_config = self.bridge_config.with_change_tolerance(tolerance);
        self
    }

    /// Add an event subscriber.
    pub fn with_event_subscriber(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.event_subscribers.push(subscriber);
        self
    }

    /// Build the runtime.
    pub fn build(self) -> Result<StockpileRuntime, StockpileError> {
        if !self.bridge_config.change_tolerance.is_finite() {
            return Err(StockpileError::InvalidConfig(format!(
                "change tolerance must be finite, got {}",
                self.bridge_config.change_tolerance
            )));
        }

        let event_dispatcher = EventDispatcher::new();
        for subscriber in self.event_subscribers {
            event_dispatcher.subscribe(subscriber);
        }

        let bridge_config = self.bridge_config.with_cache_config(self.cache_config.clone());
        let cache = AggregationCache::new(self.cache_config);

        Ok(StockpileRuntime {
            bridge: SyncBridge::new(bridge_config),
            cache,
            event_dispatcher: Arc::new(event_dispatcher),
            metrics: Arc::new(MetricsCollector::new()),
            last_push: None,
        })
    }
}

impl Default for StockpileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one sync cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome<R> {
    /// What the push found and wrote.
    pub report: PushReport,
    /// Value returned by the cycle closure.
    pub value: R,
}

/// A configured runtime owning a reusable cache.
pub struct StockpileRuntime {
    bridge: SyncBridge,
    cache: AggregationCache,
    event_dispatcher: Arc<EventDispatcher>,
    metrics: Arc<MetricsCollector>,
    last_push: Option<PushReport>,
}

impl StockpileRuntime {
    /// Get the bridge.
    pub fn bridge(&self) -> &SyncBridge {
        &self.bridge
    }

    /// Get the cache as left by the last cycle.
    pub fn cache(&self) -> &AggregationCache {
        &self.cache
    }

    /// Get the event dispatcher.
    pub fn event_dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.event_dispatcher
    }

    /// Get the metrics collector.
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Get the push report of the last cycle.
    pub fn last_push(&self) -> Option<&PushReport> {
        self.last_push.as_ref()
    }

    /// Pull `group`, run `f` on the cache, and push the result back.
    pub fn run_cycle<G, F, R>(&mut self, group: &mut G, f: F) -> CycleOutcome<R>
    where
        G: ContainerGroup + ?Sized,
        F: FnOnce(&mut AggregationCache) -> R,
    {
        self.begin_cycle(group);
        let value = f(&mut self.cache);
        let report = self.finish_cycle(group);
        CycleOutcome { report, value }
    }

    /// Like [`run_cycle`](Self::run_cycle), but skips the push when `f`
    /// fails, leaving the group untouched.
    pub fn try_run_cycle<G, F, R, E>(&mut self, group: &mut G, f: F) -> Result<CycleOutcome<R>, E>
    where
        G: ContainerGroup + ?Sized,
        F: FnOnce(&mut AggregationCache) -> Result<R, E>,
    {
        self.begin_cycle(group);
        match f(&mut self.cache) {
            Ok(value) => {
                let report = self.finish_cycle(group);
                Ok(CycleOutcome { report, value })
            }
            Err(e) => {
                debug!("Cycle closure failed, push skipped");
                self.metrics.record_end();
                Err(e)
            }
        }
    }

    /// Build a report of the last cycle.
    pub fn sync_report(&self) -> SyncReport {
        let push = self.last_push.clone().unwrap_or_default();
        let mut report =
            SyncReport::new(&push, self.metrics.snapshot()).with_aggregates(self.cache.aggregates());
        if self.last_push.is_none() {
            report.add_info("No cycle has run yet");
        }
        report
    }

    /// Release the cache arena.
    pub fn dispose(self) -> ArenaStats {
        let stats = self.cache.dispose();
        self.event_dispatcher.emit(SyncEvent::CacheDisposed {
            peak_slots: stats.peak_slots,
            clear_count: stats.clear_count,
        });
        stats
    }

    fn begin_cycle<G>(&mut self, group: &G)
    where
        G: ContainerGroup + ?Sized,
    {
        self.metrics.record_start();

        let start = Instant::now();
        self.bridge.pull_into(group, &mut self.cache);
        let duration = start.elapsed();

        self.metrics
            .record_pull(self.cache.container_count(), self.cache.slot_count(), duration);
        self.event_dispatcher.emit(SyncEvent::Pulled {
            containers: self.cache.container_count(),
            slots: self.cache.slot_count(),
            resource_types: self.cache.resource_types().count(),
            duration,
        });
    }

    fn finish_cycle<G>(&mut self, group: &mut G) -> PushReport
    where
        G: ContainerGroup + ?Sized,
    {
        let start = Instant::now();
        let report = self.bridge.push(&self.cache, group);
        let duration = start.elapsed();

        self.metrics.record_push(&report, duration);
        self.event_dispatcher.emit(SyncEvent::Pushed {
            visited: report.visited,
            written: report.written,
            changed: report.changed.len(),
            warnings: report.warnings.len(),
            duration,
        });

        for warning in &report.warnings {
            self.event_dispatcher.emit(SyncEvent::ConsistencyWarning {
                warning: warning.clone(),
            });
        }

        for &(container, resource_type) in &report.changed {
            let stored = report
                .stored_total(container, resource_type)
                .unwrap_or_default();
            self.event_dispatcher.emit(SyncEvent::AmountChanged {
                container,
                resource_type,
                stored,
            });
        }

        self.metrics.record_end();
        info!(
            changed = report.changed.len(),
            warnings = report.warnings.len(),
            "Completed sync cycle"
        );

        self.last_push = Some(report.clone());
        report
    }
}

impl std::fmt::Debug for StockpileRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockpileRuntime")
            .field("bridge", &self.bridge)
            .field("slots", &self.cache.slot_count())
            .finish()
    }
}

/// Errors from the Stockpile runtime.
#[derive(Debug, thiserror::Error)]
pub enum StockpileError {
    /// Cache lookup error.
    #[error("Cache error: {0}")]
    Cache(#[from] stockpile_core::CacheError),

    /// Slot validation error.
    #[error("Slot error: {0}")]
    Slot(#[from] stockpile_core::SlotError),

    /// Group construction error.
    #[error("Sync error: {0}")]
    Sync(#[from] stockpile_sync::SyncError),

    /// Invalid runtime configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Main types
    pub use crate::{CycleOutcome, Stockpile, StockpileBuilder, StockpileError, StockpileRuntime};

    // Core types
    pub use stockpile_core::{
        AggregationCache, CacheConfig, CacheError, ContainerId, ResourceSlot, ResourceTypeId,
    };

    // Sync types
    pub use stockpile_sync::{
        BridgeConfig, ConsistencyWarning, ContainerGroup, InMemoryContainer, InMemoryGroup,
        PushReport, SlotWrite, SyncBridge,
    };

    // Observability types
    pub use stockpile_observe::{
        EventDispatcher, EventSubscriber, MetricsCollector, SyncEvent, SyncReport,
    };

    // Common std types
    pub use std::sync::Arc;
}
