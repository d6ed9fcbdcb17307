//! Stockpile Observability
//!
//! This crate provides observability for Stockpile sync cycles, including:
//!
//! - [`MetricsCollector`]: Collects pull, push and change metrics
//! - [`SyncReport`]: Complete cycle reports
//! - [`EventDispatcher`]: Observable event system
//!
//! # Metrics Collection
//!
//! ```
//! use std::time::Duration;
//! use stockpile_observe::MetricsCollector;
//!
//! let collector = MetricsCollector::new();
//! collector.record_start();
//! collector.record_pull(2, 6, Duration::from_micros(40));
//! collector.record_end();
//!
//! let snapshot = collector.snapshot();
//! assert_eq!(snapshot.slots.last_slot_count, 6);
//! ```
//!
//! # Event Subscription
//!
//! ```
//! use std::sync::Arc;
//! use stockpile_core::{ContainerId, ResourceTypeId};
//! use stockpile_observe::{CollectingSubscriber, EventDispatcher, EventSubscriber, SyncEvent};
//!
//! let dispatcher = EventDispatcher::new();
//! let collector = Arc::new(CollectingSubscriber::new(64));
//! dispatcher.subscribe(Arc::clone(&collector) as Arc<dyn EventSubscriber>);
//!
//! dispatcher.emit(SyncEvent::AmountChanged {
//!     container: ContainerId::new(1),
//!     resource_type: ResourceTypeId::new(1),
//!     stored: 42.0,
//! });
//! assert_eq!(collector.len(), 1);
//! ```

pub mod events;
pub mod metrics;
pub mod report;

// Re-export main types
pub use events::{
    CollectingSubscriber, EventDispatcher, EventSubscriber, LoggingSubscriber, SyncEvent,
};
pub use metrics::{
    CycleMetrics, MetricsCollector, MetricsSnapshot, SlotMetrics, TimingMetrics, WarningMetrics,
};
pub use report::{AggregateRow, CycleId, Diagnostic, DiagnosticLevel, SyncReport};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::events::{EventDispatcher, EventSubscriber, SyncEvent};
    pub use crate::metrics::{MetricsCollector, MetricsSnapshot};
    pub use crate::report::{CycleId, SyncReport};
}
