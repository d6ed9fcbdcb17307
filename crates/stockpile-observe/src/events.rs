//! Observable events during a sync cycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use stockpile_core::{ContainerId, ResourceTypeId};
use stockpile_sync::ConsistencyWarning;

/// Events that can be observed during a sync cycle.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A container group was pulled into a cache.
    Pulled {
        /// Containers pulled.
        containers: usize,
        /// Slots pulled.
        slots: usize,
        /// Distinct resource types seen.
        resource_types: usize,
        /// Pull duration.
        duration: Duration,
    },
    /// A cache was pushed back to its group.
    Pushed {
        /// Positions visited.
        visited: usize,
        /// Positions written.
        written: usize,
        /// Changed `(container, resource)` pairs.
        changed: usize,
        /// Consistency warnings raised.
        warnings: usize,
        /// Push duration.
        duration: Duration,
    },
    /// The stored amount of a resource in a container changed.
    AmountChanged {
        /// The container.
        container: ContainerId,
        /// The resource type.
        resource_type: ResourceTypeId,
        /// New stored amount of that resource in the container.
        stored: f64,
    },
    /// A push found a disagreement with the group.
    ConsistencyWarning {
        /// The warning.
        warning: ConsistencyWarning,
    },
    /// A cache released its arena.
    CacheDisposed {
        /// Largest number of slots ever held.
        peak_slots: usize,
        /// Number of times the cache was cleared.
        clear_count: u64,
    },
    /// Custom event.
    Custom {
        /// Event name.
        name: String,
        /// Event data.
        data: serde_json::Value,
    },
}

impl SyncEvent {
    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            SyncEvent::Pulled { .. } => "pulled",
            SyncEvent::Pushed { .. } => "pushed",
            SyncEvent::AmountChanged { .. } => "amount_changed",
            SyncEvent::ConsistencyWarning { .. } => "consistency_warning",
            SyncEvent::CacheDisposed { .. } => "cache_disposed",
            SyncEvent::Custom { .. } => "custom",
        }
    }
}

/// Subscriber for sync events.
pub trait EventSubscriber: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &SyncEvent);

    /// Event types this subscriber wants, or `None` for all of them.
    fn event_filter(&self) -> Option<Vec<&'static str>> {
        None
    }
}

/// A subscriber that forwards events to `tracing`.
pub struct LoggingSubscriber {
    /// Minimum log level for events.
    pub log_level: tracing::Level,
}

impl LoggingSubscriber {
    /// Create a new logging subscriber.
    pub fn new() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
        }
    }

    /// Set the log level.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.log_level = level;
        self
    }
}

impl Default for LoggingSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for LoggingSubscriber {
    fn on_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::Pulled {
                containers,
                slots,
                resource_types,
                duration,
            } => {
                tracing::debug!(
                    event = "pulled",
                    containers = containers,
                    slots = slots,
                    resource_types = resource_types,
                    duration_us = duration.as_micros(),
                    "Group pulled"
                );
            }
            SyncEvent::Pushed {
                visited,
                written,
                changed,
                warnings,
                duration,
            } => {
                tracing::debug!(
                    event = "pushed",
                    visited = visited,
                    written = written,
                    changed = changed,
                    warnings = warnings,
                    duration_us = duration.as_micros(),
                    "Cache pushed"
                );
            }
            SyncEvent::AmountChanged {
                container,
                resource_type,
                stored,
            } => {
                tracing::trace!(
                    event = "amount_changed",
                    container = %container,
                    resource_type = %resource_type,
                    stored = stored,
                    "Amount changed"
                );
            }
            SyncEvent::ConsistencyWarning { warning } => {
                tracing::warn!(
                    event = "consistency_warning",
                    kind = warning.kind(),
                    "{}",
                    warning
                );
            }
            SyncEvent::CacheDisposed {
                peak_slots,
                clear_count,
            } => {
                tracing::debug!(
                    event = "cache_disposed",
                    peak_slots = peak_slots,
                    clear_count = clear_count,
                    "Cache disposed"
                );
            }
            SyncEvent::Custom { name, data } => {
                tracing::debug!(
                    event = "custom",
                    name = name,
                    data = %data,
                    "Custom event"
                );
            }
        }
    }
}

/// A subscriber that collects events for later analysis.
pub struct CollectingSubscriber {
    events: RwLock<Vec<(Instant, SyncEvent)>>,
    max_events: usize,
    filter: Option<Vec<&'static str>>,
}

impl CollectingSubscriber {
    /// Create a new collecting subscriber.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events,
            filter: None,
        }
    }

    /// Only collect the given event types.
    pub fn with_filter(mut self, event_types: Vec<&'static str>) -> Self {
        self.filter = Some(event_types);
        self
    }

    /// Get collected events.
    pub fn events(&self) -> Vec<(Instant, SyncEvent)> {
        self.events.read().clone()
    }

    /// Clear collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Get event count.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl EventSubscriber for CollectingSubscriber {
    fn on_event(&self, event: &SyncEvent) {
        let mut events = self.events.write();
        if events.len() < self.max_events {
            events.push((Instant::now(), event.clone()));
        }
    }

    fn event_filter(&self) -> Option<Vec<&'static str>> {
        self.filter.clone()
    }
}

/// Event dispatcher that manages subscribers.
#[derive(Default)]
pub struct EventDispatcher {
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// Remove all subscribers.
    pub fn clear_subscribers(&self) {
        self.subscribers.write().clear();
    }

    /// Get subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: SyncEvent) {
        let subscribers = self.subscribers.read();
        for subscriber in subscribers.iter() {
            if let Some(filter) = subscriber.event_filter() {
                if !filter.contains(&event.event_type()) {
                    continue;
                }
            }
            subscriber.on_event(&event);
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(container: u64) -> SyncEvent {
        SyncEvent::AmountChanged {
            container: ContainerId::new(container),
            resource_type: ResourceTypeId::new(1),
            stored: 5.0,
        }
    }

    #[test]
    fn test_sync_event_type() {
        let event = SyncEvent::CacheDisposed {
            peak_slots: 4,
            clear_count: 1,
        };
        assert_eq!(event.event_type(), "cache_disposed");
        assert_eq!(changed(1).event_type(), "amount_changed");
    }

    #[test]
    fn test_collecting_subscriber() {
        let subscriber = CollectingSubscriber::new(100);
        subscriber.on_event(&changed(7));

        assert_eq!(subscriber.len(), 1);
        match &subscriber.events()[0].1 {
            SyncEvent::AmountChanged { container, .. } => {
                assert_eq!(*container, ContainerId::new(7));
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_collecting_subscriber_max_events() {
        let subscriber = CollectingSubscriber::new(2);
        for i in 0..5 {
            subscriber.on_event(&SyncEvent::Custom {
                name: format!("event_{}", i),
                data: serde_json::Value::Null,
            });
        }
        assert_eq!(subscriber.len(), 2);
    }

    #[test]
    fn test_dispatcher_respects_filter() {
        let dispatcher = EventDispatcher::new();
        let all = Arc::new(CollectingSubscriber::new(100));
        let changes = Arc::new(CollectingSubscriber::new(100).with_filter(vec!["amount_changed"]));

        dispatcher.subscribe(Arc::clone(&all) as Arc<dyn EventSubscriber>);
        dispatcher.subscribe(Arc::clone(&changes) as Arc<dyn EventSubscriber>);

        dispatcher.emit(changed(1));
        dispatcher.emit(SyncEvent::ConsistencyWarning {
            warning: ConsistencyWarning::SlotCountMismatch {
                visited: 1,
                external: 2,
            },
        });

        assert_eq!(all.len(), 2);
        assert_eq!(changes.len(), 1);
        assert_eq!(dispatcher.subscriber_count(), 2);
    }
}
