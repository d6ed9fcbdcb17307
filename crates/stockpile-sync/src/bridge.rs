//! Pull and push between an [`AggregationCache`] and a [`ContainerGroup`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use stockpile_core::{AggregationCache, ContainerId, ResourceTypeId};
use tracing::{debug, info, trace, warn};

use crate::config::BridgeConfig;
use crate::error::ConsistencyWarning;
use crate::group::{ContainerGroup, SlotWrite};

/// Outcome of a push.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushReport {
    /// `(container, resource type)` pairs whose stored amount changed.
    pub changed: BTreeSet<(ContainerId, ResourceTypeId)>,
    /// Consistency problems found during the walk.
    pub warnings: Vec<ConsistencyWarning>,
    /// Positions visited.
    pub visited: usize,
    /// Positions written back.
    pub written: usize,
    /// Stored amount per `(container, resource type)` in the group after the
    /// push, summed over every visited position.
    pub stored_totals: BTreeMap<(ContainerId, ResourceTypeId), f64>,
}

impl PushReport {
    /// Check if the push found no consistency problems.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Check if any stored amount changed.
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Stored amount a container holds of a resource type after the push.
    ///
    /// Returns `None` when no visited position of that container carries
    /// the type.
    pub fn stored_total(
        &self,
        container: ContainerId,
        resource_type: ResourceTypeId,
    ) -> Option<f64> {
        self.stored_totals.get(&(container, resource_type)).copied()
    }

    /// Changed pairs as a serializable list.
    pub fn changed_pairs(&self) -> Vec<ChangedPair> {
        self.changed
            .iter()
            .map(|&(container, resource_type)| ChangedPair {
                container,
                resource_type,
            })
            .collect()
    }

    fn warn(&mut self, warning: ConsistencyWarning) {
        warn!(kind = warning.kind(), "{}", warning);
        self.warnings.push(warning);
    }
}

/// One entry of the changed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedPair {
    /// The external container.
    pub container: ContainerId,
    /// The resource type whose stored amount changed.
    pub resource_type: ResourceTypeId,
}

/// Moves slot state between a cache and an external group.
///
/// # Example
///
/// ```
/// use stockpile_core::{ContainerId, ResourceSlot, ResourceTypeId};
/// use stockpile_sync::{InMemoryContainer, InMemoryGroup, SyncBridge};
///
/// let fuel = ResourceTypeId::new(1);
/// let mut group = InMemoryGroup::new().with_container(
///     InMemoryContainer::new(ContainerId::new(1))
///         .with_slot(ResourceSlot::new(fuel, 10.0).with_stored(7.0)),
/// );
///
/// let bridge = SyncBridge::with_defaults();
/// let mut cache = bridge.pull(&group);
/// cache.add(fuel, 2.0);
///
/// let report = bridge.push(&cache, &mut group);
/// assert!(report.changed.contains(&(ContainerId::new(1), fuel)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncBridge {
    config: BridgeConfig,
}

impl SyncBridge {
    /// Create a bridge.
    pub fn new(config: BridgeConfig) -> Self {
        info!(
            change_tolerance = config.change_tolerance,
            skip_mismatched_containers = config.skip_mismatched_containers,
            overwrite_mismatched_types = config.overwrite_mismatched_types,
            verify_capacity = config.verify_capacity,
            "Created sync bridge"
        );
        Self { config }
    }

    /// Create a bridge with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(BridgeConfig::default())
    }

    /// Get the bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Snapshot a group into a new cache.
    pub fn pull<G>(&self, group: &G) -> AggregationCache
    where
        G: ContainerGroup + ?Sized,
    {
        let mut cache = AggregationCache::new(self.config.cache.clone());
        self.pull_into(group, &mut cache);
        cache
    }

    /// Snapshot a group into an existing cache, reusing its arena.
    pub fn pull_into<G>(&self, group: &G, cache: &mut AggregationCache)
    where
        G: ContainerGroup + ?Sized,
    {
        cache.clear();

        for container in 0..group.container_count() {
            let Some(id) = group.container_id(container) else {
                break;
            };
            let slots = (0..group.slot_count(container))
                .map_while(|index| group.read_slot(container, index));
            cache.append_container(id, slots);
        }

        cache.refresh_aggregates();

        info!(
            containers = cache.container_count(),
            slots = cache.slot_count(),
            resource_types = cache.resource_types().count(),
            "Pulled container group"
        );
    }

    /// Write cached slot state back to the group.
    ///
    /// Positions are matched by `(container, index)` in the order the cache
    /// was pulled. Capacity is never written. A position whose resource type
    /// disagrees with the cache is reported and, unless
    /// [`overwrite_mismatched_types`](BridgeConfig::overwrite_mismatched_types)
    /// is set, keeps the group's type while taking the cached amounts.
    pub fn push<G>(&self, cache: &AggregationCache, group: &mut G) -> PushReport
    where
        G: ContainerGroup + ?Sized,
    {
        let mut report = PushReport::default();
        let external_containers = group.container_count();

        for (position, span) in cache.spans().iter().enumerate() {
            let external_id = if position < external_containers {
                group.container_id(position)
            } else {
                None
            };

            let Some(external_id) = external_id else {
                report.warn(ConsistencyWarning::ContainerMismatch {
                    position,
                    cached: span.id,
                    external: None,
                });
                continue;
            };

            if external_id != span.id {
                report.warn(ConsistencyWarning::ContainerMismatch {
                    position,
                    cached: span.id,
                    external: Some(external_id),
                });
                if self.config.skip_mismatched_containers {
                    continue;
                }
            }

            let cached_slots = &cache.slots()[span.range()];
            for (index, slot) in cached_slots.iter().enumerate() {
                let Some(current) = group.read_slot(position, index) else {
                    break;
                };
                report.visited += 1;

                let mut write = SlotWrite::from(slot);
                if current.resource_type != slot.resource_type {
                    report.warn(ConsistencyWarning::ResourceTypeMismatch {
                        container: external_id,
                        index,
                        cached: slot.resource_type,
                        external: current.resource_type,
                    });
                    if !self.config.overwrite_mismatched_types {
                        write.resource_type = current.resource_type;
                    }
                }
                let resource_type = write.resource_type;

                if self.config.verify_capacity && current.capacity != slot.capacity {
                    report.warn(ConsistencyWarning::CapacityMismatch {
                        container: external_id,
                        index,
                        cached: slot.capacity,
                        external: current.capacity,
                    });
                }

                if (slot.stored - current.stored).abs() > self.config.change_tolerance {
                    report.changed.insert((external_id, resource_type));
                }

                let stored = if group.write_slot(position, index, write) {
                    report.written += 1;
                    trace!(
                        container = %external_id,
                        index,
                        resource_type = %resource_type,
                        stored = slot.stored,
                        reserved = slot.reserved,
                        "Wrote slot"
                    );
                    slot.stored
                } else {
                    debug!(container = %external_id, index, "Group rejected slot write");
                    current.stored
                };
                *report
                    .stored_totals
                    .entry((external_id, resource_type))
                    .or_default() += stored;
            }
        }

        let external_slots = group.total_slot_count();
        if report.visited != external_slots {
            report.warn(ConsistencyWarning::SlotCountMismatch {
                visited: report.visited,
                external: external_slots,
            });
        }

        info!(
            visited = report.visited,
            written = report.written,
            changed = report.changed.len(),
            warnings = report.warnings.len(),
            "Pushed cache to container group"
        );

        report
    }
}
