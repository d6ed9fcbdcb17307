//! Metrics collection across sync cycles.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use stockpile_core::ResourceTypeId;
use stockpile_sync::{ConsistencyWarning, PushReport};

/// Collects metrics across pulls and pushes.
#[derive(Default)]
pub struct MetricsCollector {
    /// Timing metrics.
    timing: RwLock<TimingMetrics>,
    /// Pull and push counters.
    cycles: RwLock<CycleMetrics>,
    /// Slot and container counts.
    slots: RwLock<SlotMetrics>,
    /// Warning counts per kind.
    warnings: RwLock<WarningMetrics>,
    /// Changed-pair counts per resource type.
    changes: DashMap<ResourceTypeId, u64>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a cycle.
    pub fn record_start(&self) {
        let mut timing = self.timing.write();
        timing.start_time = Some(Instant::now());
        timing.end_time = None;
    }

    /// Record the end of a cycle.
    pub fn record_end(&self) {
        let mut timing = self.timing.write();
        timing.end_time = Some(Instant::now());
        if let (Some(start), Some(end)) = (timing.start_time, timing.end_time) {
            timing.cycle_time = end.duration_since(start);
        }
        self.cycles.write().cycle_count += 1;
    }

    /// Record a completed pull.
    pub fn record_pull(&self, containers: usize, slots: usize, duration: Duration) {
        self.timing.write().pull_time = duration;
        self.cycles.write().pull_count += 1;

        let mut metrics = self.slots.write();
        metrics.last_container_count = containers;
        metrics.last_slot_count = slots;
        metrics.total_slots_pulled += slots as u64;
        if slots > metrics.peak_slot_count {
            metrics.peak_slot_count = slots;
        }
    }

    /// Record a completed push and everything it reported.
    pub fn record_push(&self, report: &PushReport, duration: Duration) {
        self.timing.write().push_time = duration;
        {
            let mut cycles = self.cycles.write();
            cycles.push_count += 1;
            cycles.total_changed += report.changed.len() as u64;
            cycles.total_written += report.written as u64;
        }

        for (_, resource_type) in &report.changed {
            self.record_change(*resource_type);
        }
        for warning in &report.warnings {
            self.record_warning(warning);
        }
    }

    /// Record one changed pair for a resource type.
    pub fn record_change(&self, resource_type: ResourceTypeId) {
        *self.changes.entry(resource_type).or_insert(0) += 1;
    }

    /// Record a consistency warning.
    pub fn record_warning(&self, warning: &ConsistencyWarning) {
        let mut warnings = self.warnings.write();
        warnings.total += 1;
        *warnings
            .counts
            .entry(warning.kind().to_string())
            .or_insert(0) += 1;
    }

    /// Number of changes recorded for a resource type.
    pub fn change_count(&self, resource_type: ResourceTypeId) -> u64 {
        self.changes.get(&resource_type).map(|c| *c).unwrap_or(0)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timing: self.timing.read().clone(),
            cycles: self.cycles.read().clone(),
            slots: self.slots.read().clone(),
            warnings: self.warnings.read().clone(),
            changes_by_resource: self
                .changes
                .iter()
                .map(|entry| (*entry.key(), *entry.value()))
                .collect(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        *self.timing.write() = TimingMetrics::default();
        *self.cycles.write() = CycleMetrics::default();
        *self.slots.write() = SlotMetrics::default();
        *self.warnings.write() = WarningMetrics::default();
        self.changes.clear();
    }
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("timing", &*self.timing.read())
            .field("cycles", &*self.cycles.read())
            .field("slots", &*self.slots.read())
            .finish()
    }
}

/// Snapshot of collected metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Timing metrics.
    pub timing: TimingMetrics,
    /// Pull and push counters.
    pub cycles: CycleMetrics,
    /// Slot and container counts.
    pub slots: SlotMetrics,
    /// Warning counts.
    pub warnings: WarningMetrics,
    /// Changed-pair counts per resource type.
    pub changes_by_resource: BTreeMap<ResourceTypeId, u64>,
}

/// Timing of the most recent cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingMetrics {
    /// When the cycle started.
    #[serde(skip)]
    pub start_time: Option<Instant>,
    /// When the cycle ended.
    #[serde(skip)]
    pub end_time: Option<Instant>,
    /// Total cycle time.
    #[serde(with = "duration_serde")]
    pub cycle_time: Duration,
    /// Time spent pulling.
    #[serde(with = "duration_serde")]
    pub pull_time: Duration,
    /// Time spent pushing.
    #[serde(with = "duration_serde")]
    pub push_time: Duration,
}

/// Pull and push counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleMetrics {
    /// Completed cycles.
    pub cycle_count: u64,
    /// Completed pulls.
    pub pull_count: u64,
    /// Completed pushes.
    pub push_count: u64,
    /// Changed pairs over all pushes.
    pub total_changed: u64,
    /// Positions written over all pushes.
    pub total_written: u64,
}

/// Slot and container counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotMetrics {
    /// Containers in the last pull.
    pub last_container_count: usize,
    /// Slots in the last pull.
    pub last_slot_count: usize,
    /// Largest pull seen.
    pub peak_slot_count: usize,
    /// Slots pulled over all pulls.
    pub total_slots_pulled: u64,
}

/// Consistency warning counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarningMetrics {
    /// All warnings.
    pub total: u64,
    /// Per-kind counts.
    pub counts: BTreeMap<String, u64>,
}

/// Custom serde for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_nanos().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u128::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpile_core::ContainerId;

    const FUEL: ResourceTypeId = ResourceTypeId::new(1);
    const OXIDIZER: ResourceTypeId = ResourceTypeId::new(2);

    #[test]
    fn test_metrics_collector_timing() {
        let collector = MetricsCollector::new();

        collector.record_start();
        std::thread::sleep(Duration::from_millis(10));
        collector.record_end();

        let snapshot = collector.snapshot();
        assert!(snapshot.timing.cycle_time >= Duration::from_millis(10));
        assert_eq!(snapshot.cycles.cycle_count, 1);
    }

    #[test]
    fn test_metrics_collector_pulls() {
        let collector = MetricsCollector::new();

        collector.record_pull(2, 5, Duration::from_micros(3));
        collector.record_pull(1, 3, Duration::from_micros(2));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.cycles.pull_count, 2);
        assert_eq!(snapshot.slots.last_slot_count, 3);
        assert_eq!(snapshot.slots.peak_slot_count, 5);
        assert_eq!(snapshot.slots.total_slots_pulled, 8);
    }

    #[test]
    fn test_metrics_collector_push() {
        let collector = MetricsCollector::new();
        let mut report = PushReport::default();
        report.changed.insert((ContainerId::new(1), FUEL));
        report.changed.insert((ContainerId::new(2), FUEL));
        report.changed.insert((ContainerId::new(2), OXIDIZER));
        report.written = 4;
        report.warnings.push(ConsistencyWarning::SlotCountMismatch {
            visited: 4,
            external: 5,
        });

        collector.record_push(&report, Duration::from_micros(1));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.cycles.total_changed, 3);
        assert_eq!(snapshot.cycles.total_written, 4);
        assert_eq!(collector.change_count(FUEL), 2);
        assert_eq!(snapshot.changes_by_resource.get(&OXIDIZER), Some(&1));
        assert_eq!(snapshot.warnings.counts.get("slot_count_mismatch"), Some(&1));
    }

    #[test]
    fn test_metrics_collector_reset() {
        let collector = MetricsCollector::new();
        collector.record_pull(1, 1, Duration::ZERO);
        collector.record_change(FUEL);

        collector.reset();

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.cycles.pull_count, 0);
        assert!(snapshot.changes_by_resource.is_empty());
    }

    #[test]
    fn test_snapshot_serializes() {
        let collector = MetricsCollector::new();
        collector.record_change(FUEL);

        let json = serde_json::to_string(&collector.snapshot()).unwrap();
        assert!(json.contains("changes_by_resource"));
    }
}
