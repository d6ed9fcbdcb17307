//! Group-level resource aggregation.
//!
//! [`AggregationCache`] holds a snapshot of every slot in a container group
//! and a derived per-type aggregate. Mutations are addressed by resource type
//! and distributed back onto the matching slots.
//!
//! # Distribution
//!
//! `add`, `remove`, `store_reserved` and `consume_reserved` each use a
//! per-slot measure `M` (free room, stored amount, reservable room, or
//! consumable amount). When the requested amount meets or exceeds `ΣM`, every
//! matching slot is saturated and `ΣM` is returned. Otherwise each slot
//! receives `amount * M / ΣM` and the full amount is returned.
//!
//! The aggregate map is rebuilt from the arena after every mutation, so a
//! per-type total always equals the sum over its slots.

use std::collections::BTreeMap;

use tracing::{debug, info, trace};

use crate::arena::{ArenaStats, ContainerSpan, SlotArena};
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::slot::ResourceSlot;
use crate::types::{ContainerId, ResourceTypeId};

/// Per-slot quantity a distributed operation is proportioned by.
type Measure = fn(&ResourceSlot) -> f64;
/// Saturating form of a distributed operation.
type Saturate = fn(&mut ResourceSlot) -> f64;
/// Non-saturating form of a distributed operation.
type Partial = fn(&mut ResourceSlot, f64) -> f64;

/// Derived, mutable view over the slots of a container group.
///
/// # Example
///
/// ```
/// use stockpile_core::{AggregationCache, ContainerId, ResourceSlot, ResourceTypeId};
///
/// let fuel = ResourceTypeId::new(1);
/// let mut cache = AggregationCache::with_defaults();
/// cache.append_container(ContainerId::new(1), [ResourceSlot::new(fuel, 800.0).with_stored(700.0)]);
/// cache.append_container(ContainerId::new(2), [ResourceSlot::new(fuel, 5120.0).with_stored(4000.0)]);
///
/// assert_eq!(cache.add(fuel, 9001.0), 1220.0);
/// assert_eq!(cache.stored(fuel).unwrap(), 5920.0);
/// ```
#[derive(Debug)]
pub struct AggregationCache {
    config: CacheConfig,
    arena: SlotArena,
    aggregates: BTreeMap<ResourceTypeId, ResourceSlot>,
}

impl AggregationCache {
    /// Create an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        info!(
            initial_slot_capacity = config.initial_slot_capacity,
            shrink_on_clear = config.shrink_on_clear,
            "Created aggregation cache"
        );

        Self {
            arena: SlotArena::with_capacity(config.initial_slot_capacity),
            config,
            aggregates: BTreeMap::new(),
        }
    }

    /// Create a cache with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // Population

    /// Append one container's slots, keeping their order.
    ///
    /// The new slots are folded into the aggregates in arena order, which is
    /// the same order [`refresh_aggregates`](Self::refresh_aggregates) uses.
    pub fn append_container<I>(&mut self, id: ContainerId, slots: I) -> ContainerSpan
    where
        I: IntoIterator<Item = ResourceSlot>,
    {
        let span = self.arena.push_container(id, slots);
        for slot in &self.arena.slots()[span.range()] {
            Self::fold(&mut self.aggregates, slot);
        }
        span
    }

    /// Drop every slot. The arena allocation is kept unless the config says
    /// to shrink.
    pub fn clear(&mut self) {
        self.arena.clear(self.config.shrink_on_clear);
        self.aggregates.clear();
    }

    /// Release the arena and consume the cache.
    pub fn dispose(mut self) -> ArenaStats {
        self.aggregates.clear();
        let stats = self.arena.release();
        info!(
            peak_slots = stats.peak_slots,
            clear_count = stats.clear_count,
            "Disposed aggregation cache"
        );
        stats
    }

    /// Rebuild the per-type aggregates from the arena.
    pub fn refresh_aggregates(&mut self) {
        self.aggregates.clear();
        for slot in self.arena.slots() {
            Self::fold(&mut self.aggregates, slot);
        }
    }

    fn fold(aggregates: &mut BTreeMap<ResourceTypeId, ResourceSlot>, slot: &ResourceSlot) {
        aggregates
            .entry(slot.resource_type)
            .or_insert_with(|| ResourceSlot::new(slot.resource_type, 0.0))
            .accumulate(slot);
    }

    // Inspection

    /// All slots in arena order.
    pub fn slots(&self) -> &[ResourceSlot] {
        self.arena.slots()
    }

    /// Container spans in pull order.
    pub fn spans(&self) -> &[ContainerSpan] {
        self.arena.spans()
    }

    /// Slots of a single container, if it is in the cache.
    pub fn container_slots(&self, id: ContainerId) -> Option<&[ResourceSlot]> {
        self.arena
            .spans()
            .iter()
            .find(|span| span.id == id)
            .map(|span| &self.arena.slots()[span.range()])
    }

    /// Number of slots in the cache.
    pub fn slot_count(&self) -> usize {
        self.arena.len()
    }

    /// Number of containers in the cache.
    pub fn container_count(&self) -> usize {
        self.arena.spans().len()
    }

    /// Check if the cache holds no slots.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Arena statistics.
    pub fn arena_stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    /// Check if any slot holds the given resource type.
    pub fn contains(&self, resource_type: ResourceTypeId) -> bool {
        self.aggregates.contains_key(&resource_type)
    }

    /// Resource types present, in ascending order.
    pub fn resource_types(&self) -> impl Iterator<Item = ResourceTypeId> + '_ {
        self.aggregates.keys().copied()
    }

    /// All per-type aggregates, in ascending type order.
    pub fn aggregates(&self) -> impl Iterator<Item = &ResourceSlot> + '_ {
        self.aggregates.values()
    }

    /// The aggregate slot for a resource type.
    pub fn aggregate(&self, resource_type: ResourceTypeId) -> CacheResult<&ResourceSlot> {
        self.aggregates
            .get(&resource_type)
            .ok_or(CacheError::ResourceTypeNotFound(resource_type))
    }

    /// Total capacity of a resource type.
    pub fn capacity(&self, resource_type: ResourceTypeId) -> CacheResult<f64> {
        self.aggregate(resource_type).map(|a| a.capacity)
    }

    /// Total stored amount of a resource type.
    pub fn stored(&self, resource_type: ResourceTypeId) -> CacheResult<f64> {
        self.aggregate(resource_type).map(|a| a.stored)
    }

    /// Net reservation ledger of a resource type.
    pub fn reserved(&self, resource_type: ResourceTypeId) -> CacheResult<f64> {
        self.aggregate(resource_type).map(|a| a.reserved)
    }

    /// Total free room of a resource type, optionally adjusted by the ledger.
    pub fn empty_units(
        &self,
        resource_type: ResourceTypeId,
        include_reserved: bool,
    ) -> CacheResult<f64> {
        self.aggregate(resource_type)
            .map(|a| a.empty_units(include_reserved))
    }

    // Distributed mutations

    /// Store up to `amount` across the group, proportionally to free room.
    pub fn add(&mut self, resource_type: ResourceTypeId, amount: f64) -> f64 {
        self.distribute(
            "add",
            resource_type,
            amount,
            |s| s.empty_units(false),
            ResourceSlot::fill_to_capacity,
            ResourceSlot::add,
        )
    }

    /// Withdraw up to `amount` across the group, proportionally to stored
    /// amounts.
    pub fn remove(&mut self, resource_type: ResourceTypeId, amount: f64) -> f64 {
        self.distribute(
            "remove",
            resource_type,
            amount,
            |s| s.stored,
            ResourceSlot::remove_all,
            ResourceSlot::remove,
        )
    }

    /// Claim room for `amount` of future storage across the group.
    ///
    /// The group total counts each ledger with its sign (`room + reserved`),
    /// while a saturated slot claims `room + |reserved|`. With negative
    /// ledgers the return value can be smaller than the ledger movement,
    /// down to `0` while `reserved` still falls.
    pub fn store_reserved(&mut self, resource_type: ResourceTypeId, amount: f64) -> f64 {
        self.distribute(
            "store_reserved",
            resource_type,
            amount,
            |s| s.empty_units(true),
            ResourceSlot::saturate_reserved,
            ResourceSlot::store_reserved,
        )
    }

    /// Book consumption of `amount` against the group's ledgers.
    pub fn consume_reserved(&mut self, resource_type: ResourceTypeId, amount: f64) -> f64 {
        self.distribute(
            "consume_reserved",
            resource_type,
            amount,
            |s| s.stored - s.reserved,
            ResourceSlot::consume_all_reserved,
            ResourceSlot::consume_reserved,
        )
    }

    fn distribute(
        &mut self,
        op: &'static str,
        resource_type: ResourceTypeId,
        amount: f64,
        measure: Measure,
        saturate: Saturate,
        partial: Partial,
    ) -> f64 {
        let amount = amount.abs();
        if !amount.is_finite() {
            debug!(op, %resource_type, amount, "Ignored non-finite amount");
            return 0.0;
        }
        if amount == 0.0 || !self.contains(resource_type) {
            return 0.0;
        }

        let total: f64 = self
            .arena
            .slots()
            .iter()
            .filter(|s| s.resource_type == resource_type)
            .map(measure)
            .sum();

        let applied = if amount >= total {
            for slot in self.matching_mut(resource_type) {
                saturate(slot);
            }
            trace!(op, %resource_type, amount, total, "Saturated group");
            total
        } else {
            let ratio = amount / total;
            for slot in self.matching_mut(resource_type) {
                let share = ratio * measure(slot);
                partial(slot, share);
            }
            trace!(op, %resource_type, amount, total, ratio, "Distributed across group");
            amount
        };

        self.refresh_aggregates();
        applied
    }

    // Folded mutations

    /// Fill every slot of a resource type. Returns the total added.
    pub fn fill_to_capacity(&mut self, resource_type: ResourceTypeId) -> f64 {
        self.fold_mut(resource_type, ResourceSlot::fill_to_capacity)
    }

    /// Empty every slot of a resource type. Returns the total withdrawn.
    pub fn remove_all(&mut self, resource_type: ResourceTypeId) -> f64 {
        self.fold_mut(resource_type, ResourceSlot::remove_all)
    }

    /// Reconcile every ledger of a resource type. Returns the summed claimed
    /// room plus stored amount.
    pub fn dump_reserved(&mut self, resource_type: ResourceTypeId) -> f64 {
        self.fold_mut(resource_type, ResourceSlot::dump_reserved)
    }

    /// Zero the reservation ledger of every slot, whatever its type.
    pub fn reset(&mut self) {
        for slot in self.arena.slots_mut() {
            slot.reset();
        }
        self.refresh_aggregates();
    }

    fn fold_mut(&mut self, resource_type: ResourceTypeId, op: Saturate) -> f64 {
        if !self.contains(resource_type) {
            return 0.0;
        }
        let total: f64 = self.matching_mut(resource_type).map(op).sum();
        self.refresh_aggregates();
        total
    }

    fn matching_mut(
        &mut self,
        resource_type: ResourceTypeId,
    ) -> impl Iterator<Item = &mut ResourceSlot> + '_ {
        self.arena
            .slots_mut()
            .iter_mut()
            .filter(move |s| s.resource_type == resource_type)
    }
}

impl Default for AggregationCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FUEL: ResourceTypeId = ResourceTypeId::new(1);
    const OXIDIZER: ResourceTypeId = ResourceTypeId::new(2);
    const MONOPROP: ResourceTypeId = ResourceTypeId::new(3);

    fn single_tank() -> AggregationCache {
        let mut cache = AggregationCache::with_defaults();
        cache.append_container(
            ContainerId::new(1),
            [ResourceSlot::new(FUEL, 10.0).with_stored(7.0)],
        );
        cache
    }

    fn two_tanks() -> AggregationCache {
        let mut cache = AggregationCache::with_defaults();
        cache.append_container(
            ContainerId::new(1),
            [
                ResourceSlot::new(FUEL, 800.0).with_stored(700.0),
                ResourceSlot::new(OXIDIZER, 100.0).with_stored(50.0),
            ],
        );
        cache.append_container(
            ContainerId::new(2),
            [ResourceSlot::new(FUEL, 5120.0).with_stored(4000.0)],
        );
        cache
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_single_tank_add_clamps() {
        let mut cache = single_tank();
        assert_eq!(cache.add(FUEL, 100.0), 3.0);
        assert_eq!(cache.stored(FUEL).unwrap(), 10.0);
    }

    #[test]
    fn test_single_tank_remove_clamps() {
        let mut cache = single_tank();
        assert_eq!(cache.remove(FUEL, 100.0), 7.0);
        assert_eq!(cache.stored(FUEL).unwrap(), 0.0);
    }

    #[test]
    fn test_single_tank_fill() {
        let mut cache = single_tank();
        assert_eq!(cache.fill_to_capacity(FUEL), 3.0);
        assert_eq!(cache.stored(FUEL).unwrap(), 10.0);
    }

    #[test]
    fn test_single_tank_store_then_consume() {
        let mut cache = single_tank();

        assert_eq!(cache.store_reserved(FUEL, 20.0), 3.0);
        assert_eq!(cache.stored(FUEL).unwrap(), 7.0);
        assert_eq!(cache.reserved(FUEL).unwrap(), -3.0);

        assert_eq!(cache.consume_reserved(FUEL, 4.0), 4.0);
        assert_eq!(cache.reserved(FUEL).unwrap(), -6.0);
        assert_eq!(cache.stored(FUEL).unwrap(), 7.0);
    }

    #[test]
    fn test_two_tanks_add_saturates() {
        let mut cache = two_tanks();
        assert_eq!(cache.add(FUEL, 9001.0), 1220.0);

        let fuel: Vec<f64> = cache
            .slots()
            .iter()
            .filter(|s| s.resource_type == FUEL)
            .map(|s| s.stored)
            .collect();
        assert_eq!(fuel, vec![800.0, 5120.0]);
        assert_eq!(cache.stored(FUEL).unwrap(), 5920.0);
        // Other resources are untouched.
        assert_eq!(cache.stored(OXIDIZER).unwrap(), 50.0);
    }

    #[test]
    fn test_saturates_at_exact_total() {
        let mut cache = two_tanks();
        assert_eq!(cache.add(FUEL, 1220.0), 1220.0);
        assert_eq!(cache.empty_units(FUEL, false).unwrap(), 0.0);
    }

    #[test]
    fn test_add_distributes_proportionally_to_room() {
        let mut cache = two_tanks();
        // Room is 100 and 1120; 122 is a tenth of the group room.
        assert_eq!(cache.add(FUEL, 122.0), 122.0);

        let slots = cache.container_slots(ContainerId::new(1)).unwrap();
        assert_close(slots[0].stored, 710.0);
        let slots = cache.container_slots(ContainerId::new(2)).unwrap();
        assert_close(slots[0].stored, 4112.0);
        assert_close(cache.stored(FUEL).unwrap(), 4822.0);
    }

    #[test]
    fn test_remove_distributes_proportionally_to_stored() {
        let mut cache = two_tanks();
        assert_eq!(cache.remove(FUEL, 470.0), 470.0);

        let first = cache.container_slots(ContainerId::new(1)).unwrap()[0];
        let second = cache.container_slots(ContainerId::new(2)).unwrap()[0];
        assert_close(first.stored, 630.0);
        assert_close(second.stored, 3600.0);
    }

    #[test]
    fn test_add_then_remove_round_trip() {
        let mut cache = two_tanks();
        let before = cache.stored(FUEL).unwrap();

        cache.add(FUEL, 500.0);
        cache.remove(FUEL, 500.0);

        assert_close(cache.stored(FUEL).unwrap(), before);
    }

    #[test]
    fn test_zero_amount_is_noop() {
        let mut cache = two_tanks();
        assert_eq!(cache.add(FUEL, 0.0), 0.0);
        assert_eq!(cache.remove(FUEL, 0.0), 0.0);
        assert_eq!(cache.store_reserved(FUEL, 0.0), 0.0);
        assert_eq!(cache.consume_reserved(FUEL, 0.0), 0.0);
        assert_eq!(cache.stored(FUEL).unwrap(), 4700.0);
        assert_eq!(cache.reserved(FUEL).unwrap(), 0.0);
    }

    #[test]
    fn test_non_finite_amount_is_noop() {
        let mut cache = single_tank();
        for amount in [f64::NAN, f64::INFINITY] {
            assert_eq!(cache.add(FUEL, amount), 0.0);
            assert_eq!(cache.remove(FUEL, amount), 0.0);
            assert_eq!(cache.store_reserved(FUEL, amount), 0.0);
            assert_eq!(cache.consume_reserved(FUEL, amount), 0.0);
        }

        let slot = cache.slots()[0];
        assert_eq!(slot.stored, 7.0);
        assert_eq!(slot.reserved, 0.0);
        assert_eq!(cache.stored(FUEL), Ok(7.0));
    }

    #[test]
    fn test_full_group_add_returns_zero() {
        let mut cache = AggregationCache::with_defaults();
        cache.append_container(
            ContainerId::new(1),
            [ResourceSlot::new(FUEL, 5.0).with_stored(5.0)],
        );
        assert_eq!(cache.add(FUEL, 1.0), 0.0);
        assert_eq!(cache.stored(FUEL).unwrap(), 5.0);
    }

    #[test]
    fn test_unknown_type_query_fails() {
        let cache = two_tanks();
        assert_eq!(
            cache.stored(MONOPROP),
            Err(CacheError::ResourceTypeNotFound(MONOPROP))
        );
        assert!(cache.capacity(MONOPROP).is_err());
        assert!(cache.empty_units(MONOPROP, true).is_err());
    }

    #[test]
    fn test_zero_units_is_not_missing() {
        let mut cache = AggregationCache::with_defaults();
        cache.append_container(ContainerId::new(1), [ResourceSlot::new(MONOPROP, 0.0)]);
        assert_eq!(cache.stored(MONOPROP), Ok(0.0));
    }

    #[test]
    fn test_unknown_type_mutation_is_noop() {
        let mut cache = two_tanks();
        assert_eq!(cache.add(MONOPROP, 10.0), 0.0);
        assert_eq!(cache.remove(MONOPROP, 10.0), 0.0);
        assert_eq!(cache.fill_to_capacity(MONOPROP), 0.0);
        assert_eq!(cache.dump_reserved(MONOPROP), 0.0);
        assert!(!cache.contains(MONOPROP));
    }

    #[test]
    fn test_store_reserved_distributes() {
        let mut cache = two_tanks();
        // Reservable room is 100 and 1120.
        assert_eq!(cache.store_reserved(FUEL, 610.0), 610.0);

        let first = cache.container_slots(ContainerId::new(1)).unwrap()[0];
        let second = cache.container_slots(ContainerId::new(2)).unwrap()[0];
        assert_close(first.reserved, -50.0);
        assert_close(second.reserved, -560.0);
        assert_close(cache.reserved(FUEL).unwrap(), -610.0);
        assert_eq!(cache.stored(FUEL).unwrap(), 4700.0);
    }

    #[test]
    fn test_store_reserved_with_negative_ledger() {
        let mut cache = AggregationCache::with_defaults();
        cache.append_container(
            ContainerId::new(1),
            [ResourceSlot::new(FUEL, 10.0)
                .with_stored(7.0)
                .with_reserved(-3.0)],
        );

        // Group room is 3 - 3 = 0, so the saturating branch fires.
        assert_eq!(cache.store_reserved(FUEL, 20.0), 0.0);
        assert_eq!(cache.reserved(FUEL), Ok(-6.0));
        assert_eq!(cache.stored(FUEL), Ok(7.0));
    }

    #[test]
    fn test_consume_reserved_saturates_ledger() {
        let mut cache = two_tanks();
        cache.store_reserved(FUEL, 1e9);

        // Consumable is stored minus ledger: 800 + 5120.
        assert_eq!(cache.consume_reserved(FUEL, 1e9), 5920.0);
        assert_eq!(cache.reserved(FUEL).unwrap(), 0.0);
    }

    #[test]
    fn test_dump_reserved_and_reset() {
        let mut cache = two_tanks();
        cache.store_reserved(OXIDIZER, 10.0);
        cache.store_reserved(FUEL, 100.0);

        assert_close(cache.dump_reserved(FUEL), 4800.0);
        assert_eq!(cache.reserved(FUEL).unwrap(), 0.0);
        assert_close(cache.reserved(OXIDIZER).unwrap(), -10.0);

        cache.reset();
        assert_eq!(cache.reserved(OXIDIZER).unwrap(), 0.0);
    }

    #[test]
    fn test_remove_all() {
        let mut cache = two_tanks();
        assert_eq!(cache.remove_all(FUEL), 4700.0);
        assert_eq!(cache.stored(FUEL).unwrap(), 0.0);
        assert_eq!(cache.capacity(FUEL).unwrap(), 5920.0);
    }

    #[test]
    fn test_refresh_matches_incremental_append() {
        let mut cache = two_tanks();
        let appended: Vec<ResourceSlot> = cache.aggregates().copied().collect();
        cache.refresh_aggregates();
        let refreshed: Vec<ResourceSlot> = cache.aggregates().copied().collect();
        assert_eq!(appended, refreshed);
    }

    #[test]
    fn test_clear_and_reuse() {
        let mut cache = two_tanks();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.resource_types().count(), 0);

        cache.append_container(ContainerId::new(9), [ResourceSlot::new(FUEL, 1.0)]);
        assert_eq!(cache.container_count(), 1);
        assert_eq!(cache.capacity(FUEL).unwrap(), 1.0);
    }

    #[test]
    fn test_dispose_reports_stats() {
        let cache = two_tanks();
        let stats = cache.dispose();
        assert_eq!(stats.peak_slots, 3);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(f64),
            Remove(f64),
            StoreReserved(f64),
            ConsumeReserved(f64),
            Fill,
            RemoveAll,
            Dump,
            Reset,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0.0..2000.0f64).prop_map(Op::Add),
                (0.0..2000.0f64).prop_map(Op::Remove),
                (0.0..2000.0f64).prop_map(Op::StoreReserved),
                (0.0..2000.0f64).prop_map(Op::ConsumeReserved),
                Just(Op::Fill),
                Just(Op::RemoveAll),
                Just(Op::Dump),
                Just(Op::Reset),
            ]
        }

        fn group() -> impl Strategy<Value = Vec<(f64, f64, u32)>> {
            prop::collection::vec(
                (0.0..1000.0f64, 0.0..1.0f64, 1u32..3).prop_map(|(cap, fill, ty)| (cap, cap * fill, ty)),
                1..8,
            )
        }

        fn build(slots: &[(f64, f64, u32)]) -> AggregationCache {
            let mut cache = AggregationCache::with_defaults();
            for (i, (capacity, stored, ty)) in slots.iter().enumerate() {
                cache.append_container(
                    ContainerId::new(i as u64),
                    [ResourceSlot::new(ResourceTypeId::new(*ty), *capacity).with_stored(*stored)],
                );
            }
            cache
        }

        fn apply(cache: &mut AggregationCache, ty: ResourceTypeId, op: &Op) {
            match op {
                Op::Add(a) => {
                    cache.add(ty, *a);
                }
                Op::Remove(a) => {
                    cache.remove(ty, *a);
                }
                Op::StoreReserved(a) => {
                    cache.store_reserved(ty, *a);
                }
                Op::ConsumeReserved(a) => {
                    cache.consume_reserved(ty, *a);
                }
                Op::Fill => {
                    cache.fill_to_capacity(ty);
                }
                Op::RemoveAll => {
                    cache.remove_all(ty);
                }
                Op::Dump => {
                    cache.dump_reserved(ty);
                }
                Op::Reset => cache.reset(),
            }
        }

        fn check_invariants(cache: &AggregationCache) {
            let tolerance = 1e-6;
            for slot in cache.slots() {
                assert!(slot.stored >= -tolerance, "negative stored: {slot:?}");
                assert!(slot.stored <= slot.capacity + tolerance, "overfull: {slot:?}");
            }
            for aggregate in cache.aggregates() {
                let (mut stored, mut capacity, mut reserved) = (0.0, 0.0, 0.0);
                for slot in cache.slots().iter().filter(|s| s.resource_type == aggregate.resource_type) {
                    stored += slot.stored;
                    capacity += slot.capacity;
                    reserved += slot.reserved;
                }
                assert_eq!(aggregate.stored, stored);
                assert_eq!(aggregate.capacity, capacity);
                assert_eq!(aggregate.reserved, reserved);
            }
        }

        proptest! {
            #[test]
            fn prop_invariants_hold_after_every_call(
                slots in group(),
                ops in prop::collection::vec((1u32..3, op()), 0..24),
            ) {
                let mut cache = build(&slots);
                check_invariants(&cache);
                for (ty, op) in &ops {
                    apply(&mut cache, ResourceTypeId::new(*ty), op);
                    check_invariants(&cache);
                }
            }

            #[test]
            fn prop_unclamped_add_remove_restores_total(
                slots in group(),
                fraction in 0.0..0.5f64,
            ) {
                let mut cache = build(&slots);
                let ty = slots[0].2;
                let ty = ResourceTypeId::new(ty);
                let room = cache.empty_units(ty, false).unwrap();
                let stored = cache.stored(ty).unwrap();
                let amount = room.min(stored) * fraction;
                prop_assume!(amount > 0.0);

                cache.add(ty, amount);
                cache.remove(ty, amount);

                prop_assert!((cache.stored(ty).unwrap() - stored).abs() < 1e-6);
            }
        }
    }
}
