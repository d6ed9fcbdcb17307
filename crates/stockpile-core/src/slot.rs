//! Per-container resource accounting.
//!
//! A [`ResourceSlot`] is the capacity, stored amount, and reservation ledger of
//! one resource type inside one container. The same type doubles as the
//! per-type aggregate kept by the cache.
//!
//! # Sign conventions
//!
//! `stored` is the only durable quantity and always stays in `[0, capacity]`.
//! `reserved` is a signed scratch ledger of pending adjustments:
//!
//! - negative: room provisionally claimed for future storage
//! - positive: overdraw bookkeeping left behind by [`ResourceSlot::consume_reserved`]
//!
//! Callers zero the ledger with [`ResourceSlot::reset`] or reconcile it with
//! [`ResourceSlot::dump_reserved`].
//!
//! Amounts are magnitudes. A non-finite amount is ignored: the operation
//! returns `0` and leaves the slot as it was.

use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};
use crate::types::ResourceTypeId;

/// Capacity, stored amount and reservation ledger for one resource type.
///
/// Every amount argument is a magnitude; negative inputs are folded to their
/// absolute value before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSlot {
    /// The resource held by this slot.
    pub resource_type: ResourceTypeId,
    /// Maximum storable amount. Owned by the external group.
    pub capacity: f64,
    /// Currently stored amount.
    pub stored: f64,
    /// Pending, not yet materialized adjustments against `stored`.
    pub reserved: f64,
}

impl ResourceSlot {
    /// Create an empty slot with the given capacity.
    pub fn new(resource_type: ResourceTypeId, capacity: f64) -> Self {
        Self {
            resource_type,
            capacity,
            stored: 0.0,
            reserved: 0.0,
        }
    }

    /// Create a slot from untrusted values, checking the storage invariant.
    ///
    /// # Errors
    ///
    /// Rejects non-finite values, negative capacity, and a stored amount
    /// outside `[0, capacity]`.
    pub fn try_new(
        resource_type: ResourceTypeId,
        capacity: f64,
        stored: f64,
        reserved: f64,
    ) -> SlotResult<Self> {
        for (field, value) in [("capacity", capacity), ("stored", stored), ("reserved", reserved)] {
            if !value.is_finite() {
                return Err(SlotError::NonFinite {
                    resource_type,
                    field,
                    value,
                });
            }
        }

        if capacity < 0.0 {
            return Err(SlotError::NegativeCapacity {
                resource_type,
                capacity,
            });
        }

        if stored < 0.0 || stored > capacity {
            return Err(SlotError::StoredOutOfBounds {
                resource_type,
                stored,
                capacity,
            });
        }

        Ok(Self {
            resource_type,
            capacity,
            stored,
            reserved,
        })
    }

    /// Set the stored amount.
    pub fn with_stored(mut self, stored: f64) -> Self {
        self.stored = stored;
        self
    }

    /// Set the reservation ledger.
    pub fn with_reserved(mut self, reserved: f64) -> Self {
        self.reserved = reserved;
        self
    }

    /// Free room in the slot, optionally adjusted by the reservation ledger.
    pub fn empty_units(&self, include_reserved: bool) -> f64 {
        let empty = self.capacity - self.stored;
        if include_reserved {
            empty + self.reserved
        } else {
            empty
        }
    }

    /// Store up to `amount`, clamping at capacity.
    ///
    /// Returns the amount actually stored.
    pub fn add(&mut self, amount: f64) -> f64 {
        let Some(amount) = magnitude(amount) else {
            return 0.0;
        };
        let room = self.capacity - self.stored;
        if room <= amount {
            self.stored = self.capacity;
            room
        } else {
            self.stored += amount;
            amount
        }
    }

    /// Fill the slot. Returns the amount that was added.
    pub fn fill_to_capacity(&mut self) -> f64 {
        let room = self.capacity - self.stored;
        self.stored = self.capacity;
        room
    }

    /// Withdraw up to `amount`, clamping at zero.
    ///
    /// Returns the amount actually withdrawn.
    pub fn remove(&mut self, amount: f64) -> f64 {
        let Some(amount) = magnitude(amount) else {
            return 0.0;
        };
        if self.stored <= amount {
            let previous = self.stored;
            self.stored = 0.0;
            previous
        } else {
            self.stored -= amount;
            amount
        }
    }

    /// Withdraw everything. Returns the prior stored amount.
    pub fn remove_all(&mut self) -> f64 {
        let previous = self.stored;
        self.stored = 0.0;
        previous
    }

    /// Room a reservation may still claim.
    ///
    /// The ledger's magnitude is added back whatever its sign.
    fn reservable(&self) -> f64 {
        let room = self.capacity - self.stored;
        if self.reserved >= 0.0 {
            room + self.reserved
        } else {
            room - self.reserved
        }
    }

    /// Claim room for `amount` of future storage without touching `stored`.
    ///
    /// Returns the amount claimed.
    pub fn store_reserved(&mut self, amount: f64) -> f64 {
        let Some(amount) = magnitude(amount) else {
            return 0.0;
        };
        let avail = self.reservable();
        if avail <= amount {
            self.reserved = -avail;
            avail
        } else {
            self.reserved -= amount;
            amount
        }
    }

    /// Saturating branch of [`store_reserved`](Self::store_reserved): claim
    /// all reservable room.
    pub fn saturate_reserved(&mut self) -> f64 {
        let avail = self.reservable();
        self.reserved = -avail;
        avail
    }

    /// Book consumption of `amount` against the ledger. `stored` is untouched.
    ///
    /// Outstanding negative reservations raise what is consumable. Returns the
    /// amount booked.
    pub fn consume_reserved(&mut self, amount: f64) -> f64 {
        let Some(amount) = magnitude(amount) else {
            return 0.0;
        };
        let avail = self.stored - self.reserved;
        if avail <= amount {
            self.reserved = self.reserved + avail - self.stored;
            avail
        } else {
            self.reserved = self.reserved + amount - self.stored;
            amount
        }
    }

    /// Saturating branch of [`consume_reserved`](Self::consume_reserved):
    /// book everything consumable.
    pub fn consume_all_reserved(&mut self) -> f64 {
        let avail = self.stored - self.reserved;
        self.reserved = self.reserved + avail - self.stored;
        avail
    }

    /// Reconcile the ledger without withdrawing.
    ///
    /// A negative ledger is folded into the result and zeroed. Returns the
    /// claimed room plus the stored amount.
    pub fn dump_reserved(&mut self) -> f64 {
        let claimed = if self.reserved < 0.0 {
            let claimed = -self.reserved;
            self.reserved = 0.0;
            claimed
        } else {
            0.0
        };
        claimed + self.stored
    }

    /// Zero the reservation ledger.
    pub fn reset(&mut self) {
        self.reserved = 0.0;
    }

    /// Fold another slot's quantities into this one.
    pub(crate) fn accumulate(&mut self, other: &ResourceSlot) {
        self.capacity += other.capacity;
        self.stored += other.stored;
        self.reserved += other.reserved;
    }
}

fn magnitude(amount: f64) -> Option<f64> {
    amount.is_finite().then(|| amount.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FUEL: ResourceTypeId = ResourceTypeId::new(1);

    fn tank() -> ResourceSlot {
        ResourceSlot::new(FUEL, 10.0).with_stored(7.0)
    }

    #[test]
    fn test_add_clamps_at_capacity() {
        let mut slot = tank();
        assert_eq!(slot.add(100.0), 3.0);
        assert_eq!(slot.stored, 10.0);
    }

    #[test]
    fn test_add_partial() {
        let mut slot = tank();
        assert_eq!(slot.add(2.0), 2.0);
        assert_eq!(slot.stored, 9.0);
    }

    #[test]
    fn test_add_exact_room_saturates() {
        let mut slot = tank();
        assert_eq!(slot.add(3.0), 3.0);
        assert_eq!(slot.stored, 10.0);
    }

    #[test]
    fn test_remove_clamps_at_zero() {
        let mut slot = tank();
        assert_eq!(slot.remove(100.0), 7.0);
        assert_eq!(slot.stored, 0.0);
    }

    #[test]
    fn test_negative_amounts_are_magnitudes() {
        let mut slot = tank();
        assert_eq!(slot.remove(-2.0), 2.0);
        assert_eq!(slot.stored, 5.0);
        assert_eq!(slot.add(-1.0), 1.0);
        assert_eq!(slot.stored, 6.0);
    }

    #[test]
    fn test_non_finite_amounts_are_ignored() {
        let mut slot = tank().with_reserved(-1.0);
        for amount in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(slot.add(amount), 0.0);
            assert_eq!(slot.remove(amount), 0.0);
            assert_eq!(slot.store_reserved(amount), 0.0);
            assert_eq!(slot.consume_reserved(amount), 0.0);
        }
        assert_eq!(slot, tank().with_reserved(-1.0));
    }

    #[test]
    fn test_fill_to_capacity() {
        let mut slot = tank();
        assert_eq!(slot.fill_to_capacity(), 3.0);
        assert_eq!(slot.stored, 10.0);
    }

    #[test]
    fn test_remove_all() {
        let mut slot = tank();
        assert_eq!(slot.remove_all(), 7.0);
        assert_eq!(slot.stored, 0.0);
    }

    #[test]
    fn test_store_reserved_saturates() {
        let mut slot = tank();
        assert_eq!(slot.store_reserved(20.0), 3.0);
        assert_eq!(slot.stored, 7.0);
        assert_eq!(slot.reserved, -3.0);
    }

    #[test]
    fn test_store_reserved_partial() {
        let mut slot = tank();
        assert_eq!(slot.store_reserved(1.0), 1.0);
        assert_eq!(slot.reserved, -1.0);
    }

    #[test]
    fn test_consume_reserved_after_store() {
        let mut slot = tank();
        slot.store_reserved(20.0);

        assert_eq!(slot.consume_reserved(4.0), 4.0);
        assert_eq!(slot.reserved, -6.0);
        assert_eq!(slot.stored, 7.0);
    }

    #[test]
    fn test_consume_reserved_saturates_to_zero_ledger() {
        let mut slot = tank().with_reserved(-3.0);
        assert_eq!(slot.consume_reserved(50.0), 10.0);
        assert_eq!(slot.reserved, 0.0);
        assert_eq!(slot.stored, 7.0);
    }

    #[test]
    fn test_saturating_helpers_match_branches() {
        let mut a = tank().with_reserved(-1.0);
        let mut b = a;
        assert_eq!(a.saturate_reserved(), b.store_reserved(f64::MAX));
        assert_eq!(a, b);

        let mut c = tank().with_reserved(-2.0);
        let mut d = c;
        assert_eq!(c.consume_all_reserved(), d.consume_reserved(f64::MAX));
        assert_eq!(c, d);
    }

    #[test]
    fn test_dump_reserved_folds_claims() {
        let mut slot = tank().with_reserved(-3.0);
        assert_eq!(slot.dump_reserved(), 10.0);
        assert_eq!(slot.reserved, 0.0);
        assert_eq!(slot.stored, 7.0);
    }

    #[test]
    fn test_dump_reserved_keeps_positive_ledger() {
        let mut slot = tank().with_reserved(2.0);
        assert_eq!(slot.dump_reserved(), 7.0);
        assert_eq!(slot.reserved, 2.0);
    }

    #[test]
    fn test_reset() {
        let mut slot = tank().with_reserved(-4.0);
        slot.reset();
        assert_eq!(slot.reserved, 0.0);
        assert_eq!(slot.stored, 7.0);
    }

    #[test]
    fn test_empty_units() {
        let slot = tank().with_reserved(-1.0);
        assert_eq!(slot.empty_units(false), 3.0);
        assert_eq!(slot.empty_units(true), 2.0);
    }

    #[test]
    fn test_try_new_validation() {
        assert!(ResourceSlot::try_new(FUEL, 10.0, 7.0, 0.0).is_ok());
        assert!(matches!(
            ResourceSlot::try_new(FUEL, -1.0, 0.0, 0.0),
            Err(SlotError::NegativeCapacity { .. })
        ));
        assert!(matches!(
            ResourceSlot::try_new(FUEL, 10.0, 11.0, 0.0),
            Err(SlotError::StoredOutOfBounds { .. })
        ));
        assert!(matches!(
            ResourceSlot::try_new(FUEL, f64::NAN, 0.0, 0.0),
            Err(SlotError::NonFinite { field: "capacity", .. })
        ));
    }
}
