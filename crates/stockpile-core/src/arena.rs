//! Flat slot storage owned by a cache.
//!
//! The arena holds every slot of a group in one contiguous buffer, laid out
//! container by container in the order the group enumerates them. It is
//! meant to be allocated once and refilled every tick.
//!
//! Release is deterministic: call [`SlotArena::release`] (or dispose the
//! owning cache). Dropping an arena that was never released still frees the
//! buffer, but logs it, since that path is only a leak guard.

use tracing::debug;

use crate::slot::ResourceSlot;
use crate::types::ContainerId;

/// The contiguous range of arena slots belonging to one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSpan {
    /// The container these slots were pulled from.
    pub id: ContainerId,
    /// Index of the container's first slot in the arena.
    pub start: usize,
    /// Number of slots the container held when pulled.
    pub len: usize,
}

impl ContainerSpan {
    /// Arena index range covered by this span.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// Lifetime statistics of an arena.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Largest number of slots held at once.
    pub peak_slots: usize,
    /// Number of times the arena was cleared for reuse.
    pub clear_count: u64,
    /// Allocated slot capacity at the time of the snapshot.
    pub allocated_slots: usize,
}

/// Owned, reusable buffer of resource slots.
#[derive(Debug)]
pub struct SlotArena {
    slots: Vec<ResourceSlot>,
    spans: Vec<ContainerSpan>,
    peak_slots: usize,
    clear_count: u64,
    released: bool,
}

impl SlotArena {
    /// Create an arena with room for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            spans: Vec::new(),
            peak_slots: 0,
            clear_count: 0,
            released: false,
        }
    }

    /// Append one container's slots and record its span.
    pub fn push_container<I>(&mut self, id: ContainerId, slots: I) -> ContainerSpan
    where
        I: IntoIterator<Item = ResourceSlot>,
    {
        let start = self.slots.len();
        self.slots.extend(slots);
        let span = ContainerSpan {
            id,
            start,
            len: self.slots.len() - start,
        };
        self.spans.push(span);
        self.peak_slots = self.peak_slots.max(self.slots.len());
        self.released = false;
        span
    }

    /// All slots in arena order.
    pub fn slots(&self) -> &[ResourceSlot] {
        &self.slots
    }

    /// All slots in arena order, mutably.
    pub fn slots_mut(&mut self) -> &mut [ResourceSlot] {
        &mut self.slots
    }

    /// Container spans in pull order.
    pub fn spans(&self) -> &[ContainerSpan] {
        &self.spans
    }

    /// Number of slots held.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the arena holds no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every slot, optionally giving the allocation back.
    pub fn clear(&mut self, shrink: bool) {
        self.slots.clear();
        self.spans.clear();
        if shrink {
            self.slots.shrink_to_fit();
            self.spans.shrink_to_fit();
        }
        self.clear_count += 1;
    }

    /// Free the backing buffer.
    ///
    /// The arena stays usable afterwards; the next `push_container`
    /// allocates again.
    pub fn release(&mut self) -> ArenaStats {
        let stats = self.stats();
        self.slots = Vec::new();
        self.spans = Vec::new();
        self.released = true;
        debug!(
            peak_slots = stats.peak_slots,
            allocated_slots = stats.allocated_slots,
            "Released slot arena"
        );
        stats
    }

    /// Check if the arena was explicitly released and not refilled since.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Snapshot of the arena statistics.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            peak_slots: self.peak_slots,
            clear_count: self.clear_count,
            allocated_slots: self.slots.capacity(),
        }
    }
}

impl Drop for SlotArena {
    fn drop(&mut self) {
        if !self.released && self.slots.capacity() > 0 {
            debug!(
                allocated_slots = self.slots.capacity(),
                "Slot arena dropped without explicit release"
            );
        }
    }
}
