//! The external container group contract.
//!
//! A bridge only needs index-stable read and write access to the group it
//! synchronizes with. [`ContainerGroup`] is that contract; [`InMemoryGroup`]
//! is a plain implementation used by tools and tests.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use stockpile_core::{ContainerId, ResourceSlot, ResourceTypeId};

use crate::error::{SyncError, SyncResult};

/// Values a push writes back into one external slot.
///
/// There is no capacity field: capacity belongs to the group and is never
/// written back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotWrite {
    /// Resource type to record at the position.
    pub resource_type: ResourceTypeId,
    /// New stored amount.
    pub stored: f64,
    /// New reservation ledger.
    pub reserved: f64,
}

impl From<&ResourceSlot> for SlotWrite {
    fn from(slot: &ResourceSlot) -> Self {
        Self {
            resource_type: slot.resource_type,
            stored: slot.stored,
            reserved: slot.reserved,
        }
    }
}

/// An ordered group of containers, each an ordered list of slots.
///
/// Positions are `(container, index)` pairs. Implementations must keep the
/// enumeration order stable between a pull and the matching push.
pub trait ContainerGroup {
    /// Number of containers in the group.
    fn container_count(&self) -> usize;

    /// Id of the container at `container`, or `None` past the end.
    fn container_id(&self, container: usize) -> Option<ContainerId>;

    /// Number of slots in the container at `container`.
    fn slot_count(&self, container: usize) -> usize;

    /// Read the slot at a position.
    fn read_slot(&self, container: usize, index: usize) -> Option<ResourceSlot>;

    /// Write a slot in place. Returns `false` if the position does not exist.
    fn write_slot(&mut self, container: usize, index: usize, write: SlotWrite) -> bool;

    /// Total number of slots across all containers.
    fn total_slot_count(&self) -> usize {
        (0..self.container_count())
            .map(|container| self.slot_count(container))
            .sum()
    }
}

/// A container held in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InMemoryContainer {
    /// Container id.
    pub id: ContainerId,
    /// Slots in native order.
    pub slots: Vec<ResourceSlot>,
}

impl InMemoryContainer {
    /// Create an empty container.
    pub fn new(id: ContainerId) -> Self {
        Self {
            id,
            slots: Vec::new(),
        }
    }

    /// Add a slot.
    pub fn with_slot(mut self, slot: ResourceSlot) -> Self {
        self.slots.push(slot);
        self
    }

    /// Find the first slot holding a resource type.
    pub fn slot(&self, resource_type: ResourceTypeId) -> Option<&ResourceSlot> {
        self.slots.iter().find(|s| s.resource_type == resource_type)
    }
}

/// A [`ContainerGroup`] held in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryGroup {
    containers: Vec<InMemoryContainer>,
}

impl InMemoryGroup {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group from containers, validating ids and slot values.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate container ids or on a slot that fails
    /// [`ResourceSlot::try_new`].
    pub fn try_from_containers(containers: Vec<InMemoryContainer>) -> SyncResult<Self> {
        let mut group = Self::new();
        for container in containers {
            group.insert(container)?;
        }
        Ok(group)
    }

    /// Append a validated container.
    pub fn insert(&mut self, container: InMemoryContainer) -> SyncResult<()> {
        if self.containers.iter().any(|c| c.id == container.id) {
            return Err(SyncError::DuplicateContainer(container.id));
        }

        for (index, slot) in container.slots.iter().enumerate() {
            ResourceSlot::try_new(slot.resource_type, slot.capacity, slot.stored, slot.reserved)
                .map_err(|source| SyncError::InvalidSlot {
                    container: container.id,
                    index,
                    source,
                })?;
        }

        self.containers.push(container);
        Ok(())
    }

    /// Append a container without validation.
    pub fn with_container(mut self, container: InMemoryContainer) -> Self {
        self.containers.push(container);
        self
    }

    /// Remove a container by id.
    pub fn remove(&mut self, id: ContainerId) -> Option<InMemoryContainer> {
        let position = self.containers.iter().position(|c| c.id == id)?;
        Some(self.containers.remove(position))
    }

    /// All containers in order.
    pub fn containers(&self) -> &[InMemoryContainer] {
        &self.containers
    }

    /// All containers in order, mutably.
    pub fn containers_mut(&mut self) -> &mut [InMemoryContainer] {
        &mut self.containers
    }

    /// Look up a container by id.
    pub fn container(&self, id: ContainerId) -> Option<&InMemoryContainer> {
        self.containers.iter().find(|c| c.id == id)
    }

    /// Look up a container by id, mutably.
    pub fn container_mut(&mut self, id: ContainerId) -> Option<&mut InMemoryContainer> {
        self.containers.iter_mut().find(|c| c.id == id)
    }

    /// Check for duplicate container ids.
    pub fn has_duplicate_ids(&self) -> bool {
        let mut seen = HashSet::new();
        !self.containers.iter().all(|c| seen.insert(c.id))
    }
}

impl ContainerGroup for InMemoryGroup {
    fn container_count(&self) -> usize {
        self.containers.len()
    }

    fn container_id(&self, container: usize) -> Option<ContainerId> {
        self.containers.get(container).map(|c| c.id)
    }

    fn slot_count(&self, container: usize) -> usize {
        self.containers
            .get(container)
            .map(|c| c.slots.len())
            .unwrap_or(0)
    }

    fn read_slot(&self, container: usize, index: usize) -> Option<ResourceSlot> {
        self.containers.get(container)?.slots.get(index).copied()
    }

    fn write_slot(&mut self, container: usize, index: usize, write: SlotWrite) -> bool {
        let Some(slot) = self
            .containers
            .get_mut(container)
            .and_then(|c| c.slots.get_mut(index))
        else {
            return false;
        };

        slot.resource_type = write.resource_type;
        slot.stored = write.stored;
        slot.reserved = write.reserved;
        true
    }
}
