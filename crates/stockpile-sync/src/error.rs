//! Error and warning types for synchronization.

use stockpile_core::{ContainerId, ResourceTypeId, SlotError};
use thiserror::Error;

/// Errors raised while building an in-memory container group.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Two containers share an id.
    #[error("Duplicate container id: {0}")]
    DuplicateContainer(ContainerId),

    /// A slot failed validation.
    #[error("Invalid slot {index} in {container}: {source}")]
    InvalidSlot {
        /// The container holding the slot.
        container: ContainerId,
        /// Position of the slot within the container.
        index: usize,
        /// The validation failure.
        #[source]
        source: SlotError,
    },
}

/// A positional disagreement between a cache and its external group.
///
/// Warnings are detected during a push. They never abort it: the position is
/// reported and processing continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsistencyWarning {
    /// The resource type at a position differs from the pulled one.
    #[error(
        "Resource type mismatch in {container} at slot {index}: cached {cached}, external {external}"
    )]
    ResourceTypeMismatch {
        /// The external container.
        container: ContainerId,
        /// Position of the slot within the container.
        index: usize,
        /// Resource type recorded at pull time.
        cached: ResourceTypeId,
        /// Resource type the group reports now.
        external: ResourceTypeId,
    },

    /// The container at a position differs from the pulled one, or is gone.
    #[error("Container mismatch at position {position}: cached {cached}, external {external:?}")]
    ContainerMismatch {
        /// Position of the container within the group.
        position: usize,
        /// Container recorded at pull time.
        cached: ContainerId,
        /// Container the group reports now, if any.
        external: Option<ContainerId>,
    },

    /// The capacity at a position differs from the pulled one.
    #[error("Capacity mismatch in {container} at slot {index}: cached {cached}, external {external}")]
    CapacityMismatch {
        /// The external container.
        container: ContainerId,
        /// Position of the slot within the container.
        index: usize,
        /// Capacity recorded at pull time.
        cached: f64,
        /// Capacity the group reports now.
        external: f64,
    },

    /// The number of positions walked differs from the group's slot count.
    ///
    /// Usually means containers or slots were added or removed between the
    /// pull and the push.
    #[error("Slot count mismatch: visited {visited}, group holds {external}")]
    SlotCountMismatch {
        /// Positions visited during the push.
        visited: usize,
        /// Total slots the group reports.
        external: usize,
    },
}

impl ConsistencyWarning {
    /// Short name of the warning kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ConsistencyWarning::ResourceTypeMismatch { .. } => "resource_type_mismatch",
            ConsistencyWarning::ContainerMismatch { .. } => "container_mismatch",
            ConsistencyWarning::CapacityMismatch { .. } => "capacity_mismatch",
            ConsistencyWarning::SlotCountMismatch { .. } => "slot_count_mismatch",
        }
    }

    /// Check if the warning indicates a structural change of the group.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ConsistencyWarning::ContainerMismatch { .. } | ConsistencyWarning::SlotCountMismatch { .. }
        )
    }
}

/// Result type for synchronization operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
