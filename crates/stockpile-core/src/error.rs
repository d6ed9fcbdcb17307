//! Core error types for Stockpile.
//!
//! Per-slot arithmetic is total and never fails. The errors here cover
//! lookups that address a resource type the cache does not hold, and slot
//! values that are rejected at construction time.

use thiserror::Error;

use crate::types::ResourceTypeId;

/// Errors raised by [`AggregationCache`](crate::cache::AggregationCache) queries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    /// No slot in the group holds the requested resource type.
    ///
    /// This is distinct from a resource that is present with zero units.
    #[error("Resource type not found in group: {0}")]
    ResourceTypeNotFound(ResourceTypeId),
}

/// Errors raised when building a [`ResourceSlot`](crate::slot::ResourceSlot)
/// from untrusted values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SlotError {
    /// A slot value is NaN or infinite.
    #[error("Non-finite {field} for {resource_type}: {value}")]
    NonFinite {
        /// The resource type of the rejected slot.
        resource_type: ResourceTypeId,
        /// Which field was rejected.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Capacity is negative.
    #[error("Negative capacity for {resource_type}: {capacity}")]
    NegativeCapacity {
        /// The resource type of the rejected slot.
        resource_type: ResourceTypeId,
        /// The rejected capacity.
        capacity: f64,
    },

    /// Stored amount falls outside `[0, capacity]`.
    #[error("Stored amount {stored} for {resource_type} is outside [0, {capacity}]")]
    StoredOutOfBounds {
        /// The resource type of the rejected slot.
        resource_type: ResourceTypeId,
        /// The rejected stored amount.
        stored: f64,
        /// The slot capacity.
        capacity: f64,
    },
}

/// Result type alias for cache queries.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Result type alias for slot construction.
pub type SlotResult<T> = std::result::Result<T, SlotError>;
