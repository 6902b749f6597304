//! Error types for the region-tree navigator, layout registry and instance cache.

use crate::forest::DomainPoint;
use crate::types::{
    Color, FieldID, FieldSpaceID, IndexPartitionID, IndexSpaceID, LayoutConstraintID, MemoryID,
    RegionTreeID,
};
use std::thread::ThreadId;
use thiserror::Error;

/// Region-tree lookup and population errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForestError {
    #[error("Index space not found: {0}")]
    IndexSpaceNotFound(IndexSpaceID),

    #[error("Index partition not found: {0}")]
    IndexPartitionNotFound(IndexPartitionID),

    #[error("Field space not found: {0}")]
    FieldSpaceNotFound(FieldSpaceID),

    #[error("Field {field} not found in {field_space}")]
    FieldNotFound {
        field_space: FieldSpaceID,
        field: FieldID,
    },

    #[error("Region tree not found: {0}")]
    RegionTreeNotFound(RegionTreeID),

    #[error("No partition with color {color} under {parent}")]
    PartitionColorNotFound { parent: IndexSpaceID, color: Color },

    #[error("No subspace with color {color} under {parent}")]
    SubspaceColorNotFound {
        parent: IndexPartitionID,
        color: DomainPoint,
    },

    #[error("{0} spans multiple domains")]
    MultipleDomains(IndexSpaceID),

    #[error("{0} has no parent partition")]
    NoParentPartition(IndexSpaceID),

    #[error("Identifier does not belong to this tree: {0}")]
    NotInTree(String),

    #[error("Invalid partition: {0}")]
    InvalidPartition(String),

    #[error("Duplicate color {color} under {parent}")]
    DuplicateColor { parent: IndexSpaceID, color: Color },

    #[error("Field {field} already allocated in {field_space}")]
    DuplicateField {
        field_space: FieldSpaceID,
        field: FieldID,
    },

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Point count of {0} does not fit in 64 bits")]
    VolumeOverflow(IndexSpaceID),
}

impl ForestError {
    /// True for lookups that simply had no entry; false for malformed requests.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ForestError::IndexSpaceNotFound(_)
                | ForestError::IndexPartitionNotFound(_)
                | ForestError::FieldSpaceNotFound(_)
                | ForestError::FieldNotFound { .. }
                | ForestError::RegionTreeNotFound(_)
                | ForestError::PartitionColorNotFound { .. }
                | ForestError::SubspaceColorNotFound { .. }
                | ForestError::NoParentPartition(_)
        )
    }
}

/// Layout constraint errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("Layout constraint not registered: {0}")]
    ConstraintNotFound(LayoutConstraintID),

    #[error("Layout constraint set names no fields")]
    EmptyFieldSet,

    #[error("Field {0} listed more than once in layout")]
    DuplicateField(FieldID),

    #[error("Dimension ordering repeats {0}")]
    DuplicateDimension(String),

    #[error("Explicit size given for field {0} which is not in the layout")]
    UnlistedFieldSize(FieldID),

    #[error("Field {field} has size {actual} but layout requires {expected}")]
    FieldSizeMismatch {
        field: FieldID,
        expected: usize,
        actual: usize,
    },

    #[error("Reduction layouts hold exactly one field, got {0}")]
    ReductionFieldCount(usize),

    #[error("Failed to encode layout: {0}")]
    Encoding(String),
}

/// Errors surfaced to mapper code as programming errors; soft failures travel in `Placement`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown memory: {0}")]
    UnknownMemory(MemoryID),

    #[error("Mapping context owned by {owner:?} used from {caller:?}")]
    ConcurrencyViolation { owner: ThreadId, caller: ThreadId },

    #[error("Forest error: {0}")]
    Forest(#[from] ForestError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
}

/// Soft failure of a create/find request, reported alongside the virtual instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementFailure {
    #[error("no instance matches the requested fingerprint")]
    NotFound,

    #[error("memory capacity exhausted after considering all evictable instances")]
    CapacityExhausted,
}

/// Configuration loading and logging setup errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration source error: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Configuration validation failed:\n{0}")]
    Validation(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}
