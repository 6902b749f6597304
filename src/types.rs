//! Identifier types shared by the forest, the instance cache and the mapping facade.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte BLAKE3 digest
pub type Hash = [u8; 32];

/// Field identifier within a field space
pub type FieldID = u32;

/// Color of a partition among the partitions of an index space
pub type Color = u32;

/// Reduction operator identifier carried by reduction layouts
pub type ReductionOpID = u32;

/// Garbage-collection priority: lower values are evicted first
pub type GcPriority = i32;

/// Instances at this priority are never selected for eviction.
pub const GC_NEVER_PRIORITY: GcPriority = GcPriority::MAX;

/// Evicted before anything else.
pub const GC_FIRST_PRIORITY: GcPriority = GcPriority::MIN;

pub const GC_DEFAULT_PRIORITY: GcPriority = 0;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

opaque_id!(
    /// Memory of the machine an instance lives in
    MemoryID,
    "mem#"
);
opaque_id!(IndexSpaceID, "is#");
opaque_id!(IndexPartitionID, "ip#");
opaque_id!(FieldSpaceID, "fs#");
opaque_id!(
    /// Identifies one region tree (root index space paired with a field space)
    RegionTreeID,
    "tree#"
);
opaque_id!(LayoutConstraintID, "layout#");
opaque_id!(
    /// Process-unique identity of a physical instance
    InstanceID,
    "inst#"
);
opaque_id!(TaskID, "task#");

impl MemoryID {
    /// Location reported by the virtual instance.
    pub const NONE: MemoryID = MemoryID(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// Identity of one mapping decision, used to audit which task requested an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecisionId {
    pub task: TaskID,
    pub serial: u64,
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/decision#{}", self.task, self.serial)
    }
}

/// A logical region: an index-space node paired with a field space inside one region tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogicalRegion {
    pub tree_id: RegionTreeID,
    pub index_space: IndexSpaceID,
    pub field_space: FieldSpaceID,
}

impl fmt::Display for LogicalRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region({}, {}, {})",
            self.tree_id, self.index_space, self.field_space
        )
    }
}

/// A logical partition: an index-partition node paired with a field space inside one region tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogicalPartition {
    pub tree_id: RegionTreeID,
    pub index_partition: IndexPartitionID,
    pub field_space: FieldSpaceID,
}

impl fmt::Display for LogicalPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "partition({}, {}, {})",
            self.tree_id, self.index_partition, self.field_space
        )
    }
}
