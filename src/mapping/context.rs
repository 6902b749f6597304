//! Mapping Context
//!
//! The facade mapper code sees during one mapping call. It is tied to the thread that
//! opened it, forwards cache and forest queries, and releases on drop every use-reference
//! that was installed through it and not released early.

use crate::cache::{InstanceRequest, Placement, PoolStats};
use crate::error::MappingError;
use crate::forest::{Domain, DomainPoint};
use crate::instance::InstanceHandle;
use crate::layout::{LayoutConstraintSet, LayoutRef};
use crate::machine::{MemoryDescriptor, MemoryKind};
use crate::mapping::MapperRuntime;
use crate::types::{
    Color, DecisionId, FieldID, FieldSpaceID, GcPriority, IndexPartitionID, IndexSpaceID,
    LayoutConstraintID, LogicalPartition, LogicalRegion, MemoryID, RegionTreeID,
};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::ThreadId;
use tracing::{debug, warn};

macro_rules! forest_queries {
    ($($(#[$meta:meta])* fn $name:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*) => {
        $(
            $(#[$meta])*
            pub fn $name(&self, $($arg: $ty),*) -> Result<$ret, MappingError> {
                self.ensure_owner()?;
                Ok(self.runtime.forest().$name($($arg),*)?)
            }
        )*
    };
}

/// Decision-scoped view of the runtime handed to mapper code
///
/// Not `Send`, `Sync` or `Clone`.
pub struct MappingContext<'rt> {
    runtime: &'rt MapperRuntime,
    decision: DecisionId,
    mapper: String,
    owner: ThreadId,
    /// One entry per use-reference installed through this context
    acquired: RefCell<Vec<InstanceHandle>>,
    _not_send: PhantomData<*const ()>,
}

impl<'rt> MappingContext<'rt> {
    pub(crate) fn new(
        runtime: &'rt MapperRuntime,
        decision: DecisionId,
        mapper: &str,
        owner: ThreadId,
    ) -> Self {
        MappingContext {
            runtime,
            decision,
            mapper: mapper.to_string(),
            owner,
            acquired: RefCell::new(Vec::new()),
            _not_send: PhantomData,
        }
    }

    pub fn decision(&self) -> DecisionId {
        self.decision
    }

    pub fn mapper_name(&self) -> &str {
        &self.mapper
    }

    /// Priority mappers pass when they have no reason to pick one.
    pub fn default_gc_priority(&self) -> GcPriority {
        self.runtime.config().default_gc_priority
    }

    fn ensure_owner(&self) -> Result<(), MappingError> {
        let caller = std::thread::current().id();
        if caller != self.owner {
            return Err(MappingError::ConcurrencyViolation {
                owner: self.owner,
                caller,
            });
        }
        Ok(())
    }

    fn track(&self, placement: &Placement, acquire: bool) {
        if acquire && placement.ok() {
            self.acquired.borrow_mut().push(placement.handle.clone());
        }
    }

    /// Always allocate a new instance.
    pub fn create_physical_instance<'l>(
        &self,
        memory: MemoryID,
        layout: impl Into<LayoutRef<'l>>,
        region: LogicalRegion,
        acquire: bool,
        priority: GcPriority,
    ) -> Result<Placement, MappingError> {
        self.ensure_owner()?;
        let request = InstanceRequest {
            memory,
            layout: layout.into(),
            region,
            acquire,
            priority,
        };
        let placement = self.runtime.cache().create(self.decision, &request)?;
        self.track(&placement, acquire);
        Ok(placement)
    }

    /// Reuse the instance matching (memory, layout, region) or allocate one.
    pub fn find_or_create_physical_instance<'l>(
        &self,
        memory: MemoryID,
        layout: impl Into<LayoutRef<'l>>,
        region: LogicalRegion,
        acquire: bool,
        priority: GcPriority,
    ) -> Result<Placement, MappingError> {
        self.ensure_owner()?;
        let request = InstanceRequest {
            memory,
            layout: layout.into(),
            region,
            acquire,
            priority,
        };
        let placement = self.runtime.cache().find_or_create(self.decision, &request)?;
        self.track(&placement, acquire);
        Ok(placement)
    }

    pub fn find_physical_instance<'l>(
        &self,
        memory: MemoryID,
        layout: impl Into<LayoutRef<'l>>,
        region: LogicalRegion,
        acquire: bool,
    ) -> Result<Placement, MappingError> {
        self.ensure_owner()?;
        let placement =
            self.runtime
                .cache()
                .find(self.decision, memory, layout.into(), region, acquire)?;
        self.track(&placement, acquire);
        Ok(placement)
    }

    /// Pin `handle` for the rest of this decision. False if it was already evicted.
    pub fn acquire_instance(&self, handle: &InstanceHandle) -> Result<bool, MappingError> {
        self.ensure_owner()?;
        let acquired = self.runtime.cache().acquire(handle)?;
        if acquired {
            self.acquired.borrow_mut().push(handle.clone());
        }
        Ok(acquired)
    }

    /// Release one use-reference installed through this context before the context ends.
    pub fn release_instance(&self, handle: &InstanceHandle) -> Result<(), MappingError> {
        self.ensure_owner()?;
        let mut acquired = self.acquired.borrow_mut();
        let position = acquired.iter().position(|h| h == handle).ok_or_else(|| {
            MappingError::InvalidArgument(format!(
                "{} was not acquired by {}",
                handle, self.decision
            ))
        })?;
        let handle = acquired.swap_remove(position);
        self.runtime.cache().release(&handle)
    }

    /// Instances this context still pins, one entry per use-reference.
    pub fn acquired_instances(&self) -> Vec<InstanceHandle> {
        self.acquired.borrow().clone()
    }

    pub fn set_gc_priority(
        &self,
        handle: &InstanceHandle,
        priority: GcPriority,
    ) -> Result<(), MappingError> {
        self.ensure_owner()?;
        self.runtime.cache().set_gc_priority(handle, priority)
    }

    pub fn register_layout(
        &self,
        constraints: LayoutConstraintSet,
    ) -> Result<LayoutConstraintID, MappingError> {
        self.ensure_owner()?;
        Ok(self.runtime.layouts().register(constraints)?)
    }

    pub fn find_layout(
        &self,
        id: LayoutConstraintID,
    ) -> Result<Arc<LayoutConstraintSet>, MappingError> {
        self.ensure_owner()?;
        Ok(self.runtime.layouts().get(id)?)
    }

    pub fn memories(&self) -> Result<Vec<MemoryDescriptor>, MappingError> {
        self.ensure_owner()?;
        Ok(self.runtime.backend().memories())
    }

    pub fn memory_kind(&self, memory: MemoryID) -> Result<MemoryKind, MappingError> {
        self.ensure_owner()?;
        self.runtime
            .backend()
            .describe(memory)
            .map(|m| m.kind)
            .ok_or(MappingError::UnknownMemory(memory))
    }

    pub fn memory_stats(&self, memory: MemoryID) -> Result<PoolStats, MappingError> {
        self.ensure_owner()?;
        self.runtime.cache().stats(memory)
    }

    pub fn get_index_subspace(
        &self,
        parent: IndexPartitionID,
        color: impl Into<DomainPoint>,
    ) -> Result<IndexSpaceID, MappingError> {
        self.ensure_owner()?;
        Ok(self.runtime.forest().get_index_subspace(parent, color)?)
    }

    pub fn has_index_subspace(
        &self,
        parent: IndexPartitionID,
        color: impl Into<DomainPoint>,
    ) -> Result<bool, MappingError> {
        self.ensure_owner()?;
        Ok(self.runtime.forest().has_index_subspace(parent, color)?)
    }

    pub fn get_logical_subregion_by_color(
        &self,
        parent: LogicalPartition,
        color: impl Into<DomainPoint>,
    ) -> Result<LogicalRegion, MappingError> {
        self.ensure_owner()?;
        Ok(self
            .runtime
            .forest()
            .get_logical_subregion_by_color(parent, color)?)
    }

    forest_queries! {
        fn get_index_partition(parent: IndexSpaceID, color: Color) -> IndexPartitionID;
        fn has_index_partition(parent: IndexSpaceID, color: Color) -> bool;
        fn has_multiple_domains(space: IndexSpaceID) -> bool;
        fn get_index_space_domain(space: IndexSpaceID) -> Domain;
        fn get_index_space_domains(space: IndexSpaceID) -> Vec<Domain>;
        fn get_index_space_volume(space: IndexSpaceID) -> u64;
        fn get_index_partition_color_space(partition: IndexPartitionID) -> Domain;
        fn get_index_space_partition_colors(space: IndexSpaceID) -> BTreeSet<Color>;
        fn is_index_partition_disjoint(partition: IndexPartitionID) -> bool;
        fn get_index_space_color(space: IndexSpaceID) -> DomainPoint;
        fn get_index_partition_color(partition: IndexPartitionID) -> Color;
        fn get_parent_index_space(partition: IndexPartitionID) -> IndexSpaceID;
        fn has_parent_index_partition(space: IndexSpaceID) -> bool;
        fn get_parent_index_partition(space: IndexSpaceID) -> IndexPartitionID;
        fn get_field_size(field_space: FieldSpaceID, field: FieldID) -> usize;
        /// Fields in allocation order.
        fn get_field_space_fields(field_space: FieldSpaceID) -> Vec<FieldID>;
        fn get_logical_partition(parent: LogicalRegion, index_partition: IndexPartitionID) -> LogicalPartition;
        fn get_logical_partition_by_color(parent: LogicalRegion, color: Color) -> LogicalPartition;
        fn get_logical_partition_by_tree(
            index_partition: IndexPartitionID,
            field_space: FieldSpaceID,
            tree_id: RegionTreeID
        ) -> LogicalPartition;
        fn get_logical_subregion(parent: LogicalPartition, index_space: IndexSpaceID) -> LogicalRegion;
        fn get_logical_subregion_by_tree(
            index_space: IndexSpaceID,
            field_space: FieldSpaceID,
            tree_id: RegionTreeID
        ) -> LogicalRegion;
        fn get_logical_region_color(region: LogicalRegion) -> DomainPoint;
        fn get_logical_partition_color(partition: LogicalPartition) -> Color;
        fn get_parent_logical_region(partition: LogicalPartition) -> LogicalRegion;
        fn has_parent_logical_partition(region: LogicalRegion) -> bool;
        fn get_parent_logical_partition(region: LogicalRegion) -> LogicalPartition;
    }
}

impl Drop for MappingContext<'_> {
    fn drop(&mut self) {
        let acquired = std::mem::take(self.acquired.get_mut());
        if acquired.is_empty() {
            return;
        }
        debug!(
            decision = %self.decision,
            count = acquired.len(),
            "Releasing use-references held by mapping context"
        );
        for handle in acquired {
            if let Err(e) = self.runtime.cache().release(&handle) {
                warn!(decision = %self.decision, instance = %handle, error = %e, "Release on drop failed");
            }
        }
    }
}
