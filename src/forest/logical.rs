//! Logical region and logical partition navigation
//!
//! Logical nodes are plain values; every query first checks that the value names nodes
//! that actually belong to the region tree it claims.

use super::{DomainPoint, ForestState, RegionTreeForest};
use crate::error::ForestError;
use crate::types::{
    Color, FieldSpaceID, IndexPartitionID, IndexSpaceID, LogicalPartition, LogicalRegion,
    RegionTreeID,
};

impl ForestState {
    fn check_tree_member(
        &self,
        tree_id: RegionTreeID,
        field_space: FieldSpaceID,
        index_space: IndexSpaceID,
    ) -> Result<(), ForestError> {
        let tree = self.tree(tree_id)?;
        if tree.field_space != field_space {
            return Err(ForestError::NotInTree(format!(
                "{} is not the field space of {}",
                field_space, tree_id
            )));
        }
        if self.index_space(index_space)?.root != tree.root {
            return Err(ForestError::NotInTree(format!(
                "{} is not part of {}",
                index_space, tree_id
            )));
        }
        Ok(())
    }

    pub(crate) fn check_region(&self, region: &LogicalRegion) -> Result<(), ForestError> {
        self.check_tree_member(region.tree_id, region.field_space, region.index_space)
    }

    fn check_partition(&self, partition: &LogicalPartition) -> Result<(), ForestError> {
        let parent = self.index_partition(partition.index_partition)?.parent;
        self.check_tree_member(partition.tree_id, partition.field_space, parent)
    }
}

impl RegionTreeForest {
    /// Verify that `region` names a registered tree, field space and index space.
    pub fn check_logical_region(&self, region: &LogicalRegion) -> Result<(), ForestError> {
        self.state.read().check_region(region)
    }

    pub fn get_logical_partition(
        &self,
        parent: LogicalRegion,
        index_partition: IndexPartitionID,
    ) -> Result<LogicalPartition, ForestError> {
        let state = self.state.read();
        state.check_region(&parent)?;
        if state.index_partition(index_partition)?.parent != parent.index_space {
            return Err(ForestError::NotInTree(format!(
                "{} is not a partition of {}",
                index_partition, parent
            )));
        }
        Ok(LogicalPartition {
            tree_id: parent.tree_id,
            index_partition,
            field_space: parent.field_space,
        })
    }

    pub fn get_logical_partition_by_color(
        &self,
        parent: LogicalRegion,
        color: Color,
    ) -> Result<LogicalPartition, ForestError> {
        let state = self.state.read();
        state.check_region(&parent)?;
        let index_partition = state
            .index_space(parent.index_space)?
            .partitions
            .get(&color)
            .copied()
            .ok_or(ForestError::PartitionColorNotFound {
                parent: parent.index_space,
                color,
            })?;
        Ok(LogicalPartition {
            tree_id: parent.tree_id,
            index_partition,
            field_space: parent.field_space,
        })
    }

    pub fn get_logical_partition_by_tree(
        &self,
        index_partition: IndexPartitionID,
        field_space: FieldSpaceID,
        tree_id: RegionTreeID,
    ) -> Result<LogicalPartition, ForestError> {
        let partition = LogicalPartition {
            tree_id,
            index_partition,
            field_space,
        };
        self.state.read().check_partition(&partition)?;
        Ok(partition)
    }

    pub fn get_logical_subregion(
        &self,
        parent: LogicalPartition,
        index_space: IndexSpaceID,
    ) -> Result<LogicalRegion, ForestError> {
        let state = self.state.read();
        state.check_partition(&parent)?;
        if state.index_space(index_space)?.parent != Some(parent.index_partition) {
            return Err(ForestError::NotInTree(format!(
                "{} is not a subspace of {}",
                index_space, parent
            )));
        }
        Ok(LogicalRegion {
            tree_id: parent.tree_id,
            index_space,
            field_space: parent.field_space,
        })
    }

    pub fn get_logical_subregion_by_color(
        &self,
        parent: LogicalPartition,
        color: impl Into<DomainPoint>,
    ) -> Result<LogicalRegion, ForestError> {
        let color = color.into();
        let state = self.state.read();
        state.check_partition(&parent)?;
        let index_space = state
            .index_partition(parent.index_partition)?
            .children
            .get(&color)
            .copied()
            .ok_or(ForestError::SubspaceColorNotFound {
                parent: parent.index_partition,
                color,
            })?;
        Ok(LogicalRegion {
            tree_id: parent.tree_id,
            index_space,
            field_space: parent.field_space,
        })
    }

    pub fn get_logical_subregion_by_tree(
        &self,
        index_space: IndexSpaceID,
        field_space: FieldSpaceID,
        tree_id: RegionTreeID,
    ) -> Result<LogicalRegion, ForestError> {
        let region = LogicalRegion {
            tree_id,
            index_space,
            field_space,
        };
        self.state.read().check_region(&region)?;
        Ok(region)
    }

    pub fn get_logical_region_color(
        &self,
        region: LogicalRegion,
    ) -> Result<DomainPoint, ForestError> {
        let state = self.state.read();
        state.check_region(&region)?;
        Ok(state.index_space(region.index_space)?.color.clone())
    }

    pub fn get_logical_partition_color(
        &self,
        partition: LogicalPartition,
    ) -> Result<Color, ForestError> {
        let state = self.state.read();
        state.check_partition(&partition)?;
        Ok(state.index_partition(partition.index_partition)?.color)
    }

    pub fn get_parent_logical_region(
        &self,
        partition: LogicalPartition,
    ) -> Result<LogicalRegion, ForestError> {
        let state = self.state.read();
        state.check_partition(&partition)?;
        Ok(LogicalRegion {
            tree_id: partition.tree_id,
            index_space: state.index_partition(partition.index_partition)?.parent,
            field_space: partition.field_space,
        })
    }

    pub fn has_parent_logical_partition(&self, region: LogicalRegion) -> Result<bool, ForestError> {
        let state = self.state.read();
        state.check_region(&region)?;
        Ok(state.index_space(region.index_space)?.parent.is_some())
    }

    pub fn get_parent_logical_partition(
        &self,
        region: LogicalRegion,
    ) -> Result<LogicalPartition, ForestError> {
        let state = self.state.read();
        state.check_region(&region)?;
        let index_partition = state
            .index_space(region.index_space)?
            .parent
            .ok_or(ForestError::NoParentPartition(region.index_space))?;
        Ok(LogicalPartition {
            tree_id: region.tree_id,
            index_partition,
            field_space: region.field_space,
        })
    }
}
