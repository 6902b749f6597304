//! Index-space and index-partition queries

use super::{Domain, DomainPoint, RegionTreeForest};
use crate::error::ForestError;
use crate::types::{Color, IndexPartitionID, IndexSpaceID};
use std::collections::BTreeSet;

impl RegionTreeForest {
    pub fn get_index_partition(
        &self,
        parent: IndexSpaceID,
        color: Color,
    ) -> Result<IndexPartitionID, ForestError> {
        let state = self.state.read();
        state
            .index_space(parent)?
            .partitions
            .get(&color)
            .copied()
            .ok_or(ForestError::PartitionColorNotFound { parent, color })
    }

    pub fn has_index_partition(
        &self,
        parent: IndexSpaceID,
        color: Color,
    ) -> Result<bool, ForestError> {
        let state = self.state.read();
        Ok(state.index_space(parent)?.partitions.contains_key(&color))
    }

    pub fn get_index_subspace(
        &self,
        parent: IndexPartitionID,
        color: impl Into<DomainPoint>,
    ) -> Result<IndexSpaceID, ForestError> {
        let color = color.into();
        let state = self.state.read();
        let node = state.index_partition(parent)?;
        node.children
            .get(&color)
            .copied()
            .ok_or(ForestError::SubspaceColorNotFound { parent, color })
    }

    pub fn has_index_subspace(
        &self,
        parent: IndexPartitionID,
        color: impl Into<DomainPoint>,
    ) -> Result<bool, ForestError> {
        let color = color.into();
        let state = self.state.read();
        Ok(state.index_partition(parent)?.children.contains_key(&color))
    }

    pub fn has_multiple_domains(&self, space: IndexSpaceID) -> Result<bool, ForestError> {
        let state = self.state.read();
        Ok(state.index_space(space)?.domains.len() > 1)
    }

    /// The single domain of `space`; fails with `MultipleDomains` if it has several.
    pub fn get_index_space_domain(&self, space: IndexSpaceID) -> Result<Domain, ForestError> {
        let state = self.state.read();
        match state.index_space(space)?.domains.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(ForestError::MultipleDomains(space)),
        }
    }

    pub fn get_index_space_domains(&self, space: IndexSpaceID) -> Result<Vec<Domain>, ForestError> {
        let state = self.state.read();
        Ok(state.index_space(space)?.domains.clone())
    }

    /// Total points across the domains of `space`. Domains of one space do not overlap.
    ///
    /// Fails with `VolumeOverflow` when the count does not fit in a `u64`.
    pub fn get_index_space_volume(&self, space: IndexSpaceID) -> Result<u64, ForestError> {
        let state = self.state.read();
        state
            .index_space(space)?
            .domains
            .iter()
            .try_fold(0u64, |total, domain| {
                domain.volume().and_then(|v| total.checked_add(v))
            })
            .ok_or(ForestError::VolumeOverflow(space))
    }

    pub fn get_index_partition_color_space(
        &self,
        partition: IndexPartitionID,
    ) -> Result<Domain, ForestError> {
        let state = self.state.read();
        Ok(state.index_partition(partition)?.color_space.clone())
    }

    pub fn get_index_space_partition_colors(
        &self,
        space: IndexSpaceID,
    ) -> Result<BTreeSet<Color>, ForestError> {
        let state = self.state.read();
        Ok(state.index_space(space)?.partitions.keys().copied().collect())
    }

    /// Disjointness recorded when the partition was created.
    pub fn is_index_partition_disjoint(
        &self,
        partition: IndexPartitionID,
    ) -> Result<bool, ForestError> {
        let state = self.state.read();
        Ok(state.index_partition(partition)?.kind == super::PartitionKind::Disjoint)
    }

    pub fn get_index_space_color(&self, space: IndexSpaceID) -> Result<DomainPoint, ForestError> {
        let state = self.state.read();
        Ok(state.index_space(space)?.color.clone())
    }

    pub fn get_index_partition_color(
        &self,
        partition: IndexPartitionID,
    ) -> Result<Color, ForestError> {
        let state = self.state.read();
        Ok(state.index_partition(partition)?.color)
    }

    pub fn get_parent_index_space(
        &self,
        partition: IndexPartitionID,
    ) -> Result<IndexSpaceID, ForestError> {
        let state = self.state.read();
        Ok(state.index_partition(partition)?.parent)
    }

    pub fn has_parent_index_partition(&self, space: IndexSpaceID) -> Result<bool, ForestError> {
        let state = self.state.read();
        Ok(state.index_space(space)?.parent.is_some())
    }

    pub fn get_parent_index_partition(
        &self,
        space: IndexSpaceID,
    ) -> Result<IndexPartitionID, ForestError> {
        let state = self.state.read();
        state
            .index_space(space)?
            .parent
            .ok_or(ForestError::NoParentPartition(space))
    }
}
