//! Region Tree Forest
//!
//! Read-side index over index spaces, index partitions, field spaces and the logical
//! regions/partitions built from them. Mapping code only queries the forest; the
//! population methods here are driven by the runtime's region-tree manager.

pub mod domain;
mod field;
mod index;
mod logical;

pub use domain::{Domain, DomainPoint};

use crate::error::ForestError;
use crate::types::{
    Color, FieldID, FieldSpaceID, IndexPartitionID, IndexSpaceID, LogicalRegion, RegionTreeID,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// Whether the subspaces of a partition may overlap. Fixed when the partition is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionKind {
    Disjoint,
    Aliased,
}

#[derive(Debug, Clone)]
pub(crate) struct IndexSpaceNode {
    pub domains: Vec<Domain>,
    pub parent: Option<IndexPartitionID>,
    /// Color within the parent partition; roots carry the zero point of their dimension
    pub color: DomainPoint,
    pub root: IndexSpaceID,
    pub partitions: BTreeMap<Color, IndexPartitionID>,
}

#[derive(Debug, Clone)]
pub(crate) struct IndexPartitionNode {
    pub parent: IndexSpaceID,
    pub color: Color,
    pub kind: PartitionKind,
    pub color_space: Domain,
    pub children: BTreeMap<DomainPoint, IndexSpaceID>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FieldSpaceNode {
    /// Allocation order
    pub fields: Vec<FieldID>,
    pub sizes: HashMap<FieldID, usize>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RegionTreeNode {
    pub root: IndexSpaceID,
    pub field_space: FieldSpaceID,
}

#[derive(Debug, Default)]
pub(crate) struct ForestState {
    next_id: u64,
    pub index_spaces: HashMap<IndexSpaceID, IndexSpaceNode>,
    pub index_partitions: HashMap<IndexPartitionID, IndexPartitionNode>,
    pub field_spaces: HashMap<FieldSpaceID, FieldSpaceNode>,
    pub trees: HashMap<RegionTreeID, RegionTreeNode>,
}

impl ForestState {
    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn index_space(&self, id: IndexSpaceID) -> Result<&IndexSpaceNode, ForestError> {
        self.index_spaces
            .get(&id)
            .ok_or(ForestError::IndexSpaceNotFound(id))
    }

    pub fn index_partition(
        &self,
        id: IndexPartitionID,
    ) -> Result<&IndexPartitionNode, ForestError> {
        self.index_partitions
            .get(&id)
            .ok_or(ForestError::IndexPartitionNotFound(id))
    }

    pub fn field_space(&self, id: FieldSpaceID) -> Result<&FieldSpaceNode, ForestError> {
        self.field_spaces
            .get(&id)
            .ok_or(ForestError::FieldSpaceNotFound(id))
    }

    pub fn tree(&self, id: RegionTreeID) -> Result<&RegionTreeNode, ForestError> {
        self.trees.get(&id).ok_or(ForestError::RegionTreeNotFound(id))
    }
}

/// Shared, thread-safe region tree forest
#[derive(Debug, Default)]
pub struct RegionTreeForest {
    pub(crate) state: RwLock<ForestState>,
}

impl RegionTreeForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root index space covering `domains`.
    #[instrument(skip(self, domains), fields(domain_count = domains.len()))]
    pub fn create_index_space(&self, domains: Vec<Domain>) -> Result<IndexSpaceID, ForestError> {
        let dim = check_domains(&domains)?;
        let mut state = self.state.write();
        let id = IndexSpaceID(state.fresh_id());
        state.index_spaces.insert(
            id,
            IndexSpaceNode {
                domains,
                parent: None,
                color: DomainPoint::new(vec![0; dim]),
                root: id,
                partitions: BTreeMap::new(),
            },
        );
        debug!(index_space = %id, "Created root index space");
        Ok(id)
    }

    /// Partition `parent` into the given colored subspaces.
    ///
    /// Every child color must lie in `color_space`, every child domain must lie inside the
    /// parent's bounds, and a `Disjoint` partition must have non-overlapping children. These
    /// checks run once here; `is_index_partition_disjoint` only reports the recorded kind.
    #[instrument(skip(self, color_space, children), fields(child_count = children.len()))]
    pub fn create_index_partition(
        &self,
        parent: IndexSpaceID,
        color: Color,
        kind: PartitionKind,
        color_space: Domain,
        children: Vec<(DomainPoint, Vec<Domain>)>,
    ) -> Result<IndexPartitionID, ForestError> {
        let mut state = self.state.write();
        let parent_node = state.index_space(parent)?;
        if parent_node.partitions.contains_key(&color) {
            return Err(ForestError::DuplicateColor { parent, color });
        }
        let root = parent_node.root;
        let parent_bounds = Domain::bounding(&parent_node.domains);

        let mut seen: BTreeMap<DomainPoint, ()> = BTreeMap::new();
        for (point, domains) in &children {
            if !color_space.contains(point) {
                return Err(ForestError::InvalidPartition(format!(
                    "child color {} outside color space {}",
                    point, color_space
                )));
            }
            if seen.insert(point.clone(), ()).is_some() {
                return Err(ForestError::InvalidPartition(format!(
                    "child color {} given twice",
                    point
                )));
            }
            check_domains(domains)?;
            for domain in domains {
                let fits = parent_bounds
                    .as_ref()
                    .map_or(domain.is_empty(), |bounds| bounds.contains_domain(domain));
                if !fits {
                    return Err(ForestError::InvalidPartition(format!(
                        "child {} domain {} escapes parent {}",
                        point, domain, parent
                    )));
                }
            }
        }

        if kind == PartitionKind::Disjoint {
            check_disjoint(&children)?;
        }

        let ip = IndexPartitionID(state.fresh_id());
        let mut child_ids = BTreeMap::new();
        for (point, domains) in children {
            let child = IndexSpaceID(state.fresh_id());
            state.index_spaces.insert(
                child,
                IndexSpaceNode {
                    domains,
                    parent: Some(ip),
                    color: point.clone(),
                    root,
                    partitions: BTreeMap::new(),
                },
            );
            child_ids.insert(point, child);
        }
        state.index_partitions.insert(
            ip,
            IndexPartitionNode {
                parent,
                color,
                kind,
                color_space,
                children: child_ids,
            },
        );
        if let Some(node) = state.index_spaces.get_mut(&parent) {
            node.partitions.insert(color, ip);
        }
        debug!(index_partition = %ip, ?kind, "Created index partition");
        Ok(ip)
    }

    pub fn create_field_space(&self) -> FieldSpaceID {
        let mut state = self.state.write();
        let id = FieldSpaceID(state.fresh_id());
        state.field_spaces.insert(id, FieldSpaceNode::default());
        id
    }

    pub fn allocate_field(
        &self,
        field_space: FieldSpaceID,
        field: FieldID,
        size: usize,
    ) -> Result<(), ForestError> {
        let mut state = self.state.write();
        let node = state
            .field_spaces
            .get_mut(&field_space)
            .ok_or(ForestError::FieldSpaceNotFound(field_space))?;
        if node.sizes.contains_key(&field) {
            return Err(ForestError::DuplicateField { field_space, field });
        }
        node.fields.push(field);
        node.sizes.insert(field, size);
        Ok(())
    }

    /// Create a new region tree rooted at `index_space`.
    pub fn create_logical_region(
        &self,
        index_space: IndexSpaceID,
        field_space: FieldSpaceID,
    ) -> Result<LogicalRegion, ForestError> {
        let mut state = self.state.write();
        let node = state.index_space(index_space)?;
        if node.parent.is_some() {
            return Err(ForestError::NotInTree(format!(
                "{} is not a root index space",
                index_space
            )));
        }
        state.field_space(field_space)?;
        let tree_id = RegionTreeID(state.fresh_id());
        state.trees.insert(
            tree_id,
            RegionTreeNode {
                root: index_space,
                field_space,
            },
        );
        debug!(tree = %tree_id, "Created logical region tree");
        Ok(LogicalRegion {
            tree_id,
            index_space,
            field_space,
        })
    }
}

fn check_domains(domains: &[Domain]) -> Result<usize, ForestError> {
    let first = domains
        .first()
        .ok_or_else(|| ForestError::InvalidDomain("index space needs a domain".to_string()))?;
    let dim = first.dim();
    if domains.iter().any(|d| d.dim() != dim) {
        return Err(ForestError::InvalidDomain(
            "domains of one index space must share a dimension".to_string(),
        ));
    }
    Ok(dim)
}

fn check_disjoint(children: &[(DomainPoint, Vec<Domain>)]) -> Result<(), ForestError> {
    for (i, (point_a, domains_a)) in children.iter().enumerate() {
        for (point_b, domains_b) in &children[i + 1..] {
            let overlap = domains_a
                .iter()
                .any(|a| domains_b.iter().any(|b| a.intersects(b)));
            if overlap {
                return Err(ForestError::InvalidPartition(format!(
                    "disjoint partition children {} and {} overlap",
                    point_a, point_b
                )));
            }
        }
    }
    Ok(())
}
