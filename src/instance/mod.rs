//! Physical Instance Handles
//!
//! An `InstanceHandle` names one physical instance created by the instance cache. Clones
//! share the same record; identity, not content, decides equality and ordering. The
//! default handle is the virtual instance, which has no backing memory at all.

pub(crate) mod record;

pub(crate) use record::InstanceRecord;

use crate::layout::{LayoutConstraintSet, SpecializedKind};
use crate::types::{
    DecisionId, FieldID, GcPriority, InstanceID, LogicalRegion, MemoryID,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceKind {
    Normal,
    Reduction,
    Virtual,
}

impl From<SpecializedKind> for InstanceKind {
    fn from(kind: SpecializedKind) -> Self {
        match kind {
            SpecializedKind::Normal => InstanceKind::Normal,
            SpecializedKind::Reduction(_) => InstanceKind::Reduction,
        }
    }
}

/// Shared handle to a physical instance
#[derive(Clone, Default)]
pub struct InstanceHandle {
    record: Option<Arc<InstanceRecord>>,
}

impl InstanceHandle {
    /// The virtual instance: no memory, no fields, never exists.
    pub fn virtual_instance() -> Self {
        InstanceHandle { record: None }
    }

    pub(crate) fn from_record(record: Arc<InstanceRecord>) -> Self {
        InstanceHandle {
            record: Some(record),
        }
    }

    pub(crate) fn record(&self) -> Option<&Arc<InstanceRecord>> {
        self.record.as_ref()
    }

    pub fn instance_id(&self) -> Option<InstanceID> {
        self.record.as_ref().map(|r| r.id)
    }

    /// Memory holding the instance, or `MemoryID::NONE` for the virtual instance.
    pub fn location(&self) -> MemoryID {
        self.record.as_ref().map_or(MemoryID::NONE, |r| r.memory)
    }

    pub fn logical_region(&self) -> Option<LogicalRegion> {
        self.record.as_ref().map(|r| r.region)
    }

    /// False for the virtual instance and for instances the cache has since evicted.
    pub fn exists(&self) -> bool {
        self.record.as_ref().is_some_and(|r| !r.is_destroyed())
    }

    pub fn kind(&self) -> InstanceKind {
        self.record
            .as_ref()
            .map_or(InstanceKind::Virtual, |r| r.kind)
    }

    pub fn is_normal(&self) -> bool {
        self.kind() == InstanceKind::Normal
    }

    pub fn is_reduction(&self) -> bool {
        self.kind() == InstanceKind::Reduction
    }

    pub fn is_virtual(&self) -> bool {
        self.record.is_none()
    }

    pub fn has_field(&self, field: FieldID) -> bool {
        self.record
            .as_ref()
            .is_some_and(|r| r.fields.contains(&field))
    }

    pub fn has_fields(&self, fields: &[FieldID]) -> BTreeMap<FieldID, bool> {
        fields.iter().map(|f| (*f, self.has_field(*f))).collect()
    }

    /// Remove from `fields` every field this instance does not hold.
    pub fn prune_absent_fields(&self, fields: &mut BTreeSet<FieldID>) {
        fields.retain(|f| self.has_field(*f));
    }

    pub fn layout(&self) -> Option<&LayoutConstraintSet> {
        self.record.as_ref().map(|r| r.layout.as_ref())
    }

    /// Bytes the instance occupies in its memory.
    pub fn footprint(&self) -> u64 {
        self.record.as_ref().map_or(0, |r| r.footprint)
    }

    pub fn gc_priority(&self) -> Option<GcPriority> {
        self.record.as_ref().map(|r| r.priority())
    }

    /// Outstanding use-references pinning the instance against eviction.
    pub fn use_count(&self) -> u64 {
        self.record.as_ref().map_or(0, |r| r.use_count())
    }

    /// Decision that created the instance.
    pub fn created_by(&self) -> Option<DecisionId> {
        self.record.as_ref().map(|r| r.created_by)
    }
}

impl PartialEq for InstanceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.instance_id() == other.instance_id()
    }
}

impl Eq for InstanceHandle {}

impl Hash for InstanceHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instance_id().hash(state);
    }
}

impl PartialOrd for InstanceHandle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InstanceHandle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instance_id().cmp(&other.instance_id())
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.record {
            None => write!(f, "InstanceHandle(virtual)"),
            Some(r) => f
                .debug_struct("InstanceHandle")
                .field("id", &r.id)
                .field("memory", &r.memory)
                .field("region", &r.region)
                .field("kind", &r.kind)
                .field("exists", &!r.is_destroyed())
                .finish(),
        }
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.record {
            None => write!(f, "virtual"),
            Some(r) => write!(f, "{}@{}", r.id, r.memory),
        }
    }
}
