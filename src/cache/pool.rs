//! Per-memory instance pool: fingerprint table plus free-space accounting.
//!
//! Every pool sits behind its own mutex, so allocation in one memory never waits on
//! another. Footprints are reserved with the memory backend on insert and returned on
//! remove.

use crate::cache::Fingerprint;
use crate::instance::InstanceRecord;
use crate::machine::{MemoryBackend, MemoryDescriptor, MemoryKind};
use crate::types::{InstanceID, MemoryID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Occupancy snapshot of one memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub memory: MemoryID,
    pub kind: MemoryKind,
    pub capacity: u64,
    pub used: u64,
    pub instances: usize,
    pub pinned: usize,
}

pub(crate) struct MemoryPool {
    descriptor: MemoryDescriptor,
    backend: Arc<dyn MemoryBackend>,
    used: u64,
    /// Live instances per fingerprint, oldest first
    table: HashMap<Fingerprint, Vec<InstanceID>>,
    instances: BTreeMap<InstanceID, Arc<InstanceRecord>>,
}

impl MemoryPool {
    pub fn new(descriptor: MemoryDescriptor, backend: Arc<dyn MemoryBackend>) -> Self {
        MemoryPool {
            descriptor,
            backend,
            used: 0,
            table: HashMap::new(),
            instances: BTreeMap::new(),
        }
    }

    pub fn descriptor(&self) -> &MemoryDescriptor {
        &self.descriptor
    }

    pub fn capacity(&self) -> u64 {
        self.descriptor.capacity
    }

    pub fn free(&self) -> u64 {
        self.descriptor.capacity.saturating_sub(self.used)
    }

    /// Most recently created live instance with this fingerprint.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&Arc<InstanceRecord>> {
        self.table
            .get(fingerprint)
            .and_then(|ids| ids.last())
            .and_then(|id| self.instances.get(id))
    }

    pub fn get(&self, id: InstanceID) -> Option<&Arc<InstanceRecord>> {
        self.instances.get(&id)
    }

    /// Register `record` once the backend has reserved its footprint. Returns false, with
    /// the pool unchanged, if the backend refuses.
    pub fn insert(&mut self, record: Arc<InstanceRecord>) -> bool {
        if !self.backend.allocate(self.descriptor.id, record.footprint) {
            return false;
        }
        self.used += record.footprint;
        self.table.entry(record.fingerprint).or_default().push(record.id);
        self.instances.insert(record.id, record);
        true
    }

    /// Drop an already-destroyed record from the table and return its space.
    pub fn remove(&mut self, id: InstanceID) -> Option<Arc<InstanceRecord>> {
        let record = self.instances.remove(&id)?;
        if let Some(ids) = self.table.get_mut(&record.fingerprint) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.table.remove(&record.fingerprint);
            }
        }
        debug_assert!(self.used >= record.footprint);
        self.used = self.used.saturating_sub(record.footprint);
        self.backend.release(self.descriptor.id, record.footprint);
        Some(record)
    }

    pub fn records(&self) -> impl Iterator<Item = &Arc<InstanceRecord>> {
        self.instances.values()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            memory: self.descriptor.id,
            kind: self.descriptor.kind,
            capacity: self.descriptor.capacity,
            used: self.used,
            instances: self.instances.len(),
            pinned: self.instances.values().filter(|r| r.use_count() > 0).count(),
        }
    }
}
