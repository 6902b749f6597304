//! Machine Model
//!
//! The memories instances can be placed in. The instance cache keeps its own fingerprint
//! table per memory and asks the backend to account for every footprint it places or frees;
//! byte ranges themselves belong to the backend.

use crate::types::MemoryID;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    System,
    Framebuffer,
    ZeroCopy,
    Registered,
    Socket,
    Disk,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoryKind::System => "system",
            MemoryKind::Framebuffer => "framebuffer",
            MemoryKind::ZeroCopy => "zero_copy",
            MemoryKind::Registered => "registered",
            MemoryKind::Socket => "socket",
            MemoryKind::Disk => "disk",
        };
        write!(f, "{}", name)
    }
}

/// One memory of the machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDescriptor {
    pub id: MemoryID,
    pub kind: MemoryKind,
    /// Capacity in bytes
    pub capacity: u64,
}

/// Capacity/allocation backend consulted by the instance cache
pub trait MemoryBackend: Send + Sync {
    /// All memories, ordered by ID.
    fn memories(&self) -> Vec<MemoryDescriptor>;

    fn describe(&self, memory: MemoryID) -> Option<MemoryDescriptor>;

    /// Reserve `bytes` in `memory`. Returns false when the backend cannot hold them.
    fn allocate(&self, memory: MemoryID, bytes: u64) -> bool;

    /// Return `bytes` reserved earlier with `allocate`.
    fn release(&self, memory: MemoryID, bytes: u64);
}

/// Static machine description, typically built from configuration
#[derive(Debug, Default)]
pub struct Machine {
    memories: BTreeMap<MemoryID, MemoryDescriptor>,
    allocated: BTreeMap<MemoryID, AtomicU64>,
}

impl Machine {
    pub fn new(memories: impl IntoIterator<Item = MemoryDescriptor>) -> Self {
        memories
            .into_iter()
            .fold(Machine::default(), |machine, m| {
                machine.with_memory(m.id, m.kind, m.capacity)
            })
    }

    pub fn with_memory(mut self, id: MemoryID, kind: MemoryKind, capacity: u64) -> Self {
        self.memories
            .insert(id, MemoryDescriptor { id, kind, capacity });
        self.allocated.insert(id, AtomicU64::new(0));
        self
    }

    /// Bytes currently reserved in `memory`.
    pub fn allocated(&self, memory: MemoryID) -> u64 {
        self.allocated
            .get(&memory)
            .map_or(0, |used| used.load(Ordering::Acquire))
    }
}

impl MemoryBackend for Machine {
    fn memories(&self) -> Vec<MemoryDescriptor> {
        self.memories.values().cloned().collect()
    }

    fn describe(&self, memory: MemoryID) -> Option<MemoryDescriptor> {
        self.memories.get(&memory).cloned()
    }

    fn allocate(&self, memory: MemoryID, bytes: u64) -> bool {
        let (Some(descriptor), Some(used)) =
            (self.memories.get(&memory), self.allocated.get(&memory))
        else {
            return false;
        };
        used.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            current
                .checked_add(bytes)
                .filter(|total| *total <= descriptor.capacity)
        })
        .is_ok()
    }

    fn release(&self, memory: MemoryID, bytes: u64) {
        let Some(used) = self.allocated.get(&memory) else {
            warn!(memory = %memory, bytes, "Release for unknown memory");
            return;
        };
        let previous = used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(bytes))
            })
            .unwrap_or_else(|current| current);
        if previous < bytes {
            warn!(memory = %memory, bytes, previous, "Released more bytes than were allocated");
        }
    }
}
