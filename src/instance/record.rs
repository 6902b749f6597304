//! Shared state behind every clone of an `InstanceHandle`.

use crate::cache::Fingerprint;
use crate::instance::InstanceKind;
use crate::layout::LayoutConstraintSet;
use crate::types::{DecisionId, FieldID, GcPriority, InstanceID, LogicalRegion, MemoryID};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;

/// Set once the cache has evicted the instance; the low bits hold the use-reference count.
const DESTROYED: u64 = 1 << 63;

#[derive(Debug)]
pub(crate) struct InstanceRecord {
    pub id: InstanceID,
    pub memory: MemoryID,
    pub region: LogicalRegion,
    pub kind: InstanceKind,
    pub layout: Arc<LayoutConstraintSet>,
    pub fields: BTreeSet<FieldID>,
    pub footprint: u64,
    pub fingerprint: Fingerprint,
    pub created_by: DecisionId,
    state: AtomicU64,
    priority: AtomicI32,
    last_use: AtomicU64,
}

impl InstanceRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: InstanceID,
        memory: MemoryID,
        region: LogicalRegion,
        layout: Arc<LayoutConstraintSet>,
        footprint: u64,
        fingerprint: Fingerprint,
        created_by: DecisionId,
        priority: GcPriority,
        tick: u64,
        acquired: bool,
    ) -> Self {
        let kind = InstanceKind::from(layout.kind);
        let fields = layout.field_set();
        InstanceRecord {
            id,
            memory,
            region,
            kind,
            layout,
            fields,
            footprint,
            fingerprint,
            created_by,
            state: AtomicU64::new(u64::from(acquired)),
            priority: AtomicI32::new(priority),
            last_use: AtomicU64::new(tick),
        }
    }

    pub fn use_count(&self) -> u64 {
        self.state.load(Ordering::Acquire) & !DESTROYED
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.load(Ordering::Acquire) & DESTROYED != 0
    }

    /// Add a use-reference unless the instance has already been evicted.
    pub fn try_acquire(&self) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                if s & DESTROYED != 0 {
                    None
                } else {
                    Some(s + 1)
                }
            })
            .is_ok()
    }

    /// Drop one use-reference. Returns false, changing nothing, if none is outstanding.
    pub fn release(&self) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                if s & !DESTROYED == 0 {
                    None
                } else {
                    Some(s - 1)
                }
            })
            .is_ok()
    }

    /// Mark destroyed, only if no use-reference is outstanding.
    pub fn try_evict(&self) -> bool {
        self.state
            .compare_exchange(0, DESTROYED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn priority(&self) -> GcPriority {
        self.priority.load(Ordering::Acquire)
    }

    pub fn set_priority(&self, priority: GcPriority) {
        self.priority.store(priority, Ordering::Release);
    }

    pub fn last_use(&self) -> u64 {
        self.last_use.load(Ordering::Acquire)
    }

    pub fn touch(&self, tick: u64) {
        self.last_use.fetch_max(tick, Ordering::AcqRel);
    }
}
