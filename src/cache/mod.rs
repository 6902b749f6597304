//! Physical Instance Cache
//!
//! Maps fingerprints (memory, layout, region) to physical instances. `create` always
//! allocates, `find` never does, and `find_or_create` does a lookup and, on a miss, a
//! create under the same per-memory lock so identical concurrent requests allocate once.
//! When a memory is full, unpinned instances below the requesting priority are evicted,
//! lowest priority and least recently used first.

mod eviction;
pub mod fingerprint;
mod pool;

pub use fingerprint::Fingerprint;
pub use pool::PoolStats;

use crate::error::{ForestError, LayoutError, MappingError, PlacementFailure};
use crate::forest::RegionTreeForest;
use crate::instance::{InstanceHandle, InstanceRecord};
use crate::layout::{LayoutConstraintRegistry, LayoutConstraintSet, LayoutRef, ResolvedLayout};
use crate::machine::MemoryBackend;
use crate::types::{
    DecisionId, GcPriority, InstanceID, LogicalRegion, MemoryID, GC_NEVER_PRIORITY,
};
use parking_lot::{Mutex, RwLock};
use pool::MemoryPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Everything a create or find-or-create request carries
#[derive(Debug, Clone, Copy)]
pub struct InstanceRequest<'a> {
    pub memory: MemoryID,
    pub layout: LayoutRef<'a>,
    pub region: LogicalRegion,
    /// Pin the instance against eviction until released
    pub acquire: bool,
    pub priority: GcPriority,
}

/// Outcome of a create/find request
///
/// On failure `handle` is the virtual instance and `failure` says why.
#[derive(Debug, Clone)]
pub struct Placement {
    pub handle: InstanceHandle,
    pub created: bool,
    pub failure: Option<PlacementFailure>,
}

impl Placement {
    fn created(handle: InstanceHandle) -> Self {
        Placement {
            handle,
            created: true,
            failure: None,
        }
    }

    fn found(handle: InstanceHandle) -> Self {
        Placement {
            handle,
            created: false,
            failure: None,
        }
    }

    fn failed(failure: PlacementFailure) -> Self {
        Placement {
            handle: InstanceHandle::virtual_instance(),
            created: false,
            failure: Some(failure),
        }
    }

    pub fn ok(&self) -> bool {
        self.failure.is_none()
    }

    pub fn into_result(self) -> Result<InstanceHandle, PlacementFailure> {
        match self.failure {
            None => Ok(self.handle),
            Some(failure) => Err(failure),
        }
    }
}

/// Logical clock ordering instance uses for least-recently-used tie breaking
#[derive(Debug, Default)]
pub struct UseClock(AtomicU64);

impl UseClock {
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

pub struct InstanceCache {
    forest: Arc<RegionTreeForest>,
    layouts: Arc<LayoutConstraintRegistry>,
    pools: RwLock<HashMap<MemoryID, Arc<Mutex<MemoryPool>>>>,
    clock: UseClock,
    next_instance: AtomicU64,
    eviction: bool,
}

impl InstanceCache {
    /// One pool per backend memory. Fails if the backend lists the null memory.
    pub fn new(
        forest: Arc<RegionTreeForest>,
        layouts: Arc<LayoutConstraintRegistry>,
        backend: Arc<dyn MemoryBackend>,
    ) -> Result<Self, MappingError> {
        let mut pools = HashMap::new();
        for descriptor in backend.memories() {
            if descriptor.id.is_none() {
                return Err(MappingError::InvalidArgument(format!(
                    "{} is reserved for the null memory",
                    descriptor.id
                )));
            }
            let pool = MemoryPool::new(descriptor.clone(), Arc::clone(&backend));
            pools.insert(descriptor.id, Arc::new(Mutex::new(pool)));
        }
        Ok(InstanceCache {
            forest,
            layouts,
            pools: RwLock::new(pools),
            clock: UseClock::default(),
            next_instance: AtomicU64::new(1),
            eviction: true,
        })
    }

    /// Disable eviction: requests that do not fit in free space fail outright.
    pub fn with_eviction(mut self, enabled: bool) -> Self {
        self.eviction = enabled;
        self
    }

    fn pool(&self, memory: MemoryID) -> Result<Arc<Mutex<MemoryPool>>, MappingError> {
        self.pools
            .read()
            .get(&memory)
            .cloned()
            .ok_or(MappingError::UnknownMemory(memory))
    }

    /// Allocate a new instance, evicting lower-priority unpinned instances if needed.
    #[instrument(skip(self, request), fields(decision = %decision, memory = %request.memory, region = %request.region))]
    pub fn create(
        &self,
        decision: DecisionId,
        request: &InstanceRequest<'_>,
    ) -> Result<Placement, MappingError> {
        let layout = self.layouts.resolve(request.layout)?;
        let fingerprint = Fingerprint::new(request.memory, &layout, request.region);
        let pool = self.pool(request.memory)?;
        let mut pool = pool.lock();
        self.allocate_locked(&mut pool, decision, request, layout, fingerprint)
    }

    /// Return the instance matching the fingerprint, creating one on a miss.
    #[instrument(skip(self, request), fields(decision = %decision, memory = %request.memory, region = %request.region))]
    pub fn find_or_create(
        &self,
        decision: DecisionId,
        request: &InstanceRequest<'_>,
    ) -> Result<Placement, MappingError> {
        let layout = self.layouts.resolve(request.layout)?;
        let fingerprint = Fingerprint::new(request.memory, &layout, request.region);
        let pool = self.pool(request.memory)?;
        let mut pool = pool.lock();
        if let Some(handle) = self.lookup_locked(&pool, &fingerprint, request.acquire) {
            debug!(instance = %handle, %fingerprint, "Fingerprint hit");
            return Ok(Placement::found(handle));
        }
        self.allocate_locked(&mut pool, decision, request, layout, fingerprint)
    }

    /// Look up an existing instance; never allocates.
    #[instrument(skip(self, layout), fields(decision = %decision, memory = %memory, region = %region))]
    pub fn find(
        &self,
        decision: DecisionId,
        memory: MemoryID,
        layout: LayoutRef<'_>,
        region: LogicalRegion,
        acquire: bool,
    ) -> Result<Placement, MappingError> {
        let layout = self.layouts.resolve(layout)?;
        let fingerprint = Fingerprint::new(memory, &layout, region);
        let pool = self.pool(memory)?;
        let pool = pool.lock();
        match self.lookup_locked(&pool, &fingerprint, acquire) {
            Some(handle) => {
                debug!(instance = %handle, %fingerprint, "Fingerprint hit");
                Ok(Placement::found(handle))
            }
            None => {
                self.forest.check_logical_region(&region)?;
                debug!(%fingerprint, "Fingerprint miss");
                Ok(Placement::failed(PlacementFailure::NotFound))
            }
        }
    }

    fn lookup_locked(
        &self,
        pool: &MemoryPool,
        fingerprint: &Fingerprint,
        acquire: bool,
    ) -> Option<InstanceHandle> {
        let record = pool.lookup(fingerprint)?;
        if acquire && !record.try_acquire() {
            return None;
        }
        record.touch(self.clock.tick());
        Some(InstanceHandle::from_record(Arc::clone(record)))
    }

    fn allocate_locked(
        &self,
        pool: &mut MemoryPool,
        decision: DecisionId,
        request: &InstanceRequest<'_>,
        layout: ResolvedLayout,
        fingerprint: Fingerprint,
    ) -> Result<Placement, MappingError> {
        let Some(footprint) = self.footprint(&layout.constraints, &request.region)? else {
            warn!(region = %request.region, "Request footprint overflows 64 bits");
            return Ok(Placement::failed(PlacementFailure::CapacityExhausted));
        };
        if footprint > pool.capacity() {
            warn!(
                footprint,
                capacity = pool.capacity(),
                "Request exceeds total memory capacity"
            );
            return Ok(Placement::failed(PlacementFailure::CapacityExhausted));
        }

        if footprint > pool.free() {
            let needed = footprint - pool.free();
            let reclaimed = if self.eviction {
                eviction::reclaim(pool, request.priority, needed)
            } else {
                None
            };
            if reclaimed.is_none() || footprint > pool.free() {
                warn!(
                    footprint,
                    free = pool.free(),
                    priority = request.priority,
                    "Memory capacity exhausted"
                );
                return Ok(Placement::failed(PlacementFailure::CapacityExhausted));
            }
        }

        let id = InstanceID(self.next_instance.fetch_add(1, Ordering::Relaxed));
        let record = Arc::new(InstanceRecord::new(
            id,
            request.memory,
            request.region,
            Arc::clone(&layout.constraints),
            footprint,
            fingerprint,
            decision,
            request.priority,
            self.clock.tick(),
            request.acquire,
        ));
        if !pool.insert(Arc::clone(&record)) {
            warn!(footprint, memory = %request.memory, "Memory backend refused allocation");
            return Ok(Placement::failed(PlacementFailure::CapacityExhausted));
        }
        info!(
            instance = %id,
            footprint,
            priority = request.priority,
            acquired = request.acquire,
            %fingerprint,
            "Created physical instance"
        );
        Ok(Placement::created(InstanceHandle::from_record(record)))
    }

    /// Bytes needed to hold `constraints` for every point of `region`, or `None` when that
    /// does not fit in a `u64`.
    fn footprint(
        &self,
        constraints: &LayoutConstraintSet,
        region: &LogicalRegion,
    ) -> Result<Option<u64>, MappingError> {
        self.forest.check_logical_region(region)?;
        let mut bytes_per_point = 0u64;
        for field in &constraints.fields {
            let actual = self.forest.get_field_size(region.field_space, *field)?;
            if let Some(expected) = constraints.field_sizes.get(field) {
                if *expected != actual {
                    return Err(LayoutError::FieldSizeMismatch {
                        field: *field,
                        expected: *expected,
                        actual,
                    }
                    .into());
                }
            }
            let Some(sum) = bytes_per_point.checked_add(actual as u64) else {
                return Ok(None);
            };
            bytes_per_point = sum;
        }
        let volume = match self.forest.get_index_space_volume(region.index_space) {
            Ok(volume) => volume,
            Err(ForestError::VolumeOverflow(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(bytes_per_point.checked_mul(volume))
    }

    /// Pin `handle` against eviction. Returns false if it was already evicted.
    ///
    /// Takes the pool lock so a pin never lands while eviction in that memory is choosing
    /// victims.
    pub fn acquire(&self, handle: &InstanceHandle) -> Result<bool, MappingError> {
        let record = handle.record().ok_or_else(|| {
            MappingError::InvalidArgument("cannot acquire the virtual instance".to_string())
        })?;
        let pool = self.pool(record.memory)?;
        let _pool = pool.lock();
        let acquired = record.try_acquire();
        if acquired {
            record.touch(self.clock.tick());
        }
        Ok(acquired)
    }

    /// Drop one use-reference. Never takes the pool lock.
    pub fn release(&self, handle: &InstanceHandle) -> Result<(), MappingError> {
        let record = handle.record().ok_or_else(|| {
            MappingError::InvalidArgument("cannot release the virtual instance".to_string())
        })?;
        if !record.release() {
            return Err(MappingError::InvalidArgument(format!(
                "{} has no outstanding use-reference",
                record.id
            )));
        }
        Ok(())
    }

    pub fn set_gc_priority(
        &self,
        handle: &InstanceHandle,
        priority: GcPriority,
    ) -> Result<(), MappingError> {
        let record = handle.record().ok_or_else(|| {
            MappingError::InvalidArgument("virtual instance has no priority".to_string())
        })?;
        let pool = self.pool(record.memory)?;
        let _pool = pool.lock();
        record.set_priority(priority);
        debug!(instance = %record.id, priority, "Updated GC priority");
        Ok(())
    }

    pub fn stats(&self, memory: MemoryID) -> Result<PoolStats, MappingError> {
        Ok(self.pool(memory)?.lock().stats())
    }

    /// Occupancy of every memory, ordered by memory ID.
    pub fn snapshot(&self) -> Vec<PoolStats> {
        let pools: Vec<_> = self.pools.read().values().cloned().collect();
        let mut stats: Vec<PoolStats> = pools.iter().map(|p| p.lock().stats()).collect();
        stats.sort_by_key(|s| s.memory);
        stats
    }

    /// Live instances in `memory`, oldest first.
    pub fn instances_in(&self, memory: MemoryID) -> Result<Vec<InstanceHandle>, MappingError> {
        let pool = self.pool(memory)?;
        let pool = pool.lock();
        let handles = pool
            .records()
            .map(|r| InstanceHandle::from_record(Arc::clone(r)))
            .collect();
        Ok(handles)
    }

    /// Evict every unpinned instance in `memory` that is not at `GC_NEVER_PRIORITY`.
    pub fn collect_unreferenced(&self, memory: MemoryID) -> Result<usize, MappingError> {
        let pool = self.pool(memory)?;
        let mut pool = pool.lock();
        let evicted = eviction::collect_all(&mut pool, GC_NEVER_PRIORITY);
        if !evicted.is_empty() {
            info!(memory = %memory, count = evicted.len(), "Collected unreferenced instances");
        }
        Ok(evicted.len())
    }

    /// Whether `id` is still registered in `memory`.
    pub fn contains(&self, memory: MemoryID, id: InstanceID) -> Result<bool, MappingError> {
        Ok(self.pool(memory)?.lock().get(id).is_some())
    }
}
