//! Mapper Runtime
//!
//! Owns the shared region tree forest, layout registry and instance cache, and hands out
//! one `MappingContext` per mapping decision. The shared pieces outlive every context and
//! are used concurrently by decisions running on different threads.

mod context;

pub use context::MappingContext;

use crate::cache::InstanceCache;
use crate::config::{CacheConfig, RuntimeConfig};
use crate::error::MappingError;
use crate::forest::RegionTreeForest;
use crate::layout::LayoutConstraintRegistry;
use crate::machine::MemoryBackend;
use crate::types::{DecisionId, TaskID};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub struct MapperRuntime {
    forest: Arc<RegionTreeForest>,
    layouts: Arc<LayoutConstraintRegistry>,
    cache: Arc<InstanceCache>,
    backend: Arc<dyn MemoryBackend>,
    config: CacheConfig,
    next_decision: AtomicU64,
}

impl MapperRuntime {
    /// Fails if `backend` lists a memory the cache cannot track, such as the null memory.
    pub fn new(
        forest: Arc<RegionTreeForest>,
        backend: Arc<dyn MemoryBackend>,
        config: CacheConfig,
    ) -> Result<Self, MappingError> {
        let layouts = Arc::new(LayoutConstraintRegistry::new());
        let cache = Arc::new(
            InstanceCache::new(Arc::clone(&forest), Arc::clone(&layouts), Arc::clone(&backend))?
                .with_eviction(config.eviction),
        );
        info!(
            memories = backend.memories().len(),
            eviction = config.eviction,
            "Mapper runtime ready"
        );
        Ok(MapperRuntime {
            forest,
            layouts,
            cache,
            backend,
            config,
            next_decision: AtomicU64::new(1),
        })
    }

    /// Build a runtime with an empty forest over the configured machine.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, MappingError> {
        Self::new(
            Arc::new(RegionTreeForest::new()),
            Arc::new(config.machine.to_machine()),
            config.cache.clone(),
        )
    }

    pub fn forest(&self) -> &Arc<RegionTreeForest> {
        &self.forest
    }

    pub fn layouts(&self) -> &Arc<LayoutConstraintRegistry> {
        &self.layouts
    }

    pub fn cache(&self) -> &Arc<InstanceCache> {
        &self.cache
    }

    pub fn backend(&self) -> &Arc<dyn MemoryBackend> {
        &self.backend
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Occupancy of every memory as JSON, for diagnostics.
    pub fn occupancy_report(&self) -> serde_json::Value {
        serde_json::json!({ "memories": self.cache.snapshot() })
    }

    fn next_decision(&self, task: TaskID) -> DecisionId {
        DecisionId {
            task,
            serial: self.next_decision.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Open the context for one mapping call on the current thread.
    pub fn begin_mapping(&self, task: TaskID, mapper: &str) -> MappingContext<'_> {
        let decision = self.next_decision(task);
        debug!(decision = %decision, mapper, "Begin mapping");
        MappingContext::new(self, decision, mapper, std::thread::current().id())
    }
}
