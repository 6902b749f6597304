//! Eviction candidate ordering and reclamation
//!
//! Candidates are instances with no use-reference whose priority is strictly below the
//! requesting priority. They are taken lowest priority first, then least recently used,
//! then oldest instance.

use crate::cache::pool::MemoryPool;
use crate::instance::InstanceRecord;
use crate::types::{GcPriority, InstanceID};
use std::sync::Arc;
use tracing::debug;

/// Eviction order for `records` against a request at `requesting` priority.
pub(crate) fn ordered_candidates<'a>(
    records: impl Iterator<Item = &'a Arc<InstanceRecord>>,
    requesting: GcPriority,
) -> Vec<Arc<InstanceRecord>> {
    let mut candidates: Vec<Arc<InstanceRecord>> = records
        .filter(|r| r.use_count() == 0 && !r.is_destroyed())
        .filter(|r| r.priority() < requesting)
        .cloned()
        .collect();
    candidates.sort_by_key(|r| (r.priority(), r.last_use(), r.id));
    candidates
}

/// Evict candidates in order until at least `needed` bytes are free.
///
/// Returns the evicted instance IDs, or `None` without evicting anything when the
/// candidates together could not cover `needed`. The caller holds the pool lock, which
/// `InstanceCache::acquire` also takes, so no candidate can gain a use-reference between
/// the feasibility check and its eviction.
pub(crate) fn reclaim(
    pool: &mut MemoryPool,
    requesting: GcPriority,
    needed: u64,
) -> Option<Vec<InstanceID>> {
    let candidates: Vec<_> = ordered_candidates(pool.records(), requesting)
        .into_iter()
        .filter(|r| r.footprint > 0)
        .collect();
    let available: u64 = candidates.iter().map(|r| r.footprint).sum();
    if available < needed {
        debug!(
            memory = %pool.descriptor().id,
            needed,
            available,
            "Not enough evictable space"
        );
        return None;
    }

    let mut freed = 0u64;
    let mut evicted = Vec::new();
    for victim in candidates {
        if freed >= needed {
            break;
        }
        if !victim.try_evict() {
            continue;
        }
        pool.remove(victim.id);
        freed += victim.footprint;
        debug!(
            instance = %victim.id,
            priority = victim.priority(),
            last_use = victim.last_use(),
            footprint = victim.footprint,
            fingerprint = %victim.fingerprint,
            "Evicted instance"
        );
        evicted.push(victim.id);
    }
    Some(evicted)
}

/// Evict every unpinned instance below `requesting`, regardless of space.
pub(crate) fn collect_all(pool: &mut MemoryPool, requesting: GcPriority) -> Vec<InstanceID> {
    let mut evicted = Vec::new();
    for victim in ordered_candidates(pool.records(), requesting) {
        if victim.try_evict() {
            pool.remove(victim.id);
            evicted.push(victim.id);
        }
    }
    evicted
}
