//! Layout Constraint Registry
//!
//! Registered constraint sets are validated and digested once; later lookups by ID are
//! cheap clones of the shared set.

use crate::error::LayoutError;
use crate::layout::{LayoutConstraintSet, LayoutRef, ResolvedLayout};
use crate::types::LayoutConstraintID;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

pub struct LayoutConstraintRegistry {
    layouts: RwLock<HashMap<LayoutConstraintID, ResolvedLayout>>,
    next_id: AtomicU64,
}

impl Default for LayoutConstraintRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutConstraintRegistry {
    pub fn new() -> Self {
        LayoutConstraintRegistry {
            layouts: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn register(
        &self,
        constraints: LayoutConstraintSet,
    ) -> Result<LayoutConstraintID, LayoutError> {
        let resolved = ResolvedLayout::resolve(constraints)?;
        let id = LayoutConstraintID(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(layout = %id, digest = %hex::encode(&resolved.digest[..8]), "Registered layout");
        self.layouts.write().insert(id, resolved);
        Ok(id)
    }

    pub fn get(&self, id: LayoutConstraintID) -> Result<Arc<LayoutConstraintSet>, LayoutError> {
        self.layouts
            .read()
            .get(&id)
            .map(|r| Arc::clone(&r.constraints))
            .ok_or(LayoutError::ConstraintNotFound(id))
    }

    /// Resolve a mapper-supplied reference to a validated set and its digest.
    pub fn resolve(&self, layout: LayoutRef<'_>) -> Result<ResolvedLayout, LayoutError> {
        match layout {
            LayoutRef::Inline(constraints) => ResolvedLayout::resolve(constraints.clone()),
            LayoutRef::Registered(id) => self
                .layouts
                .read()
                .get(&id)
                .cloned()
                .ok_or(LayoutError::ConstraintNotFound(id)),
        }
    }

    pub fn len(&self) -> usize {
        self.layouts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.read().is_empty()
    }
}
