//! Layout Constraints
//!
//! Describes the physical layout a mapper requires of an instance: which fields, in which
//! order, with which sizes, and whether it is a normal or reduction instance. A constraint
//! set is given inline or registered once and referenced by `LayoutConstraintID`.

pub mod digest;
pub mod registry;

pub use digest::compute_layout_digest;
pub use registry::LayoutConstraintRegistry;

use crate::error::LayoutError;
use crate::types::{FieldID, Hash, LayoutConstraintID, ReductionOpID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// One axis of the physical ordering. `Field` positions the field dimension (SOA vs AOS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DimensionKind {
    X,
    Y,
    Z,
    Field,
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DimensionKind::X => "x",
            DimensionKind::Y => "y",
            DimensionKind::Z => "z",
            DimensionKind::Field => "field",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpecializedKind {
    #[default]
    Normal,
    Reduction(ReductionOpID),
}

/// Layout requirements for a physical instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutConstraintSet {
    pub kind: SpecializedKind,
    /// Fields in layout order
    pub fields: Vec<FieldID>,
    /// Sizes the mapper expects; checked against the field space when allocating
    pub field_sizes: BTreeMap<FieldID, usize>,
    /// Fastest-varying dimension first; empty means the runtime default
    pub ordering: Vec<DimensionKind>,
}

impl LayoutConstraintSet {
    pub fn new(fields: impl IntoIterator<Item = FieldID>) -> Self {
        LayoutConstraintSet {
            kind: SpecializedKind::Normal,
            fields: fields.into_iter().collect(),
            field_sizes: BTreeMap::new(),
            ordering: Vec::new(),
        }
    }

    /// Single-field reduction layout.
    pub fn reduction(field: FieldID, redop: ReductionOpID) -> Self {
        LayoutConstraintSet {
            kind: SpecializedKind::Reduction(redop),
            ..Self::new([field])
        }
    }

    pub fn with_field_size(mut self, field: FieldID, size: usize) -> Self {
        self.field_sizes.insert(field, size);
        self
    }

    pub fn with_ordering(mut self, ordering: Vec<DimensionKind>) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn field_set(&self) -> BTreeSet<FieldID> {
        self.fields.iter().copied().collect()
    }

    /// Check internal consistency. Field existence and sizes are checked against the
    /// forest by the instance cache.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.fields.is_empty() {
            return Err(LayoutError::EmptyFieldSet);
        }
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(*field) {
                return Err(LayoutError::DuplicateField(*field));
            }
        }
        if let Some(field) = self.field_sizes.keys().find(|f| !seen.contains(f)) {
            return Err(LayoutError::UnlistedFieldSize(*field));
        }
        let mut dims = BTreeSet::new();
        for dim in &self.ordering {
            if !dims.insert(*dim) {
                return Err(LayoutError::DuplicateDimension(dim.to_string()));
            }
        }
        if matches!(self.kind, SpecializedKind::Reduction(_)) && self.fields.len() != 1 {
            return Err(LayoutError::ReductionFieldCount(self.fields.len()));
        }
        Ok(())
    }
}

/// Constraints as passed by mapper code: inline or by registered ID.
#[derive(Debug, Clone, Copy)]
pub enum LayoutRef<'a> {
    Inline(&'a LayoutConstraintSet),
    Registered(LayoutConstraintID),
}

impl<'a> From<&'a LayoutConstraintSet> for LayoutRef<'a> {
    fn from(constraints: &'a LayoutConstraintSet) -> Self {
        LayoutRef::Inline(constraints)
    }
}

impl From<LayoutConstraintID> for LayoutRef<'_> {
    fn from(id: LayoutConstraintID) -> Self {
        LayoutRef::Registered(id)
    }
}

/// A validated constraint set together with its digest.
#[derive(Debug, Clone)]
pub struct ResolvedLayout {
    pub constraints: Arc<LayoutConstraintSet>,
    pub digest: Hash,
}

impl ResolvedLayout {
    pub fn resolve(constraints: LayoutConstraintSet) -> Result<Self, LayoutError> {
        constraints.validate()?;
        let digest = compute_layout_digest(&constraints)?;
        Ok(ResolvedLayout {
            constraints: Arc::new(constraints),
            digest,
        })
    }
}
