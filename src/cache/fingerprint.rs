//! Cache keys for physical instances

use crate::layout::ResolvedLayout;
use crate::types::{Hash, LogicalRegion, MemoryID};
use std::fmt;

/// (target memory, layout digest, logical region). Requests with equal fingerprints can be
/// served by the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub memory: MemoryID,
    pub layout: Hash,
    pub region: LogicalRegion,
}

impl Fingerprint {
    pub fn new(memory: MemoryID, layout: &ResolvedLayout, region: LogicalRegion) -> Self {
        Fingerprint {
            memory,
            layout: layout.digest,
            region,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.memory,
            self.region,
            hex::encode(&self.layout[..8])
        )
    }
}
