//! regionmap: Mapping-Time Instance Placement
//!
//! Lets mapping policies place physical instances of logical regions in the memories of a
//! machine and navigate how those regions are partitioned. The instance cache reuses an
//! existing instance whenever (memory, layout, region) match and evicts unpinned,
//! lower-priority instances when a memory fills up.

pub mod cache;
pub mod config;
pub mod error;
pub mod forest;
pub mod instance;
pub mod layout;
pub mod logging;
pub mod machine;
pub mod mapping;
pub mod types;

pub use cache::{InstanceCache, InstanceRequest, Placement};
pub use error::{ForestError, LayoutError, MappingError, PlacementFailure};
pub use instance::InstanceHandle;
pub use mapping::{MapperRuntime, MappingContext};
