//! Configuration System
//!
//! Runtime configuration loaded in layers: built-in defaults, the global config file,
//! the workspace config file, then `REGIONMAP__`-prefixed environment variables.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::machine::{Machine, MemoryDescriptor, MemoryKind};
use crate::types::{GcPriority, MemoryID, GC_DEFAULT_PRIORITY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

mod loader;
mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use loader::ConfigLoader;
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::workspace_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub machine: MachineConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Memories instances may be placed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    #[serde(default = "default_memories")]
    pub memories: Vec<MemoryDescriptor>,
}

fn default_memories() -> Vec<MemoryDescriptor> {
    vec![MemoryDescriptor {
        id: MemoryID(1),
        kind: MemoryKind::System,
        capacity: 1 << 30,
    }]
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memories: default_memories(),
        }
    }
}

impl MachineConfig {
    pub fn to_machine(&self) -> Machine {
        Machine::new(self.memories.iter().cloned())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.memories.is_empty() {
            return Err("At least one memory must be configured".to_string());
        }
        let mut seen = BTreeSet::new();
        for memory in &self.memories {
            if memory.id.is_none() {
                return Err(format!("{} is reserved for the virtual instance", memory.id));
            }
            if !seen.insert(memory.id) {
                return Err(format!("Duplicate memory id {}", memory.id));
            }
            if memory.capacity == 0 {
                return Err(format!("{} has zero capacity", memory.id));
            }
        }
        Ok(())
    }
}

/// Instance cache behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Evict lower-priority unpinned instances when a memory is full
    #[serde(default = "default_true")]
    pub eviction: bool,

    /// Priority mappers use when they have no better signal
    #[serde(default = "default_gc_priority")]
    pub default_gc_priority: GcPriority,
}

fn default_true() -> bool {
    true
}

fn default_gc_priority() -> GcPriority {
    GC_DEFAULT_PRIORITY
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            eviction: default_true(),
            default_gc_priority: default_gc_priority(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Machine(String),
    Cache(String),
    Logging(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Machine(msg) => write!(f, "Machine: {}", msg),
            ValidationError::Cache(msg) => write!(f, "Cache: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RuntimeConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.machine.validate() {
            errors.push(ValidationError::Machine(e));
        }
        if self.cache.default_gc_priority == GcPriority::MAX {
            errors.push(ValidationError::Cache(
                "default_gc_priority cannot be the never-evict priority".to_string(),
            ));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Render as TOML, e.g. to seed a workspace `config/regionmap.toml`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load every layer for `workspace_root` and validate the result.
    pub fn load(workspace_root: &Path) -> Result<Self, ConfigError> {
        let config = ConfigLoader::load(workspace_root)?;
        config.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ConfigError::Validation(msgs.join("\n"))
        })?;
        Ok(config)
    }
}
