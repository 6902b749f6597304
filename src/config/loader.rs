//! Layered configuration loader

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::RuntimeConfig;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Builds a `RuntimeConfig` from defaults, the global file, the workspace file and the
/// environment, each layer overriding the previous one.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    global_file: Option<PathBuf>,
    workspace_root: Option<PathBuf>,
    environment: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        ConfigLoader {
            global_file: global_file::global_config_path(),
            workspace_root: None,
            environment: true,
        }
    }

    /// Load with every layer for `workspace_root`.
    pub fn load(workspace_root: &Path) -> Result<RuntimeConfig, ConfigError> {
        Self::new().workspace(workspace_root).build()
    }

    pub fn workspace(mut self, root: &Path) -> Self {
        self.workspace_root = Some(root.to_path_buf());
        self
    }

    /// Override the global file location; `None` skips the global layer.
    pub fn global_file(mut self, path: Option<PathBuf>) -> Self {
        self.global_file = path;
        self
    }

    pub fn without_environment(mut self) -> Self {
        self.environment = false;
        self
    }

    pub fn build(&self) -> Result<RuntimeConfig, ConfigError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        builder = global_file::add_to_builder(builder, self.global_file.as_deref());
        if let Some(root) = &self.workspace_root {
            builder = workspace_file::add_to_builder(builder, root);
        }
        if self.environment {
            builder = builder.add_source(merge_policy::environment());
        }
        let config: RuntimeConfig = builder.build()?.try_deserialize()?;
        debug!(memories = config.machine.memories.len(), "Configuration loaded");
        Ok(config)
    }
}
