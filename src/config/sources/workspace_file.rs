//! Workspace config file source: config/regionmap.toml and config/regionmap.{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use std::path::{Path, PathBuf};

pub fn workspace_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join("config").join("regionmap.toml")
}

/// Add workspace config files to builder.
/// Precedence: config/regionmap.toml (base) then config/regionmap.{REGIONMAP_ENV}.toml.
pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> ConfigBuilder<DefaultState> {
    let base = workspace_config_path(workspace_root);
    if base.exists() {
        builder = builder.add_source(File::from(base).required(false));
    }

    if let Ok(env_name) = std::env::var("REGIONMAP_ENV") {
        let env_path = workspace_root
            .join("config")
            .join(format!("regionmap.{}.toml", env_name));
        if env_path.exists() {
            builder = builder.add_source(File::from(env_path).required(false));
        }
    }

    builder
}
