//! Layered configuration loading through XDG paths and environment overrides

use super::test_utils::with_isolated_env;
use regionmap::config::{global_config_path, workspace_config_path, ConfigLoader, RuntimeConfig};
use regionmap::error::ConfigError;
use regionmap::machine::MemoryKind;
use regionmap::types::MemoryID;
use regionmap::MapperRuntime;
use std::fs;
use std::path::Path;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_global_file_found_under_xdg_config_home() {
    with_isolated_env(|temp| {
        let path = global_config_path().unwrap();
        assert!(path.starts_with(temp.path().join("xdg")));
        assert!(path.ends_with("regionmap/config.toml"));

        write(&path, "[cache]\ndefault_gc_priority = 12\n");
        let workspace = temp.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.cache.default_gc_priority, 12);
    });
}

#[test]
fn test_environment_overrides_files() {
    with_isolated_env(|temp| {
        let workspace = temp.path().join("workspace");
        write(
            &workspace_config_path(&workspace),
            "[cache]\neviction = true\ndefault_gc_priority = 2\n",
        );
        std::env::set_var("REGIONMAP__CACHE__EVICTION", "false");
        std::env::set_var("REGIONMAP__CACHE__DEFAULT_GC_PRIORITY", "-3");

        let config = ConfigLoader::load(&workspace).unwrap();
        assert!(!config.cache.eviction);
        assert_eq!(config.cache.default_gc_priority, -3);
    });
}

#[test]
fn test_environment_specific_workspace_file() {
    with_isolated_env(|temp| {
        let workspace = temp.path().join("workspace");
        write(
            &workspace_config_path(&workspace),
            "[logging]\nlevel = \"warn\"\n",
        );
        write(
            &workspace.join("config").join("regionmap.ci.toml"),
            "[logging]\nlevel = \"debug\"\n",
        );
        std::env::set_var("REGIONMAP_ENV", "ci");

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.logging.level, "debug");
    });
}

#[test]
fn test_invalid_configuration_rejected_on_load() {
    with_isolated_env(|temp| {
        let workspace = temp.path().join("workspace");
        write(
            &workspace_config_path(&workspace),
            "[[machine.memories]]\nid = 1\nkind = \"system\"\ncapacity = 0\n",
        );
        let err = RuntimeConfig::load(&workspace).unwrap_err();
        match err {
            ConfigError::Validation(msg) => assert!(msg.contains("zero capacity")),
            other => panic!("unexpected error: {}", other),
        }
    });
}

#[test]
fn test_runtime_built_from_loaded_config() {
    with_isolated_env(|temp| {
        let workspace = temp.path().join("workspace");
        write(
            &workspace_config_path(&workspace),
            r#"
[[machine.memories]]
id = 1
kind = "system"
capacity = 4096

[[machine.memories]]
id = 2
kind = "framebuffer"
capacity = 1024

[cache]
eviction = false
default_gc_priority = 4
"#,
        );
        let config = RuntimeConfig::load(&workspace).unwrap();
        let runtime = MapperRuntime::from_config(&config).unwrap();
        assert!(!runtime.config().eviction);
        let ctx = runtime.begin_mapping(regionmap::types::TaskID(1), "configured");
        assert_eq!(ctx.memories().unwrap().len(), 2);
        assert_eq!(ctx.memory_kind(MemoryID(2)).unwrap(), MemoryKind::Framebuffer);
        assert_eq!(ctx.default_gc_priority(), 4);
    });
}
