//! Integration tests for the regionmap instance cache and region tree navigator

mod cache_eviction;
mod config_loading;
mod forest_navigation;
mod logging_default;
mod mapping_context;
