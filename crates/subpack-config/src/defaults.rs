use std::path::PathBuf;

use subpack_core::DEFAULT_MAX_PASSES;

pub fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

pub fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

pub fn default_manifest() -> PathBuf {
    PathBuf::from("app.json")
}

pub fn default_main_entry() -> String {
    "app".to_string()
}

pub fn default_max_passes() -> u32 {
    DEFAULT_MAX_PASSES
}

pub fn default_debounce_ms() -> u64 {
    100
}

pub fn default_watch_ignore() -> Vec<String> {
    vec!["node_modules".to_string(), "dist".to_string()]
}
