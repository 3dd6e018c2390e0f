//! The `subpack.toml` configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults::*;

/// Build configuration. Relative paths are resolved against the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubpackConfig {
    /// Directory holding the application sources and `app.json`
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Output directory
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// App manifest, relative to `source_dir`
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Main entry script without extension, relative to `source_dir`
    #[serde(default = "default_main_entry")]
    pub main_entry: String,

    /// Write `analyze.json` after each successful build
    #[serde(default)]
    pub analyze: bool,

    /// Extension descriptor copied to `ext.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_file: Option<PathBuf>,

    /// Output files removed from the final asset set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_entries: Vec<String>,

    /// Upper bound on compiler passes per build
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,

    #[serde(default)]
    pub watch: WatchConfig,
}

/// Watch mode settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Quiet period before a rebuild, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Path segments whose changes never trigger a rebuild
    #[serde(default = "default_watch_ignore")]
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            ignore: default_watch_ignore(),
        }
    }
}

impl Default for SubpackConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            out_dir: default_out_dir(),
            manifest: default_manifest(),
            main_entry: default_main_entry(),
            analyze: false,
            ext_file: None,
            ignore_entries: Vec::new(),
            max_passes: default_max_passes(),
            watch: WatchConfig::default(),
        }
    }
}

impl SubpackConfig {
    pub fn source_root(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.source_dir)
    }

    pub fn out_root(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.out_dir)
    }

    pub fn manifest_path(&self, project_root: &Path) -> PathBuf {
        self.source_root(project_root).join(&self.manifest)
    }

    pub fn ext_path(&self, project_root: &Path) -> Option<PathBuf> {
        self.ext_file.as_ref().map(|p| project_root.join(p))
    }

    /// Example `subpack.toml` content.
    pub fn example_toml() -> String {
        let example = Self {
            analyze: true,
            ext_file: Some(PathBuf::from("ext.json")),
            ignore_entries: vec!["pages/debug/debug.js".to_string()],
            ..Self::default()
        };
        toml::to_string_pretty(&example).unwrap_or_default()
    }
}
