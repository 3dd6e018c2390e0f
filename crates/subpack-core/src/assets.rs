//! Output assets and the final reconciliation step.
//!
//! After convergence the compiler's assets are renamed into the target
//! layout and the top-level application files are synthesized:
//!
//! | key        | content                                                   |
//! |------------|-----------------------------------------------------------|
//! | `app.json` | application descriptor, must be non-empty                 |
//! | `app.js`   | copy of the main partition's compiled entry, must exist   |
//! | `app.wxss` | stylesheets of every partition, concatenated in order     |
//! | `ext.json` | extension descriptor, only when an ext file is configured |

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde_json::Value;

use crate::{Error, Result};

pub const APP_JSON: &str = "app.json";
pub const APP_JS: &str = "app.js";
pub const APP_WXSS: &str = "app.wxss";
pub const EXT_JSON: &str = "ext.json";

const EXCLUDED_DIRS: &[&str] = &["node_modules"];

/// Contents of one output file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Asset {
    bytes: Vec<u8>,
}

impl Asset {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The contents as UTF-8, if they are.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<String> for Asset {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Asset {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<Vec<u8>> for Asset {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

/// Output files keyed by their path relative to the output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSet {
    assets: IndexMap<String, Asset>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the asset at `key`, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, asset: impl Into<Asset>) -> Option<Asset> {
        self.assets.insert(key.into(), asset.into())
    }

    pub fn get(&self, key: &str) -> Option<&Asset> {
        self.assets.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.assets.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Asset> {
        self.assets.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Asset)> {
        self.assets.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.assets.values().map(Asset::len).sum()
    }

    /// Short blake3 digest over every key and its bytes, in key order.
    pub fn content_hash(&self) -> String {
        let mut keys: Vec<_> = self.assets.keys().collect();
        keys.sort();

        let mut hasher = blake3::Hasher::new();
        for key in keys {
            hasher.update(key.as_bytes());
            hasher.update(&[0]);
            if let Some(asset) = self.assets.get(key) {
                hasher.update(asset.bytes());
            }
        }
        hasher.finalize().to_hex().as_str()[..16].to_string()
    }

    /// Write every asset below `dir`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an I/O error naming the path that failed.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let mut written = Vec::with_capacity(self.assets.len());

        for (key, asset) in &self.assets {
            let path = dir.join(key);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
            }
            fs::write(&path, asset.bytes()).map_err(|e| Error::io_at(&path, e))?;
            written.push(path);
        }

        tracing::info!(dir = %dir.display(), files = written.len(), "wrote assets");
        Ok(written)
    }
}

impl FromIterator<(String, Asset)> for AssetSet {
    fn from_iter<T: IntoIterator<Item = (String, Asset)>>(iter: T) -> Self {
        Self {
            assets: iter.into_iter().collect(),
        }
    }
}

/// Renames compiler output keys into the target layout.
pub trait OutputPathMapper {
    fn map(&self, key: &str) -> String;
}

impl<F> OutputPathMapper for F
where
    F: Fn(&str) -> String,
{
    fn map(&self, key: &str) -> String {
        self(key)
    }
}

/// Default mapper: unify separators and strip leading source prefixes
/// (`src/pages/a.js` -> `pages/a.js`).
#[derive(Debug, Clone, Default)]
pub struct DistPathMapper {
    strip_prefixes: Vec<String>,
}

impl DistPathMapper {
    pub fn new<I, S>(strip_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let strip_prefixes = strip_prefixes
            .into_iter()
            .map(|p| p.as_ref().replace('\\', "/").trim_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .map(|p| format!("{p}/"))
            .collect();
        Self { strip_prefixes }
    }
}

impl OutputPathMapper for DistPathMapper {
    fn map(&self, key: &str) -> String {
        let unified = key.replace('\\', "/");
        let mut mapped = unified.trim_start_matches("./").trim_start_matches('/');
        if let Some(rest) = self
            .strip_prefixes
            .iter()
            .find_map(|prefix| mapped.strip_prefix(prefix.as_str()))
        {
            mapped = rest;
        }
        mapped.to_string()
    }
}

/// Inputs for the synthesized top-level files, prepared from the app manifest.
#[derive(Debug, Clone, Default)]
pub struct AppShell {
    /// Merged application descriptor written as `app.json`.
    pub descriptor: Value,
    /// `(partition name, stylesheet source)` in partition order.
    pub stylesheets: Vec<(String, String)>,
    /// Contents of the configured extension file.
    pub ext_json: Option<String>,
}

impl AppShell {
    fn descriptor_is_empty(&self) -> bool {
        match &self.descriptor {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    fn merged_stylesheet(&self) -> String {
        let mut merged = String::new();
        for (partition, css) in &self.stylesheets {
            if css.trim().is_empty() {
                continue;
            }
            if !merged.is_empty() {
                merged.push('\n');
            }
            merged.push_str(&format!("/* {partition} */\n"));
            merged.push_str(css.trim_end());
            merged.push('\n');
        }
        merged
    }
}

/// Final rename/merge/prune step over the converged assets.
pub struct AssetReconciler {
    mapper: Box<dyn OutputPathMapper + Send + Sync>,
    ignored: FxHashSet<String>,
    main_entry_output: String,
}

impl std::fmt::Debug for AssetReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetReconciler")
            .field("ignored", &self.ignored)
            .field("main_entry_output", &self.main_entry_output)
            .finish_non_exhaustive()
    }
}

impl AssetReconciler {
    /// `ignored` holds pre-mapping asset keys that must not reach the
    /// output; `main_entry_output` is the main entry's output name (`app`).
    pub fn new<I, S>(
        mapper: impl OutputPathMapper + Send + Sync + 'static,
        ignored: I,
        main_entry_output: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mapper: Box::new(mapper),
            ignored: ignored.into_iter().map(Into::into).collect(),
            main_entry_output: main_entry_output.into(),
        }
    }

    /// Produce the output set from the converged assets.
    ///
    /// # Errors
    ///
    /// [`Error::MissingRequiredAsset`] when the descriptor is empty or the
    /// main entry script was not emitted. Both abort the build cycle.
    pub fn reconcile(&self, assets: AssetSet, shell: &AppShell) -> Result<AssetSet> {
        if shell.descriptor_is_empty() {
            return Err(Error::MissingRequiredAsset {
                asset: APP_JSON.to_string(),
                detail: "application descriptor is empty".to_string(),
            });
        }

        let main_key = format!("{}.js", self.main_entry_output);
        let Some(main_script) = assets.get(&main_key).cloned() else {
            return Err(Error::MissingRequiredAsset {
                asset: APP_JS.to_string(),
                detail: format!("main entry '{main_key}' was not emitted"),
            });
        };

        let mut staged = assets;
        staged.insert(APP_JSON, serde_json::to_string_pretty(&shell.descriptor)?);
        staged.insert(APP_JS, main_script);
        staged.insert(APP_WXSS, shell.merged_stylesheet());
        if let Some(ext) = &shell.ext_json {
            staged.insert(EXT_JSON, ext.as_str());
        }

        let mut output = AssetSet::new();
        let mut dropped = 0usize;
        for (key, asset) in staged.assets {
            if self.is_dropped(&key) {
                dropped += 1;
                continue;
            }
            let mapped = self.mapper.map(&key);
            if output.insert(mapped.clone(), asset).is_some() {
                tracing::warn!(
                    asset = %key,
                    output = %mapped,
                    "asset overwrites an earlier one with the same output path"
                );
            }
        }

        for required in [APP_JSON, APP_JS] {
            if !output.contains(required) {
                return Err(Error::MissingRequiredAsset {
                    asset: required.to_string(),
                    detail: "removed by output path mapping".to_string(),
                });
            }
        }

        tracing::debug!(assets = output.len(), dropped, "reconciled assets");
        Ok(output)
    }

    fn is_dropped(&self, key: &str) -> bool {
        if self.ignored.contains(key) {
            return true;
        }
        key.replace('\\', "/")
            .split('/')
            .any(|segment| EXCLUDED_DIRS.contains(&segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shell() -> AppShell {
        AppShell {
            descriptor: json!({ "pages": ["pages/index/index"] }),
            stylesheets: vec![
                ("main".to_string(), "page { color: red; }".to_string()),
                ("pkgA".to_string(), ".a { margin: 0; }".to_string()),
            ],
            ext_json: None,
        }
    }

    fn compiled() -> AssetSet {
        let mut assets = AssetSet::new();
        assets.insert("app.js", "/* app */");
        assets.insert("pages/index/index.js", "/* index */");
        assets.insert("node_modules/lodash/index.js", "/* vendor */");
        assets.insert("pkgA/commonchunks.js", "/* commons */");
        assets
    }

    #[test]
    fn synthesizes_top_level_files() {
        let reconciler = AssetReconciler::new(DistPathMapper::default(), Vec::<String>::new(), "app");
        let out = reconciler.reconcile(compiled(), &shell()).unwrap();

        assert_eq!(out.get(APP_JS).unwrap().as_str(), Some("/* app */"));
        let descriptor: Value = serde_json::from_slice(out.get(APP_JSON).unwrap().bytes()).unwrap();
        assert_eq!(descriptor["pages"][0], "pages/index/index");

        let css = out.get(APP_WXSS).unwrap().as_str().unwrap();
        assert!(css.find("color: red").unwrap() < css.find("margin: 0").unwrap());
        assert!(!out.contains(EXT_JSON));
        assert!(!out.contains("node_modules/lodash/index.js"));
        assert!(out.contains("pkgA/commonchunks.js"));
    }

    #[test]
    fn main_entry_is_copied_from_its_output_name() {
        let mut assets = AssetSet::new();
        assets.insert("main.js", "/* main */");
        let reconciler = AssetReconciler::new(DistPathMapper::default(), ["main.js"], "main");
        let out = reconciler.reconcile(assets, &shell()).unwrap();

        assert_eq!(out.get(APP_JS).unwrap().as_str(), Some("/* main */"));
        assert!(!out.contains("main.js"));
    }

    #[test]
    fn ext_json_only_when_configured() {
        let mut with_ext = shell();
        with_ext.ext_json = Some(r#"{"extEnable":true}"#.to_string());
        let reconciler = AssetReconciler::new(DistPathMapper::default(), Vec::<String>::new(), "app");
        let out = reconciler.reconcile(compiled(), &with_ext).unwrap();
        assert_eq!(out.get(EXT_JSON).unwrap().as_str(), Some(r#"{"extEnable":true}"#));
    }

    #[test]
    fn empty_descriptor_is_fatal() {
        let mut empty = shell();
        empty.descriptor = json!({});
        let reconciler = AssetReconciler::new(DistPathMapper::default(), Vec::<String>::new(), "app");
        let err = reconciler.reconcile(compiled(), &empty).unwrap_err();

        assert!(matches!(err, Error::MissingRequiredAsset { ref asset, .. } if asset == APP_JSON));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn missing_main_entry_is_fatal() {
        let mut assets = compiled();
        assets.remove("app.js");
        let reconciler = AssetReconciler::new(DistPathMapper::default(), Vec::<String>::new(), "app");
        let err = reconciler.reconcile(assets, &shell()).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredAsset { ref asset, .. } if asset == APP_JS));
    }

    #[test]
    fn keys_are_mapped_and_ignored_keys_dropped() {
        let mut assets = compiled();
        assets.insert("src/pages/logs/logs.js", "/* logs */");
        assets.insert("pages/debug/debug.js", "/* debug */");
        let reconciler = AssetReconciler::new(
            DistPathMapper::new(["src"]),
            ["pages/debug/debug.js"],
            "app",
        );
        let out = reconciler.reconcile(assets, &shell()).unwrap();

        assert!(out.contains("pages/logs/logs.js"));
        assert!(!out.contains("src/pages/logs/logs.js"));
        assert!(!out.contains("pages/debug/debug.js"));
    }

    #[test]
    fn colliding_output_paths_keep_the_later_asset() {
        let mut assets = compiled();
        assets.insert("pages/a.js", "/* plain */");
        assets.insert("src/pages/a.js", "/* from src */");
        let reconciler =
            AssetReconciler::new(DistPathMapper::new(["src"]), Vec::<String>::new(), "app");
        let out = reconciler.reconcile(assets, &shell()).unwrap();

        assert_eq!(out.get("pages/a.js").unwrap().as_str(), Some("/* from src */"));
        assert!(!out.contains("src/pages/a.js"));
    }

    #[test]
    fn closures_are_mappers() {
        let mapper = |key: &str| format!("dist/{key}");
        assert_eq!(mapper.map("a.js"), "dist/a.js");

        let reconciler = AssetReconciler::new(mapper, Vec::<String>::new(), "app");
        let err = reconciler.reconcile(compiled(), &shell()).unwrap_err();
        // app.json ended up at dist/app.json
        assert!(matches!(err, Error::MissingRequiredAsset { .. }));
    }

    #[test]
    fn write_to_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut assets = AssetSet::new();
        assets.insert("pkgA/pages/a.js", "/* a */");
        let written = assets.write_to(dir.path()).unwrap();

        assert_eq!(written.len(), 1);
        assert_eq!(fs::read_to_string(dir.path().join("pkgA/pages/a.js")).unwrap(), "/* a */");
    }

    #[test]
    fn content_hash_ignores_insertion_order() {
        let mut a = AssetSet::new();
        a.insert("x.js", "1");
        a.insert("y.js", "2");
        let mut b = AssetSet::new();
        b.insert("y.js", "2");
        b.insert("x.js", "1");

        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash().len(), 16);
        b.insert("x.js", "3");
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
