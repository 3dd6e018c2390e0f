//! The application manifest (`app.json`).
//!
//! Only `pages` and `subPackages` (also spelled `subpackages`) are
//! interpreted; every other key is carried through unchanged into the output
//! descriptor.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use subpack_core::{AppShell, EntryRecord, MAIN_PARTITION, PartitionSet};

use crate::error::{ConfigError, Result};

const ENTRY_EXTENSIONS: &[&str] = &["js", "ts"];
const STYLESHEET: &str = "app.wxss";

/// One `subPackages` item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPackage {
    pub root: String,
    #[serde(default)]
    pub pages: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parsed `app.json`.
#[derive(Debug, Clone)]
pub struct AppManifest {
    path: PathBuf,
    raw: Map<String, Value>,
    pages: Vec<String>,
    sub_packages: Vec<SubPackage>,
}

impl AppManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_value(path, value)
    }

    pub fn from_value(path: impl Into<PathBuf>, value: Value) -> Result<Self> {
        let path = path.into();
        let invalid = |message: String| ConfigError::Manifest {
            path: path.clone(),
            message,
        };

        let Value::Object(raw) = value else {
            return Err(invalid("expected a JSON object".to_string()));
        };

        let pages = match raw.get("pages") {
            None => Vec::new(),
            Some(pages) => serde_json::from_value::<Vec<String>>(pages.clone())
                .map_err(|e| invalid(format!("'pages' must be a list of strings: {e}")))?,
        };

        let sub_packages = match raw.get("subPackages").or_else(|| raw.get("subpackages")) {
            None => Vec::new(),
            Some(list) => serde_json::from_value::<Vec<SubPackage>>(list.clone())
                .map_err(|e| invalid(format!("invalid 'subPackages': {e}")))?,
        };

        Ok(Self {
            path,
            raw,
            pages,
            sub_packages,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn sub_packages(&self) -> &[SubPackage] {
        &self.sub_packages
    }

    /// The manifest as written, used as the output `app.json`.
    pub fn descriptor(&self) -> Value {
        Value::Object(self.raw.clone())
    }

    /// Main partition first, then one partition per sub-package root.
    pub fn list_partitions(&self) -> Result<PartitionSet> {
        Ok(PartitionSet::new(self.sub_packages.iter().map(|p| p.root.as_str()))?)
    }

    /// The main entry followed by every page, main pages first.
    ///
    /// Each entry resolves to the first existing `.js`/`.ts` file and falls
    /// back to `.js` so a missing page surfaces as a compiler error.
    pub fn manifest_entries(&self, source_root: &Path, main_entry: &str) -> Result<Vec<EntryRecord>> {
        let sub_pages = self.sub_packages.iter().flat_map(|package| {
            let root = package.root.trim_matches('/');
            package
                .pages
                .iter()
                .map(move |page| format!("{root}/{}", page.trim_start_matches('/')))
        });
        let main_pages = self
            .pages
            .iter()
            .map(|page| page.trim_start_matches('/').to_string());

        std::iter::once(main_entry.to_string())
            .chain(main_pages)
            .chain(sub_pages)
            .map(|name| -> Result<EntryRecord> {
                let path = resolve_entry(source_root, &name);
                Ok(EntryRecord::manifest(source_root, path)?)
            })
            .collect()
    }

    /// Inputs of the synthesized top-level files: the descriptor, the
    /// `app.wxss` of each partition that has one, and the extension file.
    pub fn app_shell(&self, source_root: &Path, ext_file: Option<&Path>) -> Result<AppShell> {
        let mut stylesheets = Vec::new();
        let roots = std::iter::once((MAIN_PARTITION.to_string(), source_root.join(STYLESHEET)))
            .chain(self.sub_packages.iter().map(|package| {
                let root = package.root.trim_matches('/');
                (root.replace('/', ""), source_root.join(root).join(STYLESHEET))
            }));

        for (partition, path) in roots {
            if !path.is_file() {
                continue;
            }
            let css = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            stylesheets.push((partition, css));
        }

        let ext_json = ext_file
            .map(|path| {
                fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            })
            .transpose()?;

        Ok(AppShell {
            descriptor: self.descriptor(),
            stylesheets,
            ext_json,
        })
    }
}

fn resolve_entry(source_root: &Path, name: &str) -> PathBuf {
    ENTRY_EXTENSIONS
        .iter()
        .map(|ext| PathBuf::from(format!("{name}.{ext}")))
        .find(|candidate| source_root.join(candidate).is_file())
        .unwrap_or_else(|| PathBuf::from(format!("{name}.js")))
}
