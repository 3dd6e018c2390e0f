//! Optional dependency report (`analyze.json`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::usage::UsageIndex;
use crate::{Error, Result};

/// File name of the report inside the build root.
pub const DEPS_REPORT_FILE: &str = "analyze.json";

/// Snapshot of a usage index: module path -> chunks using it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DepsReport {
    modules: BTreeMap<String, Vec<String>>,
}

impl DepsReport {
    pub fn from_usage(usage: &UsageIndex) -> Self {
        let modules = usage
            .iter()
            .map(|(module, chunks)| (module.to_string(), chunks.iter().cloned().collect()))
            .collect();
        Self { modules }
    }

    pub fn get(&self, module: &str) -> Option<&[String]> {
        self.modules.get(module).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report to `<build_root>/analyze.json`.
    pub fn write(&self, build_root: impl AsRef<Path>) -> Result<PathBuf> {
        let path = build_root.as_ref().join(DEPS_REPORT_FILE);
        fs::write(&path, self.to_json()?).map_err(|e| Error::io_at(&path, e))?;
        tracing::info!(path = %path.display(), modules = self.len(), "wrote dependency report");
        Ok(path)
    }
}
