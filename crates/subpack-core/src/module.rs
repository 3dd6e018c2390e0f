//! Source module identity.

use std::fmt;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const SCRIPT_EXTENSIONS: &[&str] = &["js", "ts", "mjs", "cjs"];

/// Normalized, `/`-separated path of a module relative to the source root.
///
/// Two spellings of the same file (`./a/../b.js`, `b.js`) produce the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    /// Create an id for `path`, which is either absolute or relative to `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidModulePath`] if the path leaves the source root.
    pub fn new(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().clean();
        let path = path.as_ref();
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
        .clean();

        let relative = joined
            .strip_prefix(&root)
            .map_err(|_| Error::InvalidModulePath {
                path: path.display().to_string(),
                reason: format!("outside source root {}", root.display()),
            })?;

        Self::from_relative(relative.to_string_lossy())
    }

    /// Create an id from a path already relative to the source root.
    pub fn from_relative(path: impl AsRef<str>) -> Result<Self> {
        let raw = path.as_ref();
        let unified = raw.replace('\\', "/");
        let cleaned = PathBuf::from(unified.trim_start_matches('/')).clean();
        let normalized = cleaned.to_string_lossy().replace('\\', "/");

        if normalized.is_empty() || normalized == "." {
            return Err(Error::InvalidModulePath {
                path: raw.to_string(),
                reason: "empty path".to_string(),
            });
        }
        if normalized == ".." || normalized.starts_with("../") {
            return Err(Error::InvalidModulePath {
                path: raw.to_string(),
                reason: "escapes the source root".to_string(),
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn extension(&self) -> Option<&str> {
        let file = self.0.rsplit('/').next().unwrap_or(&self.0);
        file.rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }

    /// Only script modules may be hoisted into a commons bucket.
    pub fn is_script(&self) -> bool {
        self.extension()
            .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
    }

    /// The id with its extension removed (`pages/a/a.js` -> `pages/a/a`).
    pub fn without_extension(&self) -> &str {
        match self.extension() {
            Some(ext) => &self.0[..self.0.len() - ext.len() - 1],
            None => &self.0,
        }
    }

    /// Directory part of the id, empty for modules at the source root.
    pub fn dir(&self) -> &str {
        self.0.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Absolute location of the module under `root`.
    pub fn to_path(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(&self.0)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
