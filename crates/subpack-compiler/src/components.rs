use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde_json::Value;
use subpack_core::{ComponentRef, ComponentScanner, DiscoveryError, ModuleNode};

const PLUGIN_SCHEME: &str = "plugin://";

/// Reads the `usingComponents` map of the `.json` file next to a module.
///
/// `/path` values resolve against the source root, everything else against
/// the module's directory. Plugin components are provided by the host and
/// skipped.
#[derive(Debug, Clone)]
pub struct UsingComponentsScanner {
    source_root: PathBuf,
}

impl UsingComponentsScanner {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }

    fn module_path(&self, module: &ModuleNode) -> PathBuf {
        if module.path.is_absolute() {
            module.path.clone()
        } else {
            self.source_root.join(&module.path)
        }
    }
}

impl ComponentScanner for UsingComponentsScanner {
    fn scan(&self, module: &ModuleNode) -> Vec<ComponentRef> {
        let module_path = self.module_path(module);
        let descriptor = module_path.with_extension("json");

        let content = match fs::read_to_string(&descriptor) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(source) => {
                return vec![Err(DiscoveryError::Read {
                    path: descriptor,
                    source,
                })];
            }
        };

        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(err) => {
                return vec![Err(DiscoveryError::Manifest {
                    path: descriptor,
                    message: err.to_string(),
                })];
            }
        };

        let Some(components) = value.get("usingComponents") else {
            return Vec::new();
        };
        let Some(components) = components.as_object() else {
            return vec![Err(DiscoveryError::Manifest {
                path: descriptor,
                message: "'usingComponents' must be an object".to_string(),
            })];
        };

        let module_dir = module_path.parent().unwrap_or(Path::new(""));
        components
            .iter()
            .filter_map(|(name, target)| {
                let Some(target) = target.as_str() else {
                    return Some(Err(DiscoveryError::Manifest {
                        path: descriptor.clone(),
                        message: format!("component '{name}' must map to a path"),
                    }));
                };
                if target.starts_with(PLUGIN_SCHEME) {
                    return None;
                }
                let path = match target.strip_prefix('/') {
                    Some(rooted) => self.source_root.join(rooted),
                    None => module_dir.join(target),
                };
                Some(Ok(path.clean()))
            })
            .collect()
    }
}
