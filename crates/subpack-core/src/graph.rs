//! Module graph reported by one compiler pass.
//!
//! A [`PassGraph`] is the shape the core needs from the compiler: every
//! module with its resolved dependencies, plus one [`EntryChunk`] per entry
//! listing the modules reachable from it. It is built once per pass and never
//! mutated afterwards.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::module::ModuleId;

/// One module as seen by a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    pub id: ModuleId,
    pub path: PathBuf,
    pub is_entry: bool,
    pub dependencies: Vec<ModuleId>,
}

/// Output chunk rooted at one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryChunk {
    pub output_name: String,
    pub entry: ModuleId,
    /// Modules reachable from `entry`, excluding `entry` itself, in
    /// depth-first discovery order.
    pub modules: Vec<ModuleId>,
}

impl EntryChunk {
    /// Chunk file name as it appears in usage sets and emitted assets.
    pub fn file_name(&self) -> String {
        format!("{}.js", self.output_name)
    }
}

/// Immutable module graph of a single pass.
#[derive(Debug, Clone, Default)]
pub struct PassGraph {
    modules: IndexMap<ModuleId, ModuleNode>,
    chunks: Vec<EntryChunk>,
}

impl PassGraph {
    pub fn builder() -> PassGraphBuilder {
        PassGraphBuilder::default()
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleNode> {
        self.modules.values()
    }

    pub fn module(&self, id: &ModuleId) -> Option<&ModuleNode> {
        self.modules.get(id)
    }

    pub fn chunks(&self) -> &[EntryChunk] {
        &self.chunks
    }

    pub fn is_entry(&self, id: &ModuleId) -> bool {
        self.modules.get(id).is_some_and(|m| m.is_entry)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

/// Incremental construction of a [`PassGraph`].
#[derive(Debug, Default)]
pub struct PassGraphBuilder {
    modules: IndexMap<ModuleId, ModuleNode>,
    entries: Vec<(String, ModuleId)>,
}

impl PassGraphBuilder {
    /// Add a module (idempotent) and return it for further edits.
    pub fn add_module(&mut self, id: ModuleId, path: impl AsRef<Path>) -> &mut ModuleNode {
        self.modules
            .entry(id.clone())
            .or_insert_with(|| ModuleNode {
                id,
                path: path.as_ref().to_path_buf(),
                is_entry: false,
                dependencies: Vec::new(),
            })
    }

    /// Record that `from` imports `to`. Both modules are created if absent.
    pub fn add_dependency(&mut self, from: &ModuleId, to: &ModuleId) {
        if !self.modules.contains_key(to) {
            self.add_module(to.clone(), to.as_str());
        }
        let node = self.add_module(from.clone(), from.as_str());
        if !node.dependencies.contains(to) {
            node.dependencies.push(to.clone());
        }
    }

    /// Register `module` as the root of the chunk named `output_name`.
    pub fn add_entry(&mut self, output_name: impl Into<String>, module: &ModuleId) {
        self.add_module(module.clone(), module.as_str()).is_entry = true;
        self.entries.push((output_name.into(), module.clone()));
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    pub fn build(self) -> PassGraph {
        let chunks = self
            .entries
            .iter()
            .map(|(output_name, entry)| EntryChunk {
                output_name: output_name.clone(),
                entry: entry.clone(),
                modules: reachable_from(&self.modules, entry),
            })
            .collect();

        PassGraph {
            modules: self.modules,
            chunks,
        }
    }
}

/// Iterative depth-first walk; cycles and self-imports are tolerated.
fn reachable_from(modules: &IndexMap<ModuleId, ModuleNode>, entry: &ModuleId) -> Vec<ModuleId> {
    let mut seen = FxHashSet::default();
    let mut order = Vec::new();
    let mut stack = vec![entry];
    seen.insert(entry);

    while let Some(current) = stack.pop() {
        if current != entry {
            order.push(current.clone());
        }
        let Some(node) = modules.get(current) else {
            continue;
        };
        // reversed so the first dependency is visited first
        for dep in node.dependencies.iter().rev() {
            if seen.insert(dep) {
                stack.push(dep);
            }
        }
    }

    order
}
