//! Chunk planning and rendering.
//!
//! Every module reached by at least one entry chunk is either claimed by the
//! highest-priority cache group that matches it, or inlined into each entry
//! chunk that reaches it. Entry modules are never placed; they are the roots
//! of their own chunks.
//!
//! Emitted chunks share a tiny lazy module registry, so a group chunk only
//! defines its modules and an entry chunk pulls in the group chunks it needs
//! before running its entry module.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use subpack_core::{AssetSet, EntryChunk, GroupingRegistry, ModuleId, PassGraph};

const RUNTIME: &str = r#"var __subpack__ = globalThis.__subpack__ || (globalThis.__subpack__ = (function () {
  var defs = {}, cache = {};
  function load(id) {
    if (cache[id]) return cache[id].exports;
    var def = defs[id];
    if (!def) throw new Error("module '" + id + "' is not loaded");
    var module = (cache[id] = { exports: {} });
    def.factory.call(module.exports, module, module.exports, function (request) {
      return Object.prototype.hasOwnProperty.call(def.deps, request) ? load(def.deps[request]) : require(request);
    });
    return module.exports;
  }
  return {
    define: function (id, deps, factory) { if (!defs[id]) defs[id] = { deps: deps, factory: factory }; },
    require: load
  };
})());
"#;

/// Loaded sources of one pass and the resolved import table of each module.
#[derive(Debug, Default)]
pub struct SourceTable {
    sources: FxHashMap<ModuleId, String>,
    imports: FxHashMap<ModuleId, BTreeMap<String, String>>,
}

impl SourceTable {
    pub fn insert(&mut self, module: ModuleId, source: String) {
        self.sources.insert(module, source);
    }

    /// Record that `specifier` written in `from` resolved to `to`.
    pub fn link(&mut self, from: &ModuleId, specifier: &str, to: &ModuleId) {
        self.imports
            .entry(from.clone())
            .or_default()
            .insert(specifier.to_string(), to.to_string());
    }

    pub fn contains(&self, module: &ModuleId) -> bool {
        self.sources.contains_key(module)
    }

    pub fn source(&self, module: &ModuleId) -> &str {
        self.sources.get(module).map_or("", String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn render_module(&self, out: &mut String, module: &ModuleId) {
        let deps = self.imports.get(module).cloned().unwrap_or_default();
        let deps = serde_json::to_string(&deps).unwrap_or_else(|_| "{}".to_string());
        let id = serde_json::Value::from(module.as_str());
        let source = self.source(module);

        let _ = writeln!(
            out,
            "__subpack__.define({id}, {deps}, function (module, exports, require) {{"
        );
        if module.extension() == Some("json") {
            let _ = writeln!(out, "module.exports = {};", source.trim());
        } else {
            out.push_str(source);
            if !source.ends_with('\n') {
                out.push('\n');
            }
        }
        out.push_str("});\n");
    }
}

/// Placement of every shared module for one pass.
#[derive(Debug, Default)]
pub struct ChunkPlan {
    placements: BTreeMap<ModuleId, String>,
    groups: IndexMap<String, Vec<ModuleId>>,
}

impl ChunkPlan {
    pub fn new(graph: &PassGraph, registry: &GroupingRegistry) -> Self {
        let mut used_by: IndexMap<&ModuleId, usize> = IndexMap::new();
        for chunk in graph.chunks() {
            for module in &chunk.modules {
                if !graph.is_entry(module) {
                    *used_by.entry(module).or_default() += 1;
                }
            }
        }

        let mut plan = Self::default();
        for (module, count) in used_by {
            if let Some(group) = registry.claim(module, count) {
                plan.placements
                    .insert(module.clone(), group.name().to_string());
                plan.groups
                    .entry(group.file_name())
                    .or_default()
                    .push(module.clone());
            }
        }

        tracing::debug!(
            placed = plan.placements.len(),
            groups = plan.groups.len(),
            "planned chunks"
        );
        plan
    }

    /// Group name of each claimed module.
    pub fn placements(&self) -> &BTreeMap<ModuleId, String> {
        &self.placements
    }

    pub fn group_of(&self, module: &ModuleId) -> Option<&str> {
        self.placements.get(module).map(String::as_str)
    }

    /// Non-empty group chunks by file name, in first-claim order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[ModuleId])> {
        self.groups.iter().map(|(file, modules)| (file.as_str(), modules.as_slice()))
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Emit one asset per entry chunk and per non-empty group.
    pub fn render(&self, graph: &PassGraph, sources: &SourceTable) -> AssetSet {
        let mut assets = AssetSet::new();

        for chunk in graph.chunks() {
            assets.insert(chunk.file_name(), self.render_entry(graph, chunk, sources));
        }
        for (file, modules) in &self.groups {
            let mut out = String::from(RUNTIME);
            for module in modules {
                sources.render_module(&mut out, module);
            }
            assets.insert(file.clone(), out);
        }

        assets
    }

    fn render_entry(&self, graph: &PassGraph, chunk: &EntryChunk, sources: &SourceTable) -> String {
        let chunk_file = chunk.file_name();
        let mut out = String::from(RUNTIME);

        let mut required: Vec<String> = Vec::new();
        for module in &chunk.modules {
            if let Some(group) = self.placements.get(module) {
                let file = format!("{group}.js");
                if !required.contains(&file) {
                    required.push(file);
                }
            }
        }
        for file in &required {
            let _ = writeln!(out, "require({});", serde_json::Value::from(relative_path(&chunk_file, file)));
        }

        for module in &chunk.modules {
            if graph.is_entry(module) || self.placements.contains_key(module) {
                continue;
            }
            sources.render_module(&mut out, module);
        }
        sources.render_module(&mut out, &chunk.entry);
        let _ = writeln!(out, "__subpack__.require({});", serde_json::Value::from(chunk.entry.as_str()));
        out
    }
}

/// Path of `to` relative to the directory of `from`, both `/`-separated
/// output keys.
pub(crate) fn relative_path(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = from.split('/').collect();
    let from_dir = &from_dir[..from_dir.len().saturating_sub(1)];
    let to_parts: Vec<&str> = to.split('/').collect();
    let (to_dir, file) = to_parts.split_at(to_parts.len().saturating_sub(1));

    let common = from_dir
        .iter()
        .zip(to_dir)
        .take_while(|(a, b)| a == b)
        .count();

    let mut path = if common == from_dir.len() {
        String::from("./")
    } else {
        "../".repeat(from_dir.len() - common)
    };
    for part in &to_dir[common..] {
        path.push_str(part);
        path.push('/');
    }
    path.push_str(file.first().copied().unwrap_or_default());
    path
}
