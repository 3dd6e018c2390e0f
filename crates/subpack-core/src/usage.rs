//! Module -> chunk usage index.
//!
//! Rebuilt from scratch after every pass: reachability changes whenever an
//! entry is added, so an incrementally patched index could keep chunk names
//! from a stale pass.

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::PassGraph;
use crate::module::ModuleId;

static NO_USAGES: BTreeSet<String> = BTreeSet::new();

/// Which output chunks transitively include each non-entry module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageIndex {
    usages: FxHashMap<ModuleId, BTreeSet<String>>,
    entries: FxHashSet<ModuleId>,
}

impl UsageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk every entry chunk of `graph` and record the chunk file name
    /// against each non-entry module it reaches.
    pub fn rebuild(graph: &PassGraph) -> Self {
        let mut index = Self::new();

        for chunk in graph.chunks() {
            index.entries.insert(chunk.entry.clone());
            let chunk_name = chunk.file_name();
            for module in &chunk.modules {
                if graph.is_entry(module) {
                    continue;
                }
                index.record(module, chunk_name.as_str());
            }
        }

        // entry modules never appear in usage sets, even when another
        // chunk imports them
        for module in graph.modules().filter(|m| m.is_entry) {
            index.entries.insert(module.id.clone());
        }

        tracing::debug!(
            modules = index.usages.len(),
            chunks = graph.chunks().len(),
            "rebuilt usage index"
        );
        index
    }

    /// Add `partition` to the usage set of `module`. Idempotent.
    pub fn record(&mut self, module: &ModuleId, partition: impl Into<String>) -> bool {
        self.usages
            .entry(module.clone())
            .or_default()
            .insert(partition.into())
    }

    /// Chunks using `module`; empty when the module was never reached.
    pub fn usages(&self, module: &ModuleId) -> &BTreeSet<String> {
        self.usages.get(module).unwrap_or(&NO_USAGES)
    }

    pub fn mark_entry(&mut self, module: &ModuleId) {
        self.entries.insert(module.clone());
    }

    pub fn is_entry(&self, module: &ModuleId) -> bool {
        self.entries.contains(module)
    }

    /// Usage sets ordered by module id.
    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &BTreeSet<String>)> {
        let mut sorted: Vec<_> = self.usages.iter().collect();
        sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));
        sorted.into_iter()
    }

    pub fn entry_modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.usages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usages.is_empty()
    }

    /// Freeze the index so predicates can share it read-only.
    pub fn snapshot(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(path: &str) -> ModuleId {
        ModuleId::from_relative(path).unwrap()
    }

    #[test]
    fn record_is_idempotent() {
        let mut index = UsageIndex::new();
        assert!(index.record(&id("shared/util.js"), "pkgA/pages/a.js"));
        assert!(!index.record(&id("shared/util.js"), "pkgA/pages/a.js"));
        assert!(index.record(&id("shared/util.js"), "pages/index/index.js"));
        assert_eq!(index.usages(&id("shared/util.js")).len(), 2);
    }

    #[test]
    fn unknown_modules_have_no_usages() {
        let index = UsageIndex::new();
        assert!(index.usages(&id("nowhere.js")).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn rebuild_skips_entry_modules() {
        let mut builder = PassGraph::builder();
        builder.add_dependency(&id("pages/a.js"), &id("comp/c.js"));
        builder.add_dependency(&id("pages/a.js"), &id("shared/util.js"));
        builder.add_dependency(&id("comp/c.js"), &id("shared/util.js"));
        builder.add_entry("pages/a", &id("pages/a.js"));
        builder.add_entry("comp/c", &id("comp/c.js"));
        let index = UsageIndex::rebuild(&builder.build());

        assert!(index.usages(&id("comp/c.js")).is_empty());
        assert!(index.is_entry(&id("comp/c.js")));

        let users: Vec<_> = index.usages(&id("shared/util.js")).iter().cloned().collect();
        assert_eq!(users, vec!["comp/c.js".to_string(), "pages/a.js".to_string()]);
    }

    #[test]
    fn rebuild_starts_from_scratch() {
        let mut first = PassGraph::builder();
        first.add_dependency(&id("pages/a.js"), &id("old.js"));
        first.add_entry("pages/a", &id("pages/a.js"));
        let stale = UsageIndex::rebuild(&first.build());
        assert_eq!(stale.len(), 1);

        let mut second = PassGraph::builder();
        second.add_dependency(&id("pages/a.js"), &id("new.js"));
        second.add_entry("pages/a", &id("pages/a.js"));
        let fresh = UsageIndex::rebuild(&second.build());

        assert!(fresh.usages(&id("old.js")).is_empty());
        assert_eq!(fresh.len(), 1);
    }
}
