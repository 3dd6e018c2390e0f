//! Shared test utilities for subpack-core tests
//!
//! An in-memory compiler that follows the pass lifecycle and a scanner that
//! reports components from a fixed table, so scenarios can be driven without
//! the reference compiler.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use subpack_core::{
    AssetSet, Compiler, ComponentRef, ComponentScanner, Diagnostics, EntryDiscoveryOrchestrator,
    EntryRecord, GroupingRegistry, ModuleId, ModuleNode, OrchestratorOptions, PartitionSet,
    PassContext, PassGraph, PassHooks, PassOutput, PassStats, Result,
};

/// Placement of a module not claimed by any cache group.
pub const INLINE: &str = "inline";

/// Compiler over a fixed import table.
#[derive(Debug, Default)]
pub struct MemoryCompiler {
    imports: BTreeMap<String, Vec<String>>,
    /// Module -> group name (or [`INLINE`]) decided by the last pass.
    pub placements: BTreeMap<String, String>,
    /// Entry count of every pass run so far.
    pub entry_counts: Vec<usize>,
}

impl MemoryCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn import(mut self, from: &str, to: &str) -> Self {
        self.imports
            .entry(from.to_string())
            .or_default()
            .push(to.to_string());
        self
    }

    pub fn placement(&self, module: &str) -> Option<&str> {
        self.placements.get(module).map(String::as_str)
    }
}

impl Compiler for MemoryCompiler {
    fn name(&self) -> &str {
        "memory"
    }

    fn run_pass(&mut self, pass: PassContext<'_>, hooks: &mut dyn PassHooks) -> Result<PassOutput> {
        hooks.on_pass_start(pass.pass);
        self.entry_counts.push(pass.entries.len());

        let mut builder = PassGraph::builder();
        let mut stack = Vec::new();
        for entry in pass.entries.iter() {
            builder.add_entry(entry.output_name(), entry.module());
            stack.push(entry.module().clone());
        }
        let mut visited = Vec::new();
        while let Some(current) = stack.pop() {
            if visited.contains(&current) {
                continue;
            }
            for dep in self.imports.get(current.as_str()).into_iter().flatten() {
                let dep = ModuleId::from_relative(dep)?;
                builder.add_dependency(&current, &dep);
                stack.push(dep);
            }
            visited.push(current);
        }
        let graph = builder.build();

        let mut diagnostics = Diagnostics::new();
        hooks.on_module_graph_ready(&graph, &mut diagnostics);
        let mut registry = GroupingRegistry::with_defaults();
        hooks.on_grouping_decision(&mut registry);

        let mut used_by: BTreeMap<ModuleId, usize> = BTreeMap::new();
        for chunk in graph.chunks() {
            for module in chunk.modules.iter().filter(|m| !graph.is_entry(m)) {
                *used_by.entry(module.clone()).or_default() += 1;
            }
        }

        self.placements.clear();
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (module, count) in used_by {
            let placement = match registry.claim(&module, count) {
                Some(group) => {
                    groups
                        .entry(group.file_name())
                        .or_default()
                        .push(module.to_string());
                    group.name().to_string()
                }
                None => INLINE.to_string(),
            };
            self.placements.insert(module.to_string(), placement);
        }

        let mut assets = AssetSet::new();
        for chunk in graph.chunks() {
            assets.insert(chunk.file_name(), format!("/* {} */", chunk.entry));
        }
        for (file, modules) in groups {
            assets.insert(file, modules.join("\n"));
        }

        Ok(PassOutput {
            stats: PassStats {
                modules: graph.module_count(),
                chunks: graph.chunks().len(),
                watched_files: graph.module_count(),
                duration: Duration::from_millis(1),
                hash: assets.content_hash(),
            },
            assets,
            diagnostics,
        })
    }
}

/// Scanner answering from a module -> components table.
#[derive(Debug, Default)]
pub struct StaticComponents(BTreeMap<String, Vec<PathBuf>>);

impl StaticComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uses(mut self, module: &str, component: &str) -> Self {
        self.0
            .entry(module.to_string())
            .or_default()
            .push(PathBuf::from(component));
        self
    }
}

impl ComponentScanner for StaticComponents {
    fn scan(&self, module: &ModuleNode) -> Vec<ComponentRef> {
        self.0
            .get(module.id.as_str())
            .map(|paths| paths.iter().cloned().map(Ok).collect())
            .unwrap_or_default()
    }
}

/// Create empty source files under `root`.
pub fn touch_all(root: &Path, files: &[&str]) {
    for file in files {
        let path = root.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }
}

pub fn entries(root: &Path, files: &[&str]) -> Vec<EntryRecord> {
    files
        .iter()
        .map(|f| EntryRecord::manifest(root, *f).unwrap())
        .collect()
}

pub fn orchestrator(
    root: &Path,
    compiler: MemoryCompiler,
    scanner: StaticComponents,
    sub_packages: &[&str],
    manifest: &[&str],
) -> EntryDiscoveryOrchestrator<MemoryCompiler, StaticComponents> {
    touch_all(root, manifest);
    EntryDiscoveryOrchestrator::new(
        compiler,
        scanner,
        PartitionSet::new(sub_packages).unwrap(),
        entries(root, manifest),
        OrchestratorOptions::new(root),
    )
}
