//! The pass-based script compiler.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rustc_hash::FxHashSet;
use subpack_core::{
    Compiler, DiagnosticKind, Diagnostics, EntrySet, GroupingRegistry, ModuleId, PassContext,
    PassGraph, PassHooks, PassOutput, PassStats, Result,
};

use crate::emit::{ChunkPlan, SourceTable};
use crate::imports::scan_imports;
use crate::resolve::Resolver;

/// Files copied next to each entry chunk when they exist beside the entry.
const SIBLING_EXTENSIONS: &[&str] = &["json", "wxml", "wxss"];

/// Compiles CommonJS-style sources into one chunk per entry plus one chunk
/// per non-empty cache group.
///
/// Each pass starts from scratch: the module graph, the cache groups and the
/// placements are recomputed from the entries of that pass.
#[derive(Debug)]
pub struct ScriptCompiler {
    resolver: Resolver,
    placements: BTreeMap<String, String>,
    watched: Vec<PathBuf>,
}

impl ScriptCompiler {
    pub fn new(source_root: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            resolver: Resolver::new(source_root, project_root),
            placements: BTreeMap::new(),
            watched: Vec::new(),
        }
    }

    pub fn source_root(&self) -> &Path {
        self.resolver.source_root()
    }

    /// Group name of every module claimed by a cache group in the last pass.
    pub fn placements(&self) -> &BTreeMap<String, String> {
        &self.placements
    }

    /// Files read by the last pass.
    pub fn watched_files(&self) -> &[PathBuf] {
        &self.watched
    }

    /// Ids are relative to the source root; packages outside it are keyed
    /// relative to the project root (`node_modules/...`).
    fn module_id(&self, path: &Path) -> Result<ModuleId> {
        ModuleId::new(self.resolver.source_root(), path)
            .or_else(|_| ModuleId::new(self.resolver.project_root(), path))
    }

    fn load_graph(&self, entries: &EntrySet, diagnostics: &mut Diagnostics) -> (PassGraph, SourceTable) {
        let mut builder = PassGraph::builder();
        let mut sources = SourceTable::default();
        let mut queued: FxHashSet<ModuleId> = FxHashSet::default();
        let mut queue: VecDeque<(ModuleId, PathBuf)> = VecDeque::new();

        for entry in entries.iter() {
            builder.add_module(entry.module().clone(), entry.source_path());
            builder.add_entry(entry.output_name(), entry.module());
            if queued.insert(entry.module().clone()) {
                queue.push_back((entry.module().clone(), entry.source_path().to_path_buf()));
            }
        }

        while let Some((module, path)) = queue.pop_front() {
            let source = match fs::read_to_string(&path) {
                Ok(source) => source,
                Err(err) => {
                    diagnostics.error(
                        DiagnosticKind::Compiler,
                        Some(module.to_string()),
                        format!("Module build failed: cannot read {}\n{err}", path.display()),
                    );
                    sources.insert(module, String::new());
                    continue;
                }
            };

            if module.is_script() {
                for import in scan_imports(&source) {
                    let Some(resolved) = self.resolver.resolve(&path, &import.specifier) else {
                        diagnostics.warning(
                            DiagnosticKind::Resolve,
                            Some(module.to_string()),
                            format!(
                                "Module not found: Can't resolve '{}' in '{}' ({}:{})",
                                import.specifier,
                                module.dir(),
                                import.line,
                                import.column
                            ),
                        );
                        continue;
                    };

                    let dependency = match self.module_id(&resolved) {
                        Ok(id) => id,
                        Err(err) => {
                            diagnostics.warning(
                                DiagnosticKind::Resolve,
                                Some(module.to_string()),
                                format!("{err} ({}:{})", import.line, import.column),
                            );
                            continue;
                        }
                    };

                    if !builder.contains(&dependency) {
                        builder.add_module(dependency.clone(), &resolved);
                    }
                    builder.add_dependency(&module, &dependency);
                    sources.link(&module, &import.specifier, &dependency);
                    if queued.insert(dependency.clone()) {
                        queue.push_back((dependency, resolved));
                    }
                }
            }

            sources.insert(module, source);
        }

        (builder.build(), sources)
    }

    /// `.json`/`.wxml`/`.wxss` files next to each entry, keyed by the entry's
    /// output name.
    fn copy_siblings(&mut self, entries: &EntrySet, output: &mut PassOutput) {
        for entry in entries.iter() {
            for ext in SIBLING_EXTENSIONS {
                let sibling = entry.source_path().with_extension(ext);
                match fs::read(&sibling) {
                    Ok(bytes) => {
                        output
                            .assets
                            .insert(format!("{}.{ext}", entry.output_name()), bytes);
                        self.watched.push(sibling);
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => output.diagnostics.error(
                        DiagnosticKind::Compiler,
                        Some(entry.module().to_string()),
                        format!("Module build failed: cannot read {}\n{err}", sibling.display()),
                    ),
                }
            }
        }
    }
}

impl Compiler for ScriptCompiler {
    fn name(&self) -> &str {
        "script"
    }

    fn run_pass(&mut self, pass: PassContext<'_>, hooks: &mut dyn PassHooks) -> Result<PassOutput> {
        let start = Instant::now();
        hooks.on_pass_start(pass.pass);

        let mut diagnostics = Diagnostics::new();
        let (graph, sources) = self.load_graph(pass.entries, &mut diagnostics);
        hooks.on_module_graph_ready(&graph, &mut diagnostics);

        let mut registry = GroupingRegistry::with_defaults();
        hooks.on_grouping_decision(&mut registry);

        let plan = ChunkPlan::new(&graph, &registry);
        self.placements = plan
            .placements()
            .iter()
            .map(|(module, group)| (module.to_string(), group.clone()))
            .collect();
        self.watched = graph.modules().map(|m| m.path.clone()).collect();

        let mut output = PassOutput {
            assets: plan.render(&graph, &sources),
            stats: PassStats::default(),
            diagnostics,
        };
        self.copy_siblings(pass.entries, &mut output);

        output.stats = PassStats {
            modules: graph.module_count(),
            chunks: graph.chunks().len() + plan.group_count(),
            watched_files: self.watched.len(),
            duration: start.elapsed(),
            hash: output.assets.content_hash(),
        };

        tracing::debug!(
            pass = pass.pass,
            modules = output.stats.modules,
            chunks = output.stats.chunks,
            errors = output.diagnostics.error_count(),
            "script pass complete"
        );
        Ok(output)
    }
}
