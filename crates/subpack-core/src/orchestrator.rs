//! Multi-pass entry discovery.
//!
//! ```text
//! Idle ──run_pass──► PassRunning ──pass done──► Deciding
//!                        ▲                         │
//!                        └── queue non-empty ◄─────┤
//!                                                  └── queue empty ──► Converged
//! ```
//!
//! During a pass the compiler reports its module graph; every entry module is
//! handed to the [`ComponentScanner`] and each component it references that
//! is not yet an entry is queued. When the pass ends the queue is drained into
//! the entry set and another pass runs. A pass that queues nothing means the
//! entry set is a fixed point and the build has converged.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::affinity::PartitionAffinityResolver;
use crate::assets::{AppShell, AssetReconciler, AssetSet};
use crate::compiler::{
    Compiler, ComponentScanner, DiscoveryError, PassContext, PassHooks, PassOutput, PassStats,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::entry::{EntryOrigin, EntryRecord, EntrySet, PendingEntryQueue};
use crate::graph::{ModuleNode, PassGraph};
use crate::grouping::GroupingRegistry;
use crate::partition::PartitionSet;
use crate::report::DepsReport;
use crate::usage::UsageIndex;
use crate::{Error, Result};

/// Upper bound on passes per build cycle unless configured otherwise.
pub const DEFAULT_MAX_PASSES: u32 = 32;

const CANDIDATE_EXTENSIONS: &[&str] = &["js", "ts"];

/// Where the orchestrator is within a build cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    PassRunning,
    Deciding,
    Converged,
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Directory module ids and discovered candidates are resolved against.
    pub source_root: PathBuf,
    pub max_passes: u32,
}

impl OrchestratorOptions {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    pub fn with_max_passes(mut self, max_passes: u32) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }
}

/// Outcome of one pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub pass: u32,
    /// Output names queued during this pass.
    pub discovered: Vec<String>,
    pub stats: PassStats,
    pub errors: usize,
    pub warnings: usize,
}

/// Drives a compiler pass by pass.
///
/// Watch loops, one-shot builds and tests all go through this interface.
pub trait PassScheduler {
    /// Run one pass over the current entry set.
    fn run_pass(&mut self) -> Result<PassReport>;

    /// Whether the last pass discovered entries that still need a pass.
    fn needs_another_pass(&self) -> bool;
}

/// Result of a converged build cycle.
#[derive(Debug, Clone)]
pub struct ConvergedBuild {
    pub passes: u32,
    /// Assets of the final pass.
    pub assets: AssetSet,
    /// Usage index of the final pass.
    pub usage: Arc<UsageIndex>,
    pub entries: EntrySet,
    /// Compiler diagnostics of the final pass plus every discovery error of
    /// the cycle.
    pub diagnostics: Diagnostics,
    /// Final pass counters; `duration` covers all passes.
    pub stats: PassStats,
}

impl ConvergedBuild {
    /// Reconcile the final assets and, when `report_root` is given, write the
    /// dependency report there. The report is only written once
    /// reconciliation succeeded.
    pub fn finish(
        &self,
        reconciler: &AssetReconciler,
        shell: &AppShell,
        report_root: Option<&Path>,
    ) -> Result<AssetSet> {
        let output = reconciler.reconcile(self.assets.clone(), shell)?;
        if let Some(root) = report_root {
            DepsReport::from_usage(&self.usage).write(root)?;
        }
        Ok(output)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.error_count() > 0
    }
}

/// Owns the entry set, the discovery queue and the usage index of one build
/// session.
pub struct EntryDiscoveryOrchestrator<C, S> {
    compiler: C,
    scanner: S,
    partitions: PartitionSet,
    entries: EntrySet,
    pending: PendingEntryQueue,
    usage: Arc<UsageIndex>,
    options: OrchestratorOptions,
    state: OrchestratorState,
    passes: u32,
    elapsed: Duration,
    discovery: Diagnostics,
    last_output: Option<PassOutput>,
}

impl<C, S> std::fmt::Debug for EntryDiscoveryOrchestrator<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryDiscoveryOrchestrator")
            .field("state", &self.state)
            .field("passes", &self.passes)
            .field("entries", &self.entries.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl<C, S> EntryDiscoveryOrchestrator<C, S>
where
    C: Compiler,
    S: ComponentScanner,
{
    pub fn new(
        compiler: C,
        scanner: S,
        partitions: PartitionSet,
        manifest_entries: impl IntoIterator<Item = EntryRecord>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            compiler,
            scanner,
            partitions,
            entries: manifest_entries.into_iter().collect(),
            pending: PendingEntryQueue::new(),
            usage: Arc::new(UsageIndex::new()),
            options,
            state: OrchestratorState::Idle,
            passes: 0,
            elapsed: Duration::ZERO,
            discovery: Diagnostics::new(),
            last_output: None,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn entries(&self) -> &EntrySet {
        &self.entries
    }

    pub fn pending(&self) -> &PendingEntryQueue {
        &self.pending
    }

    /// Usage index of the most recent pass.
    pub fn usage(&self) -> &Arc<UsageIndex> {
        &self.usage
    }

    pub fn partitions(&self) -> &PartitionSet {
        &self.partitions
    }

    /// Passes run in the current cycle.
    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn compiler_mut(&mut self) -> &mut C {
        &mut self.compiler
    }

    /// Register additional manifest entries (a page added to the manifest
    /// while watching). Returns how many were new.
    pub fn register_entries(&mut self, records: impl IntoIterator<Item = EntryRecord>) -> usize {
        records
            .into_iter()
            .filter(|record| self.entries.insert(record.clone()))
            .count()
    }

    /// Replace the partition layout for the next cycle.
    pub fn set_partitions(&mut self, partitions: PartitionSet) {
        self.partitions = partitions;
    }

    /// Prepare a new build cycle. Pass-scoped state is reset; registered
    /// entries, including discovered ones, are kept.
    pub fn begin_cycle(&mut self) {
        self.state = OrchestratorState::Idle;
        self.pending.clear();
        self.usage = Arc::new(UsageIndex::new());
        self.passes = 0;
        self.elapsed = Duration::ZERO;
        self.discovery = Diagnostics::new();
        self.last_output = None;
    }

    /// Leave `Deciding`: drain the queue into the entry set and request
    /// another pass, or converge when nothing was discovered.
    ///
    /// # Errors
    ///
    /// [`Error::PassLimitExceeded`] when entries are still pending after
    /// `max_passes` passes; [`Error::InvalidState`] outside `Deciding`.
    pub fn decide(&mut self) -> Result<OrchestratorState> {
        if self.state != OrchestratorState::Deciding {
            return Err(Error::InvalidState(format!(
                "decide() called in state {:?}",
                self.state
            )));
        }

        if self.pending.is_empty() {
            self.state = OrchestratorState::Converged;
            tracing::info!(
                passes = self.passes,
                entries = self.entries.len(),
                discovered = self.entries.discovered_count(),
                "entry discovery converged"
            );
            return Ok(self.state);
        }

        if self.passes >= self.options.max_passes {
            let pending = self.pending.len();
            self.state = OrchestratorState::Idle;
            return Err(Error::PassLimitExceeded {
                passes: self.passes,
                pending,
            });
        }

        for record in self.pending.drain() {
            self.entries.insert(record);
        }
        self.state = OrchestratorState::PassRunning;
        tracing::debug!(entries = self.entries.len(), "additional pass requested");
        Ok(self.state)
    }

    /// Run passes until the entry set stops growing.
    ///
    /// Unless a cycle is already mid-pass, a fresh cycle is started first, so
    /// a converged or failed cycle leaves nothing behind.
    pub fn run_to_convergence(&mut self) -> Result<ConvergedBuild> {
        if matches!(
            self.state,
            OrchestratorState::Idle | OrchestratorState::Converged
        ) {
            self.begin_cycle();
        }

        loop {
            self.run_pass()?;
            if self.decide()? == OrchestratorState::Converged {
                break;
            }
        }

        let output = self.last_output.take().unwrap_or_default();
        let mut diagnostics = output.diagnostics;
        diagnostics.extend_unique(self.discovery.clone());

        Ok(ConvergedBuild {
            passes: self.passes,
            assets: output.assets,
            usage: Arc::clone(&self.usage),
            entries: self.entries.clone(),
            diagnostics,
            stats: PassStats {
                duration: self.elapsed,
                ..output.stats
            },
        })
    }
}

impl<C, S> PassScheduler for EntryDiscoveryOrchestrator<C, S>
where
    C: Compiler,
    S: ComponentScanner,
{
    fn run_pass(&mut self) -> Result<PassReport> {
        match self.state {
            OrchestratorState::Idle | OrchestratorState::PassRunning => {}
            state => {
                return Err(Error::InvalidState(format!(
                    "run_pass() called in state {state:?}"
                )));
            }
        }

        self.state = OrchestratorState::PassRunning;
        self.passes += 1;
        let pass = self.passes;
        tracing::debug!(
            pass,
            compiler = self.compiler.name(),
            entries = self.entries.len(),
            "pass started"
        );

        let mut hooks = DiscoveryHooks {
            scanner: &self.scanner,
            partitions: &self.partitions,
            source_root: &self.options.source_root,
            entries: &self.entries,
            pending: &mut self.pending,
            usage: &mut self.usage,
            diagnostics: Diagnostics::new(),
            discovered: Vec::new(),
        };
        let context = PassContext {
            pass,
            entries: &self.entries,
        };

        let result = self.compiler.run_pass(context, &mut hooks);
        let DiscoveryHooks {
            diagnostics: discovery,
            discovered,
            ..
        } = hooks;

        let mut output = match result {
            Ok(output) => output,
            Err(err) => {
                self.state = OrchestratorState::Idle;
                return Err(err);
            }
        };
        output.diagnostics.extend_unique(discovery.clone());
        self.discovery.extend_unique(discovery);
        self.elapsed += output.stats.duration;
        self.state = OrchestratorState::Deciding;

        let report = PassReport {
            pass,
            discovered,
            stats: output.stats.clone(),
            errors: output.diagnostics.error_count(),
            warnings: output.diagnostics.warning_count(),
        };
        tracing::debug!(
            pass,
            modules = report.stats.modules,
            discovered = report.discovered.len(),
            errors = report.errors,
            "pass finished"
        );

        self.last_output = Some(output);
        Ok(report)
    }

    fn needs_another_pass(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Hooks handed to the compiler for one pass. Borrows the orchestrator's
/// pass-scoped state.
struct DiscoveryHooks<'a, S> {
    scanner: &'a S,
    partitions: &'a PartitionSet,
    source_root: &'a Path,
    entries: &'a EntrySet,
    pending: &'a mut PendingEntryQueue,
    usage: &'a mut Arc<UsageIndex>,
    diagnostics: Diagnostics,
    discovered: Vec<String>,
}

impl<S: ComponentScanner> DiscoveryHooks<'_, S> {
    fn discover_from(&mut self, module: &ModuleNode) {
        for candidate in self.scanner.scan(module) {
            let record = candidate
                .and_then(|candidate| resolve_candidate(self.source_root, &candidate))
                .map_err(|err| err.to_string())
                .and_then(|path| {
                    EntryRecord::new(
                        self.source_root,
                        path,
                        EntryOrigin::Discovered {
                            by: module.id.clone(),
                        },
                    )
                    .map_err(|err| err.to_string())
                });

            match record {
                Ok(record) => {
                    let output_name = record.output_name().to_string();
                    if self.pending.enqueue(record, self.entries) {
                        tracing::debug!(entry = %output_name, by = %module.id, "discovered entry");
                        self.discovered.push(output_name);
                    }
                }
                Err(message) => self.report(module, &message),
            }
        }
    }

    fn report(&mut self, module: &ModuleNode, message: &str) {
        tracing::warn!(module = %module.id, "{message}");
        self.diagnostics.push_unique(Diagnostic::error(
            DiagnosticKind::Discovery,
            Some(module.id.to_string()),
            message,
        ));
    }
}

impl<S: ComponentScanner> PassHooks for DiscoveryHooks<'_, S> {
    fn on_pass_start(&mut self, pass: u32) {
        tracing::trace!(pass, "compiler pass start");
    }

    fn on_module_graph_ready(&mut self, graph: &PassGraph, diagnostics: &mut Diagnostics) {
        *self.usage = UsageIndex::rebuild(graph).snapshot();

        for module in graph.modules().filter(|m| m.is_entry) {
            self.discover_from(module);
        }
        for diagnostic in self.diagnostics.iter() {
            diagnostics.push_unique(diagnostic.clone());
        }
    }

    fn on_grouping_decision(&mut self, registry: &mut GroupingRegistry) {
        PartitionAffinityResolver::new(self.partitions).register(registry, self.usage);
    }
}

/// Locate a candidate on disk: as given, then with each script extension.
fn resolve_candidate(
    source_root: &Path,
    candidate: &Path,
) -> std::result::Result<PathBuf, DiscoveryError> {
    let base = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        source_root.join(candidate)
    };

    let with_extensions = CANDIDATE_EXTENSIONS.iter().map(|ext| {
        let mut path = OsString::from(base.as_os_str());
        path.push(".");
        path.push(ext);
        PathBuf::from(path)
    });

    for path in std::iter::once(base.clone()).chain(with_extensions) {
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => return Ok(path),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(DiscoveryError::Read { path, source }),
        }
    }

    Err(DiscoveryError::Unresolved {
        candidate: candidate.display().to_string(),
    })
}
