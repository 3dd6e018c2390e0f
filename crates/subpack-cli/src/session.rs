//! One build session: the config, the orchestrator and the output step.
//!
//! A session outlives build cycles. In watch mode the same orchestrator runs
//! every cycle, so components discovered earlier stay registered; the app
//! manifest is re-read each cycle so added pages and sub-packages are picked
//! up.

use std::path::{Path, PathBuf};

use subpack_compiler::{ScriptCompiler, UsingComponentsScanner};
use subpack_config::{AppManifest, SubpackConfig};
use subpack_core::{
    AssetReconciler, ConvergedBuild, DistPathMapper, EntryDiscoveryOrchestrator, OrchestratorOptions,
};

use crate::error::Result;
use crate::ui::{CycleStatus, SummaryRow};

type Orchestrator = EntryDiscoveryOrchestrator<ScriptCompiler, UsingComponentsScanner>;

/// Result of a completed cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub build: ConvergedBuild,
    /// Files written to the output directory
    pub written: Vec<PathBuf>,
    /// Path of `analyze.json` when it was written
    pub report: Option<PathBuf>,
    /// Local time the cycle finished
    pub finished_at: chrono::DateTime<chrono::Local>,
}

impl CycleReport {
    pub fn summary(&self) -> SummaryRow {
        let build = &self.build;
        let errors = build.diagnostics.error_count();
        let warnings = build.diagnostics.warning_count();
        let components = build.entries.discovered_count();

        SummaryRow {
            time: self.finished_at.format("%H:%M:%S").to_string(),
            status: CycleStatus::from_counts(errors, warnings),
            watched_files: build.stats.watched_files,
            pages: build.entries.len() - components,
            components,
            duration: build.stats.duration,
            hash: build.stats.hash.clone(),
            warnings,
            errors,
        }
    }
}

#[derive(Debug)]
pub struct BuildSession {
    project_root: PathBuf,
    config: SubpackConfig,
    orchestrator: Orchestrator,
    reconciler: AssetReconciler,
}

impl BuildSession {
    pub fn new(project_root: impl Into<PathBuf>, config: SubpackConfig) -> Result<Self> {
        let project_root = project_root.into();
        let source_root = config.source_root(&project_root);

        let manifest = AppManifest::load(config.manifest_path(&project_root))?;
        let partitions = manifest.list_partitions()?;
        let entries = manifest.manifest_entries(&source_root, &config.main_entry)?;
        tracing::debug!(
            entries = entries.len(),
            partitions = partitions.len(),
            "loaded app manifest"
        );

        let orchestrator = EntryDiscoveryOrchestrator::new(
            ScriptCompiler::new(&source_root, &project_root),
            UsingComponentsScanner::new(&source_root),
            partitions,
            entries,
            OrchestratorOptions::new(&source_root).with_max_passes(config.max_passes),
        );
        let reconciler = AssetReconciler::new(
            DistPathMapper::new([config.source_dir.to_string_lossy()]),
            config.ignore_entries.clone(),
            config.main_entry.clone(),
        );

        Ok(Self {
            project_root,
            config,
            orchestrator,
            reconciler,
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config(&self) -> &SubpackConfig {
        &self.config
    }

    pub fn source_root(&self) -> PathBuf {
        self.config.source_root(&self.project_root)
    }

    pub fn out_root(&self) -> PathBuf {
        self.config.out_root(&self.project_root)
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run passes to convergence, reconcile, and write the output.
    ///
    /// # Errors
    ///
    /// Manifest errors, core invariant violations (missing `app.json` or
    /// main script, pass limit) and write failures. Compiler diagnostics are
    /// not errors here; they are reported in the returned build.
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        let source_root = self.source_root();
        let manifest = AppManifest::load(self.config.manifest_path(&self.project_root))?;

        self.orchestrator.begin_cycle();
        self.orchestrator.set_partitions(manifest.list_partitions()?);
        let added = self
            .orchestrator
            .register_entries(manifest.manifest_entries(&source_root, &self.config.main_entry)?);
        if added > 0 {
            tracing::info!(added, "registered new manifest entries");
        }

        let build = self.orchestrator.run_to_convergence()?;

        let ext_file = self.config.ext_path(&self.project_root);
        let shell = manifest.app_shell(&source_root, ext_file.as_deref())?;
        let report_root = self.config.analyze.then_some(self.project_root.as_path());
        let output = build.finish(&self.reconciler, &shell, report_root)?;

        let written = output.write_to(self.out_root())?;
        let report = report_root.map(|root| root.join(subpack_core::DEPS_REPORT_FILE));

        Ok(CycleReport {
            build,
            written,
            report,
            finished_at: chrono::Local::now(),
        })
    }
}
