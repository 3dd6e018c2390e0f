//! # subpack-core
//!
//! Orchestration and partitioning layer for multi-partition application
//! packages (one main partition plus independently loadable sub-packages).
//!
//! The crate sits on top of a pass-based compiler it treats as a black box
//! (see [`compiler::Compiler`]) and owns the two tightly coupled problems of
//! such a build:
//!
//! - **Entry discovery**: entries that only become known while compiling
//!   (custom components referenced by pages) are queued during a pass and the
//!   compiler is driven through further passes until the entry set reaches a
//!   fixed point ([`orchestrator::EntryDiscoveryOrchestrator`]).
//! - **Commons partitioning**: from the modules each output chunk reaches
//!   ([`usage::UsageIndex`]) it decides which shared modules may be hoisted
//!   into a sub-package's local commons bucket and which must stay in the
//!   global shared bucket ([`affinity::PartitionAffinityResolver`]).
//!
//! ## Architecture
//!
//! ```text
//! compiler pass ──► PassGraph ──► UsageIndex (rebuilt) ──► cache groups
//!       ▲                │                                     │
//!       │                └──► ComponentScanner ──► PendingEntryQueue
//!       │                                                      │
//!       └────────── another pass while the queue is non-empty ◄┘
//!
//! converged assets ──► AssetReconciler ──► dist/ (+ optional DepsReport)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use subpack_core::{
//!     Compiler, EntryDiscoveryOrchestrator, EntryRecord, NoComponents, OrchestratorOptions,
//!     PartitionSet,
//! };
//!
//! fn build(compiler: impl Compiler) -> subpack_core::Result<()> {
//!     let partitions = PartitionSet::new(["pkgA", "pkgB"])?;
//!     let entries = vec![EntryRecord::manifest("src", "app.js")?];
//!
//!     let mut orchestrator = EntryDiscoveryOrchestrator::new(
//!         compiler,
//!         NoComponents,
//!         partitions,
//!         entries,
//!         OrchestratorOptions::new("src"),
//!     );
//!     let build = orchestrator.run_to_convergence()?;
//!     println!("converged after {} passes", build.passes);
//!     Ok(())
//! }
//! ```

pub mod affinity;
pub mod assets;
pub mod compiler;
pub mod diagnostics;
pub mod entry;
pub mod graph;
pub mod grouping;
pub mod module;
pub mod orchestrator;
pub mod partition;
pub mod report;
pub mod usage;

pub use affinity::{AffinityPredicate, COMMONS_PRIORITY, PartitionAffinityResolver};
pub use assets::{
    APP_JS, APP_JSON, APP_WXSS, AppShell, Asset, AssetReconciler, AssetSet, DistPathMapper, EXT_JSON,
    OutputPathMapper,
};
pub use compiler::{
    Compiler, ComponentRef, ComponentScanner, DiscoveryError, NoComponents, PassContext, PassHooks, PassOutput,
    PassStats,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use entry::{EntryOrigin, EntryRecord, EntrySet, PendingEntryQueue};
pub use graph::{EntryChunk, ModuleNode, PassGraph, PassGraphBuilder};
pub use grouping::{CacheGroup, DEFAULT_GROUP, DEFAULT_PRIORITY, GroupingRegistry, ModulePredicate};
pub use module::ModuleId;
pub use orchestrator::{
    ConvergedBuild, DEFAULT_MAX_PASSES, EntryDiscoveryOrchestrator, OrchestratorOptions,
    OrchestratorState, PassReport, PassScheduler,
};
pub use partition::{MAIN_PARTITION, Partition, PartitionSet};
pub use report::{DEPS_REPORT_FILE, DepsReport};
pub use usage::UsageIndex;

/// Error types for subpack-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A module path could not be expressed relative to the source root.
    #[error("Invalid module path '{path}': {reason}")]
    InvalidModulePath { path: String, reason: String },

    /// A sub-package root is empty or escapes the source root.
    #[error("Invalid partition root: '{0}'")]
    InvalidPartitionRoot(String),

    /// Two sub-package roots share a prefix.
    #[error("Partition roots overlap: '{first}' and '{second}'")]
    OverlappingPartitions { first: String, second: String },

    /// A required top-level asset is missing after convergence.
    #[error("Required asset missing after convergence: {asset} ({detail})")]
    MissingRequiredAsset { asset: String, detail: String },

    /// Entry discovery kept producing entries past the configured pass limit.
    #[error("Entry discovery did not converge after {passes} passes ({pending} entries still pending)")]
    PassLimitExceeded { passes: u32, pending: usize },

    /// The orchestrator was driven out of order.
    #[error("Invalid orchestrator state: {0}")]
    InvalidState(String),

    /// Error reported by the underlying compiler.
    #[error("Compiler error: {0}")]
    Compiler(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with context message.
    #[error("{message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for subpack-core operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Invariant violations abort the build cycle instead of being reported
    /// as diagnostics.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::MissingRequiredAsset { .. } | Error::PassLimitExceeded { .. }
        )
    }

    pub(crate) fn io_at(path: &std::path::Path, source: std::io::Error) -> Self {
        Error::IoError {
            message: format!("I/O error at {}: {}", path.display(), source),
            source,
        }
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::InvalidModulePath { .. } => "INVALID_MODULE_PATH",
            Error::InvalidPartitionRoot(_) => "INVALID_PARTITION_ROOT",
            Error::OverlappingPartitions { .. } => "OVERLAPPING_PARTITIONS",
            Error::MissingRequiredAsset { .. } => "MISSING_REQUIRED_ASSET",
            Error::PassLimitExceeded { .. } => "PASS_LIMIT_EXCEEDED",
            Error::InvalidState(_) => "INVALID_STATE",
            Error::Compiler(_) => "COMPILER_ERROR",
            Error::Io(_) | Error::IoError { .. } => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::OverlappingPartitions { first, second } => Some(Box::new(format!(
                "Sub-package roots must be disjoint. '{}' and '{}' nest inside each other; move one of them.",
                first, second
            ))),
            Error::InvalidPartitionRoot(root) => Some(Box::new(format!(
                "Sub-package root '{}' must be a non-empty directory inside the source root.",
                root
            ))),
            Error::MissingRequiredAsset { asset, .. } => Some(Box::new(format!(
                "'{}' must exist once the build converges. Check that the app manifest and main entry match what the compiler emitted.",
                asset
            ))),
            Error::PassLimitExceeded { .. } => Some(Box::new(
                "A component scanner keeps reporting new entries. Check for generated component paths or raise max_passes.",
            )),
            _ => None,
        }
    }
}
