//! The compiler boundary.
//!
//! The core never looks inside a compiler. A [`Compiler`] runs one pass over
//! the entry set it is handed and calls back into [`PassHooks`] at fixed
//! points of that pass:
//!
//! 1. [`PassHooks::on_pass_start`] before any module is loaded.
//! 2. [`PassHooks::on_module_graph_ready`] once every entry is resolved and
//!    the module graph is complete. The core rebuilds its usage index and
//!    scans modules for custom components here.
//! 3. [`PassHooks::on_grouping_decision`] before chunks are formed. The core
//!    registers the sub-package commons groups built from the index of step 2.
//!
//! The pass result ([`PassOutput`]) doubles as the "pass complete" signal.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::assets::AssetSet;
use crate::diagnostics::Diagnostics;
use crate::entry::EntrySet;
use crate::graph::{ModuleNode, PassGraph};
use crate::grouping::GroupingRegistry;
use crate::Result;

/// Inputs of a single pass.
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    /// 1-based pass number within the current build cycle.
    pub pass: u32,
    pub entries: &'a EntrySet,
}

/// Lifecycle callbacks a compiler invokes during a pass.
pub trait PassHooks {
    fn on_pass_start(&mut self, pass: u32);

    /// The complete module graph of this pass. Recoverable problems found
    /// while inspecting it are appended to `diagnostics`.
    fn on_module_graph_ready(&mut self, graph: &PassGraph, diagnostics: &mut Diagnostics);

    /// Chance to install cache groups before the compiler groups modules.
    fn on_grouping_decision(&mut self, registry: &mut GroupingRegistry);
}

/// Counters reported with each pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub modules: usize,
    pub chunks: usize,
    /// Source files the pass read; the watch set of the next cycle.
    pub watched_files: usize,
    pub duration: Duration,
    /// Short blake3 digest of the emitted assets.
    pub hash: String,
}

/// Everything a pass produced.
#[derive(Debug, Clone, Default)]
pub struct PassOutput {
    pub assets: AssetSet,
    pub stats: PassStats,
    pub diagnostics: Diagnostics,
}

/// A pass-based compiler.
pub trait Compiler {
    fn name(&self) -> &str;

    /// Compile `pass.entries` once, invoking `hooks` along the way.
    ///
    /// # Errors
    ///
    /// Only for failures that make the pass meaningless (the compiler could
    /// not start at all). Per-module errors belong in
    /// [`PassOutput::diagnostics`].
    fn run_pass(&mut self, pass: PassContext<'_>, hooks: &mut dyn PassHooks) -> Result<PassOutput>;
}

impl<C: Compiler + ?Sized> Compiler for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run_pass(&mut self, pass: PassContext<'_>, hooks: &mut dyn PassHooks) -> Result<PassOutput> {
        (**self).run_pass(pass, hooks)
    }
}

/// A discovered entry candidate that could not be used.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid component manifest {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("component '{candidate}' not found")]
    Unresolved { candidate: String },
}

/// One component reference: its candidate entry source, or why it cannot be
/// used.
pub type ComponentRef = std::result::Result<PathBuf, DiscoveryError>;

/// Finds custom components referenced by a module.
///
/// Candidate paths are absolute or relative to the source root, with or
/// without extension. A bad reference fails only itself; a descriptor that
/// cannot be read at all is a single `Err`.
pub trait ComponentScanner {
    fn scan(&self, module: &ModuleNode) -> Vec<ComponentRef>;
}

impl<S: ComponentScanner + ?Sized> ComponentScanner for &S {
    fn scan(&self, module: &ModuleNode) -> Vec<ComponentRef> {
        (**self).scan(module)
    }
}

/// Scanner for builds without custom components.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoComponents;

impl ComponentScanner for NoComponents {
    fn scan(&self, _module: &ModuleNode) -> Vec<ComponentRef> {
        Vec::new()
    }
}
