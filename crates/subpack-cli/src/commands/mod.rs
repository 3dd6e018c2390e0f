//! Command implementations.

mod build;
mod watch;

use std::path::PathBuf;

use subpack_config::SubpackConfig;

use crate::cli::BuildArgs;
use crate::error::{Result, ResultExt};
use crate::session::{BuildSession, CycleReport};
use crate::ui;

pub use build::execute as build_execute;
pub use watch::execute as watch_execute;

/// Resolve the project root and load its layered configuration.
pub(crate) fn load_session(args: &BuildArgs) -> Result<BuildSession> {
    let project_root = match &args.cwd {
        Some(cwd) => cwd.clone(),
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let project_root = canonical(project_root)?;

    let config = SubpackConfig::load(&project_root, args.config.as_deref(), &args.overrides())?;
    tracing::debug!(?config, "configuration loaded");
    BuildSession::new(project_root, config)
}

fn canonical(path: PathBuf) -> Result<PathBuf> {
    std::fs::canonicalize(&path).with_path(&path)
}

/// Print the diagnostics and the summary row of a finished cycle.
pub(crate) fn report_cycle(report: &CycleReport) {
    ui::print_diagnostics(report.build.diagnostics.iter());
    ui::print_summary(&report.summary());
    if let Some(path) = &report.report {
        ui::info(&format!("Dependency report written to {}", path.display()));
    }
}
