//! `subpack build`: one build cycle.

use crate::cli::BuildArgs;
use crate::error::{CliError, Result};
use crate::ui;

use super::{load_session, report_cycle};

/// Execute the build command.
///
/// # Errors
///
/// Configuration and manifest errors, invariant violations raised while
/// reconciling, and [`CliError::BuildFailed`] when the compiler reported
/// errors. The output is written in the last case.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let mut session = load_session(&args)?;
    let report = session.run_cycle()?;
    report_cycle(&report);

    let errors = report.build.diagnostics.error_count();
    if errors > 0 {
        return Err(CliError::BuildFailed { errors });
    }

    ui::success(&format!(
        "Wrote {} files to {} in {} pass(es)",
        report.written.len(),
        session.out_root().display(),
        report.build.passes
    ));
    Ok(())
}
