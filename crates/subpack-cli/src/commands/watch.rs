//! `subpack watch`: build, then rebuild on change.
//!
//! The session (and with it every discovered component) is kept across
//! cycles. A failed cycle is reported and the loop waits for the next change.

use std::time::Duration;

use crate::cli::BuildArgs;
use crate::error::Result;
use crate::session::BuildSession;
use crate::ui;
use crate::watcher::{FileWatcher, next_batch};

use super::{load_session, report_cycle};

pub async fn execute(args: BuildArgs) -> Result<()> {
    let mut session = load_session(&args)?;
    run_cycle(&mut session);

    let watch = session.config().watch.clone();
    let (watcher, mut changes) =
        FileWatcher::new(session.source_root(), watch.ignore.clone(), watch.debounce_ms)?;
    let quiet = Duration::from_millis(watch.debounce_ms);
    ui::info(&format!("Watching {} for changes", watcher.root().display()));

    loop {
        tokio::select! {
            batch = next_batch(&mut changes, quiet) => {
                let Some(batch) = batch else {
                    break;
                };
                for change in &batch {
                    tracing::debug!(path = %change.path().display(), "change detected");
                }
                ui::info(&format!("{} file(s) changed, rebuilding", batch.len()));
                tokio::task::block_in_place(|| run_cycle(&mut session));
            }
            _ = tokio::signal::ctrl_c() => {
                ui::info("Stopping watch");
                break;
            }
        }
    }

    Ok(())
}

fn run_cycle(session: &mut BuildSession) {
    match session.run_cycle() {
        Ok(report) => report_cycle(&report),
        Err(err) => {
            if err.is_invariant_violation() {
                tracing::error!("build cycle aborted: {err}");
            }
            ui::error(&err.to_string());
        }
    }
}
