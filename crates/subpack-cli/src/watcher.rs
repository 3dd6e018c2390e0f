//! File system watcher with debouncing for watch mode.
//!
//! Watches the source directory recursively and forwards relevant changes
//! through a tokio channel. Changes under ignored path segments (by default
//! `node_modules` and `dist`) and hidden files never trigger a rebuild.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{CliError, Result};

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Recursive watcher over one directory.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Start watching `root`. Repeated events for one path within
    /// `debounce_ms` are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` does not exist or the watcher cannot be
    /// created.
    pub fn new(
        root: PathBuf,
        ignore: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(100);
        let debounce = Duration::from_millis(debounce_ms);
        let mut last_event: Option<(PathBuf, Instant)> = None;
        let watched_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            for path in &event.paths {
                if should_ignore(path, &watched_root, &ignore) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce {
                        continue;
                    }
                }
                last_event = Some((path.clone(), now));

                let change = match event.kind {
                    EventKind::Create(_) => FileChange::Created(path.clone()),
                    EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                // receiver gone means the watch loop ended
                let _ = tx.blocking_send(change);
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %root.display(), "watching for changes");

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Paths outside `root`, under an ignored segment, or hidden.
fn should_ignore(path: &Path, root: &Path, ignore: &[String]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };

    relative.components().any(|component| {
        let name = component.as_os_str().to_string_lossy();
        (name.starts_with('.') && name != "." && name != "..")
            || ignore.iter().any(|segment| segment.as_str() == name)
    })
}

/// Wait for the first change, then collect every change that arrives until
/// the channel has been quiet for `quiet`. `None` once the channel closes.
pub async fn next_batch(rx: &mut mpsc::Receiver<FileChange>, quiet: Duration) -> Option<Vec<FileChange>> {
    let first = rx.recv().await?;
    let mut batch = vec![first];
    while let Ok(Some(change)) = tokio::time::timeout(quiet, rx.recv()).await {
        if !batch.contains(&change) {
            batch.push(change);
        }
    }
    Some(batch)
}
