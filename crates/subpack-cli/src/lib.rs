//! Subpack CLI - builds WeChat-style mini-programs whose sub-packages get
//! their own commons chunks.
//!
//! # Architecture
//!
//! - [`cli`] - clap argument definitions
//! - [`commands`] - `build` and `watch`
//! - [`session`] - one build session: manifest, orchestrator, reconciliation
//! - [`watcher`] - debounced file watching for `watch`
//! - [`error`] - CLI error type and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - status messages and the per-cycle summary

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod session;
pub mod ui;
pub mod watcher;

pub use error::{CliError, Result, ResultExt};
pub use session::{BuildSession, CycleReport};
