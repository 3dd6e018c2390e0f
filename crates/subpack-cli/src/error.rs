//! Error handling for the subpack CLI.
//!
//! [`CliError`] wraps the errors of the library crates via `#[from]` and is
//! rendered through miette in `main`. Core errors keep their own diagnostic
//! codes and help text.

use std::path::PathBuf;

use miette::Report;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration or manifest errors
    #[error("Configuration error: {0}")]
    Config(#[from] subpack_config::ConfigError),

    /// Build errors raised by the core (invariant violations included)
    #[error(transparent)]
    Core(#[from] subpack_core::Error),

    /// The build converged but the compiler reported errors
    #[error("Build finished with {errors} error(s)")]
    BuildFailed { errors: usize },

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    /// Errors after which the build output must not be trusted.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, CliError::Core(err) if err.is_invariant_violation())
    }
}

/// Extension trait for adding context to results.
pub trait ResultExt<T> {
    /// Report a missing file as [`CliError::FileNotFound`] naming `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Prefix the error with `msg`.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}

/// Convert a CLI error to a miette report.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Core(core) => Report::new(core),
        CliError::Config(config) => miette::miette!("Configuration error: {}", config),
        other => miette::miette!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_name_the_path() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::from(std::io::ErrorKind::NotFound));
        let err = result.with_path("src/app.json").unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(ref p) if p.ends_with("app.json")));
    }

    #[test]
    fn only_core_invariants_are_violations() {
        let missing = CliError::from(subpack_core::Error::MissingRequiredAsset {
            asset: "app.js".to_string(),
            detail: "main entry 'app.js' was not emitted".to_string(),
        });
        assert!(missing.is_invariant_violation());
        assert!(!CliError::BuildFailed { errors: 2 }.is_invariant_violation());
    }

    #[test]
    fn context_prefixes_the_message() {
        let result: Result<()> = Err(CliError::Custom("boom".to_string()));
        let err = result.context("Failed to rebuild").unwrap_err();
        assert_eq!(err.to_string(), "Failed to rebuild: boom");
    }
}
