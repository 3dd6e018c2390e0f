//! Error types for configuration and manifest loading.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid config value for '{field}': {value}\n  hint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },

    #[error("missing config field '{field}'\n  hint: {hint}")]
    MissingField { field: String, hint: String },

    // App manifest (app.json) errors
    #[error("invalid app manifest {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Core(#[from] subpack_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
