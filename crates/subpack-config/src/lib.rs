//! Configuration for subpack builds.
//!
//! Two inputs are read here: the tool configuration ([`SubpackConfig`],
//! layered from defaults, `subpack.toml`, `SUBPACK_*` environment variables
//! and CLI flags) and the application manifest ([`AppManifest`], the
//! project's `app.json`) that describes pages and sub-packages.

pub mod config;
pub mod defaults;
pub mod error;
pub mod loading;
pub mod manifest;
pub mod validation;

pub use config::*;
pub use error::*;
pub use loading::{CONFIG_FILE, ConfigOverrides, ENV_PREFIX};
pub use manifest::{AppManifest, SubPackage};
