use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format as _, Serialized, Toml};
use serde::Serialize;

use crate::config::SubpackConfig;
use crate::error::{ConfigError, Result};

/// Config file looked up in the project root.
pub const CONFIG_FILE: &str = "subpack.toml";

/// Prefix of environment overrides (`SUBPACK_OUT_DIR`, `SUBPACK_WATCH__DEBOUNCE_MS`).
pub const ENV_PREFIX: &str = "SUBPACK_";

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyze: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_passes: Option<u32>,
}

impl SubpackConfig {
    /// Load configuration from multiple sources.
    /// Priority: CLI overrides > environment variables > config file > defaults
    ///
    /// `config_path` names an explicit file, which must exist; otherwise
    /// `subpack.toml` in `project_root` is used when present.
    pub fn load(
        project_root: &Path,
        config_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match config_path {
            Some(path) => {
                let path = project_root.join(path);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path));
                }
                Some(path)
            }
            None => {
                let default_path = project_root.join(CONFIG_FILE);
                default_path.is_file().then_some(default_path)
            }
        };

        if let Some(path) = &config_file {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        figment = figment.merge(Serialized::defaults(overrides));

        let config: Self = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            value: e.to_string(),
            hint: format!("Check {CONFIG_FILE} syntax and field types"),
        })?;

        config.validate()?;
        Ok(config)
    }
}
