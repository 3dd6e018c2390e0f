use std::path::Component;

use crate::config::SubpackConfig;
use crate::error::{ConfigError, Result};

impl SubpackConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.main_entry.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "main_entry".to_string(),
                hint: "Name the main entry script, e.g. \"app\"".to_string(),
            });
        }

        if self.main_entry.contains('.') {
            return Err(ConfigError::InvalidValue {
                field: "main_entry".to_string(),
                value: self.main_entry.clone(),
                hint: "Give the entry without extension (\"app\", not \"app.js\")".to_string(),
            });
        }

        if self.max_passes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_passes".to_string(),
                value: "0".to_string(),
                hint: "At least one compiler pass is required".to_string(),
            });
        }

        if self.source_dir == self.out_dir {
            return Err(ConfigError::InvalidValue {
                field: "out_dir".to_string(),
                value: self.out_dir.display().to_string(),
                hint: "The output directory must differ from source_dir".to_string(),
            });
        }

        if self
            .source_dir
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ConfigError::InvalidValue {
                field: "source_dir".to_string(),
                value: self.source_dir.display().to_string(),
                hint: "source_dir must stay inside the project root".to_string(),
            });
        }

        if self.watch.debounce_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "watch.debounce_ms".to_string(),
                value: "0".to_string(),
                hint: "Use a debounce of at least 1ms".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validation() {
        assert!(SubpackConfig::default().validate().is_ok());

        assert!(SubpackConfig {
            main_entry: String::new(),
            ..SubpackConfig::default()
        }
        .validate()
        .is_err());

        assert!(SubpackConfig {
            main_entry: "app.js".to_string(),
            ..SubpackConfig::default()
        }
        .validate()
        .is_err());

        assert!(SubpackConfig {
            max_passes: 0,
            ..SubpackConfig::default()
        }
        .validate()
        .is_err());

        assert!(SubpackConfig {
            out_dir: PathBuf::from("src"),
            ..SubpackConfig::default()
        }
        .validate()
        .is_err());

        assert!(SubpackConfig {
            source_dir: PathBuf::from("../elsewhere"),
            ..SubpackConfig::default()
        }
        .validate()
        .is_err());
    }
}
