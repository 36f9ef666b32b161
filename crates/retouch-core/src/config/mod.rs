//! Configuration management for Retouch.
//!
//! Two layers live here. [`Config`] is the application config loaded from the
//! platform config directory (policy limits, pool size, logging). The
//! [`ProcessingConfig`] is the per-batch edit recipe: built once, validated
//! once, then shared read-only by every job in the batch.

mod processing;
mod types;
mod validate;

pub use processing::*;
pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Retouch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resource and format policy
    pub limits: LimitsConfig,

    /// Worker pool settings
    pub batch: BatchConfig,

    /// Dominant color settings
    pub analysis: AnalysisConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/rs.retouch.retouch/config.toml
    /// - Linux: ~/.config/retouch/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\retouch\config\config.toml
    ///
    /// Falls back to ~/.retouch/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("rs", "retouch", "retouch")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".retouch").join("config.toml")
            })
    }

    /// Get the resolved output directory (with ~ expansion).
    pub fn output_dir(&self) -> PathBuf {
        let path_str = self.output.dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.limits.max_image_dimension, 6000);
        assert_eq!(config.limits.max_file_count, 50);
        assert_eq!(config.limits.max_total_upload_mb, 200);
        assert_eq!(config.batch.max_workers, 8);
        assert_eq!(config.analysis.dominant_colors, 5);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[limits]"));
        assert!(toml.contains("[batch]"));
        assert!(toml.contains("[logging]"));
    }

    #[test]
    fn test_load_from_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[batch]\nmax_workers = 2\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.batch.max_workers, 2);
        assert_eq!(config.limits.max_image_dimension, 6000);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[limits]\nmax_file_count = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("max_file_count"));
    }

    #[test]
    fn test_allowed_formats_case_insensitive() {
        let limits = LimitsConfig::default();
        assert!(limits.allows("JPEG"));
        assert!(limits.allows("heif"));
        assert!(!limits.allows("gif"));
        assert!(!limits.allows("mpo"));
    }

    #[test]
    fn test_output_dir_expands_tilde() {
        let mut config = Config::default();
        config.output.dir = PathBuf::from("~/retouched");
        let resolved = config.output_dir();
        assert!(!resolved.to_string_lossy().starts_with('~'));
    }
}
