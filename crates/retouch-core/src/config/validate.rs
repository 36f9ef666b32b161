//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::types::SourceFormat;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.max_file_count == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_count must be > 0".into(),
            ));
        }
        if self.limits.max_total_upload_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_total_upload_mb must be > 0".into(),
            ));
        }
        if let Some(unknown) = self
            .limits
            .allowed_formats
            .iter()
            .find(|name| SourceFormat::from_name(name).is_none())
        {
            return Err(ConfigError::ValidationError(format!(
                "limits.allowed_formats contains unknown format '{unknown}'"
            )));
        }
        if self.batch.max_workers == 0 {
            return Err(ConfigError::ValidationError(
                "batch.max_workers must be > 0".into(),
            ));
        }
        if self.analysis.dominant_colors == 0 {
            return Err(ConfigError::ValidationError(
                "analysis.dominant_colors must be > 0".into(),
            ));
        }
        if self.analysis.palette_canvas == 0 {
            return Err(ConfigError::ValidationError(
                "analysis.palette_canvas must be > 0".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        Ok(())
    }
}
