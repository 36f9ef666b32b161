//! Application config sections with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Policy limits that protect the process from hostile uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum image dimension (width or height), applied to sources and resize targets
    pub max_image_dimension: u32,

    /// Maximum number of files in one batch
    pub max_file_count: usize,

    /// Maximum combined size of one batch in megabytes
    pub max_total_upload_mb: u64,

    /// Source encodings accepted by the validation gate
    pub allowed_formats: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_dimension: 6000,
            max_file_count: 50,
            max_total_upload_mb: 200,
            allowed_formats: vec![
                "png".to_string(),
                "jpeg".to_string(),
                "bmp".to_string(),
                "webp".to_string(),
                "heic".to_string(),
                "heif".to_string(),
                "avif".to_string(),
            ],
        }
    }
}

impl LimitsConfig {
    /// Whether the given lowercase format name is on the allow-list.
    pub fn allows(&self, format: &str) -> bool {
        self.allowed_formats
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(format))
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Upper bound on concurrent jobs; the pool is further capped by
    /// [`crate::batch::MAX_WORKERS`], hardware parallelism and the batch size
    pub max_workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: crate::batch::MAX_WORKERS,
        }
    }
}

/// Read-only analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of representative colors reported per image
    pub dominant_colors: usize,

    /// Side length of the nearest-neighbor canvas used before quantizing
    pub palette_canvas: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dominant_colors: 5,
            palette_canvas: 150,
        }
    }
}

/// Where processed files land.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory (supports `~`)
    pub dir: PathBuf,

    /// Prefix prepended to every output file stem
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./processed"),
            prefix: "processed_".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
