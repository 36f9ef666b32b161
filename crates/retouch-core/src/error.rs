//! Error types for the Retouch image editing pipeline.
//!
//! Errors are organized by concern: configuration problems, batch-level
//! upload preconditions, and per-image pipeline failures. Pipeline failures
//! never escape a batch; they are converted into a failed result for the one
//! job that raised them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for Retouch operations.
#[derive(Error, Debug)]
pub enum RetouchError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Batch precondition errors
    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Preconditions on a whole batch, checked once before any job is submitted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("Too many files. Maximum allowed is {max_count}.")]
    TooManyFiles { count: usize, max_count: usize },

    #[error("Total upload size ({size_mb:.1} MB) exceeds limit of {max_mb} MB.")]
    TotalSizeExceeded { size_mb: f64, max_mb: u64 },
}

/// Failure category carried by a failed job result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Format,
    Dimension,
    Validation,
    Collaborator,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Format => "format",
            ErrorKind::Dimension => "dimension",
            ErrorKind::Validation => "validation",
            ErrorKind::Collaborator => "collaborator",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Per-image pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source encoding is not on the allow-list
    #[error("Security violation: Image format '{format}' is not allowed")]
    Format { format: String },

    /// Source or computed target dimensions exceed the pixel cap
    #[error("Image dimensions {width}x{height} exceed maximum allowed size of {max_dim}px")]
    Dimension { width: u64, height: u64, max_dim: u32 },

    /// A stage parameter is malformed
    #[error("{0}")]
    Validation(String),

    /// The codec or vectorizer failed underneath us
    #[error("{stage} failed: {message}")]
    Collaborator { stage: String, message: String },

    /// Anything not otherwise classified, including worker panics
    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl PipelineError {
    /// Shorthand for a codec/vectorizer failure in the named stage.
    pub fn collaborator(stage: impl Into<String>, message: impl ToString) -> Self {
        Self::Collaborator {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Format { .. } => ErrorKind::Format,
            PipelineError::Dimension { .. } => ErrorKind::Dimension,
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::Collaborator { .. } => ErrorKind::Collaborator,
            PipelineError::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

/// Convenience type alias for Retouch results.
pub type Result<T> = std::result::Result<T, RetouchError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
