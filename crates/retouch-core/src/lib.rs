//! Retouch Core - embeddable batch image editing library.
//!
//! Retouch takes a batch of raster images plus one edit recipe and hands
//! back one encoded result (or one failure) per image.
//!
//! # Architecture
//!
//! ```text
//! bytes → ValidationGate → decode → enhance → filter → geometry → crop
//!       → pixelate → color-to-alpha → watermark → resize → encode
//! ```
//!
//! The [`BatchExecutor`] runs that flow for many images at once on a
//! bounded worker pool, isolating each job's failure from the rest.
//!
//! # Usage
//!
//! ```rust,ignore
//! use retouch_core::{BatchJob, Config, ProcessingConfig, Retouch};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> retouch_core::Result<()> {
//!     let retouch = Retouch::new(Config::load()?);
//!     let recipe = Arc::new(ProcessingConfig::from_toml_str("brightness = 1.2")?);
//!
//!     let bytes = std::fs::read("./image.jpg")?;
//!     let report = retouch
//!         .process_batch(vec![BatchJob::new("image.jpg", bytes)], recipe)
//!         .await?;
//!     println!("{} succeeded", report.succeeded());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod batch;
pub mod config;
pub mod error;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

// Re-exports for convenient access
pub use batch::{BatchExecutor, BatchJob, BatchReport, JobBoard, JobOutcome, JobState, MAX_WORKERS};
pub use config::{Config, ProcessingConfig};
pub use error::{
    ConfigError, ErrorKind, PipelineError, PipelineResult, Result, RetouchError, UploadError,
};
pub use naming::{format_bytes, output_file_name, safe_file_stem};
pub use output::{ReportFormat, ReportWriter};
pub use pipeline::{DiscoveredFile, FileDiscovery, PipelineRunner, ValidationGate};
pub use types::{Image, ProcessedImage, ProcessingResult, SourceFormat, TargetFormat};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Main entry point: configuration plus a ready batch executor.
pub struct Retouch {
    config: Config,
    executor: BatchExecutor,
}

impl Retouch {
    pub fn new(config: Config) -> Self {
        tracing::debug!("Initializing Retouch v{}", VERSION);
        let executor = BatchExecutor::new(&config);
        Self { config, executor }
    }

    /// Create an instance from the config file, or defaults if absent.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(Config::load()?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Expand files and directories into candidate inputs.
    pub fn discover(&self, paths: &[PathBuf]) -> Vec<DiscoveredFile> {
        FileDiscovery::new(self.config.limits.clone()).discover_all(paths)
    }

    /// Run one image through the pipeline on the current thread.
    pub fn process_bytes(
        &self,
        bytes: &[u8],
        recipe: &ProcessingConfig,
    ) -> PipelineResult<ProcessedImage> {
        self.executor.runner().process(bytes, recipe)
    }

    /// Run a whole batch on the worker pool.
    pub async fn process_batch(
        &self,
        jobs: Vec<BatchJob>,
        recipe: Arc<ProcessingConfig>,
    ) -> Result<BatchReport> {
        Ok(self.executor.run(jobs, recipe).await?)
    }

    /// Run a whole batch, reporting each job as it finishes.
    pub async fn process_batch_with_progress<F>(
        &self,
        jobs: Vec<BatchJob>,
        recipe: Arc<ProcessingConfig>,
        on_complete: F,
    ) -> Result<BatchReport>
    where
        F: Fn(&JobOutcome) + Send + Sync,
    {
        Ok(self
            .executor
            .run_with_progress(jobs, recipe, on_complete)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[tokio::test]
    async fn test_retouch_new() {
        let retouch = Retouch::new(Config::default());
        assert_eq!(retouch.config().batch.max_workers, 8);

        let report = retouch
            .process_batch(vec![], Arc::new(ProcessingConfig::default()))
            .await
            .unwrap();
        assert!(report.outcomes.is_empty());
    }
}
