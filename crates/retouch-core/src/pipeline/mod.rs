//! Image processing pipeline components.
//!
//! - **validate**: format allow-list and dimension cap, before any decode
//! - **decode**: raw bytes to an [`Image`](crate::types::Image) with metadata
//! - **heif**: HEIC/HEIF decoding (`heif` feature)
//! - **stages**: the editing and analysis operations
//! - **encode**: output formats and the metadata policy
//! - **vectorize**: raster-to-SVG collaborator
//! - **processor**: runs one job through all of the above
//! - **discovery**: find input files on disk

pub mod decode;
pub mod discovery;
pub mod encode;
#[cfg(feature = "heif")]
pub mod heif;
pub mod processor;
pub mod stages;
pub mod validate;
pub mod vectorize;

// Re-exports for convenient access
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use encode::{EncodeOptions, Encoder};
pub use processor::PipelineRunner;
pub use validate::{sniff_format, SourceHeader, ValidationGate};
pub use vectorize::{default_vectorizer, VectorParams, Vectorizer};
