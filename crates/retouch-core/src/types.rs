//! Core data types for the Retouch pipeline.
//!
//! An [`Image`] is what flows between stages; a [`ProcessingResult`] is what
//! comes out of one job.

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError};

/// Encoding detected from a source's leading bytes.
///
/// Detection is by content, never by the declared filename, so a TIFF named
/// `photo.png` is still a TIFF here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Png,
    Jpeg,
    Bmp,
    Webp,
    Heic,
    Heif,
    Avif,
    Gif,
    Tiff,
    /// Multi-picture JPEG container (stereo / burst)
    Mpo,
    Ico,
    Unknown,
}

impl SourceFormat {
    /// Lowercase name as used in config allow-lists.
    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::Png => "png",
            SourceFormat::Jpeg => "jpeg",
            SourceFormat::Bmp => "bmp",
            SourceFormat::Webp => "webp",
            SourceFormat::Heic => "heic",
            SourceFormat::Heif => "heif",
            SourceFormat::Avif => "avif",
            SourceFormat::Gif => "gif",
            SourceFormat::Tiff => "tiff",
            SourceFormat::Mpo => "mpo",
            SourceFormat::Ico => "ico",
            SourceFormat::Unknown => "unknown",
        }
    }

    /// Parse a config name. `jpg` and `tif` are accepted as aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Some(SourceFormat::Png),
            "jpeg" | "jpg" => Some(SourceFormat::Jpeg),
            "bmp" => Some(SourceFormat::Bmp),
            "webp" => Some(SourceFormat::Webp),
            "heic" => Some(SourceFormat::Heic),
            "heif" => Some(SourceFormat::Heif),
            "avif" => Some(SourceFormat::Avif),
            "gif" => Some(SourceFormat::Gif),
            "tiff" | "tif" => Some(SourceFormat::Tiff),
            "mpo" => Some(SourceFormat::Mpo),
            "ico" => Some(SourceFormat::Ico),
            _ => None,
        }
    }

    /// Whether the source lives in an ISO-BMFF (HEIF family) container.
    pub fn is_heif_family(&self) -> bool {
        matches!(
            self,
            SourceFormat::Heic | SourceFormat::Heif | SourceFormat::Avif
        )
    }

    /// The `image` crate codec for this source, if one exists.
    pub fn codec(&self) -> Option<image::ImageFormat> {
        match self {
            SourceFormat::Png => Some(image::ImageFormat::Png),
            SourceFormat::Jpeg | SourceFormat::Mpo => Some(image::ImageFormat::Jpeg),
            SourceFormat::Bmp => Some(image::ImageFormat::Bmp),
            SourceFormat::Webp => Some(image::ImageFormat::WebP),
            SourceFormat::Avif => Some(image::ImageFormat::Avif),
            SourceFormat::Gif => Some(image::ImageFormat::Gif),
            SourceFormat::Tiff => Some(image::ImageFormat::Tiff),
            SourceFormat::Ico => Some(image::ImageFormat::Ico),
            SourceFormat::Heic | SourceFormat::Heif | SourceFormat::Unknown => None,
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name().to_ascii_uppercase())
    }
}

/// Encoding of the delivered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Webp,
    Avif,
    Bmp,
    Svg,
}

impl TargetFormat {
    /// File extension for output naming.
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "jpg",
            TargetFormat::Png => "png",
            TargetFormat::Webp => "webp",
            TargetFormat::Avif => "avif",
            TargetFormat::Bmp => "bmp",
            TargetFormat::Svg => "svg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "image/jpeg",
            TargetFormat::Png => "image/png",
            TargetFormat::Webp => "image/webp",
            TargetFormat::Avif => "image/avif",
            TargetFormat::Bmp => "image/bmp",
            TargetFormat::Svg => "image/svg+xml",
        }
    }

    /// Whether the container can carry an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, TargetFormat::Jpeg | TargetFormat::Bmp)
    }

    /// Whether a lossless switch means anything to the encoder.
    pub fn supports_lossless(&self) -> bool {
        matches!(self, TargetFormat::Webp | TargetFormat::Avif)
    }
}

impl std::fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{self:?}").to_ascii_uppercase())
    }
}

/// Side metadata captured at decode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub format: SourceFormat,
    /// Raw EXIF payload (TIFF structure, no `Exif\0\0` prefix)
    pub exif: Option<Vec<u8>>,
    /// Raw ICC color profile
    pub icc_profile: Option<Vec<u8>>,
}

impl ImageMetadata {
    pub fn new(format: SourceFormat) -> Self {
        Self {
            format,
            exif: None,
            icc_profile: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exif.is_none() && self.icc_profile.is_none()
    }
}

/// A decoded raster plus the metadata that rode in with it.
#[derive(Debug, Clone)]
pub struct Image {
    pub pixels: DynamicImage,
    pub metadata: ImageMetadata,
}

impl Image {
    pub fn new(pixels: DynamicImage, metadata: ImageMetadata) -> Self {
        Self { pixels, metadata }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// True when the raster has an alpha channel holding at least one
    /// non-opaque pixel.
    pub fn has_transparency(&self) -> bool {
        if !self.pixels.color().has_alpha() {
            return false;
        }
        match &self.pixels {
            DynamicImage::ImageLumaA8(buf) => buf.pixels().any(|p| p[1] < u8::MAX),
            DynamicImage::ImageRgba8(buf) => buf.pixels().any(|p| p[3] < u8::MAX),
            DynamicImage::ImageLumaA16(buf) => buf.pixels().any(|p| p[1] < u16::MAX),
            DynamicImage::ImageRgba16(buf) => buf.pixels().any(|p| p[3] < u16::MAX),
            other => other.to_rgba8().pixels().any(|p| p[3] < u8::MAX),
        }
    }
}

/// 256-bucket counts per color channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub red: Vec<u32>,
    pub green: Vec<u32>,
    pub blue: Vec<u32>,
}

/// Everything a successful job delivers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedImage {
    /// Encoded output; not part of the JSON report
    #[serde(skip)]
    pub bytes: Vec<u8>,

    /// Size of the encoded output in bytes
    pub byte_size: u64,

    pub format: TargetFormat,

    /// Width and height of the decoded source
    pub original_dimensions: (u32, u32),

    /// Whether the source carried real transparency
    pub has_transparency: bool,

    /// `#rrggbb` palette of the source image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_colors: Option<Vec<String>>,

    /// Channel histogram of the delivered image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram: Option<Histogram>,
}

/// Why a job failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<PipelineError> for JobFailure {
    fn from(err: PipelineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one job. Exactly one variant is ever populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessingResult {
    Success(ProcessedImage),
    Failure(JobFailure),
}

impl ProcessingResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingResult::Success(_))
    }

    pub fn failure(err: PipelineError) -> Self {
        ProcessingResult::Failure(err.into())
    }
}

impl From<Result<ProcessedImage, PipelineError>> for ProcessingResult {
    fn from(result: Result<ProcessedImage, PipelineError>) -> Self {
        match result {
            Ok(processed) => ProcessingResult::Success(processed),
            Err(err) => ProcessingResult::failure(err),
        }
    }
}
