//! The per-batch edit recipe.
//!
//! A recipe file is plain TOML; every field is optional and falls back to the
//! identity edit:
//!
//! ```toml
//! brightness = 1.2
//! contrast = 1.1
//! filter = "sharpen"
//! rotate = 90
//! output_format = "webp"
//! quality = 75
//!
//! [crop]
//! mode = "aspect"
//! width = 16
//! height = 9
//!
//! [resize]
//! width = 1920
//! maintain_aspect = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::pipeline::stages::watermark::MAX_WATERMARK_FONT_SIZE;
use crate::pipeline::stages::FilterKind;
use crate::pipeline::vectorize::VectorParams;
use crate::types::TargetFormat;

/// Every user-chosen option for one batch run.
///
/// Build it, call [`ProcessingConfig::validate`], then wrap it in an `Arc`
/// and hand the same value to every job. Nothing in the pipeline takes it
/// mutably.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Brightness factor (1.0 = identity)
    pub brightness: f32,
    /// Contrast factor (1.0 = identity)
    pub contrast: f32,
    /// Saturation factor (1.0 = identity)
    pub saturation: f32,
    /// Sharpness factor (1.0 = identity)
    pub sharpness: f32,

    /// Named convolution filter; unrecognized names pass through
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterKind>,

    /// Clockwise rotation in degrees (0, 90, 180 or 270)
    pub rotate: Rotation,
    pub flip_h: bool,
    pub flip_v: bool,
    pub grayscale: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropSpec>,

    /// Pixelation block size in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixelate: Option<u32>,

    /// Color to knock out to full transparency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparency: Option<TransparencySpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<WatermarkSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeSpec>,

    /// Report dominant colors of the source image
    pub extract_colors: bool,
    /// Report the RGB histogram of the delivered image
    pub show_histogram: bool,

    pub output_format: TargetFormat,
    /// Encoder quality 0-100, ignored by lossless and quality-less formats
    pub quality: u8,
    /// Spend more encoder effort for smaller files
    pub optimize: bool,
    pub lossless: bool,
    pub strip_metadata: bool,

    /// Tracing parameters for SVG output
    pub vector: VectorParams,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            sharpness: 1.0,
            filter: None,
            rotate: Rotation::None,
            flip_h: false,
            flip_v: false,
            grayscale: false,
            crop: None,
            pixelate: None,
            transparency: None,
            watermark: None,
            resize: None,
            extract_colors: false,
            show_histogram: false,
            output_format: TargetFormat::Jpeg,
            quality: 80,
            optimize: true,
            lossless: false,
            strip_metadata: true,
            vector: VectorParams::default(),
        }
    }
}

impl ProcessingConfig {
    /// Parse a recipe from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ProcessingConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a recipe file and validate it.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize the recipe to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Whether any of the four enhancement factors differs from identity.
    pub fn has_enhancements(&self) -> bool {
        [self.brightness, self.contrast, self.saturation, self.sharpness]
            .iter()
            .any(|factor| *factor != 1.0)
    }

    /// Whether the geometric stage has anything to do.
    pub fn has_geometry(&self) -> bool {
        self.grayscale || self.rotate != Rotation::None || self.flip_h || self.flip_v
    }

    /// Check every field is in range.
    ///
    /// Watermark text length is not checked here; the watermark stage
    /// rejects oversized text per job.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, factor) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
            ("sharpness", self.sharpness),
        ] {
            if !factor.is_finite() || factor < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be a finite value >= 0 (got {factor})"
                )));
            }
        }
        if self.quality > 100 {
            return Err(ConfigError::ValidationError(format!(
                "quality must be between 0 and 100 (got {})",
                self.quality
            )));
        }
        if self.pixelate == Some(0) {
            return Err(ConfigError::ValidationError(
                "pixelate block size must be >= 1".into(),
            ));
        }
        if let Some(watermark) = &self.watermark {
            if !watermark.font_size.is_finite()
                || watermark.font_size <= 0.0
                || watermark.font_size > MAX_WATERMARK_FONT_SIZE
            {
                return Err(ConfigError::ValidationError(format!(
                    "watermark.font_size must be in (0, {MAX_WATERMARK_FONT_SIZE}] (got {})",
                    watermark.font_size
                )));
            }
        }
        if let Some(resize) = &self.resize {
            resize.validate()?;
        }
        Ok(())
    }
}

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Cw90),
            180 => Ok(Rotation::Cw180),
            270 => Ok(Rotation::Cw270),
            other => Err(format!(
                "rotate must be one of 0, 90, 180, 270 (got {other})"
            )),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        match rotation {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }
}

/// Crop either to an absolute box or symmetrically to an aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CropSpec {
    /// Pixel box; `right`/`bottom` of 0 or less mean "to the image edge"
    Box {
        #[serde(default)]
        left: i64,
        #[serde(default)]
        top: i64,
        #[serde(default)]
        right: i64,
        #[serde(default)]
        bottom: i64,
    },
    /// Center crop to `width:height`; non-positive parts disable the crop
    Aspect { width: i64, height: i64 },
}

/// Color-to-transparency replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransparencySpec {
    pub color: [u8; 3],
    #[serde(default = "default_tolerance")]
    pub tolerance: u8,
}

fn default_tolerance() -> u8 {
    10
}

/// Text watermark drawn in the bottom-right corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkSpec {
    pub text: String,
    pub opacity: u8,
    pub font_size: f32,
    pub color: [u8; 3],
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            text: String::new(),
            opacity: 128,
            font_size: 36.0,
            color: [255, 255, 255],
        }
    }
}

/// Resize request. Which fields are set selects the mode, in priority
/// order: percentage, width and height, width only, height only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub maintain_aspect: bool,
}

impl Default for ResizeSpec {
    fn default() -> Self {
        Self {
            percentage: None,
            width: None,
            height: None,
            maintain_aspect: true,
        }
    }
}

impl ResizeSpec {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(percentage) = self.percentage {
            if !percentage.is_finite() || percentage <= 0.0 {
                return Err(ConfigError::ValidationError(
                    "resize.percentage must be > 0".into(),
                ));
            }
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(ConfigError::ValidationError(
                "resize.width and resize.height must be > 0".into(),
            ));
        }
        Ok(())
    }
}
