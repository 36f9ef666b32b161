//! Output encoding.
//!
//! Raster targets go through the `image` encoders, except lossy WebP which
//! needs libwebp (`webp` crate). Vector output is delegated to a
//! [`Vectorizer`] and returned as SVG text bytes.
//!
//! Metadata policy: the encoder only ever borrows the [`Image`], so
//! stripping is a matter of not passing EXIF/ICC along. The caller's image
//! is never touched, on success or failure.

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::avif::AvifEncoder;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ImageEncoder};
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF, ImageICC};

use super::vectorize::{VectorParams, Vectorizer};
use crate::config::ProcessingConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{Image, ImageMetadata, TargetFormat};

/// Everything the encoder needs to know about the requested output.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    pub format: TargetFormat,
    pub quality: u8,
    pub optimize: bool,
    pub lossless: bool,
    pub strip_metadata: bool,
    pub vector: VectorParams,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::from(&ProcessingConfig::default())
    }
}

impl From<&ProcessingConfig> for EncodeOptions {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            format: config.output_format,
            quality: config.quality,
            optimize: config.optimize,
            lossless: config.lossless,
            strip_metadata: config.strip_metadata,
            vector: config.vector.clone(),
        }
    }
}

/// Turns a finished [`Image`] into output bytes.
#[derive(Clone)]
pub struct Encoder {
    vectorizer: Arc<dyn Vectorizer>,
}

impl Encoder {
    pub fn new(vectorizer: Arc<dyn Vectorizer>) -> Self {
        Self { vectorizer }
    }

    pub fn encode(&self, image: &Image, options: &EncodeOptions) -> PipelineResult<Vec<u8>> {
        let metadata = if options.strip_metadata || image.metadata.is_empty() {
            None
        } else {
            Some(&image.metadata)
        };

        let pixels = prepare_pixels(&image.pixels, options.format);
        let quality = options.quality.clamp(1, 100);

        match options.format {
            TargetFormat::Jpeg => {
                let mut out = Vec::new();
                let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
                attach_metadata(&mut encoder, metadata, options.format);
                write(&pixels, encoder, "jpeg")?;
                Ok(out)
            }
            TargetFormat::Png => {
                let compression = if options.optimize {
                    CompressionType::Best
                } else {
                    CompressionType::Default
                };
                let mut out = Vec::new();
                let mut encoder = PngEncoder::new_with_quality(&mut out, compression, PngFilter::Adaptive);
                attach_metadata(&mut encoder, metadata, options.format);
                write(&pixels, encoder, "png")?;
                Ok(out)
            }
            TargetFormat::Avif => {
                let speed = if options.optimize { 4 } else { 8 };
                let avif_quality = if options.lossless { 100 } else { quality };
                let mut out = Vec::new();
                let mut encoder = AvifEncoder::new_with_speed_quality(&mut out, speed, avif_quality);
                attach_metadata(&mut encoder, metadata, options.format);
                write(&pixels, encoder, "avif")?;
                Ok(out)
            }
            TargetFormat::Bmp => {
                let mut cursor = Cursor::new(Vec::new());
                if metadata.is_some() {
                    tracing::warn!("BMP cannot carry EXIF or ICC data, metadata not forwarded");
                }
                write(&pixels, BmpEncoder::new(&mut cursor), "bmp")?;
                Ok(cursor.into_inner())
            }
            TargetFormat::Webp => encode_webp(&pixels, quality, options.lossless, metadata),
            TargetFormat::Svg => {
                let svg = self.vectorizer.vectorize(&image.pixels, &options.vector)?;
                tracing::trace!(vectorizer = self.vectorizer.name(), len = svg.len(), "Traced SVG");
                Ok(svg.into_bytes())
            }
        }
    }
}

/// Bring the raster into a layout the target encoder accepts.
///
/// Alpha is dropped for targets that cannot store it. Float and 16-bit
/// rasters are narrowed where the encoder only takes 8-bit input.
fn prepare_pixels(pixels: &DynamicImage, format: TargetFormat) -> DynamicImage {
    let alpha = pixels.color().has_alpha();
    match format {
        TargetFormat::Jpeg => match pixels {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => pixels.clone(),
            _ => DynamicImage::ImageRgb8(pixels.to_rgb8()),
        },
        TargetFormat::Bmp => match pixels {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => pixels.clone(),
            _ => DynamicImage::ImageRgb8(pixels.to_rgb8()),
        },
        TargetFormat::Png => match pixels {
            DynamicImage::ImageRgb32F(_) => DynamicImage::ImageRgb16(pixels.to_rgb16()),
            DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgba16(pixels.to_rgba16()),
            _ => pixels.clone(),
        },
        TargetFormat::Webp | TargetFormat::Avif => {
            if alpha {
                DynamicImage::ImageRgba8(pixels.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(pixels.to_rgb8())
            }
        }
        TargetFormat::Svg => pixels.clone(),
    }
}

fn write(pixels: &DynamicImage, encoder: impl ImageEncoder, stage: &str) -> PipelineResult<()> {
    pixels
        .write_with_encoder(encoder)
        .map_err(|e| PipelineError::collaborator(format!("encode {stage}"), e))
}

/// Hand EXIF and ICC to an `image` encoder that accepts them.
fn attach_metadata(encoder: &mut impl ImageEncoder, metadata: Option<&ImageMetadata>, format: TargetFormat) {
    let Some(metadata) = metadata else {
        return;
    };
    if let Some(icc) = &metadata.icc_profile {
        if encoder.set_icc_profile(icc.clone()).is_err() {
            tracing::warn!("{format} encoder does not accept an ICC profile, not forwarded");
        }
    }
    if let Some(exif) = &metadata.exif {
        if encoder.set_exif_metadata(exif.clone()).is_err() {
            tracing::warn!("{format} encoder does not accept EXIF, not forwarded");
        }
    }
}

fn encode_webp(
    pixels: &DynamicImage,
    quality: u8,
    lossless: bool,
    metadata: Option<&ImageMetadata>,
) -> PipelineResult<Vec<u8>> {
    let (width, height) = (pixels.width(), pixels.height());
    let encoder = match pixels {
        DynamicImage::ImageRgba8(buf) => webp::Encoder::from_rgba(buf.as_raw(), width, height),
        DynamicImage::ImageRgb8(buf) => webp::Encoder::from_rgb(buf.as_raw(), width, height),
        other => {
            return Err(PipelineError::collaborator(
                "encode webp",
                format!("unsupported pixel layout {:?}", other.color()),
            ))
        }
    };
    let memory = encoder
        .encode_simple(lossless, f32::from(quality))
        .map_err(|e| PipelineError::collaborator("encode webp", format!("{e:?}")))?;
    let bytes = memory.to_vec();

    let Some(metadata) = metadata else {
        return Ok(bytes);
    };

    // libwebp writes a bare VP8/VP8L stream; the chunks go in afterwards
    match WebP::from_bytes(Bytes::from(bytes.clone())) {
        Ok(mut container) => {
            if let Some(icc) = &metadata.icc_profile {
                container.set_icc_profile(Some(Bytes::from(icc.clone())));
            }
            if let Some(exif) = &metadata.exif {
                container.set_exif(Some(Bytes::from(exif.clone())));
            }
            Ok(container.encoder().bytes().to_vec())
        }
        Err(e) => {
            tracing::warn!("Could not reopen WebP output to add metadata: {e}");
            Ok(bytes)
        }
    }
}
