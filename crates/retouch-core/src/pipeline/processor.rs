//! Pipeline orchestration: one job from raw bytes to encoded output.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{AnalysisConfig, Config, LimitsConfig, ProcessingConfig};
use crate::error::PipelineResult;
use crate::types::{Image, ProcessedImage};

use super::encode::{EncodeOptions, Encoder};
use super::stages;
use super::validate::ValidationGate;
use super::vectorize::{default_vectorizer, Vectorizer};

/// Runs the gate, the transform stages and the encoder for one image.
///
/// Stage order is fixed: enhance, filter, geometry, crop, pixelate,
/// color-to-alpha, watermark, resize, then encode. Dominant colors are read
/// from the source as decoded; the histogram from the finished raster. A
/// stage whose setting is absent or identity is not called at all.
#[derive(Clone)]
pub struct PipelineRunner {
    gate: ValidationGate,
    analysis: AnalysisConfig,
    encoder: Encoder,
}

impl PipelineRunner {
    /// Create a runner with the vectorizer compiled into this build.
    pub fn new(config: &Config) -> Self {
        Self::with_vectorizer(config.limits.clone(), config.analysis.clone(), default_vectorizer())
    }

    pub fn with_vectorizer(
        limits: LimitsConfig,
        analysis: AnalysisConfig,
        vectorizer: Arc<dyn Vectorizer>,
    ) -> Self {
        Self {
            gate: ValidationGate::new(limits),
            analysis,
            encoder: Encoder::new(vectorizer),
        }
    }

    pub fn gate(&self) -> &ValidationGate {
        &self.gate
    }

    /// Validate, decode, edit and encode one image.
    pub fn process(&self, bytes: &[u8], config: &ProcessingConfig) -> PipelineResult<ProcessedImage> {
        let start = Instant::now();

        let image = self.gate.validate(bytes)?;
        tracing::trace!("  Validate+decode: {:?}", start.elapsed());

        let original_dimensions = image.dimensions();
        let has_transparency = image.has_transparency();

        // Palette comes from the source, before any edit
        let dominant_colors = if config.extract_colors {
            let analysis_start = Instant::now();
            let colors = stages::dominant_colors(
                &image.pixels,
                self.analysis.dominant_colors,
                self.analysis.palette_canvas,
            );
            tracing::trace!("  Dominant colors: {:?}", analysis_start.elapsed());
            Some(colors)
        } else {
            None
        };

        let image = self.transform(image, config)?;

        // Histogram reflects what gets delivered
        let histogram = config.show_histogram.then(|| stages::histogram(&image.pixels));

        let encode_start = Instant::now();
        let bytes = self.encoder.encode(&image, &EncodeOptions::from(config))?;
        tracing::trace!("  Encode: {:?}", encode_start.elapsed());

        tracing::debug!(
            "Processed {}x{} {} -> {} ({} bytes) in {:?}",
            original_dimensions.0,
            original_dimensions.1,
            image.metadata.format,
            config.output_format,
            bytes.len(),
            start.elapsed()
        );

        Ok(ProcessedImage {
            byte_size: bytes.len() as u64,
            bytes,
            format: config.output_format,
            original_dimensions,
            has_transparency,
            dominant_colors,
            histogram,
        })
    }

    /// Apply the editing stages to an already decoded image.
    pub fn transform(&self, image: Image, config: &ProcessingConfig) -> PipelineResult<Image> {
        let Image {
            mut pixels,
            metadata,
        } = image;

        if config.has_enhancements() {
            let t = Instant::now();
            pixels = stages::enhance(
                pixels,
                config.brightness,
                config.contrast,
                config.saturation,
                config.sharpness,
            );
            tracing::trace!("  Enhance: {:?}", t.elapsed());
        }

        if let Some(filter) = &config.filter {
            let t = Instant::now();
            pixels = stages::apply_filter(pixels, filter);
            tracing::trace!("  Filter {}: {:?}", filter.name(), t.elapsed());
        }

        if config.has_geometry() {
            pixels = stages::geometric_transform(
                pixels,
                config.rotate,
                config.flip_h,
                config.flip_v,
                config.grayscale,
            );
        }

        if let Some(crop) = &config.crop {
            pixels = stages::crop(pixels, crop);
        }

        if let Some(block_size) = config.pixelate {
            pixels = stages::pixelate(pixels, block_size);
        }

        if let Some(spec) = &config.transparency {
            pixels = stages::replace_color_with_transparency(pixels, spec.color, spec.tolerance);
        }

        if let Some(spec) = &config.watermark {
            let t = Instant::now();
            pixels = stages::watermark(pixels, spec)?;
            tracing::trace!("  Watermark: {:?}", t.elapsed());
        }

        if let Some(spec) = &config.resize {
            let t = Instant::now();
            pixels = stages::resize(pixels, spec, self.gate.limits().max_image_dimension)?;
            tracing::trace!("  Resize: {:?}", t.elapsed());
        }

        Ok(Image::new(pixels, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CropSpec, ResizeSpec, Rotation, TransparencySpec, WatermarkSpec};
    use crate::error::{ErrorKind, PipelineError};
    use crate::types::{ImageMetadata, SourceFormat, TargetFormat};
    use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn runner() -> PipelineRunner {
        PipelineRunner::new(&Config::default())
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 3) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
        }))
    }

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn png_config() -> ProcessingConfig {
        ProcessingConfig {
            output_format: TargetFormat::Png,
            ..ProcessingConfig::default()
        }
    }

    #[test]
    fn test_identity_config_preserves_pixels() {
        let source = gradient(40, 30);
        let result = runner().process(&png_bytes(&source), &png_config()).unwrap();
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!(decoded.to_rgb8(), source.to_rgb8());
        assert_eq!(result.original_dimensions, (40, 30));
        assert_eq!(result.byte_size, result.bytes.len() as u64);
        assert!(result.dominant_colors.is_none());
        assert!(result.histogram.is_none());
    }

    #[test]
    fn test_transform_identity_is_noop() {
        let pixels = gradient(12, 9);
        let image = Image::new(pixels.clone(), ImageMetadata::new(SourceFormat::Png));
        let out = runner().transform(image, &ProcessingConfig::default()).unwrap();
        assert_eq!(out.pixels, pixels);
    }

    #[test]
    fn test_crop_before_resize() {
        let config = ProcessingConfig {
            crop: Some(CropSpec::Aspect {
                width: 1,
                height: 1,
            }),
            resize: Some(ResizeSpec {
                width: Some(50),
                ..ResizeSpec::default()
            }),
            ..png_config()
        };
        let result = runner().process(&png_bytes(&gradient(200, 100)), &config).unwrap();
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (50, 50));
        assert_eq!(result.original_dimensions, (200, 100));
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let config = ProcessingConfig {
            rotate: Rotation::Cw90,
            ..png_config()
        };
        let result = runner().process(&png_bytes(&gradient(30, 10)), &config).unwrap();
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (10, 30));
    }

    #[test]
    fn test_palette_reads_source_histogram_reads_output() {
        let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 20, Rgb([255, 0, 0])));
        let config = ProcessingConfig {
            grayscale: true,
            extract_colors: true,
            show_histogram: true,
            ..png_config()
        };
        let result = runner().process(&png_bytes(&red), &config).unwrap();
        assert_eq!(result.dominant_colors, Some(vec!["#ff0000".to_string()]));

        // Grayscale output: every channel lands in the same bucket
        let histogram = result.histogram.unwrap();
        assert_eq!(histogram.red[255], 0);
        assert_eq!(histogram.red, histogram.green);
        assert_eq!(histogram.green, histogram.blue);
    }

    #[test]
    fn test_transparency_reported_from_source() {
        let config = ProcessingConfig {
            transparency: Some(TransparencySpec {
                color: [255, 0, 0],
                tolerance: 10,
            }),
            ..png_config()
        };
        let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 0, 0])));
        let result = runner().process(&png_bytes(&red), &config).unwrap();
        assert!(!result.has_transparency);

        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert!(decoded.to_rgba8().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_watermark_length_fails_job() {
        let config = ProcessingConfig {
            watermark: Some(WatermarkSpec {
                text: "x".repeat(1001),
                ..WatermarkSpec::default()
            }),
            ..png_config()
        };
        let err = runner().process(&png_bytes(&gradient(10, 10)), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_resize_over_cap_fails_job() {
        let config = ProcessingConfig {
            resize: Some(ResizeSpec {
                percentage: Some(10_000.0),
                ..ResizeSpec::default()
            }),
            ..png_config()
        };
        let err = runner().process(&png_bytes(&gradient(100, 100)), &config).unwrap_err();
        assert!(matches!(err, PipelineError::Dimension { .. }));
    }

    #[test]
    fn test_garbage_fails_before_stages() {
        let err = runner().process(b"definitely not an image", &png_config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
