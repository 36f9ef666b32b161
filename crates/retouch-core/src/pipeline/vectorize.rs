//! Raster-to-SVG collaborator.
//!
//! The encoder hands the finished raster to a [`Vectorizer`] and treats the
//! returned SVG as an opaque text payload. With the `vectorize` feature the
//! default implementation is [`VtracerVectorizer`]; without it, SVG output
//! fails per job with a collaborator error.

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;

/// Curve segments shorter than this are merged.
pub const LENGTH_THRESHOLD: f64 = 4.0;
/// Iteration cap for curve fitting.
pub const MAX_ITERATIONS: usize = 10;
/// Angle (degrees) above which a spline is split.
pub const SPLICE_THRESHOLD: i32 = 45;
/// Decimal places kept in path coordinates.
pub const PATH_PRECISION: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Color,
    Binary,
}

/// How overlapping shapes are layered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hierarchical {
    #[default]
    Stacked,
    Cutout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveMode {
    Pixel,
    Polygon,
    #[default]
    Spline,
}

/// The tunable tracing parameters. Everything else uses the fixed
/// constants above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorParams {
    pub color_mode: ColorMode,
    pub hierarchical: Hierarchical,
    pub mode: CurveMode,
    /// Discard patches smaller than this many pixels
    pub filter_speckle: usize,
    /// Significant bits per RGB channel
    pub color_precision: i32,
    /// Color difference between gradient layers
    pub layer_difference: i32,
    /// Minimum angle (degrees) to count as a corner
    pub corner_threshold: i32,
}

impl Default for VectorParams {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::Color,
            hierarchical: Hierarchical::Stacked,
            mode: CurveMode::Spline,
            filter_speckle: 4,
            color_precision: 6,
            layer_difference: 16,
            corner_threshold: 60,
        }
    }
}

/// Turns a raster into SVG text.
pub trait Vectorizer: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    fn vectorize(&self, image: &DynamicImage, params: &VectorParams) -> PipelineResult<String>;
}

/// The vectorizer compiled into this build.
pub fn default_vectorizer() -> Arc<dyn Vectorizer> {
    #[cfg(feature = "vectorize")]
    {
        Arc::new(VtracerVectorizer)
    }
    #[cfg(not(feature = "vectorize"))]
    {
        Arc::new(Unavailable)
    }
}

/// Stand-in used when no tracing backend is compiled in.
#[cfg(not(feature = "vectorize"))]
struct Unavailable;

#[cfg(not(feature = "vectorize"))]
impl Vectorizer for Unavailable {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn vectorize(&self, _image: &DynamicImage, _params: &VectorParams) -> PipelineResult<String> {
        Err(crate::error::PipelineError::collaborator(
            "vectorize",
            "SVG output requires building with the `vectorize` feature",
        ))
    }
}

#[cfg(feature = "vectorize")]
pub use self::vtracer_backend::VtracerVectorizer;

#[cfg(feature = "vectorize")]
mod vtracer_backend {
    use image::{DynamicImage, ImageFormat};
    use visioncortex::PathSimplifyMode;

    use super::*;
    use crate::error::PipelineError;

    /// File-in/file-out tracing through vtracer.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct VtracerVectorizer;

    impl VtracerVectorizer {
        fn config(params: &VectorParams) -> vtracer::Config {
            vtracer::Config {
                color_mode: match params.color_mode {
                    ColorMode::Color => vtracer::ColorMode::Color,
                    ColorMode::Binary => vtracer::ColorMode::Binary,
                },
                hierarchical: match params.hierarchical {
                    Hierarchical::Stacked => vtracer::Hierarchical::Stacked,
                    Hierarchical::Cutout => vtracer::Hierarchical::Cutout,
                },
                mode: match params.mode {
                    CurveMode::Pixel => PathSimplifyMode::None,
                    CurveMode::Polygon => PathSimplifyMode::Polygon,
                    CurveMode::Spline => PathSimplifyMode::Spline,
                },
                filter_speckle: params.filter_speckle,
                color_precision: params.color_precision,
                layer_difference: params.layer_difference,
                corner_threshold: params.corner_threshold,
                length_threshold: LENGTH_THRESHOLD,
                max_iterations: MAX_ITERATIONS,
                splice_threshold: SPLICE_THRESHOLD,
                path_precision: Some(PATH_PRECISION),
            }
        }
    }

    impl Vectorizer for VtracerVectorizer {
        fn name(&self) -> &str {
            "vtracer"
        }

        fn vectorize(&self, image: &DynamicImage, params: &VectorParams) -> PipelineResult<String> {
            let fail = |e: &dyn std::fmt::Display| PipelineError::collaborator("vectorize", e);

            let input = tempfile::Builder::new()
                .prefix("retouch-")
                .suffix(".png")
                .tempfile()
                .map_err(|e| fail(&e))?;
            let output = tempfile::Builder::new()
                .prefix("retouch-")
                .suffix(".svg")
                .tempfile()
                .map_err(|e| fail(&e))?;

            DynamicImage::ImageRgba8(image.to_rgba8())
                .save_with_format(input.path(), ImageFormat::Png)
                .map_err(|e| fail(&e))?;

            vtracer::convert_image_to_svg(input.path(), output.path(), Self::config(params))
                .map_err(|e| fail(&e))?;

            std::fs::read_to_string(output.path()).map_err(|e| fail(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = VectorParams::default();
        assert_eq!(params.color_mode, ColorMode::Color);
        assert_eq!(params.hierarchical, Hierarchical::Stacked);
        assert_eq!(params.mode, CurveMode::Spline);
        assert_eq!(params.filter_speckle, 4);
        assert_eq!(params.color_precision, 6);
        assert_eq!(params.layer_difference, 16);
        assert_eq!(params.corner_threshold, 60);
    }

    #[test]
    fn test_params_deserialize_partial() {
        let params: VectorParams =
            toml::from_str("color_mode = \"binary\"\nmode = \"polygon\"").unwrap();
        assert_eq!(params.color_mode, ColorMode::Binary);
        assert_eq!(params.mode, CurveMode::Polygon);
        assert_eq!(params.filter_speckle, 4);
    }

    #[cfg(not(feature = "vectorize"))]
    #[test]
    fn test_unavailable_reports_collaborator_error() {
        use crate::error::ErrorKind;

        let vectorizer = default_vectorizer();
        let err = vectorizer
            .vectorize(&DynamicImage::new_rgb8(2, 2), &VectorParams::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Collaborator);
    }

    #[cfg(feature = "vectorize")]
    #[test]
    fn test_vtracer_produces_svg() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(16, 16, |x, _| {
            if x < 8 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        }));
        let svg = default_vectorizer()
            .vectorize(&img, &VectorParams::default())
            .unwrap();
        assert!(svg.contains("<svg"));
    }
}
