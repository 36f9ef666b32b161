//! Bottom-right text watermark.

use ab_glyph::{FontRef, PxScale};
use image::imageops;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

use super::restore_color;
use crate::config::WatermarkSpec;
use crate::error::{PipelineError, PipelineResult};

/// Longest watermark text accepted, in characters.
pub const MAX_WATERMARK_TEXT_LEN: usize = 1000;

/// Largest watermark glyph size accepted, in pixels.
pub const MAX_WATERMARK_FONT_SIZE: f32 = 1000.0;

/// Gap between the text's bounding box and the bottom-right corner.
const MARGIN: i32 = 20;

static FONT_DATA: &[u8] = include_bytes!("../../../assets/fonts/DejaVuSans.ttf");

fn load_font() -> PipelineResult<FontRef<'static>> {
    FontRef::try_from_slice(FONT_DATA).map_err(|e| PipelineError::collaborator("font", e))
}

/// Composite `spec.text` onto the bottom-right corner of `image`.
///
/// The text is drawn onto a transparent overlay, which is then alpha-blended
/// over an RGBA copy of the image. The result goes back to the source color
/// mode where that mode can hold it.
pub fn watermark(image: DynamicImage, spec: &WatermarkSpec) -> PipelineResult<DynamicImage> {
    if spec.text.is_empty() {
        return Ok(image);
    }
    if spec.text.chars().count() > MAX_WATERMARK_TEXT_LEN {
        return Err(PipelineError::Validation(
            "Watermark text exceeds maximum allowed length".to_string(),
        ));
    }
    if !(spec.font_size > 0.0 && spec.font_size <= MAX_WATERMARK_FONT_SIZE) {
        return Err(PipelineError::Validation(format!(
            "Watermark font size must be in (0, {MAX_WATERMARK_FONT_SIZE}]"
        )));
    }

    let font = load_font()?;
    let scale = PxScale::from(spec.font_size);
    let (width, height) = image.dimensions();
    let (text_w, text_h) = text_size(scale, &font, &spec.text);

    let corner = |side: u32, text: u32| {
        let side = i32::try_from(side).unwrap_or(i32::MAX);
        let text = i32::try_from(text).unwrap_or(i32::MAX);
        side.saturating_sub(text).saturating_sub(MARGIN).max(0)
    };
    let x = corner(width, text_w);
    let y = corner(height, text_h);

    let [r, g, b] = spec.color;
    let mut overlay = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 0]));
    draw_text_mut(
        &mut overlay,
        Rgba([r, g, b, spec.opacity]),
        x,
        y,
        scale,
        &font,
        &spec.text,
    );

    let color = image.color();
    let mut base = image.into_rgba8();
    imageops::overlay(&mut base, &overlay, 0, 0);

    Ok(restore_color(DynamicImage::ImageRgba8(base), color))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, Rgb, RgbImage};

    fn gray(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 40, 40])))
    }

    fn spec(text: &str) -> WatermarkSpec {
        WatermarkSpec {
            text: text.to_string(),
            ..WatermarkSpec::default()
        }
    }

    #[test]
    fn test_font_loads() {
        assert!(load_font().is_ok());
    }

    #[test]
    fn test_empty_text_is_noop() {
        let img = gray(50, 50);
        assert_eq!(watermark(img.clone(), &spec("")).unwrap(), img);
    }

    #[test]
    fn test_rejects_overlong_text() {
        let long = "a".repeat(MAX_WATERMARK_TEXT_LEN + 1);
        let err = watermark(gray(10, 10), &spec(&long)).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(err.to_string().contains("Watermark text exceeds maximum allowed length"));
    }

    #[test]
    fn test_rejects_oversized_font() {
        let mut s = spec("big");
        s.font_size = MAX_WATERMARK_FONT_SIZE * 10.0;
        let err = watermark(gray(10, 10), &s).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));

        s.font_size = f32::NAN;
        assert!(watermark(gray(10, 10), &s).is_err());
    }

    #[test]
    fn test_draws_in_bottom_right() {
        let img = gray(300, 200);
        let out = watermark(img.clone(), &spec("Retouch")).unwrap();
        assert_eq!(out.dimensions(), (300, 200));
        assert_eq!(out.color(), ColorType::Rgb8);

        let before = img.to_rgb8();
        let after = out.to_rgb8();
        let changed: Vec<(u32, u32)> = after
            .enumerate_pixels()
            .filter(|(x, y, p)| *p != before.get_pixel(*x, *y))
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!changed.is_empty());
        // Nothing lands in the top-left quadrant
        assert!(changed.iter().all(|&(x, y)| x >= 150 || y >= 100));
    }

    #[test]
    fn test_zero_opacity_leaves_pixels() {
        let img = gray(120, 80);
        let mut s = spec("hidden");
        s.opacity = 0;
        let out = watermark(img.clone(), &s).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_text_larger_than_image_is_clamped() {
        let mut s = spec("a very long watermark line");
        s.font_size = 48.0;
        let out = watermark(gray(40, 30), &s).unwrap();
        assert_eq!(out.dimensions(), (40, 30));
    }
}
