//! Tonal enhancements: brightness, contrast, saturation, sharpness.
//!
//! Brightness and contrast are both per-channel affine maps, so when both
//! are active on an 8-bit image they collapse into one 256-entry table:
//!
//! ```text
//! slope     = brightness * contrast
//! intercept = mean_luma(original) * brightness * (1 - contrast)
//! lut[x]    = clamp(round(x * slope + intercept), 0, 255)
//! ```
//!
//! Contrast pivots around the mean luminance of the *original* image, which
//! after brightening sits at `mean * brightness`. Saturation and sharpness
//! follow as separate passes, always in that order.

use image::{ColorType, DynamicImage, GenericImageView};

use super::filter::{convolve, SMOOTH};
use super::{is_byte_per_channel, restore_color};

/// Apply all four enhancement factors (1.0 = identity) in the fixed order
/// brightness+contrast, saturation, sharpness.
pub fn enhance(
    image: DynamicImage,
    brightness: f32,
    contrast: f32,
    saturation: f32,
    sharpness: f32,
) -> DynamicImage {
    let mut image = EnhancementCompositor::new(brightness, contrast).apply(image);
    if saturation != 1.0 {
        image = saturate(image, saturation);
    }
    if sharpness != 1.0 {
        image = sharpen(image, sharpness);
    }
    image
}

/// Brightness and contrast, fused into one lookup pass when possible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhancementCompositor {
    pub brightness: f32,
    pub contrast: f32,
}

impl EnhancementCompositor {
    pub fn new(brightness: f32, contrast: f32) -> Self {
        Self {
            brightness,
            contrast,
        }
    }

    /// The fused table is only valid when both maps are active and every
    /// channel is a byte.
    pub fn can_fuse(&self, color: ColorType) -> bool {
        self.brightness != 1.0 && self.contrast != 1.0 && is_byte_per_channel(color)
    }

    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        if self.can_fuse(image.color()) {
            self.apply_fused(image)
        } else {
            self.apply_sequential(image)
        }
    }

    /// One statistics pass over the original, one table pass over the pixels.
    pub fn apply_fused(&self, image: DynamicImage) -> DynamicImage {
        let mean = mean_luminance(&image);
        let lut = fused_lut(self.brightness, self.contrast, mean);
        apply_lut(image, &lut)
    }

    /// Brightness, then contrast, evaluated per channel value without a
    /// table.
    ///
    /// The contrast pivot is the original mean scaled by brightness, and the
    /// brightened value is carried unclamped into the contrast step, so the
    /// only rounding and clipping happen once at the end.
    pub fn apply_sequential(&self, image: DynamicImage) -> DynamicImage {
        let (brightness, contrast) = (self.brightness, self.contrast);
        if brightness == 1.0 && contrast == 1.0 {
            return image;
        }
        let pivot = mean_luminance(&image) * brightness;
        let step = move |v: f32| {
            let brightened = v * brightness;
            pivot + contrast * (brightened - pivot)
        };

        if is_byte_per_channel(image.color()) {
            map_byte_channels(image, |v| step(f32::from(v)).round().clamp(0.0, 255.0) as u8)
        } else {
            map_float_channels(image, |v| step(v * 255.0) / 255.0)
        }
    }
}

/// Build the fused brightness+contrast table.
pub fn fused_lut(brightness: f32, contrast: f32, mean_luma: f32) -> [u8; 256] {
    let slope = brightness * contrast;
    let intercept = mean_luma * brightness * (1.0 - contrast);
    affine_lut(slope, intercept)
}

fn affine_lut(slope: f32, intercept: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (x, entry) in lut.iter_mut().enumerate() {
        *entry = (x as f32 * slope + intercept).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Mean of the grayscale-converted image, in 8-bit units.
pub fn mean_luminance(image: &DynamicImage) -> f32 {
    let luma = image.to_luma8();
    let count = luma.as_raw().len();
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = luma.as_raw().iter().map(|&v| u64::from(v)).sum();
    (sum as f64 / count as f64) as f32
}

/// Map every color channel of an 8-bit image through `lut`. Alpha goes
/// through an identity table.
///
/// Images that are not byte-per-channel are returned unchanged.
pub fn apply_lut(image: DynamicImage, lut: &[u8; 256]) -> DynamicImage {
    map_byte_channels(image, |v| lut[v as usize])
}

/// Apply `f` to the color channels of an 8-bit image, leaving alpha alone.
fn map_byte_channels(image: DynamicImage, f: impl Fn(u8) -> u8) -> DynamicImage {
    fn map(buf: &mut [u8], channels: usize, color_channels: usize, f: &impl Fn(u8) -> u8) {
        for pixel in buf.chunks_exact_mut(channels) {
            for value in &mut pixel[..color_channels] {
                *value = f(*value);
            }
        }
    }

    match image {
        DynamicImage::ImageLuma8(mut buf) => {
            map(&mut buf, 1, 1, &f);
            DynamicImage::ImageLuma8(buf)
        }
        DynamicImage::ImageLumaA8(mut buf) => {
            map(&mut buf, 2, 1, &f);
            DynamicImage::ImageLumaA8(buf)
        }
        DynamicImage::ImageRgb8(mut buf) => {
            map(&mut buf, 3, 3, &f);
            DynamicImage::ImageRgb8(buf)
        }
        DynamicImage::ImageRgba8(mut buf) => {
            map(&mut buf, 4, 3, &f);
            DynamicImage::ImageRgba8(buf)
        }
        other => other,
    }
}

/// Fallback for 16-bit and float storage: map color channels in `[0, 1]`.
fn map_float_channels(image: DynamicImage, f: impl Fn(f32) -> f32) -> DynamicImage {
    let color = image.color();
    let mut rgba = image.to_rgba32f();
    for pixel in rgba.pixels_mut() {
        for value in &mut pixel.0[..3] {
            *value = f(*value).clamp(0.0, 1.0);
        }
    }
    restore_color(DynamicImage::ImageRgba32F(rgba), color)
}

/// Blend between the grayscale rendition (factor 0) and the image (factor 1).
pub fn saturate(image: DynamicImage, factor: f32) -> DynamicImage {
    let color = image.color();
    if !color.has_color() {
        return image;
    }
    let gray = image.to_luma8();
    let mut rgba = image.to_rgba8();
    for (pixel, g) in rgba.pixels_mut().zip(gray.pixels()) {
        for value in &mut pixel.0[..3] {
            *value = blend(g[0], *value, factor);
        }
    }
    restore_color(DynamicImage::ImageRgba8(rgba), color)
}

/// Blend between a smoothed rendition (factor 0) and the image (factor 1);
/// factors above 1 sharpen.
pub fn sharpen(image: DynamicImage, factor: f32) -> DynamicImage {
    let color = image.color();
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return image;
    }
    let smoothed = convolve(&image, &SMOOTH).to_rgba8();
    let mut rgba = image.to_rgba8();
    for (pixel, soft) in rgba.pixels_mut().zip(smoothed.pixels()) {
        for c in 0..3 {
            pixel[c] = blend(soft[c], pixel[c], factor);
        }
    }
    restore_color(DynamicImage::ImageRgba8(rgba), color)
}

fn blend(from: u8, to: u8, factor: f32) -> u8 {
    let from = f32::from(from);
    (from + factor * (f32::from(to) - from))
        .round()
        .clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) * 3 % 256) as u8])
        }))
    }

    fn max_channel_diff(a: &DynamicImage, b: &DynamicImage) -> u8 {
        a.to_rgba8()
            .as_raw()
            .iter()
            .zip(b.to_rgba8().as_raw())
            .map(|(x, y)| x.abs_diff(*y))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_identity_is_noop() {
        let img = gradient(16, 9);
        let out = enhance(img.clone(), 1.0, 1.0, 1.0, 1.0);
        assert_eq!(out, img);
    }

    #[test]
    fn test_fused_matches_sequential_on_gray() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 20, Rgb([100, 100, 100])));
        let compositor = EnhancementCompositor::new(1.2, 1.3);
        assert!(compositor.can_fuse(img.color()));

        let fused = compositor.apply_fused(img.clone());
        let sequential = compositor.apply_sequential(img);
        assert!(max_channel_diff(&fused, &sequential) <= 1);
    }

    #[test]
    fn test_fused_matches_sequential_without_clipping() {
        // Neutral mid-tones: neither path clips at 0 or 255
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(32, 32, |x, y| {
            let v = 90 + ((x + y) % 40) as u8;
            Rgb([v, v, v])
        }));
        for (b, c) in [(1.1, 1.2), (0.8, 1.4), (1.3, 0.7), (0.9, 0.9)] {
            let compositor = EnhancementCompositor::new(b, c);
            let fused = compositor.apply_fused(img.clone());
            let sequential = compositor.apply_sequential(img.clone());
            assert!(
                max_channel_diff(&fused, &sequential) <= 1,
                "brightness {b} contrast {c} diverged"
            );
        }
    }

    #[test]
    fn test_fused_matches_sequential_with_clipping() {
        // Full ramp: strong brightness pushes the top end past 255 before
        // contrast is applied
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(256, 1, |x, _| {
            let v = x as u8;
            Rgb([v, v, v])
        }));
        for (b, c) in [(1.2, 1.3), (1.5, 0.6), (2.0, 2.0), (0.3, 0.2), (0.7, 1.5)] {
            let compositor = EnhancementCompositor::new(b, c);
            let fused = compositor.apply_fused(img.clone());
            let sequential = compositor.apply_sequential(img.clone());
            assert!(
                max_channel_diff(&fused, &sequential) <= 1,
                "brightness {b} contrast {c} diverged"
            );
        }
    }

    #[test]
    fn test_sequential_identity_is_noop() {
        let img = gradient(8, 8);
        assert_eq!(EnhancementCompositor::new(1.0, 1.0).apply_sequential(img.clone()), img);
    }

    #[test]
    fn test_fused_lut_formula() {
        let lut = fused_lut(1.2, 1.3, 100.0);
        // slope 1.56, intercept 100 * 1.2 * -0.3 = -36
        assert_eq!(lut[100], 120);
        assert_eq!(lut[0], 0);
        assert_eq!(lut[255], 255);
    }

    #[test]
    fn test_fused_leaves_alpha_alone() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([100, 150, 200, 42])));
        let out = EnhancementCompositor::new(1.5, 0.5).apply(img);
        assert!(out.to_rgba8().pixels().all(|p| p[3] == 42));
    }

    #[test]
    fn test_sixteen_bit_images_take_sequential_path() {
        let img = DynamicImage::new_rgb16(4, 4);
        let compositor = EnhancementCompositor::new(1.5, 1.5);
        assert!(!compositor.can_fuse(img.color()));
        let out = compositor.apply(img);
        assert_eq!(out.color(), ColorType::Rgb16);
    }

    #[test]
    fn test_brightness_zero_is_black() {
        let img = gradient(8, 8);
        let out = enhance(img, 0.0, 1.0, 1.0, 1.0);
        assert!(out.to_rgb8().pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_zero_saturation_is_grayscale() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([200, 40, 90])));
        let out = saturate(img, 0.0).to_rgb8();
        let p = out.get_pixel(0, 0);
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
    }

    #[test]
    fn test_saturation_ignores_gray_images() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([80])));
        assert_eq!(saturate(img.clone(), 2.0), img);
    }

    #[test]
    fn test_sharpen_flat_image_unchanged() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([12, 34, 56])));
        assert_eq!(sharpen(img.clone(), 2.0), img);
    }

    #[test]
    fn test_mean_luminance() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(2, 1, |x, _| Luma([x as u8 * 100])));
        assert_eq!(mean_luminance(&img), 50.0);
    }
}
