//! Replace one color with full transparency.
//!
//! Each color channel gets a 256-entry match table (255 when the value is
//! within `tolerance` of the target, 0 otherwise). The three tables are
//! combined multiplicatively into a per-pixel mask, which is a logical AND
//! on 0/255 values. The inverted mask scales the existing alpha, so matched
//! pixels end up at alpha 0 and everything else keeps its alpha exactly.

use image::{DynamicImage, RgbaImage};

/// Per-channel match table for `target ± tolerance`.
pub fn channel_match_lut(target: u8, tolerance: u8) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (value, entry) in lut.iter_mut().enumerate() {
        if (value as i16 - i16::from(target)).unsigned_abs() <= u16::from(tolerance) {
            *entry = 255;
        }
    }
    lut
}

/// Make every pixel within `tolerance` of `target` (on all three channels)
/// fully transparent. The result is always RGBA8.
pub fn replace_color_with_transparency(
    image: DynamicImage,
    target: [u8; 3],
    tolerance: u8,
) -> DynamicImage {
    let mut rgba: RgbaImage = image.into_rgba8();
    let luts = [
        channel_match_lut(target[0], tolerance),
        channel_match_lut(target[1], tolerance),
        channel_match_lut(target[2], tolerance),
    ];

    for pixel in rgba.chunks_exact_mut(4) {
        let mask = mul_255(
            mul_255(luts[0][pixel[0] as usize], luts[1][pixel[1] as usize]),
            luts[2][pixel[2] as usize],
        );
        pixel[3] = mul_255(pixel[3], 255 - mask);
    }

    DynamicImage::ImageRgba8(rgba)
}

/// `a * b / 255`, exact for the 0 and 255 endpoints.
#[inline]
fn mul_255(a: u8, b: u8) -> u8 {
    ((u16::from(a) * u16::from(b) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    fn solid(rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb(rgb)))
    }

    fn alphas(image: &DynamicImage) -> Vec<u8> {
        image.to_rgba8().pixels().map(|p| p[3]).collect()
    }

    #[test]
    fn test_exact_match_becomes_transparent() {
        let out = replace_color_with_transparency(solid([255, 0, 0]), [255, 0, 0], 10);
        assert!(alphas(&out).iter().all(|&a| a == 0));
    }

    #[test]
    fn test_within_tolerance_becomes_transparent() {
        let out = replace_color_with_transparency(solid([250, 0, 0]), [255, 0, 0], 10);
        assert!(alphas(&out).iter().all(|&a| a == 0));
    }

    #[test]
    fn test_other_colors_keep_alpha() {
        let out = replace_color_with_transparency(solid([0, 255, 0]), [255, 0, 0], 10);
        assert!(alphas(&out).iter().all(|&a| a == 255));
    }

    #[test]
    fn test_partial_alpha_is_preserved_exactly() {
        let img = RgbaImage::from_fn(8, 1, |x, _| Rgba([0, 0, 255, (x * 30) as u8]));
        let out = replace_color_with_transparency(DynamicImage::ImageRgba8(img.clone()), [255, 0, 0], 10);
        assert_eq!(out.to_rgba8(), img);
    }

    #[test]
    fn test_all_channels_must_match() {
        // Red and green within tolerance, blue far off
        let out = replace_color_with_transparency(solid([255, 0, 200]), [255, 0, 0], 10);
        assert!(alphas(&out).iter().all(|&a| a == 255));
    }

    #[test]
    fn test_tolerance_boundary() {
        let lut = channel_match_lut(100, 10);
        assert_eq!(lut[90], 255);
        assert_eq!(lut[110], 255);
        assert_eq!(lut[89], 0);
        assert_eq!(lut[111], 0);

        let wide = channel_match_lut(0, 255);
        assert!(wide.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_mul_255_endpoints() {
        assert_eq!(mul_255(255, 255), 255);
        assert_eq!(mul_255(255, 0), 0);
        assert_eq!(mul_255(77, 255), 77);
    }
}
