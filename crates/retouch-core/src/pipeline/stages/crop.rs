//! Box and aspect-ratio cropping.

use image::{DynamicImage, GenericImageView};

use crate::config::CropSpec;

pub fn crop(image: DynamicImage, spec: &CropSpec) -> DynamicImage {
    match *spec {
        CropSpec::Box {
            left,
            top,
            right,
            bottom,
        } => crop_box(image, left, top, right, bottom),
        CropSpec::Aspect { width, height } => center_crop_to_aspect(image, width, height),
    }
}

/// Crop to a pixel box, clamping it into the image.
///
/// `left`/`top` are clamped into the image; `right`/`bottom` of 0 or less
/// mean the image edge. A degenerate box is widened to one pixel instead of
/// failing.
pub fn crop_box(image: DynamicImage, left: i64, top: i64, right: i64, bottom: i64) -> DynamicImage {
    let (width, height) = image.dimensions();
    let (w, h) = (i64::from(width), i64::from(height));

    let left = left.clamp(0, w - 1);
    let top = top.clamp(0, h - 1);
    let right = if right > 0 { right } else { w };
    let bottom = if bottom > 0 { bottom } else { h };
    let right = right.min(w).max(left + 1);
    let bottom = bottom.min(h).max(top + 1);

    image.crop_imm(
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    )
}

/// Crop symmetrically around the center to hit `target_w:target_h`.
///
/// A non-positive ratio part leaves the image unchanged.
pub fn center_crop_to_aspect(image: DynamicImage, target_w: i64, target_h: i64) -> DynamicImage {
    if target_w <= 0 || target_h <= 0 {
        return image;
    }
    let (width, height) = image.dimensions();
    let target_ratio = target_w as f64 / target_h as f64;
    let current_ratio = f64::from(width) / f64::from(height);

    if current_ratio > target_ratio {
        let new_width = ((f64::from(height) * target_ratio) as u32).clamp(1, width);
        let left = (width - new_width) / 2;
        image.crop_imm(left, 0, new_width, height)
    } else {
        let new_height = ((f64::from(width) / target_ratio) as u32).clamp(1, height);
        let top = (height - new_height) / 2;
        image.crop_imm(0, top, width, new_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn canvas(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([x as u8, y as u8, 0])
        }))
    }

    #[test]
    fn test_aspect_wide_to_square() {
        let out = center_crop_to_aspect(canvas(200, 100), 1, 1);
        assert_eq!(out.dimensions(), (100, 100));
        // Symmetric: 50px trimmed from each side
        assert_eq!(out.to_rgb8().get_pixel(0, 0)[0], 50);
    }

    #[test]
    fn test_aspect_square_to_wide() {
        let out = center_crop_to_aspect(canvas(100, 100), 2, 1);
        assert_eq!(out.dimensions(), (100, 50));
        assert_eq!(out.to_rgb8().get_pixel(0, 0)[1], 25);
    }

    #[test]
    fn test_aspect_square_to_tall() {
        let out = center_crop_to_aspect(canvas(100, 100), 1, 2);
        assert_eq!(out.dimensions(), (50, 100));
    }

    #[test]
    fn test_aspect_non_positive_is_noop() {
        let img = canvas(30, 20);
        assert_eq!(center_crop_to_aspect(img.clone(), 0, 1), img);
        assert_eq!(center_crop_to_aspect(img.clone(), 1, -3), img);
    }

    #[test]
    fn test_box_zero_right_bottom_means_edge() {
        let out = crop_box(canvas(50, 40), 10, 5, 0, 0);
        assert_eq!(out.dimensions(), (40, 35));
        assert_eq!(out.to_rgb8().get_pixel(0, 0).0, [10, 5, 0]);
    }

    #[test]
    fn test_box_clamps_out_of_range() {
        let out = crop_box(canvas(50, 40), -20, -1, 500, 400);
        assert_eq!(out.dimensions(), (50, 40));
    }

    #[test]
    fn test_box_degenerate_widens_to_one_pixel() {
        let out = crop_box(canvas(50, 40), 30, 30, 10, 10);
        assert_eq!(out.dimensions(), (1, 1));
        assert_eq!(out.to_rgb8().get_pixel(0, 0).0, [30, 30, 0]);

        // Left beyond the right edge still yields a valid column
        let out = crop_box(canvas(50, 40), 80, 0, 0, 0);
        assert_eq!(out.dimensions(), (1, 40));
    }

    #[test]
    fn test_crop_dispatch() {
        let out = crop(canvas(200, 100), &CropSpec::Aspect { width: 1, height: 1 });
        assert_eq!(out.dimensions(), (100, 100));
        let out = crop(
            canvas(200, 100),
            &CropSpec::Box {
                left: 0,
                top: 0,
                right: 20,
                bottom: 10,
            },
        );
        assert_eq!(out.dimensions(), (20, 10));
    }
}
