//! Grayscale, quarter-turn rotation and flips.

use image::DynamicImage;

use crate::config::Rotation;

/// Apply the geometric edits in their fixed order: grayscale, rotation,
/// horizontal flip, vertical flip.
///
/// Grayscale drops to one channel and promotes back to RGB so later stages
/// see a uniform three-channel raster. Rotation is clockwise.
pub fn geometric_transform(
    image: DynamicImage,
    rotation: Rotation,
    flip_h: bool,
    flip_v: bool,
    grayscale: bool,
) -> DynamicImage {
    let mut image = image;
    if grayscale {
        image = DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(image.to_luma8()).to_rgb8());
    }
    image = match rotation {
        Rotation::None => image,
        Rotation::Cw90 => image.rotate90(),
        Rotation::Cw180 => image.rotate180(),
        Rotation::Cw270 => image.rotate270(),
    };
    if flip_h {
        image = image.fliph();
    }
    if flip_v {
        image = image.flipv();
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, GenericImageView, Rgb, RgbImage};

    /// 3x2 image with a red marker in the top-left corner.
    fn marked() -> DynamicImage {
        let mut img = RgbImage::from_pixel(3, 2, Rgb([0, 0, 0]));
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        DynamicImage::ImageRgb8(img)
    }

    fn marker_position(img: &DynamicImage) -> (u32, u32) {
        let rgb = img.to_rgb8();
        let (x, y, _) = rgb
            .enumerate_pixels()
            .find(|(_, _, p)| p[0] == 255)
            .unwrap();
        (x, y)
    }

    #[test]
    fn test_rotate_90_is_clockwise() {
        let out = geometric_transform(marked(), Rotation::Cw90, false, false, false);
        assert_eq!(out.dimensions(), (2, 3));
        // Top-left moves to top-right under a clockwise quarter turn
        assert_eq!(marker_position(&out), (1, 0));
    }

    #[test]
    fn test_rotate_270() {
        let out = geometric_transform(marked(), Rotation::Cw270, false, false, false);
        assert_eq!(out.dimensions(), (2, 3));
        assert_eq!(marker_position(&out), (0, 2));
    }

    #[test]
    fn test_rotate_then_flip_order() {
        // Rotate first, then flip horizontally: (1, 0) -> (0, 0)
        let out = geometric_transform(marked(), Rotation::Cw90, true, false, false);
        assert_eq!(marker_position(&out), (0, 0));
    }

    #[test]
    fn test_flips() {
        let out = geometric_transform(marked(), Rotation::None, true, true, false);
        assert_eq!(marker_position(&out), (2, 1));
    }

    #[test]
    fn test_grayscale_promotes_to_rgb() {
        let rgba = DynamicImage::new_rgba8(4, 4);
        let out = geometric_transform(rgba, Rotation::None, false, false, true);
        assert_eq!(out.color(), ColorType::Rgb8);
        let p = out.to_rgb8().get_pixel(0, 0).0;
        assert_eq!(p[0], p[1]);
    }

    #[test]
    fn test_noop() {
        let img = marked();
        assert_eq!(
            geometric_transform(img.clone(), Rotation::None, false, false, false),
            img
        );
    }
}
