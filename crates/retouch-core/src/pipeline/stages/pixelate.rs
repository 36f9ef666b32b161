//! Blocky "8-bit" pixelation.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Shrink by `block_size` then blow back up, both with nearest-neighbor so
/// the blocks keep hard edges. Block sizes of 0 or 1 are a no-op.
pub fn pixelate(image: DynamicImage, block_size: u32) -> DynamicImage {
    if block_size <= 1 {
        return image;
    }
    let (width, height) = image.dimensions();
    let small_w = (width / block_size).max(1);
    let small_h = (height / block_size).max(1);

    image
        .resize_exact(small_w, small_h, FilterType::Nearest)
        .resize_exact(width, height, FilterType::Nearest)
}
