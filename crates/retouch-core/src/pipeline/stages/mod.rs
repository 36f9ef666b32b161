//! Transform stages: pure `image -> image` operations.
//!
//! Each stage takes the raster by value and hands back the edited one. None
//! of them keeps state between calls, so the runner can skip any of them
//! outright when the recipe leaves it unset.
//!
//! - **enhance**: brightness/contrast (fused LUT), saturation, sharpness
//! - **filter**: named convolution kernels
//! - **geometry**: grayscale, quarter-turn rotation, flips
//! - **crop**: pixel box or aspect-ratio center crop
//! - **pixelate**: nearest-neighbor block effect
//! - **alpha**: knock a color out to transparency
//! - **watermark**: bottom-right text overlay
//! - **resize**: Lanczos resampling under the dimension cap
//! - **analysis**: dominant colors and histogram (read-only)

pub mod alpha;
pub mod analysis;
pub mod crop;
pub mod enhance;
pub mod filter;
pub mod geometry;
pub mod pixelate;
pub mod resize;
pub mod watermark;

pub use alpha::replace_color_with_transparency;
pub use analysis::{dominant_colors, histogram};
pub use crop::{center_crop_to_aspect, crop, crop_box};
pub use enhance::{enhance, EnhancementCompositor};
pub use filter::{apply_filter, FilterKind};
pub use geometry::geometric_transform;
pub use pixelate::pixelate;
pub use resize::{resize, target_dimensions};
pub use watermark::{watermark, MAX_WATERMARK_FONT_SIZE, MAX_WATERMARK_TEXT_LEN};

use image::{ColorType, DynamicImage};

/// Convert `image` into the storage mode described by `color`.
///
/// Modes that cannot be represented directly fall back to RGBA8, which can
/// hold anything the stages produce.
pub(crate) fn restore_color(image: DynamicImage, color: ColorType) -> DynamicImage {
    if image.color() == color {
        return image;
    }
    match color {
        ColorType::L8 => DynamicImage::ImageLuma8(image.to_luma8()),
        ColorType::La8 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        ColorType::Rgb8 => DynamicImage::ImageRgb8(image.to_rgb8()),
        ColorType::Rgba8 => DynamicImage::ImageRgba8(image.to_rgba8()),
        ColorType::L16 => DynamicImage::ImageLuma16(image.to_luma16()),
        ColorType::La16 => DynamicImage::ImageLumaA16(image.to_luma_alpha16()),
        ColorType::Rgb16 => DynamicImage::ImageRgb16(image.to_rgb16()),
        ColorType::Rgba16 => DynamicImage::ImageRgba16(image.to_rgba16()),
        ColorType::Rgb32F => DynamicImage::ImageRgb32F(image.to_rgb32f()),
        ColorType::Rgba32F => DynamicImage::ImageRgba32F(image.to_rgba32f()),
        _ => DynamicImage::ImageRgba8(image.to_rgba8()),
    }
}

/// Whether every channel of `color` is stored as one byte.
pub(crate) fn is_byte_per_channel(color: ColorType) -> bool {
    matches!(
        color,
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8
    )
}
