//! Lanczos resize under the dimension cap.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::config::ResizeSpec;
use crate::error::{PipelineError, PipelineResult};

/// Work out the output size for `spec` applied to a `width` x `height`
/// source, or `None` when no size is requested.
///
/// Sizes are computed in `u64` so an absurd percentage cannot wrap before
/// the cap check in [`resize`] sees it.
pub fn target_dimensions(width: u32, height: u32, spec: &ResizeSpec) -> Option<(u64, u64)> {
    let (w, h) = (f64::from(width), f64::from(height));

    if let Some(percentage) = spec.percentage {
        let scale = percentage / 100.0;
        return Some(((w * scale) as u64, (h * scale) as u64));
    }

    match (spec.width, spec.height) {
        (Some(box_w), Some(box_h)) if spec.maintain_aspect => Some(fit_within(width, height, box_w, box_h)),
        (Some(box_w), Some(box_h)) => Some((u64::from(box_w), u64::from(box_h))),
        (Some(new_w), None) => {
            let new_h = if spec.maintain_aspect {
                (h * (f64::from(new_w) / w)) as u64
            } else {
                u64::from(height)
            };
            Some((u64::from(new_w), new_h))
        }
        (None, Some(new_h)) => {
            let new_w = if spec.maintain_aspect {
                (w * (f64::from(new_h) / h)) as u64
            } else {
                u64::from(width)
            };
            Some((new_w, u64::from(new_h)))
        }
        (None, None) => None,
    }
}

/// Largest size that keeps the source ratio and fits inside the box. Never
/// upscales.
fn fit_within(width: u32, height: u32, box_w: u32, box_h: u32) -> (u64, u64) {
    let box_w = box_w.min(width);
    let box_h = box_h.min(height);
    let (w, h) = (f64::from(width), f64::from(height));
    let ratio = (f64::from(box_w) / w).min(f64::from(box_h) / h);

    let new_w = ((w * ratio).round() as u64).clamp(1, u64::from(box_w.max(1)));
    let new_h = ((h * ratio).round() as u64).clamp(1, u64::from(box_h.max(1)));
    (new_w, new_h)
}

/// Resample `image` per `spec`, rejecting any target larger than
/// `max_dimension` on either side.
pub fn resize(image: DynamicImage, spec: &ResizeSpec, max_dimension: u32) -> PipelineResult<DynamicImage> {
    let (width, height) = image.dimensions();
    let Some((new_w, new_h)) = target_dimensions(width, height, spec) else {
        return Ok(image);
    };

    let cap = u64::from(max_dimension);
    if new_w > cap || new_h > cap {
        return Err(PipelineError::Dimension {
            width: new_w,
            height: new_h,
            max_dim: max_dimension,
        });
    }
    if new_w == 0 || new_h == 0 {
        return Err(PipelineError::Validation(format!(
            "Resize target {new_w}x{new_h} has a zero dimension"
        )));
    }
    if (new_w, new_h) == (u64::from(width), u64::from(height)) {
        return Ok(image);
    }

    Ok(image.resize_exact(new_w as u32, new_h as u32, FilterType::Lanczos3))
}
