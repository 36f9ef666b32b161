//! Named convolution filters.
//!
//! The catalogue mirrors the classic photo-editor kernel set. Names are
//! matched loosely (`Edge-Enhance`, `edge_enhance` and `EDGE ENHANCE` are the
//! same filter) and anything unrecognized maps to [`FilterKind::Unknown`],
//! which is always a pass-through.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::filter::Kernel;
use serde::{Deserialize, Serialize};

use super::restore_color;

/// A filter the user asked for by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterKind {
    Blur,
    Contour,
    Detail,
    EdgeEnhance,
    EdgeEnhanceMore,
    Emboss,
    FindEdges,
    Sharpen,
    Smooth,
    SmoothMore,
    /// Unrecognized name, kept verbatim for reporting
    Unknown(String),
}

impl FilterKind {
    pub fn parse(name: &str) -> Self {
        let folded: String = name
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "blur" => FilterKind::Blur,
            "contour" => FilterKind::Contour,
            "detail" => FilterKind::Detail,
            "edgeenhance" => FilterKind::EdgeEnhance,
            "edgeenhancemore" => FilterKind::EdgeEnhanceMore,
            "emboss" => FilterKind::Emboss,
            "findedges" => FilterKind::FindEdges,
            "sharpen" => FilterKind::Sharpen,
            "smooth" => FilterKind::Smooth,
            "smoothmore" => FilterKind::SmoothMore,
            _ => FilterKind::Unknown(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FilterKind::Blur => "blur",
            FilterKind::Contour => "contour",
            FilterKind::Detail => "detail",
            FilterKind::EdgeEnhance => "edge_enhance",
            FilterKind::EdgeEnhanceMore => "edge_enhance_more",
            FilterKind::Emboss => "emboss",
            FilterKind::FindEdges => "find_edges",
            FilterKind::Sharpen => "sharpen",
            FilterKind::Smooth => "smooth",
            FilterKind::SmoothMore => "smooth_more",
            FilterKind::Unknown(name) => name,
        }
    }

    /// The kernel behind this filter; `None` for unknown names.
    pub fn kernel(&self) -> Option<&'static ConvKernel> {
        match self {
            FilterKind::Blur => Some(&BLUR),
            FilterKind::Contour => Some(&CONTOUR),
            FilterKind::Detail => Some(&DETAIL),
            FilterKind::EdgeEnhance => Some(&EDGE_ENHANCE),
            FilterKind::EdgeEnhanceMore => Some(&EDGE_ENHANCE_MORE),
            FilterKind::Emboss => Some(&EMBOSS),
            FilterKind::FindEdges => Some(&FIND_EDGES),
            FilterKind::Sharpen => Some(&SHARPEN),
            FilterKind::Smooth => Some(&SMOOTH),
            FilterKind::SmoothMore => Some(&SMOOTH_MORE),
            FilterKind::Unknown(_) => None,
        }
    }
}

impl From<String> for FilterKind {
    fn from(name: String) -> Self {
        FilterKind::parse(&name)
    }
}

impl From<FilterKind> for String {
    fn from(kind: FilterKind) -> Self {
        kind.name().to_string()
    }
}

/// Square kernel: `out = sum(weights * window) / scale + offset`.
#[derive(Debug)]
pub struct ConvKernel {
    pub size: u32,
    pub weights: &'static [f32],
    pub scale: f32,
    pub offset: f32,
}

#[rustfmt::skip]
pub const BLUR: ConvKernel = ConvKernel {
    size: 5,
    weights: &[
        1.0, 1.0, 1.0, 1.0, 1.0,
        1.0, 0.0, 0.0, 0.0, 1.0,
        1.0, 0.0, 0.0, 0.0, 1.0,
        1.0, 0.0, 0.0, 0.0, 1.0,
        1.0, 1.0, 1.0, 1.0, 1.0,
    ],
    scale: 16.0,
    offset: 0.0,
};

#[rustfmt::skip]
pub const CONTOUR: ConvKernel = ConvKernel {
    size: 3,
    weights: &[
        -1.0, -1.0, -1.0,
        -1.0,  8.0, -1.0,
        -1.0, -1.0, -1.0,
    ],
    scale: 1.0,
    offset: 255.0,
};

#[rustfmt::skip]
pub const DETAIL: ConvKernel = ConvKernel {
    size: 3,
    weights: &[
         0.0, -1.0,  0.0,
        -1.0, 10.0, -1.0,
         0.0, -1.0,  0.0,
    ],
    scale: 6.0,
    offset: 0.0,
};

#[rustfmt::skip]
pub const EDGE_ENHANCE: ConvKernel = ConvKernel {
    size: 3,
    weights: &[
        -1.0, -1.0, -1.0,
        -1.0, 10.0, -1.0,
        -1.0, -1.0, -1.0,
    ],
    scale: 2.0,
    offset: 0.0,
};

#[rustfmt::skip]
pub const EDGE_ENHANCE_MORE: ConvKernel = ConvKernel {
    size: 3,
    weights: &[
        -1.0, -1.0, -1.0,
        -1.0,  9.0, -1.0,
        -1.0, -1.0, -1.0,
    ],
    scale: 1.0,
    offset: 0.0,
};

#[rustfmt::skip]
pub const EMBOSS: ConvKernel = ConvKernel {
    size: 3,
    weights: &[
        -1.0, 0.0, 0.0,
         0.0, 1.0, 0.0,
         0.0, 0.0, 0.0,
    ],
    scale: 1.0,
    offset: 128.0,
};

#[rustfmt::skip]
pub const FIND_EDGES: ConvKernel = ConvKernel {
    size: 3,
    weights: &[
        -1.0, -1.0, -1.0,
        -1.0,  8.0, -1.0,
        -1.0, -1.0, -1.0,
    ],
    scale: 1.0,
    offset: 0.0,
};

#[rustfmt::skip]
pub const SHARPEN: ConvKernel = ConvKernel {
    size: 3,
    weights: &[
        -2.0, -2.0, -2.0,
        -2.0, 32.0, -2.0,
        -2.0, -2.0, -2.0,
    ],
    scale: 16.0,
    offset: 0.0,
};

#[rustfmt::skip]
pub const SMOOTH: ConvKernel = ConvKernel {
    size: 3,
    weights: &[
        1.0, 1.0, 1.0,
        1.0, 5.0, 1.0,
        1.0, 1.0, 1.0,
    ],
    scale: 13.0,
    offset: 0.0,
};

#[rustfmt::skip]
pub const SMOOTH_MORE: ConvKernel = ConvKernel {
    size: 5,
    weights: &[
        1.0, 1.0,  1.0, 1.0, 1.0,
        1.0, 5.0,  5.0, 5.0, 1.0,
        1.0, 5.0, 44.0, 5.0, 1.0,
        1.0, 5.0,  5.0, 5.0, 1.0,
        1.0, 1.0,  1.0, 1.0, 1.0,
    ],
    scale: 100.0,
    offset: 0.0,
};

/// Apply a named filter. Unknown names return the image untouched.
pub fn apply_filter(image: DynamicImage, kind: &FilterKind) -> DynamicImage {
    match kind.kernel() {
        Some(kernel) => convolve(&image, kernel),
        None => {
            tracing::debug!("Unknown filter {:?}, passing image through", kind.name());
            image
        }
    }
}

/// Convolve the color channels with `kernel`; alpha is carried over as-is.
///
/// Edges are padded by repeating the border pixels. The result keeps the
/// source's storage mode, with color math done at 8 bits per channel.
pub fn convolve(image: &DynamicImage, kernel: &ConvKernel) -> DynamicImage {
    let color = image.color();
    let k = Kernel::new(kernel.weights, kernel.size, kernel.size);
    let store = |channel: &mut u8, acc: f32| {
        *channel = (acc / kernel.scale + kernel.offset).round().clamp(0.0, 255.0) as u8;
    };

    let filtered = if color.has_color() {
        let rgb: RgbImage = image.to_rgb8();
        let out: RgbImage = k.filter::<Rgb<u8>, _, Rgb<u8>>(&rgb, store);
        if color.has_alpha() {
            let mut rgba = image.to_rgba8();
            for (dst, src) in rgba.pixels_mut().zip(out.pixels()) {
                dst[0] = src[0];
                dst[1] = src[1];
                dst[2] = src[2];
            }
            DynamicImage::ImageRgba8(rgba)
        } else {
            DynamicImage::ImageRgb8(out)
        }
    } else {
        let luma: GrayImage = image.to_luma8();
        let out: GrayImage = k.filter::<Luma<u8>, _, Luma<u8>>(&luma, store);
        if color.has_alpha() {
            let mut la = image.to_luma_alpha8();
            for (dst, src) in la.pixels_mut().zip(out.pixels()) {
                dst[0] = src[0];
            }
            DynamicImage::ImageLumaA8(la)
        } else {
            DynamicImage::ImageLuma8(out)
        }
    };

    restore_color(filtered, color)
}
