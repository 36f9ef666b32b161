//! Read-only analysis: dominant colors and channel histogram.
//!
//! Neither function touches the image it is given. The runner calls
//! [`dominant_colors`] on the source as decoded and [`histogram`] on the
//! finished raster.

use std::collections::HashMap;

use image::imageops::FilterType;
use image::DynamicImage;

use crate::types::Histogram;

/// A run of distinct colors with their pixel counts.
type ColorBox = Vec<([u8; 3], u32)>;

/// Up to `k` representative colors as `#rrggbb`, most common first.
///
/// The image is first shrunk to a `canvas` x `canvas` square with
/// nearest-neighbor sampling, then quantized by median cut over its
/// distinct colors.
pub fn dominant_colors(image: &DynamicImage, k: usize, canvas: u32) -> Vec<String> {
    if k == 0 {
        return Vec::new();
    }
    let canvas = canvas.max(1);
    let small = image.resize_exact(canvas, canvas, FilterType::Nearest).to_rgb8();

    let mut counts: HashMap<[u8; 3], u32> = HashMap::new();
    for pixel in small.pixels() {
        *counts.entry(pixel.0).or_insert(0) += 1;
    }
    let mut colors: ColorBox = counts.into_iter().collect();
    colors.sort_unstable();

    let mut boxes = median_cut(colors, k);
    boxes.sort_by(|a, b| b.1.cmp(&a.1));

    let mut hexes: Vec<String> = Vec::with_capacity(boxes.len());
    for (color, _) in boxes {
        let hex = format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2]);
        if !hexes.contains(&hex) {
            hexes.push(hex);
        }
    }
    hexes
}

/// Split `colors` into at most `k` boxes and return each box's weighted
/// mean color with its total pixel count.
fn median_cut(colors: ColorBox, k: usize) -> Vec<([u8; 3], u32)> {
    let mut boxes: Vec<ColorBox> = vec![colors];

    while boxes.len() < k {
        let widest = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.len() > 1)
            .map(|(i, b)| {
                let (channel, range) = widest_channel(b);
                (i, channel, range)
            })
            .max_by_key(|&(_, _, range)| range);

        let Some((index, channel, _)) = widest else {
            break;
        };

        let mut target = boxes.swap_remove(index);
        target.sort_by_key(|(color, _)| color[channel]);
        let upper = target.split_off(target.len() / 2);
        boxes.push(target);
        boxes.push(upper);
    }

    boxes.iter().filter(|b| !b.is_empty()).map(|b| mean_color(b)).collect()
}

fn widest_channel(colors: &[([u8; 3], u32)]) -> (usize, u8) {
    let mut best = (0, 0);
    for channel in 0..3 {
        let (lo, hi) = colors.iter().fold((u8::MAX, u8::MIN), |(lo, hi), (c, _)| {
            (lo.min(c[channel]), hi.max(c[channel]))
        });
        let range = hi.saturating_sub(lo);
        if range > best.1 {
            best = (channel, range);
        }
    }
    best
}

fn mean_color(colors: &[([u8; 3], u32)]) -> ([u8; 3], u32) {
    let mut sums = [0u64; 3];
    let mut total = 0u64;
    for (color, count) in colors {
        let count = u64::from(*count);
        for channel in 0..3 {
            sums[channel] += u64::from(color[channel]) * count;
        }
        total += count;
    }
    let total_nz = total.max(1);
    let mean = sums.map(|s| ((s + total_nz / 2) / total_nz) as u8);
    (mean, total as u32)
}

/// 256-bucket counts for each of red, green and blue over an RGB view of
/// `image`.
pub fn histogram(image: &DynamicImage) -> Histogram {
    let rgb = image.to_rgb8();
    let mut red = vec![0u32; 256];
    let mut green = vec![0u32; 256];
    let mut blue = vec![0u32; 256];
    for pixel in rgb.pixels() {
        red[pixel[0] as usize] += 1;
        green[pixel[1] as usize] += 1;
        blue[pixel[2] as usize] += 1;
    }
    Histogram { red, green, blue }
}
