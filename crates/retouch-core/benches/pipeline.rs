//! Benchmarks for the Retouch image editing pipeline.
//!
//! Run with: cargo bench -p retouch-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use retouch_core::config::{ProcessingConfig, ResizeSpec};
use retouch_core::pipeline::stages::{self, EnhancementCompositor};
use retouch_core::{Config, PipelineRunner, TargetFormat};
use std::io::Cursor;

fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

fn benchmark_enhance_fused(c: &mut Criterion) {
    let img = photo(1920, 1080);
    let compositor = EnhancementCompositor::new(1.2, 1.3);

    c.bench_function("brightness_contrast_fused", |b| {
        b.iter(|| compositor.apply_fused(black_box(img.clone())))
    });
}

fn benchmark_enhance_sequential(c: &mut Criterion) {
    let img = photo(1920, 1080);
    let compositor = EnhancementCompositor::new(1.2, 1.3);

    c.bench_function("brightness_contrast_sequential", |b| {
        b.iter(|| compositor.apply_sequential(black_box(img.clone())))
    });
}

fn benchmark_color_to_alpha(c: &mut Criterion) {
    let img = photo(1920, 1080);

    c.bench_function("color_to_alpha", |b| {
        b.iter(|| stages::replace_color_with_transparency(black_box(img.clone()), [255, 0, 0], 10))
    });
}

fn benchmark_full_pipeline(c: &mut Criterion) {
    let mut source = Cursor::new(Vec::new());
    if photo(1280, 720).write_to(&mut source, ImageFormat::Png).is_err() {
        eprintln!("Skipping pipeline benchmark: could not build source image");
        return;
    }
    let bytes = source.into_inner();

    let runner = PipelineRunner::new(&Config::default());
    let recipe = ProcessingConfig {
        brightness: 1.1,
        contrast: 1.2,
        sharpness: 1.5,
        resize: Some(ResizeSpec {
            width: Some(640),
            ..ResizeSpec::default()
        }),
        output_format: TargetFormat::Jpeg,
        ..ProcessingConfig::default()
    };

    c.bench_function("pipeline_1280x720_to_jpeg", |b| {
        b.iter(|| {
            let _ = runner.process(black_box(&bytes), &recipe);
        })
    });
}

criterion_group!(
    benches,
    benchmark_enhance_fused,
    benchmark_enhance_sequential,
    benchmark_color_to_alpha,
    benchmark_full_pipeline,
);
criterion_main!(benches);
