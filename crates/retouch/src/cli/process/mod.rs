//! The `retouch process` command for batch editing.

mod batch;
pub mod types;

pub use types::{OutputFormat, ReportKind};

use anyhow::Context;
use clap::Args;
use retouch_core::config::{CropSpec, ResizeSpec, Rotation, TransparencySpec, WatermarkSpec};
use retouch_core::pipeline::stages::FilterKind;
use retouch_core::{Config, ProcessingConfig, Retouch, MAX_WORKERS};
use std::path::PathBuf;

use batch::{process_batch, read_jobs};

/// Arguments for the `process` command.
///
/// Every edit flag is optional. When a `--recipe` file is given, flags that
/// are set override the matching recipe fields and everything else comes
/// from the recipe.
#[derive(Args, Debug, Default)]
pub struct ProcessArgs {
    /// Image files or directories to process
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// TOML recipe file holding the edit to apply
    #[arg(short, long)]
    pub recipe: Option<PathBuf>,

    /// Directory for processed images (defaults to `[output] dir`)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// File name prefix for processed images (defaults to `[output] prefix`)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Output encoding
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Encoder quality, 0-100
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub quality: Option<u8>,

    /// Use lossless encoding where the format supports it
    #[arg(long)]
    pub lossless: bool,

    /// Forward EXIF and ICC metadata instead of stripping it
    #[arg(long)]
    pub keep_metadata: bool,

    /// Skip the extra encoder effort spent on smaller files
    #[arg(long)]
    pub no_optimize: bool,

    /// Brightness factor (1.0 leaves the image unchanged)
    #[arg(long)]
    pub brightness: Option<f32>,

    /// Contrast factor (1.0 leaves the image unchanged)
    #[arg(long)]
    pub contrast: Option<f32>,

    /// Saturation factor (1.0 leaves the image unchanged)
    #[arg(long)]
    pub saturation: Option<f32>,

    /// Sharpness factor (1.0 leaves the image unchanged)
    #[arg(long)]
    pub sharpness: Option<f32>,

    /// Named filter, e.g. blur, sharpen, emboss, find_edges
    #[arg(long)]
    pub filter: Option<String>,

    /// Clockwise rotation in degrees: 0, 90, 180 or 270
    #[arg(long)]
    pub rotate: Option<u16>,

    /// Mirror left to right
    #[arg(long)]
    pub flip_h: bool,

    /// Mirror top to bottom
    #[arg(long)]
    pub flip_v: bool,

    /// Convert to grayscale
    #[arg(long)]
    pub grayscale: bool,

    /// Center crop to an aspect ratio, e.g. 16:9
    #[arg(long, value_name = "W:H", value_parser = parse_aspect)]
    pub crop_aspect: Option<(i64, i64)>,

    /// Pixelation block size in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub pixelate: Option<u32>,

    /// Make this color transparent, e.g. "#ffffff"
    #[arg(long, value_name = "COLOR", value_parser = parse_hex_color)]
    pub transparent: Option<[u8; 3]>,

    /// Per-channel tolerance for --transparent
    #[arg(long, default_value = "10")]
    pub tolerance: u8,

    /// Watermark text drawn in the bottom-right corner
    #[arg(long)]
    pub watermark: Option<String>,

    /// Resize to this width
    #[arg(long)]
    pub width: Option<u32>,

    /// Resize to this height
    #[arg(long)]
    pub height: Option<u32>,

    /// Resize by percentage of the source size
    #[arg(long)]
    pub scale: Option<f64>,

    /// Allow --width and --height to distort the aspect ratio
    #[arg(long)]
    pub stretch: bool,

    /// Report the dominant colors of each source image
    #[arg(long)]
    pub colors: bool,

    /// Report the RGB histogram of each processed image
    #[arg(long)]
    pub histogram: bool,

    /// Write a machine-readable report of every job to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report layout (defaults to the report file's extension)
    #[arg(long, value_enum)]
    pub report_format: Option<ReportKind>,

    /// Maximum number of parallel workers
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs, mut config: Config) -> anyhow::Result<()> {
    let recipe = build_recipe(&args)?;

    if let Some(workers) = args.workers {
        config.batch.max_workers = workers.clamp(1, MAX_WORKERS);
    }
    let output_dir = match &args.output_dir {
        Some(dir) => PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).into_owned()),
        None => config.output_dir(),
    };
    let prefix = args
        .prefix
        .clone()
        .unwrap_or_else(|| config.output.prefix.clone());

    let retouch = Retouch::new(config);
    let files = retouch.discover(&args.inputs);
    if files.is_empty() {
        tracing::warn!("No supported image files found in {:?}", args.inputs);
        return Ok(());
    }
    tracing::info!("Found {} image(s) to process", files.len());

    let jobs = read_jobs(&files)?;
    process_batch(&retouch, &args, jobs, recipe, &output_dir, &prefix).await
}

/// Merge the recipe file (if any) with the command-line flags and validate
/// the result once.
pub(crate) fn build_recipe(args: &ProcessArgs) -> anyhow::Result<ProcessingConfig> {
    let mut recipe = match &args.recipe {
        Some(path) => ProcessingConfig::load_from(path)
            .with_context(|| format!("Failed to load recipe {}", path.display()))?,
        None => ProcessingConfig::default(),
    };

    if let Some(format) = args.format {
        recipe.output_format = format.into();
    }
    if let Some(quality) = args.quality {
        recipe.quality = quality;
    }
    recipe.lossless |= args.lossless;
    if args.keep_metadata {
        recipe.strip_metadata = false;
    }
    if args.no_optimize {
        recipe.optimize = false;
    }

    for (flag, field) in [
        (args.brightness, &mut recipe.brightness),
        (args.contrast, &mut recipe.contrast),
        (args.saturation, &mut recipe.saturation),
        (args.sharpness, &mut recipe.sharpness),
    ] {
        if let Some(value) = flag {
            *field = value;
        }
    }

    if let Some(name) = &args.filter {
        recipe.filter = Some(FilterKind::parse(name));
    }
    if let Some(degrees) = args.rotate {
        recipe.rotate = Rotation::try_from(degrees).map_err(anyhow::Error::msg)?;
    }
    recipe.flip_h |= args.flip_h;
    recipe.flip_v |= args.flip_v;
    recipe.grayscale |= args.grayscale;

    if let Some((width, height)) = args.crop_aspect {
        recipe.crop = Some(CropSpec::Aspect { width, height });
    }
    if let Some(block) = args.pixelate {
        recipe.pixelate = Some(block);
    }
    if let Some(color) = args.transparent {
        recipe.transparency = Some(TransparencySpec {
            color,
            tolerance: args.tolerance,
        });
    }
    if let Some(text) = &args.watermark {
        let base = recipe.watermark.clone().unwrap_or_default();
        recipe.watermark = Some(WatermarkSpec {
            text: text.clone(),
            ..base
        });
    }

    if args.scale.is_some() || args.width.is_some() || args.height.is_some() {
        recipe.resize = Some(ResizeSpec {
            percentage: args.scale,
            width: args.width,
            height: args.height,
            maintain_aspect: !args.stretch,
        });
    }

    recipe.extract_colors |= args.colors;
    recipe.show_histogram |= args.histogram;

    recipe.validate()?;
    Ok(recipe)
}

/// Parse `W:H` (also accepts `W/H` and `WxH`).
fn parse_aspect(value: &str) -> Result<(i64, i64), String> {
    let (w, h) = value
        .split_once([':', '/', 'x'])
        .ok_or_else(|| format!("expected W:H, got '{value}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<i64>()
            .map_err(|_| format!("'{part}' is not a whole number"))
    };
    Ok((parse(w)?, parse(h)?))
}

/// Parse `#rrggbb` or `rrggbb`.
fn parse_hex_color(value: &str) -> Result<[u8; 3], String> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(format!("expected a color like #ff0000, got '{value}'"));
    }
    let mut rgb = [0u8; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        *channel = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| format!("'{value}' is not a hex color"))?;
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use retouch_core::TargetFormat;

    #[test]
    fn test_parse_aspect() {
        assert_eq!(parse_aspect("16:9"), Ok((16, 9)));
        assert_eq!(parse_aspect("4x3"), Ok((4, 3)));
        assert_eq!(parse_aspect("0:5"), Ok((0, 5)));
        assert!(parse_aspect("wide").is_err());
        assert!(parse_aspect("a:b").is_err());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff0000"), Ok([255, 0, 0]));
        assert_eq!(parse_hex_color("00FF80"), Ok([0, 255, 128]));
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
    }

    #[test]
    fn test_build_recipe_defaults_to_identity() {
        let recipe = build_recipe(&ProcessArgs::default()).unwrap();
        assert_eq!(recipe, ProcessingConfig::default());
    }

    #[test]
    fn test_build_recipe_applies_flags() {
        let args = ProcessArgs {
            format: Some(OutputFormat::Webp),
            quality: Some(60),
            brightness: Some(1.2),
            rotate: Some(90),
            crop_aspect: Some((1, 1)),
            transparent: Some([255, 255, 255]),
            tolerance: 5,
            width: Some(800),
            watermark: Some("(c) me".to_string()),
            ..ProcessArgs::default()
        };
        let recipe = build_recipe(&args).unwrap();

        assert_eq!(recipe.output_format, TargetFormat::Webp);
        assert_eq!(recipe.quality, 60);
        assert_eq!(recipe.brightness, 1.2);
        assert_eq!(recipe.contrast, 1.0);
        assert_eq!(recipe.rotate, Rotation::Cw90);
        assert_eq!(recipe.crop, Some(CropSpec::Aspect { width: 1, height: 1 }));
        assert_eq!(recipe.transparency.map(|t| t.tolerance), Some(5));
        let resize = recipe.resize.unwrap();
        assert_eq!(resize.width, Some(800));
        assert!(resize.maintain_aspect);
        assert_eq!(recipe.watermark.unwrap().opacity, 128);
    }

    #[test]
    fn test_build_recipe_flags_override_recipe_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edit.toml");
        std::fs::write(&path, "brightness = 1.5\ncontrast = 0.8\noutput_format = \"png\"\n").unwrap();

        let args = ProcessArgs {
            recipe: Some(path),
            contrast: Some(1.1),
            ..ProcessArgs::default()
        };
        let recipe = build_recipe(&args).unwrap();
        assert_eq!(recipe.brightness, 1.5);
        assert_eq!(recipe.contrast, 1.1);
        assert_eq!(recipe.output_format, TargetFormat::Png);
    }

    #[test]
    fn test_build_recipe_rejects_bad_values() {
        let args = ProcessArgs {
            rotate: Some(45),
            ..ProcessArgs::default()
        };
        assert!(build_recipe(&args).is_err());

        let args = ProcessArgs {
            brightness: Some(-1.0),
            ..ProcessArgs::default()
        };
        assert!(build_recipe(&args).is_err());
    }
}
