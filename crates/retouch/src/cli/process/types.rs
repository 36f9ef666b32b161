//! CLI enum types for the process command: output encoding and report shape.

use clap::ValueEnum;
use retouch_core::{ReportFormat, TargetFormat};

/// Encodings selectable with `--format`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[value(alias = "jpg")]
    Jpeg,
    Png,
    Webp,
    Avif,
    Bmp,
    /// Traced vector output (needs the `vectorize` feature)
    Svg,
}

impl From<OutputFormat> for TargetFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Jpeg => TargetFormat::Jpeg,
            OutputFormat::Png => TargetFormat::Png,
            OutputFormat::Webp => TargetFormat::Webp,
            OutputFormat::Avif => TargetFormat::Avif,
            OutputFormat::Bmp => TargetFormat::Bmp,
            OutputFormat::Svg => TargetFormat::Svg,
        }
    }
}

/// Report layouts selectable with `--report-format`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    /// Single JSON document
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<ReportKind> for ReportFormat {
    fn from(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Json => ReportFormat::Json,
            ReportKind::Jsonl => ReportFormat::JsonLines,
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportKind::Json => write!(f, "json"),
            ReportKind::Jsonl => write!(f, "jsonl"),
        }
    }
}
