//! Output file naming and human-readable sizes.
//!
//! Uploaded names are untrusted. Only the sanitized stem from
//! [`safe_file_stem`] is ever used to build an output path.

use crate::types::TargetFormat;

const FALLBACK_STEM: &str = "image";

/// Reduce an untrusted file name to a bare stem.
///
/// Null bytes are dropped, both `/` and `\` count as separators, and the
/// last extension is removed. Names that end up empty or made only of dots
/// become `"image"`.
pub fn safe_file_stem(file_name: &str) -> String {
    let cleaned = file_name.replace('\0', "").replace('\\', "/");
    let base = cleaned.rsplit('/').next().unwrap_or("");

    if only_dots(base) {
        return FALLBACK_STEM.to_string();
    }

    let stem = match base.rfind('.') {
        Some(pos) => &base[..pos],
        None => base,
    };

    if only_dots(stem) {
        FALLBACK_STEM.to_string()
    } else {
        stem.to_string()
    }
}

fn only_dots(s: &str) -> bool {
    s.chars().all(|c| c == '.')
}

/// `<prefix><stem>.<ext>` for a job's output file.
pub fn output_file_name(file_name: &str, prefix: &str, format: TargetFormat) -> String {
    format!("{prefix}{}.{}", safe_file_stem(file_name), format.extension())
}

/// Format a byte count with binary units, e.g. `1536` as `"1.50 KB"`.
///
/// Negative values (a batch that grew) keep their sign.
pub fn format_bytes(size: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = size.unsigned_abs() as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let sign = if size < 0 { "-" } else { "" };
    format!("{sign}{value:.2} {}", UNITS[unit])
}
