//! Batch driver: reads inputs, runs the executor with a progress bar, writes
//! processed files and the optional report.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use retouch_core::{
    format_bytes, output_file_name, BatchJob, BatchReport, DiscoveredFile, ProcessingConfig,
    ProcessingResult, ReportFormat, ReportWriter, Retouch,
};

use super::ProcessArgs;

/// Read every discovered file into memory.
///
/// Jobs are fully buffered before the batch starts so the executor never
/// touches the filesystem.
pub fn read_jobs(files: &[DiscoveredFile]) -> anyhow::Result<Vec<BatchJob>> {
    files
        .iter()
        .map(|file| {
            let bytes = std::fs::read(&file.path)
                .with_context(|| format!("Failed to read {}", file.path.display()))?;
            let name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(BatchJob::new(name, bytes))
        })
        .collect()
}

/// Run the batch and deliver its results.
pub async fn process_batch(
    retouch: &Retouch,
    args: &ProcessArgs,
    jobs: Vec<BatchJob>,
    recipe: ProcessingConfig,
    output_dir: &Path,
    prefix: &str,
) -> anyhow::Result<()> {
    let progress = create_progress_bar(jobs.len() as u64);
    let start_time = std::time::Instant::now();

    let bar = progress.clone();
    let report = retouch
        .process_batch_with_progress(jobs, Arc::new(recipe), move |outcome| {
            bar.inc(1);
            let elapsed = start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                bar.set_message(format!("{:.1} img/sec", bar.position() as f64 / elapsed));
            }
            tracing::debug!("Finished {} ({:?})", outcome.file_name, outcome.state);
        })
        .await;
    progress.finish_and_clear();
    let report = report?;

    let written = write_outputs(&report, output_dir, prefix)?;
    if written > 0 {
        tracing::info!("Wrote {written} file(s) to {}", output_dir.display());
    }

    if let Some(path) = &args.report {
        let format = args
            .report_format
            .map(ReportFormat::from)
            .unwrap_or_else(|| ReportFormat::from_path(path));
        let file = File::create(path)
            .with_context(|| format!("Failed to create report {}", path.display()))?;
        let mut writer = ReportWriter::new(BufWriter::new(file), format, true);
        writer.write_report(&report)?;
        writer.flush()?;
        tracing::info!("Report written to {:?}", path);
    }

    print_summary(&report);
    Ok(())
}

/// Save every successful job under `output_dir`. Returns the number of
/// files written.
fn write_outputs(report: &BatchReport, output_dir: &Path, prefix: &str) -> anyhow::Result<usize> {
    if report.succeeded() > 0 {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    }

    let mut used = HashSet::new();
    let mut written = 0;
    for outcome in &report.outcomes {
        match &outcome.result {
            ProcessingResult::Success(processed) => {
                let name = unique_name(
                    &mut used,
                    output_file_name(&outcome.file_name, prefix, processed.format),
                );
                let path = output_dir.join(&name);
                std::fs::write(&path, &processed.bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                written += 1;
            }
            ProcessingResult::Failure(failure) => {
                eprintln!("  Failed: {} - {}", outcome.file_name, failure.message);
            }
        }
    }
    Ok(written)
}

/// Inputs from different directories can share a stem; later ones get a
/// numeric suffix instead of overwriting earlier output.
fn unique_name(used: &mut HashSet<String>, name: String) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = name.rsplit_once('.').unwrap_or((name.as_str(), ""));
    let mut n = 2;
    loop {
        let candidate = if ext.is_empty() {
            format!("{stem}_{n}")
        } else {
            format!("{stem}_{n}.{ext}")
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after batch processing.
fn print_summary(report: &BatchReport) {
    let saved = report.total_original_bytes as i64 - report.total_processed_bytes as i64;

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", report.succeeded());
    if report.failed() > 0 {
        eprintln!("    Failed:       {:>8}", report.failed());
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", report.outcomes.len());
    eprintln!("    Workers:      {:>8}", report.workers);
    eprintln!("    Duration:     {:>7.1}s", report.elapsed.as_secs_f64());
    eprintln!("    Original:     {:>12}", format_bytes(report.total_original_bytes as i64));
    eprintln!("    Processed:    {:>12}", format_bytes(report.total_processed_bytes as i64));
    eprintln!(
        "    Saved:        {:>12} ({:.1}%)",
        format_bytes(saved),
        report.savings_percent()
    );
    eprintln!("  ====================================");
}
