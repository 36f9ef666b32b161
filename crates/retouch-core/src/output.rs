//! Machine-readable batch reports in JSON or JSON Lines.
//!
//! Encoded image bytes never appear in a report; each job is described by
//! its name, submitted size, state and result fields.

use serde::Serialize;
use std::io::{self, Write};

use crate::batch::{BatchReport, JobOutcome};

/// Report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// One JSON document holding the whole batch
    Json,
    /// One JSON object per job, then a summary line
    JsonLines,
}

impl ReportFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    /// Pick a format from a report path's extension, defaulting to JSON.
    pub fn from_path(path: &std::path::Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::parse)
            .unwrap_or(Self::Json)
    }
}

/// Totals line closing a JSONL report.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_original_bytes: u64,
    pub total_processed_bytes: u64,
    pub savings_percent: f64,
    pub workers: usize,
    pub elapsed_ms: u64,
}

impl From<&BatchReport> for BatchSummary {
    fn from(report: &BatchReport) -> Self {
        Self {
            total: report.outcomes.len(),
            succeeded: report.succeeded(),
            failed: report.failed(),
            total_original_bytes: report.total_original_bytes,
            total_processed_bytes: report.total_processed_bytes,
            savings_percent: report.savings_percent(),
            workers: report.workers,
            elapsed_ms: report.elapsed.as_millis() as u64,
        }
    }
}

/// Writes batch reports to any `Write` sink.
pub struct ReportWriter<W: Write> {
    writer: W,
    format: ReportFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> ReportWriter<W> {
    /// `pretty` only affects [`ReportFormat::Json`].
    pub fn new(writer: W, format: ReportFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write one job as a single line, whatever the format.
    pub fn write_outcome(&mut self, outcome: &JobOutcome) -> io::Result<()> {
        self.write_line(outcome)?;
        self.items_written += 1;
        Ok(())
    }

    /// Write a whole batch.
    ///
    /// JSON gets one document with a `summary` object and a `jobs` array.
    /// JSONL gets one line per job followed by the summary line.
    pub fn write_report(&mut self, report: &BatchReport) -> io::Result<()> {
        let summary = BatchSummary::from(report);
        match self.format {
            ReportFormat::Json => {
                #[derive(Serialize)]
                struct Document<'a> {
                    summary: &'a BatchSummary,
                    jobs: &'a [JobOutcome],
                }
                let doc = Document {
                    summary: &summary,
                    jobs: &report.outcomes,
                };
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, &doc)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, &doc).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.items_written += report.outcomes.len();
            }
            ReportFormat::JsonLines => {
                for outcome in &report.outcomes {
                    self.write_outcome(outcome)?;
                }
                self.write_line(&summary)?;
            }
        }
        Ok(())
    }

    fn write_line<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        // JSONL is never pretty-printed (one object per line)
        serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        writeln!(self.writer)
    }

    /// Number of job records written so far.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::JobState;
    use crate::error::PipelineError;
    use crate::types::{ProcessedImage, ProcessingResult, TargetFormat};
    use std::time::Duration;

    fn report() -> BatchReport {
        BatchReport {
            outcomes: vec![
                JobOutcome {
                    index: 0,
                    file_name: "a.png".to_string(),
                    original_size: 400,
                    state: JobState::Succeeded,
                    result: ProcessingResult::Success(ProcessedImage {
                        bytes: vec![0; 100],
                        byte_size: 100,
                        format: TargetFormat::Webp,
                        original_dimensions: (20, 10),
                        has_transparency: false,
                        dominant_colors: Some(vec!["#ff0000".to_string()]),
                        histogram: None,
                    }),
                },
                JobOutcome {
                    index: 1,
                    file_name: "b.gif".to_string(),
                    original_size: 50,
                    state: JobState::Failed,
                    result: ProcessingResult::failure(PipelineError::Format {
                        format: "GIF".to_string(),
                    }),
                },
            ],
            total_original_bytes: 450,
            total_processed_bytes: 100,
            workers: 2,
            elapsed: Duration::from_millis(12),
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ReportFormat::parse("JSON"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::parse("ndjson"), Some(ReportFormat::JsonLines));
        assert_eq!(ReportFormat::parse("xml"), None);
        assert_eq!(
            ReportFormat::from_path(std::path::Path::new("out/report.jsonl")),
            ReportFormat::JsonLines
        );
        assert_eq!(
            ReportFormat::from_path(std::path::Path::new("report")),
            ReportFormat::Json
        );
    }

    #[test]
    fn test_json_report_document() {
        let mut buffer = Vec::new();
        let mut writer = ReportWriter::new(&mut buffer, ReportFormat::Json, false);
        writer.write_report(&report()).unwrap();
        assert_eq!(writer.items_written(), 2);

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["summary"]["succeeded"], 1);
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["jobs"][0]["status"], "success");
        assert_eq!(value["jobs"][0]["format"], "webp");
        assert_eq!(value["jobs"][1]["status"], "failure");
        assert_eq!(value["jobs"][1]["kind"], "format");
        assert!(value["jobs"][0].get("bytes").is_none());
    }

    #[test]
    fn test_jsonl_report_lines() {
        let mut buffer = Vec::new();
        let mut writer = ReportWriter::new(&mut buffer, ReportFormat::JsonLines, true);
        writer.write_report(&report()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 3);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["file_name"], "a.png");
        assert_eq!(first["state"], "succeeded");

        let summary: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(summary["total_original_bytes"], 450);
        assert_eq!(summary["elapsed_ms"], 12);
    }
}
