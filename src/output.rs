use std::path::PathBuf;

use serde::Serialize;

use crate::batch::BatchReport;

/// Serializable view of a batch run.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub file_count: usize,
    pub written: Vec<PathBuf>,
    pub failed: Vec<FailedFile>,
    /// Wall-clock time for the run in seconds.
    pub elapsed_secs: f64,
}

#[derive(Debug, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

impl From<&BatchReport> for BatchSummary {
    fn from(report: &BatchReport) -> Self {
        Self {
            file_count: report.discovered.len(),
            written: report.written.clone(),
            failed: report
                .failed
                .iter()
                .map(|(path, error)| FailedFile {
                    path: path.clone(),
                    error: error.clone(),
                })
                .collect(),
            elapsed_secs: report.elapsed.as_secs_f64(),
        }
    }
}

/// Print a summary of the batch run.
///
/// - `json = true`: emit a pretty-printed JSON object to stdout.
/// - `json = false`: emit a short human-readable summary to stdout.
///
/// Failures are always listed on **stderr** so that the stdout stream remains
/// clean for downstream JSON consumers.
pub fn print_summary(summary: &BatchSummary, json: bool) {
    if json {
        match serde_json::to_string_pretty(summary) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising summary: {}", e),
        }
    } else {
        println!(
            "Generated {} declaration file(s) from {} stylesheet(s) in {:.2}s",
            summary.written.len(),
            summary.file_count,
            summary.elapsed_secs
        );
    }

    if !summary.failed.is_empty() {
        eprintln!("  {} file(s) failed:", summary.failed.len());
        for failed in &summary.failed {
            eprintln!("    {}: {}", failed.path.display(), failed.error);
        }
    }
}
