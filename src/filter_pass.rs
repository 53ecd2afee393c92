//! One filtering pass from a raw capture on disk to the filtered output.

use std::path::Path;

use postsift_filter::{FilterConfig, FilterReport};

use crate::error::Result;
use crate::sink;

/// Outcome of [`filter_file`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilePassReport {
    /// Malformed input lines that were skipped.
    pub malformed_lines: usize,
    pub report: FilterReport,
}

/// Read `input`, filter it with `config` and rewrite `output`.
///
/// `output` is only replaced once the whole pass has succeeded.
///
/// # Errors
///
/// Returns a precondition error if `input` is missing, a filter error if
/// `config` is invalid, or an I/O error if `output` cannot be written.
pub fn filter_file(input: &Path, output: &Path, config: &FilterConfig) -> Result<FilePassReport> {
    let (records, malformed_lines) = sink::read_records(input)?;
    tracing::info!(
        input = %input.display(),
        records = records.len(),
        malformed = malformed_lines,
        "loaded raw capture"
    );

    let report = postsift_filter::filter(records, config)?;
    sink::write_filtered(output, &report.kept)?;

    tracing::info!(
        output = %output.display(),
        kept = report.kept.len(),
        seen = report.total_seen,
        "filtered output written"
    );
    Ok(FilePassReport {
        malformed_lines,
        report,
    })
}
