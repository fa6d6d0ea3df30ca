// LogSlicer - core/model.rs
//
// Shared data types for the scan engines and their callers.

use crate::util::constants;
use crate::util::error::WriteError;
use serde::Serialize;
use std::path::PathBuf;

/// Which lines, besides those inside an `*ERROR*` window, count as
/// continuations of the open request block.
///
/// The default is the strict policy: only `*ERROR*`-triggered captures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapturePolicy {
    /// Treat any line starting with `at ` (after leading whitespace) as a
    /// continuation even when no capture is open.
    pub lenient_stack_frames: bool,

    /// A line starting with `Error` opens a capture and is itself kept as a
    /// continuation of the open block.
    pub error_prefix_opens_capture: bool,
}

/// Settings shared by every scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub policy: CapturePolicy,
    /// Lines between observer callbacks (progress + cancel check).
    pub progress_interval_lines: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            policy: CapturePolicy::default(),
            progress_interval_lines: constants::DEFAULT_PROGRESS_INTERVAL_LINES,
        }
    }
}

/// Receives progress from a running scan and may request cancellation.
pub trait ScanObserver {
    /// Called every `progress_interval_lines` lines and once at the end.
    fn on_progress(&mut self, _lines_read: u64) {}

    /// Checked at every progress tick. Returning true stops the scan after
    /// all open outputs are flushed and closed.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Observer that ignores progress and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

/// Result of one segmentation or concatenation pass.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Produced files, in creation order.
    pub outputs: Vec<PathBuf>,
    /// Lines read from the input.
    pub lines_read: u64,
    /// Lines written to some output.
    pub lines_written: u64,
    /// Lines that matched no key and no open capture.
    pub lines_dropped: u64,
    /// Keys that were skipped because their output failed.
    pub warnings: Vec<WriteError>,
    /// True when the observer stopped the scan before end of file.
    pub cancelled: bool,
}

/// Outcome of the audit pass.
#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    /// Report holding every missing line, repeated by its deficit.
    pub missing_report: PathBuf,
    /// Number of lines written to the report.
    pub missing_lines: u64,
    /// Output line occurrences in excess of their input occurrences.
    pub extra_lines: u64,
}

/// Line and character totals for one side of the checksum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextCounts {
    pub lines: u64,
    pub chars: u64,
}

/// Input-versus-output totals written to the checksum report.
#[derive(Debug, Clone, Serialize)]
pub struct ChecksumReport {
    pub path: PathBuf,
    pub original: TextCounts,
    pub processed: TextCounts,
    /// Rendered table, identical to the file content.
    pub table: String,
}

/// Outcome of the packaging step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PackageOutcome {
    /// Archive written to this path.
    Archive(PathBuf),
    /// Nothing to package and the policy asked for a report instead of an
    /// empty archive.
    NoOutput,
}

/// What `package` does with an empty file list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum EmptyArchivePolicy {
    /// Write a valid archive with no entries.
    Create,
    /// Write nothing and return `PackageOutcome::NoOutput`.
    #[default]
    Report,
}
