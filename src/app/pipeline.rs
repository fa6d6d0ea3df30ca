// LogSlicer - app/pipeline.rs
//
// One run of the tool, start to finish.
//
// Split mode:
//   working dir -> segment (excluding concat params) -> concatenate each
//   param -> audit -> checksum -> archive -> optional cleanup
//
// Filter mode:
//   one concatenation into `filtered_<param>.log` beside the input (or in
//   the chosen save directory), optionally rewriting the source in place.
//
// Cancellation is checked by the engines every progress interval and again
// between phases. A cancelled run returns `LogSlicerError::Cancelled` with
// every file produced so far.

use crate::core::audit::audit;
use crate::core::checksum::checksum;
use crate::core::concat::{concat_file_name, concatenate_in_place, concatenate_with};
use crate::core::model::{
    AuditResult, ChecksumReport, EmptyArchivePolicy, NoopObserver, PackageOutcome, ScanConfig,
    ScanObserver, ScanOutcome,
};
use crate::core::package::package;
use crate::core::segment::segment_with;
use crate::platform::config::AppConfig;
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::{ConfigError, LogSlicerError, ReadError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// =============================================================================
// Request
// =============================================================================

/// What a run produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Mode {
    /// Single output holding every block that contains `param`.
    Filter { param: String, in_place: bool },
    /// One file per request key, plus one concatenation per parameter.
    Split { concat_params: Vec<String> },
}

/// Input file, destination and mode of one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input: PathBuf,
    pub save_dir: PathBuf,
    pub mode: Mode,
}

impl RunRequest {
    /// Request whose results land next to the input file.
    pub fn beside_input(input: PathBuf, mode: Mode) -> Self {
        let save_dir = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            input,
            save_dir,
            mode,
        }
    }
}

/// Run settings taken from the validated configuration.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub scan: ScanConfig,
    pub archive: bool,
    pub keep_work_dir: bool,
    pub empty_archive: EmptyArchivePolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl RunOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            scan: config.scan_config(),
            archive: config.archive,
            keep_work_dir: config.keep_work_dir,
            empty_archive: config.empty_archive,
        }
    }
}

/// Split a comma-separated parameter list. Items are trimmed; empty items
/// and repeats are dropped, first occurrence wins.
pub fn parse_concat_params(text: &str) -> Vec<String> {
    let mut params: Vec<String> = Vec::new();
    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !params.iter().any(|p| p == item) {
            params.push(item.to_string());
        }
    }
    params
}

// =============================================================================
// Observer
// =============================================================================

/// Pipeline stage, reported to the observer as each one begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Segmenting,
    Concatenating,
    Auditing,
    Checksumming,
    Packaging,
    CleaningUp,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Segmenting => "Splitting by request",
            Self::Concatenating => "Concatenating",
            Self::Auditing => "Auditing",
            Self::Checksumming => "Computing checksum",
            Self::Packaging => "Packaging",
            Self::CleaningUp => "Cleaning up",
        };
        f.write_str(label)
    }
}

/// Scan observer that is also told when a new phase starts.
pub trait PipelineObserver: ScanObserver {
    fn on_phase(&mut self, _phase: Phase) {}
}

impl PipelineObserver for NoopObserver {}

// =============================================================================
// Report
// =============================================================================

/// What became of the archive step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArchiveStatus {
    Written { path: PathBuf },
    /// Archiving switched off for this run.
    Disabled,
    /// Nothing to archive and the policy asked for no empty archive.
    Empty,
    /// Packaging failed; the working directory is left in place.
    Failed { error: String },
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    Filtered {
        output: PathBuf,
        lines_read: u64,
        lines_written: u64,
    },
    Split {
        work_dir: PathBuf,
        outputs: Vec<PathBuf>,
        concat_outputs: Vec<PathBuf>,
        lines_read: u64,
        /// `None` when the audit failed; the failure is in the warnings.
        audit: Option<AuditResult>,
        /// `None` when the checksum failed; the failure is in the warnings.
        checksum: Option<ChecksumReport>,
        archive: ArchiveStatus,
        work_dir_removed: bool,
    },
    /// No request line was found and no concatenation was requested.
    NoOutput { lines_read: u64 },
}

/// Everything the caller needs to tell the user about a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub mode: Mode,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub outcome: RunOutcome,
    pub warnings: Vec<String>,
    /// Warnings beyond `MAX_WARNINGS` that were counted but not kept.
    pub warnings_dropped: usize,
}

impl RunReport {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// Human-readable summary shown at the end of a run.
    pub fn message(&self) -> String {
        let mut msg = format!(
            "Processing complete.\nElapsed: {}\n",
            format_elapsed(self.elapsed())
        );

        match &self.outcome {
            RunOutcome::Filtered {
                output,
                lines_read,
                lines_written,
            } => {
                msg.push_str(&format!(
                    "Filtered output written to: {}\nLines kept: {lines_written} of {lines_read}\n",
                    output.display()
                ));
            }
            RunOutcome::NoOutput { lines_read } => {
                msg.push_str(&format!(
                    "No request lines found in {lines_read} lines; nothing was produced.\n"
                ));
            }
            RunOutcome::Split {
                work_dir,
                outputs,
                concat_outputs,
                audit,
                checksum,
                archive,
                work_dir_removed,
                ..
            } => {
                match archive {
                    ArchiveStatus::Written { path } => {
                        msg.push_str(&format!("Archive available at: {}\n", path.display()));
                    }
                    ArchiveStatus::Disabled => {}
                    ArchiveStatus::Empty => msg.push_str("Nothing to archive.\n"),
                    ArchiveStatus::Failed { error } => {
                        msg.push_str(&format!("Archive could not be created: {error}\n"));
                    }
                }
                if !work_dir_removed {
                    msg.push_str(&format!(
                        "Output files ({} split, {} concatenated) in: {}\n",
                        outputs.len(),
                        concat_outputs.len(),
                        work_dir.display()
                    ));
                }
                match audit {
                    Some(audit) => msg.push_str(&format!(
                        "\nAudit report:\nMissing lines recorded in: {}\n\
                         Missing lines: {}\n\
                         Processed lines not in the original (possible duplication or error): {}\n",
                        audit.missing_report.display(),
                        audit.missing_lines,
                        audit.extra_lines
                    )),
                    None => msg.push_str("\nAudit report: not available, see warnings.\n"),
                }
                match checksum {
                    Some(checksum) => {
                        msg.push_str("\nChecksum:\n");
                        msg.push_str(&checksum.table);
                    }
                    None => msg.push_str("\nChecksum: not available, see warnings.\n"),
                }
            }
        }

        if !self.warnings.is_empty() {
            msg.push_str(&format!("\nWarnings ({}):\n", self.warnings.len() + self.warnings_dropped));
            for warning in &self.warnings {
                msg.push_str(&format!("  - {warning}\n"));
            }
            if self.warnings_dropped > 0 {
                msg.push_str(&format!("  ... and {} more\n", self.warnings_dropped));
            }
        }
        msg
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// `Xh Ymin Zs`, `Ymin Zs` or `Zs`, whole seconds.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes}min {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}min {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Non-fatal problems collected during a run, capped at `MAX_WARNINGS`.
#[derive(Debug, Default)]
struct Warnings {
    kept: Vec<String>,
    dropped: usize,
}

impl Warnings {
    fn push(&mut self, message: String) {
        if self.kept.len() < constants::MAX_WARNINGS {
            self.kept.push(message);
        } else {
            self.dropped += 1;
        }
    }

    fn absorb(&mut self, outcome: &mut ScanOutcome) {
        for warning in outcome.warnings.drain(..) {
            self.push(warning.to_string());
        }
    }
}

// =============================================================================
// Run
// =============================================================================

/// Execute one run.
///
/// Fatal problems (unreadable input, unusable save directory, cancellation)
/// are returned as errors. Everything else (a key whose file could not be
/// created, a failed archive, a failed cleanup) is recorded on the report.
pub fn run<O: PipelineObserver>(
    request: &RunRequest,
    options: &RunOptions,
    observer: &mut O,
) -> Result<RunReport> {
    let started_at = Utc::now();
    let timer = Instant::now();
    let mut warnings = Warnings::default();

    if !request.input.is_file() {
        return Err(ReadError::Open {
            path: request.input.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a readable file"),
        }
        .into());
    }
    std::fs::create_dir_all(&request.save_dir).map_err(|e| LogSlicerError::Io {
        path: request.save_dir.clone(),
        operation: "create save directory",
        source: e,
    })?;

    tracing::info!(
        input = %request.input.display(),
        save_dir = %request.save_dir.display(),
        mode = ?request.mode,
        "Run started"
    );

    let outcome = match &request.mode {
        Mode::Filter { param, in_place } => {
            run_filter(request, param, *in_place, options, observer, &mut warnings)?
        }
        Mode::Split { concat_params } => {
            run_split(request, concat_params, options, observer, &mut warnings)?
        }
    };

    let elapsed = timer.elapsed();
    tracing::info!(
        elapsed = %format_elapsed(elapsed),
        warnings = warnings.kept.len() + warnings.dropped,
        "Run finished"
    );

    Ok(RunReport {
        input: request.input.clone(),
        mode: request.mode.clone(),
        started_at,
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        outcome,
        warnings: warnings.kept,
        warnings_dropped: warnings.dropped,
    })
}

fn ensure_not_cancelled<O: ScanObserver>(observer: &O, produced: &[PathBuf]) -> Result<()> {
    if observer.is_cancelled() {
        tracing::warn!(produced = produced.len(), "Run cancelled between phases");
        return Err(LogSlicerError::Cancelled {
            produced: produced.to_vec(),
        });
    }
    Ok(())
}

fn run_filter<O: PipelineObserver>(
    request: &RunRequest,
    param: &str,
    in_place: bool,
    options: &RunOptions,
    observer: &mut O,
    warnings: &mut Warnings,
) -> Result<RunOutcome> {
    if param.is_empty() {
        return Err(ConfigError::ValueOutOfRange {
            field: "filter".to_string(),
            value: String::new(),
            expected: "a non-empty parameter".to_string(),
        }
        .into());
    }

    observer.on_phase(Phase::Concatenating);
    let name = format!("{}{}", constants::OUTPUT_PREFIX, concat_file_name(param));
    let base = request.save_dir.join(name);
    let output = fs::unique_path(&base).map_err(|e| LogSlicerError::Io {
        path: base.clone(),
        operation: "choose filter output name",
        source: e,
    })?;

    let mut outcome = if in_place {
        concatenate_in_place(&request.input, &output, param, &options.scan, observer)?
    } else {
        concatenate_with(&request.input, &output, param, &options.scan, observer)?
    };
    warnings.absorb(&mut outcome);

    if outcome.cancelled {
        return Err(LogSlicerError::Cancelled {
            produced: outcome.outputs,
        });
    }

    Ok(RunOutcome::Filtered {
        output,
        lines_read: outcome.lines_read,
        lines_written: outcome.lines_written,
    })
}

fn run_split<O: PipelineObserver>(
    request: &RunRequest,
    concat_params: &[String],
    options: &RunOptions,
    observer: &mut O,
    warnings: &mut Warnings,
) -> Result<RunOutcome> {
    let work_dir = fs::create_output_directory(&request.input, &request.save_dir)?;
    let mut produced: Vec<PathBuf> = Vec::new();

    // -------------------------------------------------------------------------
    // Segment, leaving the concatenation parameters' blocks to their own pass
    // -------------------------------------------------------------------------
    observer.on_phase(Phase::Segmenting);
    let mut segmented = segment_with(
        &request.input,
        &work_dir,
        concat_params,
        &options.scan,
        observer,
    )?;
    warnings.absorb(&mut segmented);
    produced.extend(segmented.outputs.iter().cloned());
    if segmented.cancelled {
        return Err(LogSlicerError::Cancelled { produced });
    }
    let outputs = segmented.outputs;

    // -------------------------------------------------------------------------
    // Concatenate; names are de-duplicated so no pass overwrites another
    // -------------------------------------------------------------------------
    let mut concat_outputs: Vec<PathBuf> = Vec::new();
    for param in concat_params.iter().filter(|p| !p.is_empty()) {
        observer.on_phase(Phase::Concatenating);
        let base = work_dir.join(concat_file_name(param));
        let output = fs::unique_path(&base).map_err(|e| LogSlicerError::Io {
            path: base.clone(),
            operation: "choose concatenation output name",
            source: e,
        })?;
        let mut outcome =
            match concatenate_with(&request.input, &output, param, &options.scan, observer) {
                Ok(outcome) => outcome,
                Err(LogSlicerError::Write(e)) => {
                    tracing::warn!(param = param.as_str(), error = %e, "Concatenation output skipped");
                    warnings.push(e.to_string());
                    continue;
                }
                Err(e) => return Err(e),
            };
        warnings.absorb(&mut outcome);
        produced.extend(outcome.outputs.iter().cloned());
        concat_outputs.append(&mut outcome.outputs);
        if outcome.cancelled {
            return Err(LogSlicerError::Cancelled { produced });
        }
    }

    if outputs.is_empty() && concat_outputs.is_empty() {
        tracing::warn!(input = %request.input.display(), "No request lines found");
        // Only succeeds when nothing was written into it.
        let _ = std::fs::remove_dir(&work_dir);
        return Ok(RunOutcome::NoOutput {
            lines_read: segmented.lines_read,
        });
    }

    // -------------------------------------------------------------------------
    // Audit and checksum
    // -------------------------------------------------------------------------
    observer.on_phase(Phase::Auditing);
    let mut audited = outputs.clone();
    audited.extend(concat_outputs.iter().cloned());
    let audit = match audit(&request.input, &audited, &work_dir) {
        Ok(result) => {
            produced.push(result.missing_report.clone());
            Some(result)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Audit failed; continuing without a missing-lines report");
            warnings.push(format!("Audit could not be completed: {e}"));
            None
        }
    };
    ensure_not_cancelled(&*observer, &produced)?;

    observer.on_phase(Phase::Checksumming);
    let mut counted = outputs.clone();
    counted.extend(audit.iter().map(|a| a.missing_report.clone()));
    counted.extend(concat_outputs.iter().cloned());
    let checksum = match checksum(&request.input, &counted, &work_dir) {
        Ok(report) => {
            produced.push(report.path.clone());
            Some(report)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Checksum failed; continuing without a checksum report");
            warnings.push(format!("Checksum could not be completed: {e}"));
            None
        }
    };
    ensure_not_cancelled(&*observer, &produced)?;

    // -------------------------------------------------------------------------
    // Archive and cleanup
    // -------------------------------------------------------------------------
    let archive = if options.archive {
        observer.on_phase(Phase::Packaging);
        let mut archived = outputs.clone();
        archived.extend(audit.iter().map(|a| a.missing_report.clone()));
        archived.extend(checksum.iter().map(|c| c.path.clone()));
        archived.extend(concat_outputs.iter().cloned());
        build_archive(request, &archived, options.empty_archive, warnings)
    } else {
        ArchiveStatus::Disabled
    };

    let mut work_dir_removed = false;
    if !options.keep_work_dir && matches!(archive, ArchiveStatus::Written { .. }) {
        observer.on_phase(Phase::CleaningUp);
        match fs::remove_work_dir(&work_dir) {
            None => work_dir_removed = true,
            Some(warning) => warnings.push(warning),
        }
    }

    Ok(RunOutcome::Split {
        work_dir,
        outputs,
        concat_outputs,
        lines_read: segmented.lines_read,
        audit,
        checksum,
        archive,
        work_dir_removed,
    })
}

fn build_archive(
    request: &RunRequest,
    archived: &[PathBuf],
    empty_policy: EmptyArchivePolicy,
    warnings: &mut Warnings,
) -> ArchiveStatus {
    let base = request.save_dir.join(format!(
        "{}{}.zip",
        constants::OUTPUT_PREFIX,
        fs::input_stem(&request.input)
    ));
    let destination = match fs::unique_path(&base) {
        Ok(path) => path,
        Err(e) => {
            warnings.push(format!("Could not choose archive name: {e}"));
            return ArchiveStatus::Failed {
                error: e.to_string(),
            };
        }
    };
    let archive_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match package(archived, &request.save_dir, &archive_name, empty_policy) {
        Ok(PackageOutcome::Archive(path)) => ArchiveStatus::Written { path },
        Ok(PackageOutcome::NoOutput) => ArchiveStatus::Empty,
        Err(e) => {
            tracing::error!(error = %e, "Packaging failed; outputs left in working directory");
            warnings.push(e.to_string());
            ArchiveStatus::Failed {
                error: e.to_string(),
            }
        }
    }
}
