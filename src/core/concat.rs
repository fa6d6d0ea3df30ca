// LogSlicer - core/concat.rs
//
// Concatenation engine: routes every line containing one literal parameter,
// plus the continuation lines of those blocks, into a single output file.
//
// Routing rules, per line:
//   1. Line contains the parameter: write it and open the block (capturing
//      when the line carries the error marker).
//   2. Request-start line without the parameter: another request begins, so
//      the block is closed.
//   3. Continuation of the open block: append.
//   4. Anything else is left alone (retained, in the in-place mode).

use crate::core::classifier::Classifier;
use crate::core::model::{NoopObserver, ScanConfig, ScanObserver, ScanOutcome};
use crate::core::sanitize;
use crate::core::scan::{LineReader, OutputStreams, ScanState, Ticker};
use crate::util::error::{LogSlicerError, Result, WriteError};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Output file name for a parameter: trailing `/` removed, then sanitised.
pub fn concat_file_name(param: &str) -> String {
    sanitize::output_file_name(param.trim_end_matches('/'))
}

/// Concatenate every block of `param` from `input` into
/// `<output_dir>/<concat_file_name(param)>`, using the strict capture policy.
///
/// Always produces the file, empty if nothing matched.
pub fn concatenate(input: &Path, output_dir: &Path, param: &str) -> Result<PathBuf> {
    let output = output_dir.join(concat_file_name(param));
    concatenate_with(
        input,
        &output,
        param,
        &ScanConfig::default(),
        &mut NoopObserver,
    )?;
    Ok(output)
}

/// Concatenation pass writing to an explicit output path.
///
/// Fails with a read error if the input cannot be opened (before the output
/// is created) and with a write error if the output cannot be created.
pub fn concatenate_with(
    input: &Path,
    output: &Path,
    param: &str,
    config: &ScanConfig,
    observer: &mut dyn ScanObserver,
) -> Result<ScanOutcome> {
    let mut reader = LineReader::open(input)?;
    let mut streams = OutputStreams::new(output.parent().unwrap_or(Path::new(".")));
    let slot = streams.create(param, output.to_path_buf())?;

    let result = scan_blocks(&mut reader, param, config, observer, &mut streams, slot, None);
    let (outputs, warnings) = streams.finish();
    let counts = result?;

    tracing::info!(
        param,
        output = %output.display(),
        lines = counts.lines_read,
        written = counts.lines_written,
        cancelled = counts.cancelled,
        "Concatenation complete"
    );

    Ok(counts.into_outcome(outputs, warnings))
}

/// Concatenate `param` like `concatenate_with`, then rewrite `input` in
/// place so it keeps only the lines that were not concatenated.
///
/// Destructive and order-dependent: running several parameters in sequence
/// against the same source leaves each later run a smaller input.
///
/// Retained lines are staged in a temporary file beside the source while
/// the source is read; the source is replaced only after the whole file has
/// been read. A cancelled or failed scan leaves the source untouched.
pub fn concatenate_in_place(
    input: &Path,
    output: &Path,
    param: &str,
    config: &ScanConfig,
    observer: &mut dyn ScanObserver,
) -> Result<ScanOutcome> {
    let mut reader = LineReader::open(input)?;
    let source_dir = input.parent().unwrap_or(Path::new("."));
    let staged = tempfile::NamedTempFile::new_in(source_dir).map_err(|e| LogSlicerError::Io {
        path: source_dir.to_path_buf(),
        operation: "stage source rewrite",
        source: e,
    })?;

    let mut streams = OutputStreams::new(output.parent().unwrap_or(Path::new(".")));
    let slot = streams.create(param, output.to_path_buf())?;

    let mut retained = BufWriter::new(staged.as_file());
    let result = scan_blocks(
        &mut reader,
        param,
        config,
        observer,
        &mut streams,
        slot,
        Some(Retained {
            writer: &mut retained,
            path: staged.path(),
        }),
    );
    let (outputs, warnings) = streams.finish();
    let counts = result?;

    if counts.cancelled {
        tracing::warn!(source = %input.display(), "Cancelled; source left unchanged");
        return Ok(counts.into_outcome(outputs, warnings));
    }

    retained.flush().map_err(|e| LogSlicerError::Io {
        path: staged.path().to_path_buf(),
        operation: "flush retained lines",
        source: e,
    })?;
    drop(retained);

    // The staged file is created owner-only; give it the source's mode.
    let permissions = std::fs::metadata(input)
        .map_err(|e| LogSlicerError::Io {
            path: input.to_path_buf(),
            operation: "read source permissions",
            source: e,
        })?
        .permissions();
    staged
        .as_file()
        .set_permissions(permissions)
        .map_err(|e| LogSlicerError::Io {
            path: staged.path().to_path_buf(),
            operation: "copy source permissions",
            source: e,
        })?;

    // The reader still holds the source open; release it before replacing.
    drop(reader);
    staged.persist(input).map_err(|e| LogSlicerError::Io {
        path: input.to_path_buf(),
        operation: "replace source",
        source: e.error,
    })?;

    tracing::info!(
        param,
        source = %input.display(),
        retained = counts.lines_read - counts.lines_written,
        removed = counts.lines_written,
        "Source rewritten without concatenated lines"
    );

    Ok(counts.into_outcome(outputs, warnings))
}

// =============================================================================
// Shared scan loop
// =============================================================================

struct Retained<'a> {
    writer: &'a mut dyn Write,
    path: &'a Path,
}

#[derive(Debug, Default)]
struct Counts {
    lines_read: u64,
    lines_written: u64,
    cancelled: bool,
}

impl Counts {
    fn into_outcome(
        self,
        outputs: Vec<PathBuf>,
        warnings: Vec<WriteError>,
    ) -> ScanOutcome {
        ScanOutcome {
            outputs,
            lines_read: self.lines_read,
            lines_written: self.lines_written,
            lines_dropped: self.lines_read - self.lines_written,
            warnings,
            cancelled: self.cancelled,
        }
    }
}

fn scan_blocks(
    reader: &mut LineReader,
    param: &str,
    config: &ScanConfig,
    observer: &mut dyn ScanObserver,
    streams: &mut OutputStreams,
    slot: usize,
    mut retained: Option<Retained<'_>>,
) -> Result<Counts> {
    let classifier = Classifier::new(config.policy);
    let mut state = ScanState::new();
    let mut ticker = Ticker::new(config.progress_interval_lines);
    let mut counts = Counts::default();

    loop {
        match reader.next_line()? {
            Some(raw) => {
                let line = String::from_utf8_lossy(raw);

                let routed = if line.contains(param) {
                    state.start(Some(param), classifier.opens_capture(&line));
                    true
                } else if classifier.request_key(&line).is_some() {
                    state.start(None, classifier.opens_capture(&line));
                    false
                } else {
                    state.continues(&classifier, &line)
                };

                if routed && streams.write(slot, raw) {
                    counts.lines_written += 1;
                } else if let Some(retained) = retained.as_mut() {
                    retained
                        .writer
                        .write_all(raw)
                        .map_err(|e| LogSlicerError::Io {
                            path: retained.path.to_path_buf(),
                            operation: "stage retained line",
                            source: e,
                        })?;
                }
            }
            None => break,
        }

        if ticker.tick(reader.lines_read(), observer) {
            counts.cancelled = true;
            tracing::warn!(param, lines = reader.lines_read(), "Concatenation cancelled");
            break;
        }
    }

    counts.lines_read = reader.lines_read();
    observer.on_progress(counts.lines_read);
    Ok(counts)
}
