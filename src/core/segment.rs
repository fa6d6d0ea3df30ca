// LogSlicer - core/segment.rs
//
// Segmentation engine: one forward pass over the input, routing every
// request-start line and its continuation lines to a per-URL output file.
//
// Routing rules, per line:
//   1. Request-start line whose key contains an excluded parameter: the
//      block belongs to a concatenation output; detach and skip.
//   2. Other request-start line: write to the key's stream (created on
//      first sight) and make it the open stream.
//   3. Continuation of the open block (see ScanState::continues): append.
//   4. Anything else is dropped. The audit reports those lines.

use crate::core::classifier::Classifier;
use crate::core::model::{NoopObserver, ScanConfig, ScanObserver, ScanOutcome};
use crate::core::scan::{LineReader, OutputStreams, ScanState, Ticker};
use crate::util::error::ReadError;
use crate::util::logging::preview;
use std::path::{Path, PathBuf};

/// Split `input` into one file per request key under `output_dir`, using
/// the default (strict) capture policy.
///
/// Returns the produced paths in creation order; empty if nothing matched.
pub fn segment(
    input: &Path,
    output_dir: &Path,
    exclude_keys: &[String],
) -> Result<Vec<PathBuf>, ReadError> {
    let outcome = segment_with(
        input,
        output_dir,
        exclude_keys,
        &ScanConfig::default(),
        &mut NoopObserver,
    )?;
    Ok(outcome.outputs)
}

/// Whether a request key is claimed by one of the concatenation parameters.
/// Empty parameters never match.
pub fn is_excluded(key: &str, exclude_keys: &[String]) -> bool {
    exclude_keys
        .iter()
        .any(|param| !param.is_empty() && key.contains(param.as_str()))
}

/// Full segmentation pass with explicit configuration and observer.
///
/// An unreadable input fails before any output is created. A key whose file
/// cannot be created is skipped and reported in `ScanOutcome::warnings`.
/// On cancellation or a mid-file read error every stream is still flushed
/// and closed before returning.
pub fn segment_with(
    input: &Path,
    output_dir: &Path,
    exclude_keys: &[String],
    config: &ScanConfig,
    observer: &mut dyn ScanObserver,
) -> Result<ScanOutcome, ReadError> {
    let mut reader = LineReader::open(input)?;
    let classifier = Classifier::new(config.policy);
    let mut state = ScanState::new();
    let mut streams = OutputStreams::new(output_dir);
    let mut ticker = Ticker::new(config.progress_interval_lines);

    let mut lines_written: u64 = 0;
    let mut cancelled = false;

    tracing::info!(
        input = %input.display(),
        output_dir = %output_dir.display(),
        excluded = exclude_keys.len(),
        "Segmentation started"
    );

    let read_result = loop {
        match reader.next_line() {
            Ok(Some(raw)) => {
                let line = String::from_utf8_lossy(raw);

                if let Some(key) = classifier.request_key(&line) {
                    let capturing = classifier.opens_capture(&line);
                    if is_excluded(key, exclude_keys) {
                        tracing::trace!(key, "Request claimed by concatenation");
                        state.start(None, capturing);
                    } else if let Some(slot) = streams.slot_for_key(key) {
                        if streams.write(slot, raw) {
                            lines_written += 1;
                        }
                        state.start(Some(key), capturing);
                    } else {
                        state.start(None, capturing);
                    }
                } else if state.continues(&classifier, &line) {
                    let slot = state.current_key().and_then(|key| streams.slot_for_key(key));
                    if let Some(slot) = slot {
                        if streams.write(slot, raw) {
                            lines_written += 1;
                        }
                    }
                } else {
                    tracing::trace!(line = preview(&line), "Line outside any request block");
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }

        if ticker.tick(reader.lines_read(), observer) {
            cancelled = true;
            tracing::warn!(lines = reader.lines_read(), "Segmentation cancelled");
            break Ok(());
        }
    };

    let lines_read = reader.lines_read();
    let (outputs, warnings) = streams.finish();
    observer.on_progress(lines_read);
    read_result?;

    tracing::info!(
        files = outputs.len(),
        lines = lines_read,
        written = lines_written,
        skipped_keys = warnings.len(),
        cancelled,
        "Segmentation complete"
    );

    Ok(ScanOutcome {
        outputs,
        lines_read,
        lines_written,
        lines_dropped: lines_read - lines_written,
        warnings,
        cancelled,
    })
}
