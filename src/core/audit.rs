// LogSlicer - core/audit.rs
//
// Post-hoc reconciliation of input lines against every produced file.
// Exact multiset comparison on raw line text (terminator included): a line
// counts as the same line only if its bytes are identical.

use crate::core::model::AuditResult;
use crate::core::scan::LineReader;
use crate::util::constants::MISSING_LINES_FILE_NAME;
use crate::util::error::{LogSlicerError, ReadError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Occurrence counts per distinct line, remembering first-seen order so the
/// report is deterministic.
#[derive(Debug, Default)]
struct LineTally {
    counts: HashMap<Vec<u8>, u64>,
    order: Vec<Vec<u8>>,
}

impl LineTally {
    fn add(&mut self, line: &[u8]) {
        match self.counts.get_mut(line) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(line.to_vec(), 1);
                self.order.push(line.to_vec());
            }
        }
    }

    fn add_file(&mut self, path: &Path) -> std::result::Result<u64, ReadError> {
        let mut reader = LineReader::open(path)?;
        while let Some(line) = reader.next_line()? {
            self.add(line);
        }
        Ok(reader.lines_read())
    }

    fn count(&self, line: &[u8]) -> u64 {
        self.counts.get(line).copied().unwrap_or(0)
    }
}

/// Compare `input` with the union of `produced` and write the missing-lines
/// report to `output_dir`.
///
/// Every input line whose produced count falls short is written to the
/// report once per missing copy, in first-occurrence order. Produced
/// occurrences beyond the input's count (including lines absent from the
/// input) are summed into `extra_lines`.
pub fn audit(input: &Path, produced: &[PathBuf], output_dir: &Path) -> Result<AuditResult> {
    let mut original = LineTally::default();
    let input_lines = original.add_file(input)?;

    let mut processed = LineTally::default();
    let mut produced_lines: u64 = 0;
    for path in produced {
        produced_lines += processed.add_file(path)?;
    }

    let missing_report = output_dir.join(MISSING_LINES_FILE_NAME);
    let file = File::create(&missing_report).map_err(|e| LogSlicerError::Io {
        path: missing_report.clone(),
        operation: "create missing-lines report",
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    let write_err = |e: std::io::Error| LogSlicerError::Io {
        path: missing_report.clone(),
        operation: "write missing-lines report",
        source: e,
    };

    let mut missing_lines: u64 = 0;
    for line in &original.order {
        let expected = original.count(line);
        let found = processed.count(line);
        for _ in found..expected {
            writer.write_all(line).map_err(write_err)?;
            missing_lines += 1;
        }
    }
    writer.flush().map_err(write_err)?;

    let extra_lines: u64 = processed
        .order
        .iter()
        .map(|line| processed.count(line).saturating_sub(original.count(line)))
        .sum();

    tracing::info!(
        input_lines,
        produced_files = produced.len(),
        produced_lines,
        missing_lines,
        extra_lines,
        report = %missing_report.display(),
        "Audit complete"
    );

    Ok(AuditResult {
        missing_report,
        missing_lines,
        extra_lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_reports_missing_lines_with_multiplicity() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "in.log", "a\nb\nb\nb\nc\n");
        let out1 = write(dir.path(), "o1.log", "a\nb\n");
        let out2 = write(dir.path(), "o2.log", "c\n");

        let result = audit(&input, &[out1, out2], dir.path()).unwrap();

        assert_eq!(result.missing_lines, 2);
        assert_eq!(result.extra_lines, 0);
        assert_eq!(fs::read_to_string(&result.missing_report).unwrap(), "b\nb\n");
    }

    #[test]
    fn test_counts_extra_and_foreign_lines() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "in.log", "a\nb\n");
        let out = write(dir.path(), "o.log", "a\na\na\nb\nz\n");

        let result = audit(&input, &[out], dir.path()).unwrap();

        assert_eq!(result.missing_lines, 0);
        assert_eq!(result.extra_lines, 3, "two surplus 'a' plus one foreign 'z'");
    }

    #[test]
    fn test_terminator_is_part_of_line_identity() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "in.log", "a\r\nlast");
        let out = write(dir.path(), "o.log", "a\nlast");

        let result = audit(&input, &[out], dir.path()).unwrap();

        assert_eq!(result.missing_lines, 1);
        assert_eq!(result.extra_lines, 1);
        assert_eq!(fs::read(&result.missing_report).unwrap(), b"a\r\n");
    }

    #[test]
    fn test_empty_input_and_no_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "in.log", "");

        let result = audit(&input, &[], dir.path()).unwrap();

        assert_eq!(result.missing_lines, 0);
        assert_eq!(result.extra_lines, 0);
        assert!(result.missing_report.exists());
    }

    #[test]
    fn test_unreadable_input_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = audit(&dir.path().join("absent.log"), &[], dir.path());
        assert!(matches!(result, Err(LogSlicerError::Read(_))));
    }
}
