// LogSlicer - core/checksum.rs
//
// Line and character totals for the input versus all produced files,
// rendered as a small text table. Counts only; no content hashing.

use crate::core::model::{ChecksumReport, TextCounts};
use crate::core::scan::LineReader;
use crate::util::constants::CHECKSUM_FILE_NAME;
use crate::util::error::{LogSlicerError, ReadError, Result};
use std::path::{Path, PathBuf};

/// Count lines and characters (Unicode scalar values, terminators included)
/// in one file. Invalid UTF-8 sequences count as one replacement character.
pub fn count_file(path: &Path) -> std::result::Result<TextCounts, ReadError> {
    let mut reader = LineReader::open(path)?;
    let mut counts = TextCounts::default();
    while let Some(line) = reader.next_line()? {
        counts.chars += String::from_utf8_lossy(line).chars().count() as u64;
    }
    counts.lines = reader.lines_read();
    Ok(counts)
}

/// Write `checksum.log` to `output_dir` comparing `input` with the
/// concatenation of `produced`.
///
/// The report depends only on file contents, so repeated runs over the same
/// files produce identical bytes.
pub fn checksum(input: &Path, produced: &[PathBuf], output_dir: &Path) -> Result<ChecksumReport> {
    let original = count_file(input)?;
    let mut processed = TextCounts::default();
    for path in produced {
        let counts = count_file(path)?;
        processed.lines += counts.lines;
        processed.chars += counts.chars;
    }

    let table = render_table(original, processed);
    let path = output_dir.join(CHECKSUM_FILE_NAME);
    std::fs::write(&path, &table).map_err(|e| LogSlicerError::Io {
        path: path.clone(),
        operation: "write checksum report",
        source: e,
    })?;

    tracing::info!(
        original_lines = original.lines,
        processed_lines = processed.lines,
        original_chars = original.chars,
        processed_chars = processed.chars,
        report = %path.display(),
        "Checksum report written"
    );

    Ok(ChecksumReport {
        path,
        original,
        processed,
        table,
    })
}

fn difference(original: u64, processed: u64) -> String {
    (i128::from(original) - i128::from(processed)).to_string()
}

/// Bordered, centre-aligned table with a header row.
pub fn render_table(original: TextCounts, processed: TextCounts) -> String {
    let rows: [[String; 4]; 3] = [
        [
            "Description".to_string(),
            "Original".to_string(),
            "Processed".to_string(),
            "Difference".to_string(),
        ],
        [
            "Lines".to_string(),
            original.lines.to_string(),
            processed.lines.to_string(),
            difference(original.lines, processed.lines),
        ],
        [
            "Characters".to_string(),
            original.chars.to_string(),
            processed.chars.to_string(),
            difference(original.chars, processed.chars),
        ],
    ];

    let mut widths = [0usize; 4];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule = |fill: char| -> String {
        let mut line = String::from("+");
        for width in widths {
            line.extend(std::iter::repeat(fill).take(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };

    let mut out = rule('-');
    for (idx, row) in rows.iter().enumerate() {
        out.push('|');
        for (cell, width) in row.iter().zip(widths) {
            out.push_str(&format!(" {cell:^width$} |"));
        }
        out.push('\n');
        out.push_str(&rule(if idx == 0 { '=' } else { '-' }));
    }
    out
}
