// LogSlicer - core/scan.rs
//
// Building blocks shared by the segmentation and concatenation engines:
// a raw line reader, the per-scan routing state, the lazily-opened output
// streams, and the progress/cancel ticker.
//
// Lines are handled as raw bytes including their terminator so outputs are
// byte-exact copies of input lines. Classification runs on a lossy UTF-8
// view of the same bytes.

use crate::core::classifier::Classifier;
use crate::core::model::ScanObserver;
use crate::core::sanitize;
use crate::util::error::{ReadError, WriteError};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

// =============================================================================
// LineReader
// =============================================================================

/// Forward-only reader yielding each line with its terminator.
pub struct LineReader {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
    lines_read: u64,
}

impl LineReader {
    /// Open `path` for reading. Failure here is fatal to the caller's run.
    pub fn open(path: &Path) -> Result<Self, ReadError> {
        let file = File::open(path).map_err(|e| ReadError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            buf: Vec::new(),
            lines_read: 0,
        })
    }

    /// The next line (terminator included), or `None` at end of file.
    pub fn next_line(&mut self) -> Result<Option<&[u8]>, ReadError> {
        self.buf.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(|e| ReadError::Read {
                path: self.path.clone(),
                line_number: self.lines_read,
                source: e,
            })?;
        if n == 0 {
            return Ok(None);
        }
        self.lines_read += 1;
        Ok(Some(&self.buf))
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

// =============================================================================
// ScanState
// =============================================================================

/// Routing state of one scan: which stream is open for continuations and
/// whether the open block is capturing.
///
/// Starts with no key and no capture; discarded when the scan ends.
#[derive(Debug, Default)]
pub struct ScanState {
    current_key: Option<String>,
    capturing: bool,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_key(&self) -> Option<&str> {
        self.current_key.as_deref()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Record a request-start line. `key` is `None` when the request belongs
    /// to another output, which detaches following continuations too.
    pub fn start(&mut self, key: Option<&str>, capturing: bool) {
        self.capturing = capturing;
        match key {
            Some(k) if self.current_key.as_deref() == Some(k) => {}
            Some(k) => self.current_key = Some(k.to_owned()),
            None => self.current_key = None,
        }
    }

    /// Decide a line that is not a start line. Returns true when it must be
    /// appended to the stream of the current key.
    ///
    /// A boundary line ends the capture and is not appended.
    pub fn continues(&mut self, classifier: &Classifier, line: &str) -> bool {
        let banner = classifier.is_error_banner(line);
        if !(self.capturing || banner || classifier.is_stack_frame(line)) {
            return false;
        }
        if classifier.is_boundary(line) {
            self.capturing = false;
            return false;
        }
        if banner {
            self.capturing = true;
        }
        self.current_key.is_some()
    }
}

// =============================================================================
// OutputStreams
// =============================================================================

struct Slot {
    path: PathBuf,
    /// `None` once a write on this stream has failed.
    writer: Option<BufWriter<File>>,
}

/// Append-only output files owned by a single scan, created on first use.
///
/// Keys whose sanitised file names collide share one stream, so no key can
/// truncate another key's file.
pub struct OutputStreams {
    dir: PathBuf,
    slots: Vec<Slot>,
    by_key: HashMap<String, Option<usize>>,
    by_name: HashMap<String, usize>,
    warnings: Vec<WriteError>,
}

impl OutputStreams {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            slots: Vec::new(),
            by_key: HashMap::new(),
            by_name: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Create a stream for `key` at `path`.
    pub fn create(&mut self, key: &str, path: PathBuf) -> Result<usize, WriteError> {
        let file = File::create(&path).map_err(|e| WriteError::Create {
            key: key.to_owned(),
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(key, path = %path.display(), "Output stream created");
        self.slots.push(Slot {
            path,
            writer: Some(BufWriter::new(file)),
        });
        Ok(self.slots.len() - 1)
    }

    /// Stream for a routing key, creating `<sanitised key>.log` in the
    /// output directory the first time the key is seen.
    ///
    /// Returns `None` for a key whose file could not be created; the failure
    /// is logged and recorded once, and the key stays skipped.
    pub fn slot_for_key(&mut self, key: &str) -> Option<usize> {
        if let Some(slot) = self.by_key.get(key) {
            return *slot;
        }

        let name = sanitize::output_file_name(key);
        let existing = self.by_name.get(&name).copied();
        let slot = match existing {
            Some(shared) => {
                tracing::debug!(key, file = %name, "Key shares an existing output file");
                Some(shared)
            }
            None => match self.create(key, self.dir.join(&name)) {
                Ok(slot) => {
                    self.by_name.insert(name, slot);
                    Some(slot)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping key");
                    self.warnings.push(e);
                    None
                }
            },
        };
        self.by_key.insert(key.to_owned(), slot);
        slot
    }

    /// Append one raw line. Returns false if the stream is closed or the
    /// write failed (the stream is then closed for the rest of the scan).
    pub fn write(&mut self, slot: usize, line: &[u8]) -> bool {
        let Some(entry) = self.slots.get_mut(slot) else {
            return false;
        };
        let Some(writer) = entry.writer.as_mut() else {
            return false;
        };
        if let Err(e) = writer.write_all(line) {
            let err = WriteError::Write {
                path: entry.path.clone(),
                source: e,
            };
            tracing::warn!(error = %err, "Output stream closed after write failure");
            entry.writer = None;
            self.warnings.push(err);
            return false;
        }
        true
    }

    /// Flush and close every stream. Returns the created paths in creation
    /// order together with all write failures seen during the scan.
    pub fn finish(mut self) -> (Vec<PathBuf>, Vec<WriteError>) {
        let mut paths = Vec::with_capacity(self.slots.len());
        for slot in self.slots {
            if let Some(mut writer) = slot.writer {
                if let Err(e) = writer.flush() {
                    let err = WriteError::Write {
                        path: slot.path.clone(),
                        source: e,
                    };
                    tracing::warn!(error = %err, "Flush failed");
                    self.warnings.push(err);
                }
            }
            paths.push(slot.path);
        }
        (paths, self.warnings)
    }
}

// =============================================================================
// Progress ticker
// =============================================================================

/// Fires the observer every `interval` lines.
pub(crate) struct Ticker {
    interval: u64,
    next: u64,
}

impl Ticker {
    pub(crate) fn new(interval: u64) -> Self {
        let interval = interval.max(1);
        Self {
            interval,
            next: interval,
        }
    }

    /// Report progress if due. Returns true when the observer asked to stop.
    pub(crate) fn tick(&mut self, lines_read: u64, observer: &mut dyn ScanObserver) -> bool {
        if lines_read < self.next {
            return false;
        }
        self.next = lines_read + self.interval;
        observer.on_progress(lines_read);
        observer.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::CapturePolicy;
    use std::fs;

    #[test]
    fn test_line_reader_keeps_terminators() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.log");
        fs::write(&path, b"one\r\ntwo\nthree").unwrap();

        let mut reader = LineReader::open(&path).unwrap();
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().unwrap() {
            lines.push(line.to_vec());
        }
        assert_eq!(
            lines,
            vec![b"one\r\n".to_vec(), b"two\n".to_vec(), b"three".to_vec()]
        );
        assert_eq!(reader.lines_read(), 3);
    }

    #[test]
    fn test_line_reader_missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = LineReader::open(&dir.path().join("absent.log"));
        assert!(matches!(result, Err(ReadError::Open { .. })));
    }

    #[test]
    fn test_state_boundary_ends_capture() {
        let c = Classifier::default();
        let mut state = ScanState::new();
        state.start(Some("/a"), true);
        assert!(state.continues(&c, "java.lang.NullPointerException\n"));
        assert!(!state.continues(&c, "01.01.2024 10:00:00.000 *INFO* next\n"));
        assert!(!state.is_capturing());
        assert!(!state.continues(&c, "trailing noise\n"));
        assert_eq!(state.current_key(), Some("/a"));
    }

    #[test]
    fn test_state_detached_key_swallows_nothing() {
        let c = Classifier::default();
        let mut state = ScanState::new();
        state.start(None, true);
        assert!(!state.continues(&c, "stack line\n"));
        assert!(state.is_capturing());
    }

    #[test]
    fn test_state_lenient_stack_frame_without_capture() {
        let c = Classifier::new(CapturePolicy {
            lenient_stack_frames: true,
            error_prefix_opens_capture: false,
        });
        let mut state = ScanState::new();
        state.start(Some("/a"), false);
        assert!(state.continues(&c, "\tat com.example.Foo.bar(Foo.java:1)\n"));
        assert!(!state.continues(&c, "Caused by: x\n"));
    }

    #[test]
    fn test_state_error_banner_opens_capture() {
        let c = Classifier::new(CapturePolicy {
            lenient_stack_frames: false,
            error_prefix_opens_capture: true,
        });
        let mut state = ScanState::new();
        state.start(Some("/a"), false);
        assert!(state.continues(&c, "Error: upstream timeout\n"));
        assert!(state.is_capturing());
        assert!(state.continues(&c, "  detail line\n"));
    }

    #[test]
    fn test_streams_share_file_for_colliding_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut streams = OutputStreams::new(dir.path());
        let a = streams.slot_for_key("/a").unwrap();
        let b = streams.slot_for_key("a/").unwrap();
        assert_eq!(a, b);
        assert!(streams.write(a, b"first\n"));
        assert!(streams.write(b, b"second\n"));
        let (paths, warnings) = streams.finish();
        assert_eq!(paths, vec![dir.path().join("a.log")]);
        assert!(warnings.is_empty());
        assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_streams_skip_key_when_create_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-created");
        let mut streams = OutputStreams::new(&missing);
        assert!(streams.slot_for_key("/a").is_none());
        assert!(streams.slot_for_key("/a").is_none());
        let (paths, warnings) = streams.finish();
        assert!(paths.is_empty());
        assert_eq!(warnings.len(), 1, "failure is recorded once per key");
    }

    #[test]
    fn test_ticker_fires_on_interval() {
        struct Count(u32);
        impl ScanObserver for Count {
            fn on_progress(&mut self, _lines_read: u64) {
                self.0 += 1;
            }
        }
        let mut observer = Count(0);
        let mut ticker = Ticker::new(10);
        for line in 1..=35 {
            ticker.tick(line, &mut observer);
        }
        assert_eq!(observer.0, 3);
    }
}
