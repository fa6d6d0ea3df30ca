// LogSlicer - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogSlicer";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogSlicer";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Line classification
// =============================================================================

/// Request-start pattern: an HTTP method, the requested path, then the
/// protocol literal. Group 2 is the routing key.
pub const REQUEST_LINE_PATTERN: &str =
    r"(GET|POST|PUT|DELETE|PATCH|OPTIONS|HEAD|TRACE|CONNECT) (.*?) HTTP/1\.1";

/// Entry timestamp prefix (`DD.MM.YYYY HH:MM:SS.mmm`) anchored at line start.
/// A line carrying it belongs to a new entry and ends any open capture.
pub const BOUNDARY_PATTERN: &str = r"^[0-9]{2}\.[0-9]{2}\.[0-9]{4} [0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]{3}";

/// Marker that puts a request block into capture mode.
pub const ERROR_MARKER: &str = "*ERROR*";

/// Line prefix treated as a stack frame under the lenient capture policy.
pub const STACK_FRAME_PREFIX: &str = "at ";

/// Line prefix that opens a capture when `error_prefix_opens_capture` is set.
pub const ERROR_BANNER_PREFIX: &str = "Error";

// =============================================================================
// File naming
// =============================================================================

/// Maximum sanitised file-name length in characters. Leaves headroom under
/// the common 255 limit for the extension.
pub const MAX_FILE_STEM_CHARS: usize = 251;

/// Characters replaced by `_` when deriving a file name from a key.
pub const FORBIDDEN_FILE_NAME_CHARS: &[char] =
    &['\\', '/', '*', '?', ':', '"', '<', '>', '|', '\r', '\n'];

/// Extension given to every per-key output stream.
pub const OUTPUT_EXTENSION: &str = "log";

/// Stem used when a key sanitises to an empty string (e.g. the root path `/`).
pub const EMPTY_KEY_FILE_STEM: &str = "root";

/// Prefix of the per-run working directory, the filter output and the archive.
pub const OUTPUT_PREFIX: &str = "filtered_";

/// Audit report listing input lines absent from every output.
/// The leading `_` keeps report names disjoint from sanitised key names.
pub const MISSING_LINES_FILE_NAME: &str = "_missing_lines.log";

/// Line/character count summary.
pub const CHECKSUM_FILE_NAME: &str = "_checksum.log";

/// Upper bound on the `(n)` suffix tried when looking for a free path.
pub const MAX_UNIQUE_PATH_ATTEMPTS: u32 = 10_000;

// =============================================================================
// Progress reporting
// =============================================================================

/// Lines read between progress callbacks and cancel checks.
pub const DEFAULT_PROGRESS_INTERVAL_LINES: u64 = 50_000;

/// Minimum user-configurable progress interval.
pub const MIN_PROGRESS_INTERVAL_LINES: u64 = 1_000;

/// Maximum user-configurable progress interval.
pub const MAX_PROGRESS_INTERVAL_LINES: u64 = 10_000_000;

/// How often the CLI prints elapsed time while a job runs (ms).
pub const ELAPSED_REPORT_INTERVAL_MS: u64 = 1_000;

/// Maximum number of non-fatal warnings kept on a single run report.
pub const MAX_WARNINGS: usize = 1_000;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
