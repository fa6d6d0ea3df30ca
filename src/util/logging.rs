// LogSlicer - util/logging.rs
//
// Structured logging with runtime-selectable debug mode.
//
// Activation:
//   - Environment variable: RUST_LOG=debug (or trace)
//   - CLI flag: --debug
//   - Config file: [logging] level = "debug"
//
// Output: stderr. Log lines from the input are only ever logged through
// `preview`, never in full.

use tracing_subscriber::EnvFilter;

/// Initialise the logging subsystem.
///
/// Priority: RUST_LOG env var > CLI --debug flag > config level > default "info".
pub fn init(debug_flag: bool, config_level: Option<&str>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else if let Some(level) = config_level {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(super::constants::DEFAULT_LOG_LEVEL)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .init();

    tracing::debug!(
        app = super::constants::APP_NAME,
        version = super::constants::APP_VERSION,
        "Logging initialised"
    );
}

/// Shorten a log line for inclusion in diagnostics.
///
/// Cuts at a char boundary no later than `DEBUG_MAX_LINE_PREVIEW` bytes and
/// drops the trailing line terminator.
pub fn preview(line: &str) -> &str {
    let line = line.trim_end_matches(['\r', '\n']);
    let max = super::constants::DEBUG_MAX_LINE_PREVIEW;
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::DEBUG_MAX_LINE_PREVIEW;

    #[test]
    fn test_preview_strips_terminator() {
        assert_eq!(preview("GET /a HTTP/1.1\r\n"), "GET /a HTTP/1.1");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(DEBUG_MAX_LINE_PREVIEW);
        let cut = preview(&long);
        assert!(cut.len() <= DEBUG_MAX_LINE_PREVIEW);
        assert!(cut.chars().all(|c| c == 'é'));
    }
}
