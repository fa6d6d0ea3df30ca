// LogSlicer - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::model::{CapturePolicy, EmptyArchivePolicy, ScanConfig};
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LogSlicer configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logslicer/ or %APPDATA%\LogSlicer\config\)
    pub config_dir: PathBuf,

    /// Full path of `config.toml` inside `config_dir`.
    pub config_file: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        let config_dir = match ProjectDirs::from("", "", constants::APP_ID) {
            Some(proj_dirs) => proj_dirs.config_dir().to_path_buf(),
            None => {
                tracing::warn!("Could not determine platform directories, using current directory");
                PathBuf::from(".")
            }
        };
        let config_file = config_dir.join(constants::CONFIG_FILE_NAME);

        tracing::debug!(
            config = %config_dir.display(),
            file = %config_file.display(),
            "Platform paths resolved"
        );

        Self {
            config_dir,
            config_file,
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so a newer config file can be used with
/// an older binary.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[capture]` section.
    pub capture: CaptureSection,
    /// `[output]` section.
    pub output: OutputSection,
    /// `[package]` section.
    pub package: PackageSection,
    /// `[progress]` section.
    pub progress: ProgressSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[capture]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct CaptureSection {
    /// Keep `at ...` lines even outside an `*ERROR*` capture.
    pub lenient_stack_frames: Option<bool>,
    /// Lines starting with `Error` open a capture.
    pub error_prefix_opens_capture: Option<bool>,
}

/// `[output]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Keep the working directory after a successful archive.
    pub keep_work_dir: Option<bool>,
    /// Bundle split outputs into a zip archive.
    pub archive: Option<bool>,
}

/// `[package]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct PackageSection {
    /// "create" writes an empty archive, "report" returns NoOutput.
    pub empty_archive: Option<String>,
}

/// `[progress]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ProgressSection {
    /// Lines read between progress updates and cancel checks.
    pub interval_lines: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Values are validated against named constants at load time. Invalid values
/// produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Capture --
    pub policy: CapturePolicy,

    // -- Output --
    /// Keep the working directory after the archive is written.
    pub keep_work_dir: bool,
    /// Produce an archive at the end of a split run.
    pub archive: bool,
    /// What packaging does when there is nothing to archive.
    pub empty_archive: EmptyArchivePolicy,

    // -- Progress --
    pub progress_interval_lines: u64,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            policy: CapturePolicy::default(),
            keep_work_dir: true,
            archive: true,
            empty_archive: EmptyArchivePolicy::default(),
            progress_interval_lines: constants::DEFAULT_PROGRESS_INTERVAL_LINES,
            log_level: None,
        }
    }
}

impl AppConfig {
    /// Scan settings for the engines.
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            policy: self.policy,
            progress_interval_lines: self.progress_interval_lines,
        }
    }
}

/// Read and parse a config file without validating values.
pub fn read_config(config_path: &Path) -> Result<RawConfig, ConfigError> {
    let content = std::fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
        path: config_path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
        path: config_path.to_path_buf(),
        source: e,
    })
}

/// Load and validate the config file at `config_path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first run).
/// If the file is unreadable or unparseable, returns defaults with a warning:
/// the run still proceeds but the user is told why the file was ignored.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let raw = match read_config(config_path) {
        Ok(raw) => raw,
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let (config, validation) = validate(raw);
    warnings.extend(validation.iter().map(|e| format!("{e}. Using default.")));

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Apply every recognised value of `raw` over the defaults, collecting one
/// error per rejected value.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<ConfigError>) {
    let mut config = AppConfig::default();
    let mut errors = Vec::new();

    // -- Capture --
    if let Some(lenient) = raw.capture.lenient_stack_frames {
        config.policy.lenient_stack_frames = lenient;
    }
    if let Some(prefix) = raw.capture.error_prefix_opens_capture {
        config.policy.error_prefix_opens_capture = prefix;
    }

    // -- Output --
    if let Some(keep) = raw.output.keep_work_dir {
        config.keep_work_dir = keep;
    }
    if let Some(archive) = raw.output.archive {
        config.archive = archive;
    }

    // -- Package: empty_archive --
    if let Some(ref policy) = raw.package.empty_archive {
        match policy.to_lowercase().as_str() {
            "create" => config.empty_archive = EmptyArchivePolicy::Create,
            "report" => config.empty_archive = EmptyArchivePolicy::Report,
            _ => errors.push(ConfigError::ValueOutOfRange {
                field: "package.empty_archive".to_string(),
                value: policy.clone(),
                expected: "\"create\" or \"report\"".to_string(),
            }),
        }
    }

    // -- Progress: interval_lines --
    if let Some(interval) = raw.progress.interval_lines {
        if (constants::MIN_PROGRESS_INTERVAL_LINES..=constants::MAX_PROGRESS_INTERVAL_LINES)
            .contains(&interval)
        {
            config.progress_interval_lines = interval;
        } else {
            errors.push(ConfigError::ValueOutOfRange {
                field: "progress.interval_lines".to_string(),
                value: interval.to_string(),
                expected: format!(
                    "{}-{}",
                    constants::MIN_PROGRESS_INTERVAL_LINES,
                    constants::MAX_PROGRESS_INTERVAL_LINES
                ),
            });
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            errors.push(ConfigError::ValueOutOfRange {
                field: "logging.level".to_string(),
                value: level.clone(),
                expected: "error, warn, info, debug or trace".to_string(),
            });
        }
    }

    (config, errors)
}
