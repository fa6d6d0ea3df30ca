// LogSlicer - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Every variant carries the path it concerns so the caller can present it
// verbatim.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LogSlicer operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogSlicerError {
    /// The input (or a produced file being re-read) could not be read.
    Read(ReadError),

    /// An output stream could not be created or written.
    Write(WriteError),

    /// The archive could not be written or moved.
    Packaging(PackagingError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// The run was cancelled; files written so far are flushed and closed.
    Cancelled { produced: Vec<PathBuf> },

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for LogSlicerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(e) => write!(f, "Read error: {e}"),
            Self::Write(e) => write!(f, "Write error: {e}"),
            Self::Packaging(e) => write!(f, "Packaging error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Cancelled { produced } => write!(
                f,
                "Cancelled after producing {} file(s); outputs are incomplete",
                produced.len()
            ),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LogSlicerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read(e) => Some(e),
            Self::Write(e) => Some(e),
            Self::Packaging(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Cancelled { .. } => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Read errors
// ---------------------------------------------------------------------------

/// Fatal input errors. The whole operation is aborted.
#[derive(Debug)]
pub enum ReadError {
    /// The file does not exist or cannot be opened.
    Open { path: PathBuf, source: io::Error },

    /// The file was opened but reading it failed part-way.
    Read {
        path: PathBuf,
        line_number: u64,
        source: io::Error,
    },
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "Cannot open '{}': {source}", path.display())
            }
            Self::Read {
                path,
                line_number,
                source,
            } => write!(
                f,
                "'{}': read failed after line {line_number}: {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { source, .. } | Self::Read { source, .. } => Some(source),
        }
    }
}

impl From<ReadError> for LogSlicerError {
    fn from(e: ReadError) -> Self {
        Self::Read(e)
    }
}

// ---------------------------------------------------------------------------
// Write errors
// ---------------------------------------------------------------------------

/// Output errors. Recoverable inside a scan: the affected key is skipped and
/// every other key is still processed.
#[derive(Debug)]
pub enum WriteError {
    /// The output file for `key` could not be created.
    Create {
        key: String,
        path: PathBuf,
        source: io::Error,
    },

    /// A write or flush on an already-open output failed.
    Write { path: PathBuf, source: io::Error },
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { key, path, source } => write!(
                f,
                "Cannot create '{}' for key '{key}': {source}",
                path.display()
            ),
            Self::Write { path, source } => {
                write!(f, "Write to '{}' failed: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Create { source, .. } | Self::Write { source, .. } => Some(source),
        }
    }
}

impl From<WriteError> for LogSlicerError {
    fn from(e: WriteError) -> Self {
        Self::Write(e)
    }
}

// ---------------------------------------------------------------------------
// Packaging errors
// ---------------------------------------------------------------------------

/// Errors that abort the packaging step. Outputs already on disk are kept.
#[derive(Debug)]
pub enum PackagingError {
    /// The staging file for the archive could not be created.
    Create { path: PathBuf, source: io::Error },

    /// A produced file could not be copied into the archive.
    AddFile { path: PathBuf, source: io::Error },

    /// The zip writer rejected an entry or failed to finalise.
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    /// The finished archive could not be moved to its destination.
    Persist { path: PathBuf, source: io::Error },

    /// Something already occupies the destination path.
    DestinationExists { path: PathBuf },
}

impl fmt::Display for PackagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { path, source } => {
                write!(f, "Cannot stage archive in '{}': {source}", path.display())
            }
            Self::AddFile { path, source } => {
                write!(f, "Cannot add '{}' to archive: {source}", path.display())
            }
            Self::Zip { path, source } => {
                write!(f, "Zip error for '{}': {source}", path.display())
            }
            Self::Persist { path, source } => {
                write!(f, "Cannot move archive to '{}': {source}", path.display())
            }
            Self::DestinationExists { path } => write!(
                f,
                "Archive destination '{}' already exists; choose another name",
                path.display()
            ),
        }
    }
}

impl std::error::Error for PackagingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Create { source, .. }
            | Self::AddFile { source, .. }
            | Self::Persist { source, .. } => Some(source),
            Self::Zip { source, .. } => Some(source),
            Self::DestinationExists { .. } => None,
        }
    }
}

impl From<PackagingError> for LogSlicerError {
    fn from(e: PackagingError) -> Self {
        Self::Packaging(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LogSlicerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for LogSlicer results.
pub type Result<T> = std::result::Result<T, LogSlicerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_read_error_display_names_path() {
        let err = ReadError::Open {
            path: PathBuf::from("missing.log"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        let msg = LogSlicerError::from(err).to_string();
        assert!(msg.starts_with("Read error:"), "{msg}");
        assert!(msg.contains("missing.log"), "{msg}");
    }

    #[test]
    fn test_source_chain_is_preserved() {
        let err: LogSlicerError = WriteError::Write {
            path: PathBuf::from("a.log"),
            source: io::Error::other("disk full"),
        }
        .into();
        let write = err.source().expect("write error source");
        let io = write.source().expect("io error source");
        assert_eq!(io.to_string(), "disk full");
    }

    #[test]
    fn test_destination_exists_has_no_source() {
        let err = PackagingError::DestinationExists {
            path: PathBuf::from("out.zip"),
        };
        assert!(err.source().is_none());
        assert!(err.to_string().contains("out.zip"));
    }
}
