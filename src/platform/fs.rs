// LogSlicer - platform/fs.rs
//
// Output location helpers: collision-free naming, the per-run working
// directory and its cleanup.

use crate::util::constants;
use crate::util::error::{LogSlicerError, Result};
use std::io;
use std::path::{Path, PathBuf};

/// First free variant of `path`: the path itself, else `stem(1).ext`,
/// `stem(2).ext`, ... Directories get the suffix on the whole name.
///
/// Gives up after `MAX_UNIQUE_PATH_ATTEMPTS` candidates.
pub fn unique_path(path: &Path) -> io::Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let parent = path.parent().unwrap_or(Path::new(""));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, ext) = match (path.is_dir(), name.rfind('.')) {
        (false, Some(idx)) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name.as_str(), ""),
    };

    for n in 1..=constants::MAX_UNIQUE_PATH_ATTEMPTS {
        let candidate = parent.join(format!("{stem}({n}){ext}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "no free name for '{}' after {} attempts",
            path.display(),
            constants::MAX_UNIQUE_PATH_ATTEMPTS
        ),
    ))
}

/// File stem of the input, used to name the working directory and archive.
pub fn input_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| constants::EMPTY_KEY_FILE_STEM.to_string())
}

/// Create `<save_dir>/filtered_<stem>` (or the first free `(n)` variant).
pub fn create_output_directory(input: &Path, save_dir: &Path) -> Result<PathBuf> {
    let base = save_dir.join(format!("{}{}", constants::OUTPUT_PREFIX, input_stem(input)));
    let dir = unique_path(&base).map_err(|e| LogSlicerError::Io {
        path: base.clone(),
        operation: "choose working directory",
        source: e,
    })?;
    std::fs::create_dir_all(&dir).map_err(|e| LogSlicerError::Io {
        path: dir.clone(),
        operation: "create working directory",
        source: e,
    })?;
    tracing::debug!(dir = %dir.display(), "Working directory created");
    Ok(dir)
}

/// Remove the working directory after its contents were archived.
///
/// Failure is logged and returned as a warning message; the archive is
/// already complete so the run still succeeds.
pub fn remove_work_dir(dir: &Path) -> Option<String> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            tracing::info!(dir = %dir.display(), "Working directory removed");
            None
        }
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove working directory");
            Some(format!(
                "Could not remove working directory '{}': {e}",
                dir.display()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_unique_path_free_name_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.zip");
        assert_eq!(unique_path(&path).unwrap(), path);
    }

    #[test]
    fn test_unique_path_suffixes_before_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("out.zip"), "").unwrap();
        fs::write(dir.path().join("out(1).zip"), "").unwrap();

        let path = unique_path(&dir.path().join("out.zip")).unwrap();

        assert_eq!(path, dir.path().join("out(2).zip"));
    }

    #[test]
    fn test_unique_path_suffixes_directory_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("filtered_app.v2")).unwrap();

        let path = unique_path(&dir.path().join("filtered_app.v2")).unwrap();

        assert_eq!(path, dir.path().join("filtered_app.v2(1)"));
    }

    #[test]
    fn test_output_directory_never_reuses_existing() {
        let save = tempfile::tempdir().unwrap();
        let input = save.path().join("server.log");

        let first = create_output_directory(&input, save.path()).unwrap();
        let second = create_output_directory(&input, save.path()).unwrap();

        assert_eq!(first, save.path().join("filtered_server"));
        assert_eq!(second, save.path().join("filtered_server(1)"));
        assert!(second.is_dir());
    }

    #[test]
    fn test_remove_work_dir() {
        let save = tempfile::tempdir().unwrap();
        let dir = save.path().join("work");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a.log"), "x").unwrap();

        assert!(remove_work_dir(&dir).is_none());
        assert!(!dir.exists());
        assert!(remove_work_dir(&dir).is_some());
    }
}
