// LogSlicer - core/package.rs
//
// Bundles produced files into a single zip archive in the destination
// directory. The archive is staged in a temporary file beside its final
// location and moved into place only once complete, so a failed run never
// leaves a truncated archive under the final name.

use crate::core::model::{EmptyArchivePolicy, PackageOutcome};
use crate::util::error::PackagingError;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write every file in `produced` into `<dest_dir>/<archive_name>`.
///
/// Entries are stored under their file name. Paths listed twice are added
/// once, paths that no longer exist are skipped, and a second file with an
/// already-used entry name is skipped with a warning.
///
/// The caller picks a non-colliding `archive_name`; an existing destination
/// is reported as `PackagingError::DestinationExists`.
pub fn package(
    produced: &[PathBuf],
    dest_dir: &Path,
    archive_name: &str,
    empty_policy: EmptyArchivePolicy,
) -> Result<PackageOutcome, PackagingError> {
    let mut seen_paths: HashSet<&Path> = HashSet::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    let mut entries: Vec<(&Path, String)> = Vec::new();

    for path in produced {
        if !seen_paths.insert(path.as_path()) {
            tracing::debug!(file = %path.display(), "Already queued for archive");
            continue;
        }
        if !path.is_file() {
            tracing::debug!(file = %path.display(), "Missing, not archived");
            continue;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if !seen_names.insert(name.clone()) {
            tracing::warn!(file = %path.display(), entry = %name, "Entry name already used, skipped");
            continue;
        }
        entries.push((path.as_path(), name));
    }

    if entries.is_empty() && empty_policy == EmptyArchivePolicy::Report {
        tracing::info!("Nothing to package");
        return Ok(PackageOutcome::NoOutput);
    }

    let destination = dest_dir.join(archive_name);
    if destination.exists() {
        return Err(PackagingError::DestinationExists { path: destination });
    }

    let staged = tempfile::NamedTempFile::new_in(dest_dir).map_err(|e| PackagingError::Create {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    let mut zip = ZipWriter::new(staged.as_file());
    for (path, name) in &entries {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name.as_str(), options)
            .map_err(|e| PackagingError::Zip {
                path: path.to_path_buf(),
                source: e,
            })?;
        let mut file = File::open(path).map_err(|e| PackagingError::AddFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::io::copy(&mut file, &mut zip).map_err(|e| PackagingError::AddFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(file = %path.display(), "Added to archive");
    }
    zip.finish().map_err(|e| PackagingError::Zip {
        path: destination.clone(),
        source: e,
    })?;

    staged
        .persist_noclobber(&destination)
        .map_err(|e| PackagingError::Persist {
            path: destination.clone(),
            source: e.error,
        })?;

    tracing::info!(
        archive = %destination.display(),
        entries = entries.len(),
        "Archive written"
    );

    Ok(PackageOutcome::Archive(destination))
}
