//! Archiving: pack one content root's files into a fresh deflate ZIP.
//!
//! The archive is rebuilt from scratch on every request
//! (truncate-and-rewrite, never append) and written atomically: bytes go
//! to a sibling temp file that is renamed over the output path only after
//! a successful finish. A failure partway (a file vanishing mid-walk, a
//! full disk) surfaces as an error, removes the temp file, and leaves any
//! previous archive at the output path untouched.
//!
//! Entry names are relative to the root's parent, so archiving
//! `out/webp` yields entries like `webp/A1.webp`, preserving nested
//! structure below the root.

use crate::error::PipelineError;
use crate::output::ArchiveSummary;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Pack every file under `root` whose name ends with `suffix`
/// (case-sensitive) into a fresh archive at `output_path`.
///
/// A missing root yields a zero-entry [`ArchiveSummary`] with no archive
/// file created; an existing-but-empty root yields a valid empty archive.
pub fn archive(
    root: &Path,
    suffix: &str,
    output_path: &Path,
) -> Result<ArchiveSummary, PipelineError> {
    if !root.is_dir() {
        debug!(
            "Root {} does not exist, skipping archive {}",
            root.display(),
            output_path.display()
        );
        return Ok(ArchiveSummary::empty());
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| archiving(output_path, e))?;
        }
    }

    let tmp_path = output_path.with_extension("zip.tmp");
    match write_archive(root, suffix, &tmp_path) {
        Ok((files_archived, bytes_written)) => {
            std::fs::rename(&tmp_path, output_path).map_err(|e| archiving(output_path, e))?;
            info!(
                "Archived {} files ({} bytes) from {} into {}",
                files_archived,
                bytes_written,
                root.display(),
                output_path.display()
            );
            Ok(ArchiveSummary {
                archive_path: Some(output_path.to_path_buf()),
                files_archived,
                bytes_written,
            })
        }
        Err(e) => {
            // No partial archive is ever left in place as "success".
            let _ = std::fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

fn write_archive(root: &Path, suffix: &str, tmp_path: &Path) -> Result<(usize, u64), PipelineError> {
    let file = File::create(tmp_path).map_err(|e| archiving(tmp_path, e))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // Entry paths are computed against the root's parent so the root's
    // own directory name appears inside the archive.
    let base = root.parent().unwrap_or(root);

    let mut files_archived = 0usize;
    let mut bytes_written = 0u64;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| PipelineError::Archiving {
            path: root.to_path_buf(),
            detail: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if !entry.file_name().to_string_lossy().ends_with(suffix) {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(base)
            .map_err(|e| PipelineError::Internal(format!("path outside root: {e}")))?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        writer
            .start_file(name, options)
            .map_err(|e| PipelineError::Archiving {
                path: entry.path().to_path_buf(),
                detail: e.to_string(),
            })?;
        let mut input = File::open(entry.path()).map_err(|e| archiving(entry.path(), e))?;
        bytes_written +=
            std::io::copy(&mut input, &mut writer).map_err(|e| archiving(entry.path(), e))?;
        files_archived += 1;
    }

    writer.finish().map_err(|e| PipelineError::Archiving {
        path: tmp_path.to_path_buf(),
        detail: e.to_string(),
    })?;

    Ok((files_archived, bytes_written))
}

fn archiving(path: &Path, e: std::io::Error) -> PipelineError {
    PipelineError::Archiving {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entry_names(path: &Path) -> Vec<String> {
        let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn missing_root_archives_nothing_and_creates_no_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("webp.zip");

        let summary = archive(&tmp.path().join("absent"), ".webp", &out).unwrap();

        assert!(summary.archive_path.is_none());
        assert_eq!(summary.files_archived, 0);
        assert!(!out.exists());
    }

    #[test]
    fn empty_root_yields_valid_empty_archive() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().join("webp");
        std::fs::create_dir(&root).unwrap();
        let out = tmp.path().join("webp.zip");

        let summary = archive(&root, ".webp", &out).unwrap();

        assert_eq!(summary.files_archived, 0);
        assert_eq!(summary.archive_path.as_deref(), Some(out.as_path()));
        assert!(entry_names(&out).is_empty());
    }

    #[test]
    fn entries_are_relative_to_root_parent_and_suffix_filtered() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().join("webp");
        std::fs::create_dir_all(root.join("nested")).unwrap();
        std::fs::write(root.join("A1.webp"), b"one").unwrap();
        std::fs::write(root.join("nested/A2.webp"), b"two").unwrap();
        std::fs::write(root.join("notes.txt"), b"skip me").unwrap();
        std::fs::write(root.join("A3.WEBP"), b"case-sensitive, skip").unwrap();
        let out = tmp.path().join("webp.zip");

        let summary = archive(&root, ".webp", &out).unwrap();

        assert_eq!(summary.files_archived, 2);
        let names = entry_names(&out);
        assert!(names.contains(&"webp/A1.webp".to_string()), "got: {names:?}");
        assert!(
            names.contains(&"webp/nested/A2.webp".to_string()),
            "got: {names:?}"
        );
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn rearchiving_truncates_rather_than_appends() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().join("webp");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("A1.webp"), b"one").unwrap();
        let out = tmp.path().join("webp.zip");

        archive(&root, ".webp", &out).unwrap();

        std::fs::remove_file(root.join("A1.webp")).unwrap();
        std::fs::write(root.join("B1.webp"), b"new run").unwrap();
        archive(&root, ".webp", &out).unwrap();

        let names = entry_names(&out);
        assert_eq!(names, vec!["webp/B1.webp".to_string()]);
    }

    #[test]
    fn archived_bytes_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().join("webp");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("A1.webp"), b"payload").unwrap();
        let out = tmp.path().join("webp.zip");

        let summary = archive(&root, ".webp", &out).unwrap();
        assert_eq!(summary.bytes_written, 7);

        let mut zip = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut entry = zip.by_name("webp/A1.webp").unwrap();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"payload");
    }
}
