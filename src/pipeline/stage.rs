//! Staging: write encoded artifacts onto a content root, and clear roots
//! between runs.
//!
//! A root holds at most one file per (identifier, encoding) pair; writes
//! for the same name overwrite. `clear` runs before any batch that
//! targets a root, so an archive built at run end reflects only the
//! current input and never stale entries from a prior upload. All
//! failures here are fatal to the run: an unwritable root makes
//! continuing meaningless.

use crate::error::PipelineError;
use crate::pipeline::normalize::EncodedArtifact;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write `artifact` to `<root>/<stem>.<ext>`, creating the root if
/// needed. Overwrites any existing file of the same name.
pub async fn stage(artifact: &EncodedArtifact, root: &Path) -> Result<PathBuf, PipelineError> {
    tokio::fs::create_dir_all(root)
        .await
        .map_err(|e| PipelineError::Staging {
            path: root.to_path_buf(),
            source: e,
        })?;

    let path = root.join(artifact.file_name());
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .map_err(|e| PipelineError::Staging {
            path: path.clone(),
            source: e,
        })?;
    debug!("Staged {} ({} bytes)", path.display(), artifact.bytes.len());

    Ok(path)
}

/// Remove every entry under `root` (files and subdirectories) without
/// removing the root directory itself. No-op if the root does not exist.
pub fn clear(root: &Path) -> Result<(), PipelineError> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(PipelineError::Staging {
                path: root.to_path_buf(),
                source: e,
            })
        }
    };

    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::Staging {
            path: root.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let result = if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        result.map_err(|e| PipelineError::Staging {
            path,
            source: e,
        })?;
    }
    debug!("Cleared root {}", root.display());

    Ok(())
}
