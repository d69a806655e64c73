//! Result types returned by a pipeline run.
//!
//! [`RunOutput`] collects the per-row record of what happened
//! ([`RowResult`]), the two archive summaries, and aggregate
//! [`RunStats`]. Everything here is serde-serializable so callers can
//! emit the whole run as JSON.

use crate::error::RowError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The explicit run state machine.
///
/// Surfaced to callers through
/// [`crate::progress::PipelineProgressCallback::on_phase`]; the pipeline
/// moves through these states strictly in order and never backwards
/// within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// No run in flight.
    Idle,
    /// Emptying both content roots before any row is processed.
    Clearing,
    /// Per-row fetch → normalize → stage into the WEBP root.
    Processing,
    /// Packing the WEBP root into the WEBP archive.
    ArchivingWebp,
    /// Re-encoding every staged WEBP into the JPEG root.
    ConvertingJpeg,
    /// Packing the JPEG root into the JPEG archive.
    ArchivingJpeg,
    /// Run finished; the next run starts from `Idle` again.
    Done,
}

/// What happened to one input row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RowOutcome {
    /// The row's image was fetched, normalized, and written to the WEBP
    /// content root at `path`.
    Staged { path: PathBuf },
    /// The row was skipped; the run continued. `reason` is the typed
    /// diagnostic exposed to the caller for display or logging.
    Skipped { reason: RowError },
}

/// Per-row record: identifier, the sanitized filename stem actually used
/// on disk, and the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowResult {
    /// Caller-supplied identifier (SKU), as parsed from the input.
    pub identifier: String,
    /// Filename stem derived from the identifier; empty when the row was
    /// skipped for an unusable identifier.
    pub stem: String,
    pub outcome: RowOutcome,
}

impl RowResult {
    /// True when the row contributed a staged file.
    pub fn is_staged(&self) -> bool {
        matches!(self.outcome, RowOutcome::Staged { .. })
    }
}

/// Summary of one archive build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSummary {
    /// `None` when the content root did not exist and no archive file was
    /// produced (a valid outcome, not an error).
    pub archive_path: Option<PathBuf>,
    /// Number of files packed into the archive.
    pub files_archived: usize,
    /// Total uncompressed bytes read into the archive.
    pub bytes_written: u64,
}

impl ArchiveSummary {
    /// Summary for a missing root: nothing archived, no file produced.
    pub fn empty() -> Self {
        Self {
            archive_path: None,
            files_archived: 0,
            bytes_written: 0,
        }
    }
}

/// Aggregate statistics for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// Row count of the input; fixed at run start.
    pub total_rows: usize,
    /// Rows whose fetch + normalize + stage all succeeded.
    pub staged_rows: usize,
    /// Rows skipped with a [`RowError`].
    pub failed_rows: usize,
    /// Input rows whose sanitized identifier collided with an earlier
    /// row's. Later writes win; this counter makes the overwrite visible.
    pub duplicate_identifiers: usize,
    /// Files produced by the WEBP → JPEG conversion phase.
    pub converted_jpegs: usize,
    /// Wall-clock of the per-row processing phase.
    pub fetch_duration_ms: u64,
    /// Wall-clock of the JPEG conversion phase.
    pub convert_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// One entry per input row, in input order.
    pub rows: Vec<RowResult>,
    pub webp_archive: ArchiveSummary,
    pub jpeg_archive: ArchiveSummary,
    pub stats: RunStats,
}

impl RunOutput {
    /// Iterate the skipped rows with their reasons, for diagnostics
    /// rendering.
    pub fn skipped(&self) -> impl Iterator<Item = (&str, &RowError)> {
        self.rows.iter().filter_map(|r| match &r.outcome {
            RowOutcome::Skipped { reason } => Some((r.identifier.as_str(), reason)),
            RowOutcome::Staged { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_iterates_only_failures() {
        let out = RunOutput {
            rows: vec![
                RowResult {
                    identifier: "A1".into(),
                    stem: "A1".into(),
                    outcome: RowOutcome::Staged {
                        path: PathBuf::from("webp/A1.webp"),
                    },
                },
                RowResult {
                    identifier: "A2".into(),
                    stem: "A2".into(),
                    outcome: RowOutcome::Skipped {
                        reason: RowError::HttpStatus { status: 404 },
                    },
                },
            ],
            webp_archive: ArchiveSummary::empty(),
            jpeg_archive: ArchiveSummary::empty(),
            stats: RunStats {
                total_rows: 2,
                staged_rows: 1,
                failed_rows: 1,
                duplicate_identifiers: 0,
                converted_jpegs: 1,
                fetch_duration_ms: 0,
                convert_duration_ms: 0,
                total_duration_ms: 0,
            },
        };

        let skipped: Vec<_> = out.skipped().collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].0, "A2");
    }

    #[test]
    fn run_output_serializes_to_json() {
        let out = RunOutput {
            rows: vec![],
            webp_archive: ArchiveSummary::empty(),
            jpeg_archive: ArchiveSummary::empty(),
            stats: RunStats {
                total_rows: 0,
                staged_rows: 0,
                failed_rows: 0,
                duplicate_identifiers: 0,
                converted_jpegs: 0,
                fetch_duration_ms: 1,
                convert_duration_ms: 2,
                total_duration_ms: 3,
            },
        };
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("webp_archive"), "got: {json}");
    }
}
