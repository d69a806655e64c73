//! Batch orchestration: the top-level entry points for a pipeline run.
//!
//! A run moves through an explicit state machine:
//!
//! ```text
//! Idle → Clearing → Processing → ArchivingWebp
//!      → ConvertingJpeg → ArchivingJpeg → Done
//! ```
//!
//! Both content roots are cleared up front (the JPEG root too, even
//! though it is only populated later, so its archive reflects only this
//! run). Rows are then fetched, normalized to WEBP, and staged with
//! bounded concurrency; per-row failures are recorded and skipped while
//! the run continues. After the WEBP archive is built, every staged WEBP
//! is decoded again and re-encoded as JPEG into the JPEG root
//! (decode-then-reencode, not reuse of the original source bytes), and
//! the JPEG archive is built. Progress counts one increment per row,
//! success or failure, reaching the input row count exactly once.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, RowError};
use crate::output::{ArchiveSummary, RowOutcome, RowResult, RunOutput, RunPhase, RunStats};
use crate::pipeline::input::{sanitize_identifier, InputRow};
use crate::pipeline::normalize::ImageEncoding;
use crate::pipeline::{archive, fetch, normalize, stage};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Run the full pipeline over `rows`.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(RunOutput)` on success, even if some rows failed (check
/// `output.stats.failed_rows` and [`RunOutput::skipped`]).
///
/// # Errors
/// Returns `Err(PipelineError)` only for fatal errors: an unusable
/// content root or a failed archive build. Row-level failures never
/// abort the run.
pub async fn run(rows: Vec<InputRow>, config: &PipelineConfig) -> Result<RunOutput, PipelineError> {
    let total_start = Instant::now();
    let total_rows = rows.len();
    info!("Starting run: {} rows", total_rows);

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total_rows);
    }

    // ── Clearing ─────────────────────────────────────────────────────────
    set_phase(config, RunPhase::Clearing);
    {
        let webp_root = config.webp_root.clone();
        let jpeg_root = config.jpeg_root.clone();
        tokio::task::spawn_blocking(move || {
            stage::clear(&webp_root)?;
            stage::clear(&jpeg_root)
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("Clear task panicked: {e}")))??;
    }

    // ── Duplicate-identifier scan ────────────────────────────────────────
    // Later writes win (accepted behavior), but the overwrite must be
    // visible to operators.
    let mut seen = HashSet::new();
    let mut duplicate_identifiers = 0usize;
    let indexed: Vec<(usize, InputRow, String)> = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| {
            let stem = sanitize_identifier(&row.identifier);
            if !stem.is_empty() && !seen.insert(stem.clone()) {
                duplicate_identifiers += 1;
                warn!(
                    "Duplicate identifier '{}' (stem '{}'): later write wins",
                    row.identifier, stem
                );
            }
            (idx, row, stem)
        })
        .collect();

    // ── Processing ───────────────────────────────────────────────────────
    set_phase(config, RunPhase::Processing);
    let fetch_start = Instant::now();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .build()
        .map_err(|e| PipelineError::Internal(format!("HTTP client: {e}")))?;

    // Rows complete out of order, but the consumer side of the stream is
    // single-threaded, so a plain counter keeps progress monotonic with
    // no lost increments.
    let mut processed = 0usize;
    let mut indexed_results: Vec<(usize, RowResult)> = Vec::with_capacity(total_rows);
    {
        let client = &client;
        let mut in_flight = stream::iter(
            indexed
                .into_iter()
                .map(|(idx, row, stem)| async move {
                    (idx, process_row(client, row, stem, config).await)
                }),
        )
        .buffer_unordered(config.concurrency);

        // A fatal error aborts immediately; in-flight rows are dropped.
        while let Some((idx, result)) = in_flight.next().await {
            let row_result = result?;
            processed += 1;
            if let RowOutcome::Skipped { reason } = &row_result.outcome {
                warn!("Skipping {}: {}", row_result.identifier, reason);
            }
            if let Some(ref cb) = config.progress_callback {
                cb.on_row_complete(processed, total_rows, &row_result);
            }
            indexed_results.push((idx, row_result));
        }
    }

    // Completion order is nondeterministic under concurrency; report in
    // input order.
    indexed_results.sort_by_key(|(idx, _)| *idx);
    let row_results: Vec<RowResult> = indexed_results.into_iter().map(|(_, r)| r).collect();
    let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;

    // ── Archive WEBP ─────────────────────────────────────────────────────
    set_phase(config, RunPhase::ArchivingWebp);
    let webp_archive = run_archive(
        &config.webp_root,
        ImageEncoding::WebP.suffix(),
        &config.webp_archive,
    )
    .await?;

    // ── Convert staged WEBPs to JPEG ─────────────────────────────────────
    set_phase(config, RunPhase::ConvertingJpeg);
    let convert_start = Instant::now();
    let converted_jpegs = convert_staged_webps(config).await?;
    let convert_duration_ms = convert_start.elapsed().as_millis() as u64;

    // ── Archive JPEG ─────────────────────────────────────────────────────
    set_phase(config, RunPhase::ArchivingJpeg);
    let jpeg_archive = run_archive(
        &config.jpeg_root,
        ImageEncoding::Jpeg.suffix(),
        &config.jpeg_archive,
    )
    .await?;

    // ── Done ─────────────────────────────────────────────────────────────
    set_phase(config, RunPhase::Done);
    let staged_rows = row_results.iter().filter(|r| r.is_staged()).count();
    let failed_rows = total_rows - staged_rows;
    let stats = RunStats {
        total_rows,
        staged_rows,
        failed_rows,
        duplicate_identifiers,
        converted_jpegs,
        fetch_duration_ms,
        convert_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Run complete: {}/{} rows staged, {} JPEGs converted, {}ms total",
        staged_rows, total_rows, converted_jpegs, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total_rows, staged_rows);
    }

    Ok(RunOutput {
        rows: row_results,
        webp_archive,
        jpeg_archive,
        stats,
    })
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(rows: Vec<InputRow>, config: &PipelineConfig) -> Result<RunOutput, PipelineError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PipelineError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(run(rows, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn set_phase(config: &PipelineConfig, phase: RunPhase) {
    debug!("Run phase: {:?}", phase);
    if let Some(ref cb) = config.progress_callback {
        cb.on_phase(phase);
    }
}

/// Fetch, normalize to WEBP, and stage one row.
///
/// Row-level failures come back as `Ok` with a skipped outcome; only
/// staging I/O failures surface as `Err` and abort the run.
async fn process_row(
    client: &reqwest::Client,
    row: InputRow,
    stem: String,
    config: &PipelineConfig,
) -> Result<RowResult, PipelineError> {
    if stem.is_empty() {
        let reason = RowError::EmptyIdentifier {
            identifier: row.identifier.clone(),
        };
        return Ok(skipped(row.identifier, stem, reason));
    }

    let bytes = match fetch::fetch(client, &row.source_url).await {
        Ok(bytes) => bytes,
        Err(reason) => return Ok(skipped(row.identifier, stem, reason)),
    };

    let encode_stem = stem.clone();
    let encoded = tokio::task::spawn_blocking(move || {
        normalize::normalize(&bytes, &encode_stem, ImageEncoding::WebP)
    })
    .await
    .map_err(|e| PipelineError::Internal(format!("Normalize task panicked: {e}")))?;

    let artifact = match encoded {
        Ok(artifact) => artifact,
        Err(reason) => return Ok(skipped(row.identifier, stem, reason)),
    };

    let path = stage::stage(&artifact, &config.webp_root).await?;
    Ok(RowResult {
        identifier: row.identifier,
        stem,
        outcome: RowOutcome::Staged { path },
    })
}

fn skipped(identifier: String, stem: String, reason: RowError) -> RowResult {
    RowResult {
        identifier,
        stem,
        outcome: RowOutcome::Skipped { reason },
    }
}

async fn run_archive(
    root: &Path,
    suffix: &'static str,
    output: &Path,
) -> Result<ArchiveSummary, PipelineError> {
    let root = root.to_path_buf();
    let output = output.to_path_buf();
    tokio::task::spawn_blocking(move || archive::archive(&root, suffix, &output))
        .await
        .map_err(|e| PipelineError::Internal(format!("Archive task panicked: {e}")))?
}

/// Walk the WEBP root and re-encode every staged `.webp` into the JPEG
/// root. Decoding each staged file (rather than reusing source bytes)
/// means the JPEG output reflects exactly what was staged.
async fn convert_staged_webps(config: &PipelineConfig) -> Result<usize, PipelineError> {
    if !config.webp_root.is_dir() {
        debug!("WEBP root absent, nothing to convert");
        return Ok(0);
    }

    let mut converted = 0usize;
    for entry in walkdir::WalkDir::new(&config.webp_root).sort_by_file_name() {
        let entry = entry.map_err(|e| PipelineError::Staging {
            path: config.webp_root.clone(),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("walk failed")),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(stem) = name.strip_suffix(".webp") else {
            continue;
        };

        let path = entry.path().to_path_buf();
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| PipelineError::Staging {
                path: path.clone(),
                source: e,
            })?;

        let encode_stem = stem.to_string();
        let result = tokio::task::spawn_blocking(move || {
            normalize::normalize(&bytes, &encode_stem, ImageEncoding::Jpeg)
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("Convert task panicked: {e}")))?;

        match result {
            Ok(artifact) => {
                stage::stage(&artifact, &config.jpeg_root).await?;
                converted += 1;
            }
            // A staged file that fails to decode is a diagnostic, not a
            // reason to lose the rest of the batch.
            Err(e) => warn!("Skipping JPEG conversion of {}: {}", path.display(), e),
        }
    }

    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_input_completes_with_no_archives() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = PipelineConfig::with_out_dir(tmp.path());

        let output = run(Vec::new(), &config).await.unwrap();

        assert_eq!(output.stats.total_rows, 0);
        assert_eq!(output.stats.staged_rows, 0);
        // Roots were never created, so no archive files exist.
        assert!(output.webp_archive.archive_path.is_none());
        assert!(output.jpeg_archive.archive_path.is_none());
        assert!(!config.webp_archive.exists());
    }

    #[tokio::test]
    async fn unusable_root_is_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        // A file where the WEBP root should be makes clearing fail.
        let bogus_root = tmp.path().join("webp");
        std::fs::write(&bogus_root, b"not a directory").unwrap();
        let config = PipelineConfig::builder()
            .webp_root(&bogus_root)
            .jpeg_root(tmp.path().join("jpeg"))
            .webp_archive(tmp.path().join("webp.zip"))
            .jpeg_archive(tmp.path().join("jpeg.zip"))
            .build()
            .unwrap();

        let err = run(Vec::new(), &config).await.unwrap_err();
        assert!(matches!(err, PipelineError::Staging { .. }), "got: {err:?}");
    }
}
