//! # skupack
//!
//! Fetch product images by SKU, normalize them, and pack downloadable
//! archives.
//!
//! Given a tabular list of (identifier, remote-image-URL) pairs, skupack
//! retrieves each image over HTTP, normalizes it into WEBP and JPEG with
//! an explicit alpha-channel policy per encoding, stages the results on
//! per-encoding content roots keyed by identifier, and packs one
//! deflate-compressed ZIP archive per encoding. Individual rows may fail
//! (bad URL, HTTP error, undecodable payload) without aborting the
//! batch; every skipped row is reported with a typed reason.
//!
//! ## Pipeline Overview
//!
//! ```text
//! CSV rows
//!  │
//!  ├─ 1. Clear      empty both content roots
//!  ├─ 2. Fetch      one GET per row (bounded concurrency)
//!  ├─ 3. Normalize  decode, apply alpha policy, encode WEBP
//!  ├─ 4. Stage      write <webp-root>/<SKU>.webp
//!  ├─ 5. Archive    pack the WEBP root into webp.zip
//!  ├─ 6. Convert    re-encode staged WEBPs as JPEG (white-flattened)
//!  └─ 7. Archive    pack the JPEG root into jpeg.zip
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skupack::{run, InputRow, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rows = vec![
//!         InputRow::new("A1", "https://cdn.example.com/a1.png"),
//!         InputRow::new("A2", "https://cdn.example.com/a2.png"),
//!     ];
//!     let config = PipelineConfig::with_out_dir("out");
//!     let output = run(rows, &config).await?;
//!     println!(
//!         "{}/{} rows staged",
//!         output.stats.staged_rows, output.stats.total_rows
//!     );
//!     for (identifier, reason) in output.skipped() {
//!         eprintln!("skipped {identifier}: {reason}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `skupack` binary (clap + anyhow + indicatif + csv) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! skupack = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{PipelineError, RowError};
pub use output::{ArchiveSummary, RowOutcome, RowResult, RunOutput, RunPhase, RunStats};
pub use pipeline::input::{sanitize_identifier, InputRow};
pub use pipeline::normalize::ImageEncoding;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use run::{run, run_sync};
