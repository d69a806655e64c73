//! CLI binary for skupack.
//!
//! A thin shim over the library crate that parses the input CSV, maps
//! CLI flags to `PipelineConfig`, and renders progress and diagnostics.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use skupack::{
    run, InputRow, PipelineConfig, PipelineProgressCallback, ProgressCallback, RowOutcome,
    RowResult, RunPhase,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-row
/// log lines using [indicatif]. Works correctly when rows complete
/// out-of-order (concurrent fetching).
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set by
    /// `on_run_start` (called before any row is processed).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} rows  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Fetching");
        self.bar.reset_eta();
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_rows: usize) {
        self.activate_bar(total_rows);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting run over {total_rows} rows…"))
        ));
    }

    fn on_phase(&self, phase: RunPhase) {
        let label = match phase {
            RunPhase::Idle => return,
            RunPhase::Clearing => "Clearing",
            RunPhase::Processing => "Fetching",
            RunPhase::ArchivingWebp => "Packing WEBP",
            RunPhase::ConvertingJpeg => "Converting",
            RunPhase::ArchivingJpeg => "Packing JPEG",
            RunPhase::Done => "Done",
        };
        self.bar.set_prefix(label);
    }

    fn on_row_complete(&self, _processed: usize, _total: usize, row: &RowResult) {
        match &row.outcome {
            RowOutcome::Staged { path } => {
                self.bar.println(format!(
                    "  {} {:<20}  {}",
                    green("✓"),
                    row.identifier,
                    dim(&path.display().to_string()),
                ));
            }
            RowOutcome::Skipped { reason } => {
                // Truncate very long reasons to keep output tidy.
                let msg = reason.to_string();
                let msg = if msg.len() > 80 {
                    format!("{}\u{2026}", &msg[..79])
                } else {
                    msg
                };
                self.bar.println(format!(
                    "  {} {:<20}  {}",
                    red("✗"),
                    row.identifier,
                    red(&msg),
                ));
            }
        }
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_rows: usize, staged_rows: usize) {
        let failed = total_rows.saturating_sub(staged_rows);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} rows staged successfully",
                green("✔"),
                bold(&staged_rows.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} rows staged  ({} skipped)",
                if staged_rows == 0 { red("✘") } else { cyan("⚠") },
                bold(&staged_rows.to_string()),
                total_rows,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic run: stage and archive under ./out
  skupack products.csv

  # Custom output directory, wider fetch pool
  skupack products.csv --out-dir /srv/bundles --concurrency 8

  # Structured JSON run report on stdout
  skupack products.csv --json > report.json

INPUT FORMAT:
  A CSV file with at least these named columns (any order, extra columns
  are ignored):
    SKU        stable identifier; becomes the output filename stem
    Image_URL  http:// or https:// source image

OUTPUTS (under --out-dir):
  webp/      staged <SKU>.webp files
  jpeg/      converted <SKU>.jpeg files (alpha flattened onto white)
  webp.zip   archive of the WEBP root
  jpeg.zip   archive of the JPEG root

Both roots are cleared at the start of every run, and both archives are
rewritten from scratch, so the outputs always reflect only the latest
input file."#;

/// Fetch product images by SKU, normalize to WEBP/JPEG, and pack archives.
#[derive(Parser, Debug)]
#[command(
    name = "skupack",
    version,
    about = "Fetch product images by SKU, normalize to WEBP/JPEG, and pack archives",
    long_about = "Fetch every image named by a CSV of (SKU, Image_URL) rows, normalize each \
one to WEBP (alpha preserved) and JPEG (alpha flattened onto white), stage the results under \
per-encoding directories keyed by SKU, and pack one ZIP archive per encoding.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// CSV file with `SKU` and `Image_URL` columns.
    input: PathBuf,

    /// Directory receiving the content roots and archives.
    #[arg(short, long, env = "SKUPACK_OUT_DIR", default_value = "out")]
    out_dir: PathBuf,

    /// Number of images fetched in flight at once.
    #[arg(short, long, env = "SKUPACK_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Per-image download timeout in seconds.
    #[arg(long, env = "SKUPACK_FETCH_TIMEOUT", default_value_t = 30)]
    fetch_timeout: u64,

    /// Output the structured run report (RunOutput) as JSON on stdout.
    #[arg(long, env = "SKUPACK_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "SKUPACK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SKUPACK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SKUPACK_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Read input rows ──────────────────────────────────────────────────
    let rows = read_rows(&cli.input)
        .with_context(|| format!("Failed to read input CSV '{}'", cli.input.display()))?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as ProgressCallback)
    } else {
        None
    };

    let mut builder = PipelineConfig::builder()
        .out_dir(&cli.out_dir)
        .concurrency(cli.concurrency)
        .fetch_timeout_secs(cli.fetch_timeout);
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run pipeline ─────────────────────────────────────────────────────
    let output = run(rows, &config).await.context("Run failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    // ── Summary (the callback already printed per-row lines) ─────────────
    if !cli.quiet {
        for (identifier, reason) in output.skipped() {
            eprintln!("  {} {}: {}", red("✗"), identifier, reason);
        }
        if output.stats.duplicate_identifiers > 0 {
            eprintln!(
                "{} {} duplicate identifier(s): later write won",
                cyan("⚠"),
                output.stats.duplicate_identifiers
            );
        }
        for (label, summary) in [
            ("WEBP", &output.webp_archive),
            ("JPEG", &output.jpeg_archive),
        ] {
            match &summary.archive_path {
                Some(path) => eprintln!(
                    "{} {} archive: {} ({} files)",
                    green("✔"),
                    label,
                    bold(&path.display().to_string()),
                    summary.files_archived,
                ),
                None => eprintln!("{} {} archive skipped (nothing staged)", dim("·"), label),
            }
        }
        eprintln!(
            "   {} rows  {} staged  {} skipped  {}",
            output.stats.total_rows,
            output.stats.staged_rows,
            output.stats.failed_rows,
            dim(&format!("{}ms total", output.stats.total_duration_ms)),
        );
    }

    // Propagate an all-rows-failed batch as a nonzero exit without
    // masking the archives that were still (validly) produced.
    if output.stats.total_rows > 0 && output.stats.staged_rows == 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// One raw CSV record; extra columns are ignored.
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "SKU")]
    sku: String,
    #[serde(rename = "Image_URL")]
    image_url: String,
}

/// Parse the input CSV into ordered rows, validating the schema up front.
fn read_rows(path: &Path) -> Result<Vec<InputRow>> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    for required in ["SKU", "Image_URL"] {
        if !headers.iter().any(|h| h == required) {
            anyhow::bail!(
                "Missing required column '{}' (found: {})",
                required,
                headers.iter().collect::<Vec<_>>().join(", ")
            );
        }
    }

    let mut rows = Vec::new();
    for (i, record) in reader.deserialize::<CsvRow>().enumerate() {
        let record = record.with_context(|| format!("Malformed CSV record {}", i + 2))?;
        rows.push(InputRow::new(record.sku, record.image_url));
    }

    if rows.is_empty() {
        anyhow::bail!("Input CSV contains no data rows");
    }

    Ok(rows)
}
