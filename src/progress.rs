//! Progress-callback trait for per-row and per-phase run events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline clears roots, processes rows, and
//! builds archives. Callers can forward events to a terminal progress
//! bar, a WebSocket, or a database record without the library knowing how
//! the host application communicates. The trait is `Send + Sync` because
//! rows are processed concurrently.

use crate::output::{RowResult, RunPhase};
use std::sync::Arc;

/// Called by the pipeline as a run progresses.
///
/// All methods have default no-op implementations so callers only
/// override what they care about.
///
/// # Thread safety
///
/// `on_row_complete` may be called concurrently from different tasks.
/// Implementations must protect shared mutable state with appropriate
/// synchronisation primitives (e.g. `Mutex`, `AtomicUsize`).
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before any root is cleared.
    ///
    /// # Arguments
    /// * `total_rows` — number of input rows in this run; progress counts
    ///   end at exactly this value.
    fn on_run_start(&self, total_rows: usize) {
        let _ = total_rows;
    }

    /// Called at each transition of the run state machine, including the
    /// final transition to [`RunPhase::Done`].
    fn on_phase(&self, phase: RunPhase) {
        let _ = phase;
    }

    /// Called once per input row, immediately after that row's
    /// fetch/normalize/stage attempt completes, success or failure.
    ///
    /// # Arguments
    /// * `processed`  — rows accounted for so far (monotonic, 1-based)
    /// * `total_rows` — fixed row count of the run
    /// * `row`        — what happened to this row
    fn on_row_complete(&self, processed: usize, total_rows: usize, row: &RowResult) {
        let _ = (processed, total_rows, row);
    }

    /// Called once after both archives have been built.
    ///
    /// # Arguments
    /// * `total_rows`  — fixed row count of the run
    /// * `staged_rows` — rows that produced a staged file
    fn on_run_complete(&self, total_rows: usize, staged_rows: usize) {
        let _ = (total_rows, staged_rows);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RowOutcome;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        rows: AtomicUsize,
        phases: AtomicUsize,
        final_staged: AtomicUsize,
    }

    impl PipelineProgressCallback for TrackingCallback {
        fn on_phase(&self, _phase: RunPhase) {
            self.phases.fetch_add(1, Ordering::SeqCst);
        }

        fn on_row_complete(&self, _processed: usize, _total: usize, _row: &RowResult) {
            self.rows.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _total: usize, staged: usize) {
            self.final_staged.store(staged, Ordering::SeqCst);
        }
    }

    fn staged_row(id: &str) -> RowResult {
        RowResult {
            identifier: id.to_string(),
            stem: id.to_string(),
            outcome: RowOutcome::Staged {
                path: format!("webp/{id}.webp").into(),
            },
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(3);
        cb.on_phase(RunPhase::Clearing);
        cb.on_row_complete(1, 3, &staged_row("A1"));
        cb.on_run_complete(3, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let cb = TrackingCallback {
            rows: AtomicUsize::new(0),
            phases: AtomicUsize::new(0),
            final_staged: AtomicUsize::new(0),
        };

        cb.on_run_start(2);
        cb.on_phase(RunPhase::Clearing);
        cb.on_phase(RunPhase::Processing);
        cb.on_row_complete(1, 2, &staged_row("A1"));
        cb.on_row_complete(2, 2, &staged_row("A2"));
        cb.on_phase(RunPhase::Done);
        cb.on_run_complete(2, 2);

        assert_eq!(cb.rows.load(Ordering::SeqCst), 2);
        assert_eq!(cb.phases.load(Ordering::SeqCst), 3);
        assert_eq!(cb.final_staged.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProgressCallback>();

        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
    }
}
