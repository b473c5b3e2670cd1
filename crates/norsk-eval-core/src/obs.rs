//! Structured observability hooks for evaluation run lifecycle events.
//!
//! This module provides:
//! - A run-scoped tracing span via [`run_span`]
//! - Emission functions for key lifecycle events: run start, pair completion,
//!   transport retry, grading fault, cancellation, run finish, report write
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).
//! For JSON output, pass `--json` to the CLI.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::VerdictKind;

/// Run-scoped span carrying `run_id`.
///
/// Attach it to the run future with `Instrument::instrument` so every event
/// emitted by the run (including spawned pair tasks that use
/// `in_current_span`) is tagged with the run.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("norsk_eval.run", run_id = %run_id)
}

/// Emit event: run started.
pub fn emit_run_started(run_id: &str, items: usize, models: usize, concurrency: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        items = items,
        models = models,
        total_pairs = items * models,
        concurrency = concurrency,
    );
}

/// Emit event: one pair reached a terminal state.
pub fn emit_pair_completed(
    progress: (usize, usize),
    test_id: &str,
    model: &str,
    verdict: VerdictKind,
    attempts: u32,
    latency_ms: u64,
) {
    info!(
        event = "pair.completed",
        test_id = %test_id,
        model = %model,
        verdict = %verdict,
        attempts = attempts,
        latency_ms = latency_ms,
        "[{}/{}] {}: {}",
        progress.0,
        progress.1,
        test_id,
        model,
    );
}

/// Emit event: a transport attempt failed and will be retried.
pub fn emit_transport_retry(
    test_id: &str,
    model: &str,
    attempt: u32,
    error: &dyn std::fmt::Display,
    backoff: Duration,
) {
    warn!(
        event = "pair.transport_retry",
        test_id = %test_id,
        model = %model,
        attempt = attempt,
        backoff_ms = backoff.as_millis() as u64,
        error = %error,
        "retrying model call"
    );
}

/// Emit event: a grader faulted; the pair is recorded as ERROR.
pub fn emit_grading_fault(test_id: &str, model: &str, error: &dyn std::fmt::Display) {
    warn!(event = "pair.grading_fault", test_id = %test_id, model = %model, error = %error);
}

/// Emit event: cancellation requested; no further pairs will be scheduled.
pub fn emit_run_cancelled(run_id: &str, scheduled: usize, total: usize) {
    warn!(
        event = "run.cancelled",
        run_id = %run_id,
        scheduled = scheduled,
        total = total,
    );
}

/// Emit event: run finished with verdict counts.
pub fn emit_run_finished(
    run_id: &str,
    duration_ms: u64,
    counts: [(VerdictKind, usize); 4],
    cancelled: bool,
) {
    let get = |kind: VerdictKind| {
        counts
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        pass = get(VerdictKind::Pass),
        fail = get(VerdictKind::Fail),
        error = get(VerdictKind::Error),
        unscored = get(VerdictKind::Unscored),
        cancelled = cancelled,
    );
}

/// Emit event: a report file was written.
pub fn emit_report_written(run_id: &str, path: &Path, bytes: usize) {
    info!(
        event = "report.written",
        run_id = %run_id,
        path = %path.display(),
        bytes = bytes,
    );
}
