//! Global atomic counters for evaluation runs.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lock-free atomic counters.
pub struct Metrics {
    pairs_completed: AtomicU64,
    transport_attempts: AtomicU64,
    transport_retries: AtomicU64,
    transport_failures: AtomicU64,
    grading_faults: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub pairs_completed: u64,
    pub transport_attempts: u64,
    pub transport_retries: u64,
    pub transport_failures: u64,
    pub grading_faults: u64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            pairs_completed: AtomicU64::new(0),
            transport_attempts: AtomicU64::new(0),
            transport_retries: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
            grading_faults: AtomicU64::new(0),
        }
    }

    pub fn inc_pairs_completed(&self) {
        self.pairs_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "pairs_completed", "counter incremented");
    }

    pub fn inc_transport_attempts(&self) {
        self.transport_attempts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "transport_attempts", "counter incremented");
    }

    pub fn inc_transport_retries(&self) {
        self.transport_retries.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "transport_retries", "counter incremented");
    }

    /// A pair gave up on transport and was recorded as ERROR.
    pub fn inc_transport_failures(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "transport_failures", "counter incremented");
    }

    pub fn inc_grading_faults(&self) {
        self.grading_faults.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "grading_faults", "counter incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pairs_completed: self.pairs_completed.load(Ordering::Relaxed),
            transport_attempts: self.transport_attempts.load(Ordering::Relaxed),
            transport_retries: self.transport_retries.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            grading_faults: self.grading_faults.load(Ordering::Relaxed),
        }
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a run) rather than on every
    /// increment.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            pairs_completed = s.pairs_completed,
            transport_attempts = s.transport_attempts,
            transport_retries = s.transport_retries,
            transport_failures = s.transport_failures,
            grading_faults = s.grading_faults,
        );
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.pairs_completed.store(0, Ordering::Relaxed);
        self.transport_attempts.store(0, Ordering::Relaxed);
        self.transport_retries.store(0, Ordering::Relaxed);
        self.transport_failures.store(0, Ordering::Relaxed);
        self.grading_faults.store(0, Ordering::Relaxed);
    }
}
