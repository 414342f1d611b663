//! Global atomic counters for swarm observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when a CLI invocation ends).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::NegotiationStatus;

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters without allocation or locking.
pub struct Metrics {
    negotiations_started: AtomicU64,
    matched: AtomicU64,
    no_availability: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    swarms_completed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            negotiations_started: AtomicU64::new(0),
            matched: AtomicU64::new(0),
            no_availability: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            swarms_completed: AtomicU64::new(0),
        }
    }

    pub fn inc_started(&self) {
        self.negotiations_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "negotiations_started", "counter incremented");
    }

    /// Count a finished negotiation under its status.
    pub fn record_outcome(&self, status: NegotiationStatus) {
        let counter = match status {
            NegotiationStatus::Matched => &self.matched,
            NegotiationStatus::NoAvailability => &self.no_availability,
            NegotiationStatus::Error => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = %status, "counter incremented");
    }

    pub fn inc_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "timed_out", "counter incremented");
    }

    pub fn inc_swarms(&self) {
        self.swarms_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "swarms_completed", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            negotiations_started = self.negotiations_started(),
            matched = self.matched(),
            no_availability = self.no_availability(),
            failed = self.failed(),
            timed_out = self.timed_out(),
            swarms_completed = self.swarms_completed(),
        );
    }

    pub fn negotiations_started(&self) -> u64 {
        self.negotiations_started.load(Ordering::Relaxed)
    }

    pub fn matched(&self) -> u64 {
        self.matched.load(Ordering::Relaxed)
    }

    pub fn no_availability(&self) -> u64 {
        self.no_availability.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    pub fn swarms_completed(&self) -> u64 {
        self.swarms_completed.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.negotiations_started,
            &self.matched,
            &self.no_availability,
            &self.failed,
            &self.timed_out,
            &self.swarms_completed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
