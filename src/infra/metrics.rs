//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path counters to avoid mutex contention on the poll
//! loop. All atomics use Relaxed ordering: these are statistical counters
//! only, never used for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Counters for the resolver poll loop
#[derive(Debug)]
pub struct Metrics {
    started_at: Instant,
    ticks: AtomicU64,
    read_errors: AtomicU64,
    entries: AtomicU64,
    exits: AtomicU64,
    timeouts: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            ticks: AtomicU64::new(0),
            read_errors: AtomicU64::new(0),
            entries: AtomicU64::new(0),
            exits: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_entry(&self) {
        self.entries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_exit(&self) {
        self.exits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot and log a summary line
    pub fn report(&self) {
        info!(
            uptime_secs = %self.started_at.elapsed().as_secs(),
            ticks = %self.ticks.load(Ordering::Relaxed),
            read_errors = %self.read_errors.load(Ordering::Relaxed),
            entries = %self.entries.load(Ordering::Relaxed),
            exits = %self.exits.load(Ordering::Relaxed),
            timeouts = %self.timeouts.load(Ordering::Relaxed),
            "metrics_summary"
        );
    }

    #[cfg(test)]
    pub fn entries_count(&self) -> u64 {
        self.entries.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub fn read_error_count(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_tick();
        metrics.record_entry();
        metrics.record_entry();
        metrics.record_read_error();
        assert_eq!(metrics.entries_count(), 2);
        assert_eq!(metrics.read_error_count(), 1);
    }
}
