//! Dispatch counters.
//!
//! Counters are the only state written during steady-state operation and
//! use relaxed atomics; snapshots are not synchronized across counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::Outcome;

/// Thread-safe outcome counters for the controller.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    forwarded: AtomicU64,
    skipped_not_subscribed: AtomicU64,
    skipped_by_filter: AtomicU64,
    errored: AtomicU64,
    failed_open: AtomicU64,
    delivery_failures: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the final outcome of one event.
    pub fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Forwarded => &self.forwarded,
            Outcome::SkippedNotSubscribed => &self.skipped_not_subscribed,
            Outcome::SkippedByFilter => &self.skipped_by_filter,
            Outcome::Errored => &self.errored,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record filters that failed open.
    pub fn record_failed_open(&self, count: usize) {
        self.failed_open.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record sinks that failed to accept a delivery.
    pub fn record_delivery_failures(&self, count: usize) {
        self.delivery_failures.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            skipped_not_subscribed: self.skipped_not_subscribed.load(Ordering::Relaxed),
            skipped_by_filter: self.skipped_by_filter.load(Ordering::Relaxed),
            errored: self.errored.load(Ordering::Relaxed),
            failed_open: self.failed_open.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSnapshot {
    pub forwarded: u64,
    pub skipped_not_subscribed: u64,
    pub skipped_by_filter: u64,
    pub errored: u64,
    pub failed_open: u64,
    pub delivery_failures: u64,
}

impl DispatchSnapshot {
    /// Events seen, whatever their outcome.
    pub fn total(&self) -> u64 {
        self.forwarded + self.skipped_not_subscribed + self.skipped_by_filter + self.errored
    }
}
