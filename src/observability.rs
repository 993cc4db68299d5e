use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Counters for a single-flight gate
#[derive(Debug, Default)]
pub struct FlightMetrics {
    pub dispatched: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub rejected_completions: AtomicU64,
    pub peak_in_flight: AtomicU64,
}

impl FlightMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatch(&self, in_flight_now: u64) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.peak_in_flight.fetch_max(in_flight_now, Ordering::Relaxed);
    }

    pub fn record_completion(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        warn!("Background computation failed");
    }

    pub fn record_rejected_completion(&self) {
        self.rejected_completions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self, in_flight: u64) -> FlightStats {
        FlightStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected_completions: self.rejected_completions.load(Ordering::Relaxed),
            in_flight,
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlightStats {
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected_completions: u64,
    pub in_flight: u64,
    pub peak_in_flight: u64,
}

impl FlightStats {
    pub fn log(&self, gate: &str) {
        info!(
            gate = gate,
            dispatched = self.dispatched,
            completed = self.completed,
            failed = self.failed,
            rejected_completions = self.rejected_completions,
            in_flight = self.in_flight,
            peak_in_flight = self.peak_in_flight,
            "Single-flight gate metrics"
        );
    }
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
        duration
    }
}
