// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for board-engine.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding process is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `board_engine_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//! - `_bytes` suffix for sizes
//!
//! # Labels
//! - `stream`: chat, confession
//! - `trigger`: guard, sweep
//! - `status` / `outcome`: operation result

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record an append attempt (`status`: success, rejected, error)
pub fn record_append(stream: &str, status: &str) {
    counter!(
        "board_engine_appends_total",
        "stream" => stream.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(stream: &str, operation: &str, duration: Duration) {
    histogram!(
        "board_engine_operation_seconds",
        "stream" => stream.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record records removed by an eviction batch
pub fn record_eviction(stream: &str, trigger: &str, deleted: u64) {
    counter!(
        "board_engine_evictions_total",
        "stream" => stream.to_string(),
        "trigger" => trigger.to_string()
    )
    .increment(1);
    counter!(
        "board_engine_evicted_records_total",
        "stream" => stream.to_string(),
        "trigger" => trigger.to_string()
    )
    .increment(deleted);
}

/// Record how long an eviction batch took
pub fn record_eviction_duration(stream: &str, duration: Duration) {
    histogram!(
        "board_engine_eviction_seconds",
        "stream" => stream.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a guard check result
pub fn record_guard_check(stream: &str, outcome: &str) {
    counter!(
        "board_engine_guard_checks_total",
        "stream" => stream.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a per-stream sweep result
pub fn record_sweep(stream: &str, status: &str) {
    counter!(
        "board_engine_sweeps_total",
        "stream" => stream.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Set last observed size estimate
pub fn set_estimated_bytes(stream: &str, bytes: u64) {
    gauge!(
        "board_engine_estimated_bytes",
        "stream" => stream.to_string()
    )
    .set(bytes as f64);
}

/// Set last observed record count
pub fn set_record_count(stream: &str, count: u64) {
    gauge!(
        "board_engine_records",
        "stream" => stream.to_string()
    )
    .set(count as f64);
}

// ═══════════════════════════════════════════════════════════════════════════
// ERROR TRACKING - Categorized error counters for alerting
// ═══════════════════════════════════════════════════════════════════════════

/// Record an error with category for alerting
pub fn record_error(stream: &str, operation: &str, error_type: &str) {
    counter!(
        "board_engine_errors_total",
        "stream" => stream.to_string(),
        "operation" => operation.to_string(),
        "error_type" => error_type.to_string()
    )
    .increment(1);
}

/// Record a timeout error
pub fn record_timeout(stream: &str, operation: &str) {
    counter!(
        "board_engine_timeouts_total",
        "stream" => stream.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Set backend health status (1 = healthy, 0 = unhealthy)
pub fn set_backend_healthy(backend: &str, healthy: bool) {
    gauge!(
        "board_engine_backend_healthy",
        "backend" => backend.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

/// Count board state transitions
pub fn set_board_state(state: &str) {
    counter!(
        "board_engine_state_transitions_total",
        "state" => state.to_string()
    )
    .increment(1);
}

/// Records operation latency when dropped.
pub struct LatencyTimer {
    stream: &'static str,
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    #[must_use]
    pub fn new(stream: &'static str, operation: &'static str) -> Self {
        Self {
            stream,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.stream, self.operation, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Without an installed recorder these are no-ops; the tests check that
    // every call site is well-formed and never panics.

    #[test]
    fn test_append_and_latency_metrics() {
        record_append("chat", "success");
        record_append("confession", "rejected");
        record_latency("chat", "append", Duration::from_micros(250));
    }

    #[test]
    fn test_eviction_metrics() {
        record_eviction("chat", "guard", 20);
        record_eviction("confession", "sweep", 0);
        record_eviction_duration("chat", Duration::from_millis(12));
        record_guard_check("chat", "coalesced");
        record_sweep("confession", "failure");
    }

    #[test]
    fn test_gauges() {
        set_estimated_bytes("chat", 301 * 1024 * 1024);
        set_record_count("chat", 40);
        set_backend_healthy("sql", true);
        set_board_state("Running");
    }

    #[test]
    fn test_latency_timer() {
        {
            let _timer = LatencyTimer::new("chat", "list_recent");
            std::thread::sleep(Duration::from_micros(10));
        }
        // Timer recorded on drop
    }
}
