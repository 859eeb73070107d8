// SPDX-FileCopyrightText: 2026 Nodescribe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is a no-op.

use metrics::{describe_counter, describe_histogram};

/// Register all writer metric descriptions.
///
/// Call once at startup after a recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "nodescribe_writer_requests_total",
        "Mutation requests completed by the writer loop, by outcome"
    );
    describe_counter!(
        "nodescribe_writer_conflicts_total",
        "Version conflicts encountered while applying mutations"
    );
    describe_counter!(
        "nodescribe_writer_shutdown_dropped_total",
        "Queued requests failed because the writer shut down"
    );
    describe_histogram!(
        "nodescribe_writer_update_seconds",
        "Time spent in the conflict-aware updater per request"
    );
}

/// Record a completed request. `outcome` is `ok` or a [`WriterError::kind`](nodescribe_core::WriterError::kind).
pub fn record_request(outcome: &'static str) {
    metrics::counter!("nodescribe_writer_requests_total", "outcome" => outcome).increment(1);
}

/// Record a version conflict.
pub fn record_conflict() {
    metrics::counter!("nodescribe_writer_conflicts_total").increment(1);
}

/// Record requests abandoned at shutdown.
pub fn record_shutdown_dropped(count: u64) {
    metrics::counter!("nodescribe_writer_shutdown_dropped_total").increment(count);
}

/// Record updater latency.
pub fn record_update_latency(seconds: f64) {
    metrics::histogram!("nodescribe_writer_update_seconds").record(seconds);
}
