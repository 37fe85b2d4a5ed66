//! Store metrics collection.
//!
//! Provides functions for recording local store and upstream metrics.

use metrics::{counter, histogram};
use std::time::Instant;

/// Record the duration of a local store operation.
pub fn record_store_duration(op: &str, file: &str, duration_secs: f64) {
    histogram!(
        "local_store_operation_seconds",
        "op" => op.to_string(),
        "file" => file.to_string()
    )
    .record(duration_secs);

    if op == "append" {
        histogram!("local_store_append_seconds", "file" => file.to_string()).record(duration_secs);
    }
}

/// Record one call to the upstream table API.
pub fn record_upstream_request(table: &str, op: &str, outcome: &str, duration_secs: f64) {
    counter!(
        "upstream_requests_total",
        "table" => table.to_string(),
        "op" => op.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        "upstream_request_duration_seconds",
        "table" => table.to_string(),
        "op" => op.to_string()
    )
    .record(duration_secs);
}

/// Record one persisted submission and what happened remotely.
pub fn record_persist(kind: &str, remote: &str) {
    counter!(
        "submissions_total",
        "kind" => kind.to_string(),
        "remote" => remote.to_string()
    )
    .increment(1);
}

/// A helper to time local store operations and record metrics.
///
/// Usage:
/// ```ignore
/// let timer = StoreTimer::new("append", "bookings");
/// write_rows(file, &rows).await?;
/// timer.record();
/// ```
pub struct StoreTimer {
    op: &'static str,
    file: String,
    start: Instant,
}

impl StoreTimer {
    /// Create a new timer for an operation on a store file.
    pub fn new(op: &'static str, file: impl Into<String>) -> Self {
        Self {
            op,
            file: file.into(),
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration to metrics.
    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_store_duration(self.op, &self.file, duration);
    }
}
