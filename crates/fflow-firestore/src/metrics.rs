//! Firestore metrics.
//!
//! - Request counters by operation and status
//! - Latency histograms
//! - Listen snapshot and reconnect counters

use metrics::{counter, histogram};

/// Metric name constants.
pub mod names {
    /// Total Firestore requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "firestore_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "firestore_latency_seconds";

    /// Documents returned by queries, by collection.
    pub const DOCUMENTS_RETURNED: &str = "firestore_list_documents_returned_total";

    /// Snapshots delivered by listen streams, by collection.
    pub const SNAPSHOTS_TOTAL: &str = "firestore_snapshots_total";

    /// Listen streams reopened after the server closed them, by collection.
    pub const LISTEN_RECONNECTS_TOTAL: &str = "firestore_listen_reconnects_total";
}

/// Record metrics for a completed Firestore request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

pub fn record_documents_returned(collection: &str, count: usize) {
    counter!(
        names::DOCUMENTS_RETURNED,
        "collection" => collection.to_string()
    )
    .increment(count as u64);
}

pub fn record_snapshot(collection: &str) {
    counter!(
        names::SNAPSHOTS_TOTAL,
        "collection" => collection.to_string()
    )
    .increment(1);
}

pub fn record_listen_reconnect(collection: &str) {
    counter!(
        names::LISTEN_RECONNECTS_TOTAL,
        "collection" => collection.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.contains("requests"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
        assert!(names::SNAPSHOTS_TOTAL.starts_with("firestore_"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("get_document", 200, 12.0);
        record_documents_returned("products", 3);
        record_snapshot("orders");
        record_listen_reconnect("orders");
    }
}
