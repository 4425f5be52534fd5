//! Firestore metrics collection.
//!
//! Provides standardized metrics for monitoring storage operations:
//! - Request counters by operation and status
//! - Latency histograms
//! - Retry and listing counters
//! - Optimistic-concurrency conflicts per collection

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total Firestore requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "firestore_requests_total";

    /// Total retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "firestore_retries_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "firestore_latency_seconds";

    /// Documents returned by collection listings.
    pub const LIST_DOCUMENTS_RETURNED_TOTAL: &str = "firestore_list_documents_returned_total";

    /// Writes rejected because the stored version moved on.
    pub const CONFLICTS_TOTAL: &str = "repository_conflicts_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

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

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record how many documents one listing page produced.
pub fn record_list_returned(collection: &str, count: usize) {
    counter!(
        names::LIST_DOCUMENTS_RETURNED_TOTAL,
        "collection" => collection.to_string()
    )
    .increment(count as u64);
}

/// Record a lost optimistic-concurrency race.
pub fn record_conflict(collection: &str) {
    counter!(
        names::CONFLICTS_TOTAL,
        "collection" => collection.to_string()
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
