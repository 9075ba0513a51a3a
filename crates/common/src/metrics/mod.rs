//! Metrics helpers
//!
//! Records search and indexing metrics through the `metrics` facade with
//! standardized naming. No exporter is installed here; without a recorder
//! every call is a no-op.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// Metrics prefix for all SiftRank metrics
pub const METRICS_PREFIX: &str = "siftrank";

/// Histogram buckets for search latency (in seconds).
///
/// Nothing here reads them; a host application that installs an exporter
/// passes them on, e.g. `PrometheusBuilder::set_buckets(LATENCY_BUCKETS)`.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.0005, // 0.5ms
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from search"
    );

    describe_counter!(
        format!("{}_search_source_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Sub-search failures by source"
    );

    describe_counter!(
        format!("{}_index_documents_total", METRICS_PREFIX),
        Unit::Count,
        "Documents added to the keyword index"
    );

    describe_histogram!(
        format!("{}_index_build_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Keyword index build latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, mode: &str, result_count: usize) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .set(result_count as f64);
}

/// Helper to record a failed vector or keyword sub-search
pub fn record_source_failure(source: &str) {
    counter!(
        format!("{}_search_source_failures_total", METRICS_PREFIX),
        "source" => source.to_string()
    )
    .increment(1);
}

/// Helper to record a keyword index build or append
pub fn record_index_build(duration_secs: f64, documents_added: usize) {
    counter!(format!("{}_index_documents_total", METRICS_PREFIX))
        .increment(documents_added as u64);

    histogram!(format!("{}_index_build_duration_seconds", METRICS_PREFIX))
        .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recording_without_recorder() {
        register_metrics();
        record_search(0.002, "hybrid", 5);
        record_source_failure("vector");
        record_index_build(0.01, 3);
    }
}
