//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use std::time::Instant;

/// Metrics prefix for all PaperLens metrics
pub const METRICS_PREFIX: &str = "paperlens";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 250ms, P99 < 1s (model calls dominate)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms - P50 target
    0.500,  // 500ms
    1.000,  // 1s - P99 target
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Search metrics
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
        "Number of results returned from the last search"
    );

    // Correlation metrics
    describe_counter!(
        format!("{}_correlation_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of related-document queries"
    );

    describe_histogram!(
        format!("{}_correlation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Related-document query latency in seconds"
    );

    // Collaborator metrics
    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Query embedding latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding failures"
    );

    describe_histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Document store retrieval latency in seconds"
    );

    describe_histogram!(
        format!("{}_rerank_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Reranking latency in seconds"
    );

    // Cache metrics
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache misses"
    );

    describe_counter!(
        format!("{}_cache_evictions_total", METRICS_PREFIX),
        Unit::Count,
        "Total least-recently-used evictions"
    );

    describe_gauge!(
        format!("{}_cache_entries", METRICS_PREFIX),
        Unit::Count,
        "Documents currently held in the cache"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, success: bool, result_count: usize) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);

    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    if success {
        gauge!(format!("{}_search_results_count", METRICS_PREFIX)).set(result_count as f64);
    }
}

/// Helper to record related-document metrics
pub fn record_correlation(duration_secs: f64, success: bool, source_cached: bool) {
    let status = if success { "success" } else { "error" };
    let source = if source_cached { "cache" } else { "store" };

    counter!(
        format!("{}_correlation_queries_total", METRICS_PREFIX),
        "status" => status,
        "source" => source
    )
    .increment(1);

    histogram!(format!("{}_correlation_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, success: bool) {
    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_embedding_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }
}

/// Helper to record store retrieval latency, labeled by retriever
pub fn record_retrieval(duration_secs: f64, retriever: &'static str) {
    histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        "retriever" => retriever
    )
    .record(duration_secs);
}

/// Helper to record rerank latency
pub fn record_rerank(duration_secs: f64, model: &str) {
    histogram!(
        format!("{}_rerank_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration_secs);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, cache_name: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    }
}

/// Helper to record cache size after a write
pub fn record_cache_size(cache_name: &str, entries: usize, evicted: bool) {
    gauge!(
        format!("{}_cache_entries", METRICS_PREFIX),
        "cache" => cache_name.to_string()
    )
    .set(entries as f64);

    if evicted {
        counter!(
            format!("{}_cache_evictions_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    }
}
