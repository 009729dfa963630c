use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics exporter
///
/// Fails if a recorder is already installed in this process.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(
        "loghub_ingested_total",
        "Total number of log entries submitted for ingestion, by outcome"
    );
    describe_counter!(
        "loghub_cache_lookups_total",
        "Result cache lookups, by kind and result"
    );
    describe_histogram!(
        "loghub_search_duration_seconds",
        "Search latency in seconds (cache misses only)"
    );
    describe_counter!(
        "loghub_retention_deleted_total",
        "Total number of log entries removed by retention cleanup"
    );
    describe_gauge!("loghub_info", "Log hub version information");

    gauge!("loghub_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record the outcome of one ingestion call
pub fn record_ingested(accepted: u64, failed: u64) {
    if accepted > 0 {
        counter!("loghub_ingested_total", "outcome" => "accepted").increment(accepted);
    }
    if failed > 0 {
        counter!("loghub_ingested_total", "outcome" => "failed").increment(failed);
    }
}

/// Record a cache lookup
pub fn record_cache_lookup(kind: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("loghub_cache_lookups_total", "kind" => kind, "result" => result).increment(1);
}

/// Record search duration
pub fn record_search_duration(duration: Duration) {
    histogram!("loghub_search_duration_seconds").record(duration.as_secs_f64());
}

/// Record rows removed by a cleanup
pub fn record_retention_deleted(count: u64) {
    counter!("loghub_retention_deleted_total").increment(count);
}
