use crate::error::{ReplayError, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics façade for replay lookups, writes and cache calls.
///
/// Without an installed recorder every call is a no-op, so library users
/// that never call [`init_metrics`] pay nothing.
#[derive(Debug, Clone, Default)]
pub struct Metrics;

impl Metrics {
    pub fn new() -> Self {
        Self
    }

    /// `outcome` is one of `hit`, `miss` or `corrupt`.
    pub fn record_replay_lookup(&self, outcome: &str) {
        counter!("replay_lookups_total", "outcome" => outcome.to_string()).increment(1);
    }

    pub fn record_replay_conflict(&self) {
        counter!("replay_conflicts_total").increment(1);
    }

    pub fn record_replay_saved(&self, status: u16) {
        counter!("replay_records_saved_total", "status" => status.to_string()).increment(1);
    }

    pub fn record_replay_served(&self, status: u16) {
        counter!("replay_responses_served_total", "status" => status.to_string()).increment(1);
    }

    pub fn record_replay_skipped(&self, reason: &str) {
        counter!("replay_records_skipped_total", "reason" => reason.to_string()).increment(1);
    }

    pub fn record_cache_operation(&self, operation: &str, duration_ms: f64, success: bool) {
        counter!("replay_cache_operations_total", "operation" => operation.to_string(), "success" => success.to_string()).increment(1);
        histogram!("replay_cache_operation_duration_ms", "operation" => operation.to_string()).record(duration_ms);
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_ms: f64) {
        counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string()).increment(1);
        histogram!("http_request_duration_ms", "method" => method.to_string(), "path" => path.to_string()).record(duration_ms);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the Prometheus recorder once and returns its handle.
pub fn init_metrics() -> Result<PrometheusHandle> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ReplayError::Internal(anyhow::anyhow!("Failed to install Prometheus recorder: {}", e)))?;
    describe_metrics();

    METRICS.get_or_init(Metrics::new);
    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

fn describe_metrics() {
    describe_counter!("replay_lookups_total", Unit::Count, "Replay record lookups by outcome");
    describe_counter!("replay_conflicts_total", Unit::Count, "Idempotency keys reused with a different request");
    describe_counter!("replay_records_saved_total", Unit::Count, "Responses recorded for replay");
    describe_counter!("replay_responses_served_total", Unit::Count, "Responses served from a replay record");
    describe_counter!("replay_records_skipped_total", Unit::Count, "Responses not recorded, by reason");

    describe_counter!("replay_cache_operations_total", Unit::Count, "Replay cache backend operations");
    describe_histogram!("replay_cache_operation_duration_ms", Unit::Milliseconds, "Replay cache operation latency in milliseconds");

    describe_counter!("http_requests_total", Unit::Count, "Total HTTP requests");
    describe_histogram!("http_request_duration_ms", Unit::Milliseconds, "HTTP request latency in milliseconds");
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
