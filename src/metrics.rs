//! Prometheus metrics for the registry and its endpoints.
//!
//! This module provides metrics for:
//! - Cache hits, misses and lazy evictions
//! - Module loading and duplicate endpoints during bootstrap
//! - Handler failures
//! - HTTP request latency

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Cache hits counter metric name.
pub const METRIC_CACHE_HITS: &str = "cache_hits_total";
/// Cache misses counter metric name.
pub const METRIC_CACHE_MISSES: &str = "cache_misses_total";
/// Cache evictions counter metric name.
pub const METRIC_CACHE_EVICTIONS: &str = "cache_evictions_total";
/// Modules loaded counter metric name.
pub const METRIC_MODULES_LOADED: &str = "modules_loaded_total";
/// Duplicate endpoints counter metric name.
pub const METRIC_DUPLICATE_ENDPOINTS: &str = "duplicate_endpoints_total";
/// Handler errors counter metric name.
pub const METRIC_HANDLER_ERRORS: &str = "handler_errors_total";
/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Bootstrap duration metric name.
pub const METRIC_BOOTSTRAP_DURATION: &str = "bootstrap_duration_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );
    describe_histogram!(
        METRIC_BOOTSTRAP_DURATION,
        "Time spent loading endpoint modules in milliseconds"
    );

    describe_counter!(METRIC_CACHE_HITS, "Total number of cache hits");
    describe_counter!(METRIC_CACHE_MISSES, "Total number of cache misses");
    describe_counter!(
        METRIC_CACHE_EVICTIONS,
        "Total number of expired cache entries removed on read"
    );
    describe_counter!(
        METRIC_MODULES_LOADED,
        "Total number of endpoint modules loaded"
    );
    describe_counter!(
        METRIC_DUPLICATE_ENDPOINTS,
        "Total number of endpoint registrations replaced by a later module"
    );
    describe_counter!(
        METRIC_HANDLER_ERRORS,
        "Total number of structured handler error responses"
    );

    debug!("Metrics initialized");
}

/// Install the global Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &str) {
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string())
        .record(millis_since(start));
}

/// Increment cache hits counter.
pub fn inc_cache_hits() {
    counter!(METRIC_CACHE_HITS).increment(1);
}

/// Increment cache misses counter.
pub fn inc_cache_misses() {
    counter!(METRIC_CACHE_MISSES).increment(1);
}

/// Increment cache evictions counter.
pub fn inc_cache_evictions() {
    counter!(METRIC_CACHE_EVICTIONS).increment(1);
}

/// Increment modules loaded counter.
pub fn inc_modules_loaded() {
    counter!(METRIC_MODULES_LOADED).increment(1);
}

/// Add to the duplicate endpoints counter.
pub fn inc_duplicate_endpoints(count: u64) {
    counter!(METRIC_DUPLICATE_ENDPOINTS).increment(count);
}

/// Increment handler errors counter.
pub fn inc_handler_errors(status: u16) {
    counter!(METRIC_HANDLER_ERRORS, "status" => status.to_string()).increment(1);
}

/// Middleware recording per-route latency.
pub async fn track_latency(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    record_http_latency(start, &endpoint);
    response
}

/// Records the time from creation to drop into a histogram.
pub struct LatencyTimer {
    metric: &'static str,
    started: Instant,
}

impl LatencyTimer {
    /// Start timing into `metric`.
    pub fn new(metric: &'static str) -> Self {
        Self {
            metric,
            started: Instant::now(),
        }
    }

    /// Milliseconds elapsed so far.
    pub fn elapsed_ms(&self) -> f64 {
        millis_since(self.started)
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric).record(millis_since(self.started));
    }
}

fn millis_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Time the bootstrap sequence until the guard is dropped.
pub fn timer_bootstrap() -> LatencyTimer {
    LatencyTimer::new(METRIC_BOOTSTRAP_DURATION)
}
