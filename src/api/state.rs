//! Application state shared with handlers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::cache::TtlCache;
use crate::registry::Aggregator;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Frozen descriptor collection built by bootstrap.
    pub aggregator: Arc<Aggregator>,
    /// Memoization store for expensive handlers.
    pub cache: Arc<TtlCache>,
    /// Prometheus handle, when the recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// TTL of the memoized stats summary.
    pub stats_ttl: Duration,
    /// When the process started serving.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create new app state.
    pub fn new(aggregator: Aggregator, cache: TtlCache) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            cache: Arc::new(cache),
            metrics: None,
            stats_ttl: Duration::from_secs(60),
            started_at: Utc::now(),
        }
    }

    /// Attach a Prometheus handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Override the stats summary TTL.
    pub fn with_stats_ttl(mut self, ttl: Duration) -> Self {
        self.stats_ttl = ttl;
        self
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        use crate::registry::{DocumentMeta, DuplicatePolicy};

        let aggregator = Aggregator::new(
            DocumentMeta {
                name: "test-api".to_string(),
                version: "0.0.0".to_string(),
            },
            DuplicatePolicy::Warn,
        );
        Self::new(aggregator, TtlCache::new())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("endpoints", &self.aggregator.len())
            .field("cache", &self.cache)
            .field("metrics", &self.metrics.is_some())
            .field("stats_ttl", &self.stats_ttl)
            .field("started_at", &self.started_at)
            .finish()
    }
}
