//! HTTP router assembly.

use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::not_found;
use super::state::AppState;
use crate::bootstrap::Bootstrapped;
use crate::cache::TtlCache;
use crate::config::Config;
use crate::metrics::track_latency;
use crate::registry::Dispatcher;

/// Create the API router from a bootstrapped route table.
pub fn create_router(dispatcher: Dispatcher, state: AppState) -> Router {
    dispatcher
        .into_router()
        .route_layer(middleware::from_fn(track_latency))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Wire a bootstrap result, configuration and optional metrics into a
/// servable router.
pub fn build_app(
    boot: Bootstrapped,
    config: &Config,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let cache = TtlCache::with_default_ttl(config.cache_default_ttl());
    let mut state = AppState::new(boot.aggregator, cache).with_stats_ttl(config.stats_ttl());
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    create_router(boot.dispatcher, state)
}
