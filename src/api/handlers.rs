//! HTTP handlers of the built-in endpoint modules.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::error::{ErrorBody, HandlerError};
use crate::registry::Aggregator;

/// Cache key of the memoized stats summary.
pub const STATS_CACHE_KEY: &str = "stats:summary";

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Greeting response.
#[derive(Debug, Serialize)]
pub struct HelloResponse {
    /// Greeting text.
    pub message: String,
}

/// Ping response.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    /// Status: "ok".
    pub status: &'static str,
    /// Always "pong".
    pub message: &'static str,
}

/// Server time response.
#[derive(Debug, Serialize)]
pub struct TimeResponse {
    /// Current time, RFC 3339.
    pub timestamp: DateTime<Utc>,
    /// Milliseconds since the Unix epoch.
    pub unix_ms: i64,
}

/// Echo response.
#[derive(Debug, Serialize)]
pub struct EchoResponse {
    /// Status: "ok".
    pub status: &'static str,
    /// The parsed request body.
    pub received: serde_json::Value,
}

/// Summary of the registered surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Documented endpoints.
    pub endpoints: usize,
    /// Modules contributing endpoints.
    pub modules: usize,
    /// Endpoints per documentation group.
    pub groups: BTreeMap<String, usize>,
    /// Endpoints per method.
    pub methods: BTreeMap<String, usize>,
    /// When the summary was computed.
    pub computed_at: DateTime<Utc>,
}

/// Stats response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Status: "ok".
    pub status: &'static str,
    /// Whether the summary came from the cache.
    pub cached: bool,
    /// How long a computed summary is reused.
    pub ttl_ms: u64,
    /// Seconds since the server started.
    pub uptime_secs: i64,
    /// The summary.
    pub summary: serde_json::Value,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Greeting handler.
pub async fn hello(State(state): State<AppState>) -> impl IntoResponse {
    Json(HelloResponse {
        message: format!("Hello from {}!", state.aggregator.meta().name),
    })
}

/// Liveness ping.
pub async fn ping() -> impl IntoResponse {
    Json(PingResponse {
        status: "ok",
        message: "pong",
    })
}

/// Current server time.
pub async fn time() -> impl IntoResponse {
    let now = Utc::now();
    Json(TimeResponse {
        timestamp: now,
        unix_ms: now.timestamp_millis(),
    })
}

/// Echo a JSON body back.
pub async fn echo(body: Bytes) -> Result<Json<EchoResponse>, HandlerError> {
    let received = serde_json::from_slice(&body)
        .map_err(|e| HandlerError::bad_request("Request body must be valid JSON", e))?;

    Ok(Json(EchoResponse {
        status: "ok",
        received,
    }))
}

/// Summarize the registered surface, memoized in the TTL cache.
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, HandlerError> {
    let memoized = state.cache.get_or_try_insert_with(
        STATS_CACHE_KEY,
        Some(state.stats_ttl),
        || {
            serde_json::to_value(summarize(&state.aggregator))
                .map_err(|e| HandlerError::internal("Failed to build stats summary", e))
        },
    )?;

    Ok(Json(StatsResponse {
        status: "ok",
        cached: memoized.hit,
        ttl_ms: u64::try_from(state.stats_ttl.as_millis()).unwrap_or(u64::MAX),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        summary: memoized.value,
    }))
}

/// Count endpoints by group and method.
pub fn summarize(aggregator: &Aggregator) -> StatsSummary {
    let mut groups = BTreeMap::new();
    let mut methods = BTreeMap::new();
    for descriptor in aggregator.descriptors() {
        *groups.entry(descriptor.group.clone()).or_insert(0) += 1;
        *methods.entry(descriptor.method.to_string()).or_insert(0) += 1;
    }

    StatsSummary {
        endpoints: aggregator.len(),
        modules: aggregator.modules().len(),
        groups,
        methods,
        computed_at: Utc::now(),
    }
}

/// Structured 404 for unknown routes.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            status: "error",
            message: "Not found".to_string(),
            error: format!("no route for {}", uri.path()),
        }),
    )
}
