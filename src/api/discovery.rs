//! Routes bootstrap registers after every module is loaded.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::state::AppState;
use crate::registry::{build_openapi, AggregatedDocument};

/// The live discovery document, rebuilt per request.
pub async fn discovery(State(state): State<AppState>) -> Json<AggregatedDocument> {
    Json(state.aggregator.snapshot())
}

/// OpenAPI rendering of the discovery document.
pub async fn openapi(State(state): State<AppState>) -> Response {
    let doc = build_openapi(&state.aggregator.snapshot());
    Json(doc).into_response()
}

/// Prometheus exposition.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
