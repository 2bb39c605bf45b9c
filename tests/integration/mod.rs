//! Integration tests for the endpoint registry.
//!
//! These drive the full path from module loading through bootstrap to the
//! served router, without binding a socket.
//!
//! Run with: cargo test --test integration

use std::fs;

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use endpoint_registry::api::{create_router, AppState};
use endpoint_registry::bootstrap::{
    Bootstrap, BootstrapOptions, Bootstrapped, BuiltinLoader, ChainLoader, DirectoryLoader,
    ModuleLoader,
};
use endpoint_registry::cache::TtlCache;
use endpoint_registry::endpoint::{EndpointDescriptor, EndpointModule, HttpMethod, ModuleRoutes};
use endpoint_registry::error::{BootstrapError, HandlerError, ModuleContractError};

/// Module A: documents and serves `GET /api/time`.
struct TimeModule;

impl EndpointModule for TimeModule {
    fn id(&self) -> &str {
        "a"
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::get("/api/time", "time")]
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        routes.get("/api/time", || async { Json(json!({ "time": "now" })) });
    }
}

/// Module B: documents and serves `GET /api/ping`.
struct PingModule;

impl EndpointModule for PingModule {
    fn id(&self) -> &str {
        "b"
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::get("/api/ping", "ping")]
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        routes.get("/api/ping", || async { Json(json!({ "message": "pong" })) });
    }
}

/// Registers `/api/x` but exports no descriptor for it.
struct SilentModule;

impl EndpointModule for SilentModule {
    fn id(&self) -> &str {
        "c"
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::get("/api/documented", "documented")]
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        routes.get("/api/documented", || async { "documented" });
        routes.get("/api/x", || async { "x" });
    }
}

/// A module whose handler always fails.
struct FailingModule;

async fn always_fails(State(_state): State<AppState>) -> Result<Json<Value>, HandlerError> {
    Err(HandlerError::internal(
        "Failed to load records",
        "connection refused",
    ))
}

impl EndpointModule for FailingModule {
    fn id(&self) -> &str {
        "failing"
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::get("/api/broken", "always fails")]
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        routes.get("/api/broken", always_fails);
    }
}

/// A module exporting `count` endpoints under its own prefix.
struct Wide {
    id: String,
    count: usize,
}

impl EndpointModule for Wide {
    fn id(&self) -> &str {
        &self.id
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        (0..self.count)
            .map(|i| EndpointDescriptor::get(format!("/{}/{}", self.id, i), format!("#{i}")))
            .collect()
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        for i in 0..self.count {
            routes.get(format!("/{}/{}", self.id, i), || async { "ok" });
        }
    }
}

/// A single-route module with a caller-chosen verb and path.
struct Single {
    id: &'static str,
    method: HttpMethod,
    path: &'static str,
}

impl EndpointModule for Single {
    fn id(&self) -> &str {
        self.id
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::new(self.method, self.path, self.id)]
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        routes.route(self.method, self.path, || async { "ok" });
    }
}

fn boot(loader: &dyn ModuleLoader) -> Result<Bootstrapped, BootstrapError> {
    Bootstrap::new(BootstrapOptions::default()).run(loader)
}

fn serve(boot: Bootstrapped) -> Router {
    create_router(boot.dispatcher, AppState::new(boot.aggregator, TtlCache::new()))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn endpoint_keys(doc: &Value) -> Vec<(String, String)> {
    doc["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["method"].as_str().unwrap().to_string(),
                e["path"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn two_modules_are_discoverable_and_served() {
    // Registered out of order: load order is by id, not insertion.
    let loader = BuiltinLoader::new().with(PingModule).with(TimeModule);
    let app = serve(boot(&loader).unwrap());

    let (status, doc) = get(&app, "/api/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        endpoint_keys(&doc),
        vec![
            ("GET".to_string(), "/api/time".to_string()),
            ("GET".to_string(), "/api/ping".to_string()),
        ]
    );
    assert_eq!(doc["endpoints"][0]["description"], "time");
    assert_eq!(doc["endpoints"][1]["group"], "General");

    let (status, body) = get(&app, "/api/time").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "time": "now" }));

    let (status, body) = get(&app, "/api/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "pong" }));
}

#[tokio::test]
async fn undocumented_route_aborts_bootstrap() {
    let loader = BuiltinLoader::new()
        .with(TimeModule)
        .with(SilentModule);

    let err = boot(&loader).unwrap_err();

    match err {
        BootstrapError::Contract(ModuleContractError::UndocumentedRoute {
            module,
            method,
            path,
        }) => {
            assert_eq!(module, "c");
            assert_eq!(method, HttpMethod::Get);
            assert_eq!(path, "/api/x");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn snapshot_holds_every_descriptor_in_order() {
    let sizes = [3usize, 1, 4, 2];
    let mut loader = BuiltinLoader::new();
    for (i, count) in sizes.iter().enumerate() {
        loader = loader.with(Wide {
            id: format!("m{i}"),
            count: *count,
        });
    }

    let boot = boot(&loader).unwrap();
    let doc = boot.aggregator.snapshot();

    assert_eq!(doc.endpoints.len(), sizes.iter().sum::<usize>());
    assert_eq!(doc.count, doc.endpoints.len());

    let expected: Vec<String> = sizes
        .iter()
        .enumerate()
        .flat_map(|(i, count)| (0..*count).map(move |j| format!("/m{i}/{j}")))
        .collect();
    let actual: Vec<String> = doc.endpoints.iter().map(|d| d.path.clone()).collect();
    assert_eq!(actual, expected);
}

#[test]
fn route_table_matches_descriptors_for_every_module() {
    let loader = BuiltinLoader::new()
        .with(TimeModule)
        .with(PingModule)
        .with(Wide {
            id: "wide".to_string(),
            count: 3,
        });

    let boot = boot(&loader).unwrap();

    for report in &boot.report {
        let mut routes: Vec<(HttpMethod, String)> = boot
            .dispatcher
            .routes_for(&report.id)
            .into_iter()
            .map(|r| (r.method, r.path))
            .collect();
        let mut documented: Vec<(HttpMethod, String)> = boot
            .aggregator
            .iter()
            .filter(|(module, _)| *module == report.id)
            .map(|(_, d)| (d.method, d.path.clone()))
            .collect();
        routes.sort();
        documented.sort();

        assert_eq!(routes, documented, "module {}", report.id);
        assert_eq!(routes.len(), report.endpoints);
    }
}

#[tokio::test]
async fn discovery_is_idempotent() {
    let loader = BuiltinLoader::new().with(TimeModule).with(PingModule);
    let app = serve(boot(&loader).unwrap());

    let (_, first) = get(&app, "/api/").await;
    let (_, second) = get(&app, "/api/").await;

    assert_eq!(first["endpoints"], second["endpoints"]);
    assert_eq!(first["name"], second["name"]);
    assert!(first["generated_at"].is_string());
}

#[tokio::test]
async fn handler_failure_is_contained() {
    let loader = BuiltinLoader::new()
        .with(FailingModule)
        .with(PingModule);
    let app = serve(boot(&loader).unwrap());

    let (status, body) = get(&app, "/api/broken").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({
            "status": "error",
            "message": "Failed to load records",
            "error": "connection refused"
        })
    );

    let (status, _) = get(&app, "/api/ping").await;
    assert_eq!(status, StatusCode::OK);

    let (status, doc) = get(&app, "/api/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["count"], 2);
}

#[tokio::test]
async fn manifest_directory_modules_are_served() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("meta.json"),
        r#"{
            "endpoints": [
                {
                    "path": "/api/version",
                    "method": "GET",
                    "description": "Deployed build",
                    "group": "Meta",
                    "response": { "build": "2024.06.1" }
                }
            ]
        }"#,
    )
    .unwrap();

    let loader = ChainLoader::new()
        .with(BuiltinLoader::new().with(TimeModule))
        .with(DirectoryLoader::new(dir.path()).unwrap());
    let app = serve(boot(&loader).unwrap());

    let (status, body) = get(&app, "/api/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["build"], "2024.06.1");

    let (_, doc) = get(&app, "/api/").await;
    assert_eq!(
        endpoint_keys(&doc),
        vec![
            ("GET".to_string(), "/api/time".to_string()),
            ("GET".to_string(), "/api/version".to_string()),
        ]
    );
    assert_eq!(doc["endpoints"][1]["group"], "Meta");
}

#[test]
fn malformed_manifest_aborts_bootstrap() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("broken.json"),
        r#"{ "endpoints": [ { "method": "GET", "description": "no path" } ] }"#,
    )
    .unwrap();

    let loader = DirectoryLoader::new(dir.path()).unwrap();
    let err = boot(&loader).unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Contract(ModuleContractError::InvalidDescriptor { .. })
    ));
}

#[test]
fn conflicting_parameters_fail_before_serving() {
    let loader = BuiltinLoader::new()
        .with(Single {
            id: "a",
            method: HttpMethod::Get,
            path: "/api/items/:id",
        })
        .with(Single {
            id: "b",
            method: HttpMethod::Post,
            path: "/api/items/:name",
        });

    let err = boot(&loader).unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::UnroutablePath { ref module, ref path, .. }
            if module == "b" && path == "/api/items/:name"
    ));
}

#[tokio::test]
async fn reserved_routes_stay_with_the_registry() {
    let loader = BuiltinLoader::new().with(Single {
        id: "shadow",
        method: HttpMethod::Get,
        path: "/metrics",
    });

    let err = boot(&loader).unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Contract(ModuleContractError::ReservedRoute { .. })
    ));

    // A different verb on a reserved path does not overlap.
    let loader = BuiltinLoader::new().with(Single {
        id: "ingest",
        method: HttpMethod::Post,
        path: "/metrics",
    });
    let app = serve(boot(&loader).unwrap());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
