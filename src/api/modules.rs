//! Built-in endpoint modules.

use crate::bootstrap::{BuiltinLoader, ChainLoader, DirectoryLoader};
use crate::config::Config;
use crate::endpoint::{EndpointDescriptor, EndpointModule, ModuleRoutes};
use crate::error::BootstrapError;

use super::handlers;

/// `GET /health`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthModule;

impl EndpointModule for HealthModule {
    fn id(&self) -> &str {
        "health"
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::get("/health", "Liveness probe, always 200").with_group("System")]
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        routes.get("/health", handlers::health);
    }
}

/// `GET /api/hello`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelloModule;

impl EndpointModule for HelloModule {
    fn id(&self) -> &str {
        "hello"
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        vec![
            EndpointDescriptor::get("/api/hello", "Greeting from the service")
                .with_group("Examples")
                .with_version("1.0.0"),
        ]
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        routes.get("/api/hello", handlers::hello);
    }
}

/// `GET /api/ping`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingModule;

impl EndpointModule for PingModule {
    fn id(&self) -> &str {
        "ping"
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::get("/api/ping", "Responds with pong")]
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        routes.get("/api/ping", handlers::ping);
    }
}

/// `GET /api/time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeModule;

impl EndpointModule for TimeModule {
    fn id(&self) -> &str {
        "time"
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::get("/api/time", "Current server time")]
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        routes.get("/api/time", handlers::time);
    }
}

/// `POST /api/echo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoModule;

impl EndpointModule for EchoModule {
    fn id(&self) -> &str {
        "echo"
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::post("/api/echo", "Returns the posted JSON body")
            .with_group("Examples")]
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        routes.post("/api/echo", handlers::echo);
    }
}

/// `GET /api/stats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsModule;

impl EndpointModule for StatsModule {
    fn id(&self) -> &str {
        "stats"
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::get(
            "/api/stats",
            "Endpoint counts by group and method (cached)",
        )
        .with_group("System")]
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        routes.get("/api/stats", handlers::stats);
    }
}

/// Every module compiled into the binary.
pub fn builtin_loader() -> BuiltinLoader {
    BuiltinLoader::new()
        .with(HealthModule)
        .with(HelloModule)
        .with(PingModule)
        .with(TimeModule)
        .with(EchoModule)
        .with(StatsModule)
}

/// Built-in modules plus the configured manifest directory, if any.
pub fn default_loader(config: &Config) -> Result<ChainLoader, BootstrapError> {
    let mut chain = ChainLoader::new().with(builtin_loader());
    if let Some(dir) = &config.module_dir {
        chain = chain.with(DirectoryLoader::new(dir.clone())?);
    }
    Ok(chain)
}
