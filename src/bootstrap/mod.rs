//! One-shot startup sequence turning endpoint modules into a live route
//! surface plus the discovery route.
//!
//! Modules load in lexicographic identifier order. Each is loaded exactly
//! once, verified against its own export and only then committed; any
//! failure aborts the whole sequence so a half-registered surface is never
//! served.

pub mod directory;
pub mod loader;

use std::collections::BTreeMap;

use serde::Serialize;
use strum::Display;
use tracing::{info, instrument};

use crate::api::discovery;
use crate::config::Config;
use crate::endpoint::{verify_contract, EndpointDescriptor, HttpMethod, ModuleRoutes};
use crate::error::{BootstrapError, ModuleContractError};
use crate::metrics;
use crate::registry::{Aggregator, Dispatcher, DocumentMeta, DuplicatePolicy, RouteInfo};

pub use directory::{DirectoryLoader, StaticModule};
pub use loader::{BuiltinLoader, ChainLoader, ModuleLoader};

/// Pseudo-module owning the routes bootstrap adds itself.
pub const BOOTSTRAP_MODULE: &str = "<bootstrap>";

/// Path of the generated OpenAPI document.
pub const OPENAPI_PATH: &str = "/api/openapi.json";

/// Path of the Prometheus exposition.
pub const METRICS_PATH: &str = "/metrics";

/// Lifecycle of a module during bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModuleState {
    /// Discovered, not yet loaded.
    Pending,
    /// Registrations and descriptors applied.
    Loaded,
}

/// Outcome for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    /// Module identifier.
    pub id: String,
    /// Final state.
    pub state: ModuleState,
    /// Number of endpoints the module exported.
    pub endpoints: usize,
}

/// Settings that shape the bootstrap.
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    /// Discovery document metadata.
    pub meta: DocumentMeta,
    /// Duplicate endpoint handling.
    pub duplicate_policy: DuplicatePolicy,
    /// Where the discovery document is served.
    pub discovery_path: String,
    /// Also serve the OpenAPI rendering.
    pub openapi: bool,
    /// Also serve Prometheus metrics.
    pub metrics: bool,
}

impl BootstrapOptions {
    /// Derive options from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            meta: DocumentMeta {
                name: config.api_name.clone(),
                version: config.api_version.clone(),
            },
            duplicate_policy: config.duplicate_policy,
            discovery_path: config.discovery_path.clone(),
            openapi: config.openapi_enabled,
            metrics: config.metrics_enabled,
        }
    }
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of a successful bootstrap.
#[derive(Debug)]
pub struct Bootstrapped {
    /// Frozen descriptor collection.
    pub aggregator: Aggregator,
    /// Route table ready to be served.
    pub dispatcher: Dispatcher,
    /// Per-module outcome, in load order.
    pub report: Vec<ModuleReport>,
}

/// Loads every module from a loader.
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    options: BootstrapOptions,
}

impl Bootstrap {
    /// Create a bootstrap with the given options.
    pub fn new(options: BootstrapOptions) -> Self {
        Self { options }
    }

    /// Run the sequence. Consumes the bootstrap: it is not reentrant.
    #[instrument(skip_all, fields(policy = %self.options.duplicate_policy))]
    pub fn run(self, loader: &dyn ModuleLoader) -> Result<Bootstrapped, BootstrapError> {
        let _timer = metrics::timer_bootstrap();

        let mut ids = loader.identifiers()?;
        ids.sort();
        ids.dedup();

        let mut states: BTreeMap<String, (ModuleState, usize)> = ids
            .iter()
            .map(|id| (id.clone(), (ModuleState::Pending, 0)))
            .collect();
        info!(modules = ids.len(), "loading endpoint modules");

        let mut aggregator =
            Aggregator::new(self.options.meta.clone(), self.options.duplicate_policy);
        let mut dispatcher = Dispatcher::new();

        // Committed first so modules can neither displace nor shadow them.
        self.register_builtin_routes(&mut dispatcher)?;
        let reserved = dispatcher.routes_for(BOOTSTRAP_MODULE);

        for id in &ids {
            let module = loader.load(id)?;
            let descriptors = module.descriptors();
            let mut routes = ModuleRoutes::new(id.as_str());
            module.register(&mut routes);

            verify_contract(id, &descriptors, &routes)?;
            check_reserved(id, &descriptors, &reserved)?;
            aggregator.register(id, &descriptors)?;
            dispatcher.commit(id, routes.into_routes())?;

            states.insert(id.clone(), (ModuleState::Loaded, descriptors.len()));
            metrics::inc_modules_loaded();
            info!(module = %id, endpoints = descriptors.len(), "endpoint module loaded");
        }

        let report = ids
            .into_iter()
            .map(|id| {
                let (state, endpoints) = states
                    .get(&id)
                    .copied()
                    .unwrap_or((ModuleState::Pending, 0));
                ModuleReport {
                    id,
                    state,
                    endpoints,
                }
            })
            .collect();

        info!(
            endpoints = aggregator.len(),
            routes = dispatcher.len(),
            discovery = %self.options.discovery_path,
            "bootstrap complete"
        );

        Ok(Bootstrapped {
            aggregator,
            dispatcher,
            report,
        })
    }

    fn register_builtin_routes(&self, dispatcher: &mut Dispatcher) -> Result<(), BootstrapError> {
        let mut routes = ModuleRoutes::new(BOOTSTRAP_MODULE);
        routes.route(
            HttpMethod::Get,
            self.options.discovery_path.as_str(),
            discovery::discovery,
        );
        if self.options.openapi {
            routes.route(HttpMethod::Get, OPENAPI_PATH, discovery::openapi);
        }
        if self.options.metrics {
            routes.route(HttpMethod::Get, METRICS_PATH, discovery::metrics);
        }
        dispatcher.commit(BOOTSTRAP_MODULE, routes.into_routes())?;
        Ok(())
    }
}

fn check_reserved(
    module: &str,
    descriptors: &[EndpointDescriptor],
    reserved: &[RouteInfo],
) -> Result<(), ModuleContractError> {
    for descriptor in descriptors {
        if reserved
            .iter()
            .any(|r| descriptor.overlaps(r.method, &r.path))
        {
            return Err(ModuleContractError::ReservedRoute {
                module: module.to_string(),
                method: descriptor.method,
                path: descriptor.path.clone(),
            });
        }
    }
    Ok(())
}
