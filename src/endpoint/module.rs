//! The endpoint module contract: routes plus the descriptors documenting them.

use std::collections::BTreeSet;

use axum::handler::Handler;
use axum::routing::{any, on, MethodRouter};

use super::descriptor::{EndpointDescriptor, HttpMethod};
use crate::api::AppState;
use crate::error::ModuleContractError;

/// A routable handler bound to the shared application state.
pub type RouteHandler = MethodRouter<AppState>;

/// A deployable unit that registers routes and documents them.
///
/// `descriptors` and `register` must describe the same set of
/// `(path, method)` pairs; bootstrap cross-checks them before anything is
/// served.
pub trait EndpointModule: Send + Sync {
    /// Logical name the module is loaded under.
    fn id(&self) -> &str;

    /// Documentation for every route the module registers, in export order.
    fn descriptors(&self) -> Vec<EndpointDescriptor>;

    /// Bind handlers for the module's routes.
    fn register(&self, routes: &mut ModuleRoutes);
}

/// One registered route.
pub struct Route {
    /// Verb.
    pub method: HttpMethod,
    /// Path.
    pub path: String,
    /// Handler bound to the verb.
    pub handler: RouteHandler,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Routes collected from a single module while it loads.
///
/// Nothing collected here is servable until bootstrap has verified the
/// module and committed the routes to the dispatcher.
#[derive(Debug)]
pub struct ModuleRoutes {
    module: String,
    routes: Vec<Route>,
}

impl ModuleRoutes {
    /// Start collecting routes for `module`.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            routes: Vec::new(),
        }
    }

    /// Module the routes belong to.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Register `handler` for `method` on `path`.
    pub fn route<H, T>(&mut self, method: HttpMethod, path: impl Into<String>, handler: H) -> &mut Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        let handler = match method.method_filter() {
            Some(filter) => on(filter, handler),
            None => any(handler),
        };
        self.routes.push(Route {
            method,
            path: path.into(),
            handler,
        });
        self
    }

    /// Register a GET handler.
    pub fn get<H, T>(&mut self, path: impl Into<String>, handler: H) -> &mut Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.route(HttpMethod::Get, path, handler)
    }

    /// Register a POST handler.
    pub fn post<H, T>(&mut self, path: impl Into<String>, handler: H) -> &mut Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.route(HttpMethod::Post, path, handler)
    }

    /// `(method, path)` pairs registered so far.
    pub fn keys(&self) -> Vec<(HttpMethod, String)> {
        self.routes
            .iter()
            .map(|r| (r.method, r.path.clone()))
            .collect()
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Hand the routes over for serving.
    pub fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}

/// Verify that a module's exported descriptors losslessly match the routes
/// it registered.
pub fn verify_contract(
    module: &str,
    descriptors: &[EndpointDescriptor],
    routes: &ModuleRoutes,
) -> Result<(), ModuleContractError> {
    if descriptors.is_empty() {
        return Err(ModuleContractError::EmptyExport {
            module: module.to_string(),
        });
    }

    for (index, descriptor) in descriptors.iter().enumerate() {
        descriptor
            .validate()
            .map_err(|source| ModuleContractError::InvalidDescriptor {
                module: module.to_string(),
                index,
                source,
            })?;

        let collides = descriptors[..index]
            .iter()
            .any(|earlier| earlier.overlaps(descriptor.method, &descriptor.path));
        if collides {
            return Err(ModuleContractError::DuplicateDescriptor {
                module: module.to_string(),
                method: descriptor.method,
                path: descriptor.path.clone(),
            });
        }
    }

    let documented: BTreeSet<(HttpMethod, String)> = descriptors
        .iter()
        .map(|d| (d.method, d.path.clone()))
        .collect();
    let registered: BTreeSet<(HttpMethod, String)> = routes.keys().into_iter().collect();

    if let Some((method, path)) = registered.difference(&documented).next() {
        return Err(ModuleContractError::UndocumentedRoute {
            module: module.to_string(),
            method: *method,
            path: path.clone(),
        });
    }

    if let Some((method, path)) = documented.difference(&registered).next() {
        return Err(ModuleContractError::UnregisteredRoute {
            module: module.to_string(),
            method: *method,
            path: path.clone(),
        });
    }

    if registered.len() != routes.len() {
        // Same route registered twice with different handlers.
        let mut seen = BTreeSet::new();
        for key in routes.keys() {
            if !seen.insert(key.clone()) {
                return Err(ModuleContractError::DuplicateDescriptor {
                    module: module.to_string(),
                    method: key.0,
                    path: key.1,
                });
            }
        }
    }

    Ok(())
}
