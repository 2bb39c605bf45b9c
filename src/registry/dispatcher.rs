//! Route table the HTTP server is built from.

use std::collections::{HashMap, HashSet};

use axum::Router;
use serde::Serialize;
use tracing::{debug, warn};

use crate::api::AppState;
use crate::endpoint::{HttpMethod, Route, RouteHandler};
use crate::error::BootstrapError;

/// One row of the route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    /// Module that registered the route.
    pub module: String,
    /// Verb.
    pub method: HttpMethod,
    /// Path.
    pub path: String,
}

struct Entry {
    info: RouteInfo,
    handler: RouteHandler,
}

/// Ordered route table; overlapping registrations resolve last-wins.
#[derive(Default)]
pub struct Dispatcher {
    entries: Vec<Entry>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a verified module's routes. Returns how many earlier routes were
    /// displaced by overlapping ones.
    ///
    /// Fails without touching the table when a path pattern cannot coexist
    /// with the ones already committed.
    pub fn commit(&mut self, module: &str, routes: Vec<Route>) -> Result<usize, BootstrapError> {
        self.check_routable(module, &routes)?;

        let mut displaced = 0;

        for route in routes {
            let before = self.entries.len();
            self.entries.retain(|existing| {
                let collides = existing.info.path == route.path
                    && existing.info.method.overlaps(route.method);
                if collides {
                    warn!(
                        method = %route.method,
                        path = %route.path,
                        previous = %existing.info.module,
                        module,
                        "route replaced by a later registration"
                    );
                }
                !collides
            });
            displaced += before - self.entries.len();

            debug!(module, method = %route.method, path = %route.path, "route registered");
            self.entries.push(Entry {
                info: RouteInfo {
                    module: module.to_string(),
                    method: route.method,
                    path: route.path,
                },
                handler: route.handler,
            });
        }

        Ok(displaced)
    }

    /// Replay every distinct path through the matcher the router is built
    /// on, so a conflicting pattern fails here instead of in `into_router`.
    fn check_routable(&self, module: &str, incoming: &[Route]) -> Result<(), BootstrapError> {
        let mut matcher = matchit::Router::<()>::new();
        let mut seen = HashSet::new();

        let paths = self
            .entries
            .iter()
            .map(|e| e.info.path.as_str())
            .chain(incoming.iter().map(|r| r.path.as_str()));
        for path in paths {
            if !seen.insert(path) {
                continue;
            }
            matcher
                .insert(path, ())
                .map_err(|e| BootstrapError::UnroutablePath {
                    module: module.to_string(),
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;
        }

        Ok(())
    }

    /// Current route table, in registration order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.entries.iter().map(|e| e.info.clone()).collect()
    }

    /// Routes registered by one module.
    pub fn routes_for(&self, module: &str) -> Vec<RouteInfo> {
        self.entries
            .iter()
            .filter(|e| e.info.module == module)
            .map(|e| e.info.clone())
            .collect()
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no route is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the router, merging every verb registered on a path.
    ///
    /// Every path was accepted by `check_routable` on commit.
    pub fn into_router(self) -> Router<AppState> {
        let mut order: Vec<String> = Vec::new();
        let mut by_path: HashMap<String, RouteHandler> = HashMap::new();

        for entry in self.entries {
            let path = entry.info.path;
            match by_path.remove(&path) {
                Some(existing) => {
                    by_path.insert(path, existing.merge(entry.handler));
                }
                None => {
                    order.push(path.clone());
                    by_path.insert(path, entry.handler);
                }
            }
        }

        order.into_iter().fold(Router::new(), |router, path| {
            match by_path.remove(&path) {
                Some(handler) => router.route(&path, handler),
                None => router,
            }
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes())
            .finish()
    }
}
