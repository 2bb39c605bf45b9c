//! Resolving module identifiers to loaded endpoint modules.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::endpoint::EndpointModule;
use crate::error::BootstrapError;

/// Source of endpoint modules.
pub trait ModuleLoader: Send + Sync {
    /// Identifiers of every module this loader can provide.
    fn identifiers(&self) -> Result<Vec<String>, BootstrapError>;

    /// Whether `id` is provided by this loader.
    fn provides(&self, id: &str) -> bool;

    /// Resolve `id` to a module.
    fn load(&self, id: &str) -> Result<Arc<dyn EndpointModule>, BootstrapError>;
}

/// Modules compiled into the binary, keyed by their id.
#[derive(Default, Clone)]
pub struct BuiltinLoader {
    modules: BTreeMap<String, Arc<dyn EndpointModule>>,
}

impl BuiltinLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module under its own id. A later module with the same id
    /// replaces the earlier one.
    pub fn with(mut self, module: impl EndpointModule + 'static) -> Self {
        self.insert(Arc::new(module));
        self
    }

    /// Add an already shared module.
    pub fn insert(&mut self, module: Arc<dyn EndpointModule>) {
        self.modules.insert(module.id().to_string(), module);
    }
}

impl std::fmt::Debug for BuiltinLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinLoader")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModuleLoader for BuiltinLoader {
    fn identifiers(&self) -> Result<Vec<String>, BootstrapError> {
        Ok(self.modules.keys().cloned().collect())
    }

    fn provides(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    fn load(&self, id: &str) -> Result<Arc<dyn EndpointModule>, BootstrapError> {
        self.modules
            .get(id)
            .cloned()
            .ok_or_else(|| BootstrapError::UnknownModule { id: id.to_string() })
    }
}

/// Several loaders queried as one.
#[derive(Default)]
pub struct ChainLoader {
    loaders: Vec<Box<dyn ModuleLoader>>,
}

impl ChainLoader {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a loader.
    pub fn with(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }
}

impl ModuleLoader for ChainLoader {
    fn identifiers(&self) -> Result<Vec<String>, BootstrapError> {
        let mut seen = BTreeSet::new();
        for loader in &self.loaders {
            for id in loader.identifiers()? {
                if !seen.insert(id.clone()) {
                    return Err(BootstrapError::DuplicateModule { id });
                }
            }
        }
        Ok(seen.into_iter().collect())
    }

    fn provides(&self, id: &str) -> bool {
        self.loaders.iter().any(|l| l.provides(id))
    }

    fn load(&self, id: &str) -> Result<Arc<dyn EndpointModule>, BootstrapError> {
        self.loaders
            .iter()
            .find(|l| l.provides(id))
            .ok_or_else(|| BootstrapError::UnknownModule { id: id.to_string() })?
            .load(id)
    }
}
