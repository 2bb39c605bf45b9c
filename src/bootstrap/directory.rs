//! Endpoint modules declared as JSON manifests in a directory.
//!
//! Each `*.json` file is one module, identified by its file stem:
//!
//! ```json
//! {
//!   "endpoints": [
//!     {
//!       "path": "/api/version",
//!       "method": "GET",
//!       "description": "Deployed build",
//!       "group": "Meta",
//!       "response": { "build": "2024.06.1" }
//!     }
//!   ]
//! }
//! ```
//!
//! Every entry both documents and registers its route, returning the fixed
//! `response` body (and optional `status`).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::loader::ModuleLoader;
use crate::endpoint::{EndpointDescriptor, EndpointModule, ModuleRoutes, RawDescriptor};
use crate::error::{BootstrapError, ModuleContractError};

const MANIFEST_EXTENSION: &str = "json";

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    endpoints: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(flatten)]
    descriptor: RawDescriptor,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    response: serde_json::Value,
}

/// A module that serves fixed JSON bodies.
#[derive(Debug, Clone)]
pub struct StaticModule {
    id: String,
    entries: Vec<StaticEntry>,
}

#[derive(Debug, Clone)]
struct StaticEntry {
    descriptor: EndpointDescriptor,
    status: StatusCode,
    body: Arc<serde_json::Value>,
}

impl StaticModule {
    /// Parse and validate a manifest.
    pub fn from_manifest(id: &str, json: &str) -> Result<Self, BootstrapError> {
        let manifest: Manifest =
            serde_json::from_str(json).map_err(|e| BootstrapError::LoadFailed {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        let mut entries = Vec::with_capacity(manifest.endpoints.len());
        for (index, entry) in manifest.endpoints.into_iter().enumerate() {
            let descriptor = EndpointDescriptor::try_from(entry.descriptor).map_err(|source| {
                ModuleContractError::InvalidDescriptor {
                    module: id.to_string(),
                    index,
                    source,
                }
            })?;

            let status = match entry.status {
                Some(code) => {
                    StatusCode::from_u16(code).map_err(|e| BootstrapError::LoadFailed {
                        id: id.to_string(),
                        reason: format!("endpoint #{index}: {e}"),
                    })?
                }
                None => StatusCode::OK,
            };

            entries.push(StaticEntry {
                descriptor,
                status,
                body: Arc::new(entry.response),
            });
        }

        Ok(Self {
            id: id.to_string(),
            entries,
        })
    }
}

impl EndpointModule for StaticModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn descriptors(&self) -> Vec<EndpointDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    fn register(&self, routes: &mut ModuleRoutes) {
        for entry in &self.entries {
            let status = entry.status;
            let body = Arc::clone(&entry.body);
            routes.route(
                entry.descriptor.method,
                entry.descriptor.path.clone(),
                move || {
                    let body = Arc::clone(&body);
                    async move { (status, Json(body.as_ref().clone())) }
                },
            );
        }
    }
}

/// Loads [`StaticModule`]s from an absolute directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    base: PathBuf,
}

impl DirectoryLoader {
    /// Create a loader rooted at `base`, which must be absolute.
    pub fn new(base: impl Into<PathBuf>) -> Result<Self, BootstrapError> {
        let base = base.into();
        if !base.is_absolute() {
            return Err(BootstrapError::RelativeModuleDir(base));
        }
        Ok(Self { base })
    }

    /// Directory being scanned.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn manifest_path(&self, id: &str) -> PathBuf {
        self.base.join(format!("{id}.{MANIFEST_EXTENSION}"))
    }

    fn scan_error(&self, source: std::io::Error) -> BootstrapError {
        BootstrapError::ScanFailed {
            path: self.base.clone(),
            source,
        }
    }
}

impl ModuleLoader for DirectoryLoader {
    #[instrument(skip(self), fields(base = %self.base.display()))]
    fn identifiers(&self) -> Result<Vec<String>, BootstrapError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.base).map_err(|e| self.scan_error(e))? {
            let path = entry.map_err(|e| self.scan_error(e))?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        debug!(count = ids.len(), "scanned module directory");
        Ok(ids)
    }

    fn provides(&self, id: &str) -> bool {
        self.manifest_path(id).is_file()
    }

    fn load(&self, id: &str) -> Result<Arc<dyn EndpointModule>, BootstrapError> {
        let path = self.manifest_path(id);
        if !path.is_file() {
            return Err(BootstrapError::UnknownModule { id: id.to_string() });
        }

        let json = fs::read_to_string(&path).map_err(|e| BootstrapError::LoadFailed {
            id: id.to_string(),
            reason: format!("{}: {e}", path.display()),
        })?;
        Ok(Arc::new(StaticModule::from_manifest(id, &json)?))
    }
}
