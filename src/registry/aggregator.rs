//! Collects descriptors from every loaded module into the discovery document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::DuplicatePolicy;
use crate::endpoint::EndpointDescriptor;
use crate::error::ModuleContractError;
use crate::metrics;

/// Static metadata reported by the discovery document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    /// Service name.
    pub name: String,
    /// Service version.
    pub version: String,
}

/// Body of the discovery endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDocument {
    /// Service name.
    pub name: String,
    /// Service version.
    pub version: String,
    /// Always "ok" while serving.
    pub status: String,
    /// Number of documented endpoints.
    pub count: usize,
    /// Every descriptor, in module load order then export order.
    pub endpoints: Vec<EndpointDescriptor>,
    /// When this document was built.
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Registered {
    module: String,
    descriptor: EndpointDescriptor,
}

/// Process-wide descriptor collection.
///
/// Written only during bootstrap and shared read-only afterwards, so it
/// carries no lock of its own.
#[derive(Debug, Clone)]
pub struct Aggregator {
    meta: DocumentMeta,
    policy: DuplicatePolicy,
    entries: Vec<Registered>,
}

impl Aggregator {
    /// Create an empty aggregator.
    pub fn new(meta: DocumentMeta, policy: DuplicatePolicy) -> Self {
        Self {
            meta,
            policy,
            entries: Vec::new(),
        }
    }

    /// Append a module's descriptors, preserving call order.
    ///
    /// Under [`DuplicatePolicy::Warn`] an overlapping earlier descriptor is
    /// dropped and the new one appended; the number of dropped entries is
    /// returned. Under [`DuplicatePolicy::Reject`] nothing is appended and the
    /// first collision is returned as an error.
    pub fn register(
        &mut self,
        module: &str,
        descriptors: &[EndpointDescriptor],
    ) -> Result<usize, ModuleContractError> {
        if self.policy == DuplicatePolicy::Reject {
            for descriptor in descriptors {
                if let Some(previous) = self.find_overlap(descriptor) {
                    return Err(ModuleContractError::DuplicateEndpoint {
                        module: module.to_string(),
                        previous: previous.module.clone(),
                        method: descriptor.method,
                        path: descriptor.path.clone(),
                    });
                }
            }
        }

        let mut replaced = 0;
        for descriptor in descriptors {
            let before = self.entries.len();
            self.entries.retain(|existing| {
                let collides = existing
                    .descriptor
                    .overlaps(descriptor.method, &descriptor.path);
                if collides {
                    warn!(
                        method = %descriptor.method,
                        path = %descriptor.path,
                        previous = %existing.module,
                        module,
                        "duplicate endpoint descriptor, keeping the later one"
                    );
                }
                !collides
            });
            let dropped = before - self.entries.len();
            if dropped > 0 {
                metrics::inc_duplicate_endpoints(dropped as u64);
            }
            replaced += dropped;

            self.entries.push(Registered {
                module: module.to_string(),
                descriptor: descriptor.clone(),
            });
        }

        Ok(replaced)
    }

    /// Build the discovery document from the current collection.
    pub fn snapshot(&self) -> AggregatedDocument {
        let endpoints: Vec<EndpointDescriptor> = self.descriptors().cloned().collect();

        AggregatedDocument {
            name: self.meta.name.clone(),
            version: self.meta.version.clone(),
            status: "ok".to_string(),
            count: endpoints.len(),
            endpoints,
            generated_at: Utc::now(),
        }
    }

    /// Descriptors in aggregation order.
    pub fn descriptors(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Descriptors paired with the module that exported them.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EndpointDescriptor)> {
        self.entries
            .iter()
            .map(|e| (e.module.as_str(), &e.descriptor))
    }

    /// Distinct modules with at least one surviving descriptor, in load order.
    pub fn modules(&self) -> Vec<&str> {
        let mut modules: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !modules.contains(&entry.module.as_str()) {
                modules.push(&entry.module);
            }
        }
        modules
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Document metadata.
    pub fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn find_overlap(&self, descriptor: &EndpointDescriptor) -> Option<&Registered> {
        self.entries
            .iter()
            .find(|e| e.descriptor.overlaps(descriptor.method, &descriptor.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::HttpMethod;
    use pretty_assertions::assert_eq;

    fn aggregator(policy: DuplicatePolicy) -> Aggregator {
        Aggregator::new(
            DocumentMeta {
                name: "test-api".to_string(),
                version: "1.0.0".to_string(),
            },
            policy,
        )
    }

    #[test]
    fn snapshot_concatenates_in_registration_order() {
        let mut agg = aggregator(DuplicatePolicy::Warn);
        agg.register(
            "a",
            &[
                EndpointDescriptor::get("/a/1", "a1"),
                EndpointDescriptor::get("/a/2", "a2"),
            ],
        )
        .unwrap();
        agg.register("b", &[EndpointDescriptor::get("/b/1", "b1")])
            .unwrap();

        let doc = agg.snapshot();
        let paths: Vec<&str> = doc.endpoints.iter().map(|d| d.path.as_str()).collect();

        assert_eq!(paths, vec!["/a/1", "/a/2", "/b/1"]);
        assert_eq!(doc.count, 3);
        assert_eq!(doc.status, "ok");
        assert_eq!(doc.name, "test-api");
    }

    #[test]
    fn snapshot_does_not_mutate_collection() {
        let mut agg = aggregator(DuplicatePolicy::Warn);
        agg.register("a", &[EndpointDescriptor::get("/a", "a")])
            .unwrap();

        let first = agg.snapshot();
        let second = agg.snapshot();

        assert_eq!(first.endpoints, second.endpoints);
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn duplicate_keeps_later_descriptor_under_warn() {
        let mut agg = aggregator(DuplicatePolicy::Warn);
        agg.register(
            "a",
            &[
                EndpointDescriptor::get("/shared", "from a"),
                EndpointDescriptor::get("/only-a", "a"),
            ],
        )
        .unwrap();
        let replaced = agg
            .register("b", &[EndpointDescriptor::get("/shared", "from b")])
            .unwrap();

        assert_eq!(replaced, 1);
        let doc = agg.snapshot();
        let descriptions: Vec<&str> = doc
            .endpoints
            .iter()
            .map(|d| d.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["a", "from b"]);
        assert_eq!(agg.modules(), vec!["a", "b"]);
    }

    #[test]
    fn wildcard_method_counts_as_duplicate() {
        let mut agg = aggregator(DuplicatePolicy::Warn);
        agg.register("a", &[EndpointDescriptor::get("/x", "get x")])
            .unwrap();
        agg.register(
            "b",
            &[EndpointDescriptor::new(HttpMethod::Any, "/x", "any x")],
        )
        .unwrap();

        assert_eq!(agg.len(), 1);
        assert_eq!(agg.iter().next().map(|(m, _)| m), Some("b"));
    }

    #[test]
    fn duplicate_is_fatal_under_reject() {
        let mut agg = aggregator(DuplicatePolicy::Reject);
        agg.register("a", &[EndpointDescriptor::get("/shared", "a")])
            .unwrap();

        let err = agg
            .register(
                "b",
                &[
                    EndpointDescriptor::get("/fresh", "b"),
                    EndpointDescriptor::get("/shared", "b"),
                ],
            )
            .unwrap_err();

        assert!(matches!(
            err,
            ModuleContractError::DuplicateEndpoint { ref previous, .. } if previous == "a"
        ));
        // Nothing from the rejected module was appended.
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn different_methods_on_same_path_coexist() {
        let mut agg = aggregator(DuplicatePolicy::Reject);
        agg.register("a", &[EndpointDescriptor::get("/items", "list")])
            .unwrap();
        agg.register("b", &[EndpointDescriptor::post("/items", "create")])
            .unwrap();

        assert_eq!(agg.len(), 2);
    }
}
