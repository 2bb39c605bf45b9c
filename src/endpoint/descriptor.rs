//! Documentation metadata for a single route.

use std::str::FromStr;

use axum::routing::MethodFilter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DescriptorError;

/// Group used when a descriptor does not name one.
pub const DEFAULT_GROUP: &str = "General";

static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?(?:\+[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?$",
    )
    .expect("semver pattern compiles")
});

/// HTTP verb a route answers to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
    /// HEAD.
    Head,
    /// OPTIONS.
    Options,
    /// Wildcard: every verb.
    Any,
}

impl HttpMethod {
    /// Every concrete verb, in the order used for documentation.
    pub const CONCRETE: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    /// Whether two registrations on the same path would collide.
    pub fn overlaps(self, other: HttpMethod) -> bool {
        self == other || self == HttpMethod::Any || other == HttpMethod::Any
    }

    /// Router filter for a concrete verb; `None` for [`HttpMethod::Any`].
    pub fn method_filter(self) -> Option<MethodFilter> {
        match self {
            HttpMethod::Get => Some(MethodFilter::GET),
            HttpMethod::Post => Some(MethodFilter::POST),
            HttpMethod::Put => Some(MethodFilter::PUT),
            HttpMethod::Patch => Some(MethodFilter::PATCH),
            HttpMethod::Delete => Some(MethodFilter::DELETE),
            HttpMethod::Head => Some(MethodFilter::HEAD),
            HttpMethod::Options => Some(MethodFilter::OPTIONS),
            HttpMethod::Any => None,
        }
    }

    /// Verbs this method expands to.
    pub fn expand(self) -> Vec<HttpMethod> {
        match self {
            HttpMethod::Any => Self::CONCRETE.to_vec(),
            method => vec![method],
        }
    }
}

/// Describes one documented route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Route path, starting with `/`.
    pub path: String,
    /// Verb the route answers to.
    pub method: HttpMethod,
    /// What the endpoint does.
    pub description: String,
    /// Documentation group.
    #[serde(default = "default_group")]
    pub group: String,
    /// Semantic version of the endpoint contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

impl EndpointDescriptor {
    /// Create a descriptor in the default group.
    pub fn new(method: HttpMethod, path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            description: description.into(),
            group: default_group(),
            version: None,
        }
    }

    /// Shorthand for a GET descriptor.
    pub fn get(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path, description)
    }

    /// Shorthand for a POST descriptor.
    pub fn post(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path, description)
    }

    /// Set the documentation group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Set the contract version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Whether this descriptor collides with another route.
    pub fn overlaps(&self, method: HttpMethod, path: &str) -> bool {
        self.path == path && self.method.overlaps(method)
    }

    /// Check the structural rules every exported descriptor must satisfy.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.path.is_empty() {
            return Err(DescriptorError::MissingField("path"));
        }
        if !self.path.starts_with('/') {
            return Err(DescriptorError::RelativePath(self.path.clone()));
        }
        if self.description.trim().is_empty() {
            return Err(DescriptorError::EmptyDescription);
        }
        if let Some(version) = &self.version {
            if !SEMVER.is_match(version) {
                return Err(DescriptorError::InvalidVersion(version.clone()));
            }
        }
        Ok(())
    }
}

/// Untyped descriptor as found in a module export; every field optional.
///
/// Converting it runs the same validation as typed descriptors, so a
/// malformed export is rejected at load time instead of being trusted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDescriptor {
    /// Route path.
    #[serde(default)]
    pub path: Option<String>,
    /// Verb, any case.
    #[serde(default)]
    pub method: Option<String>,
    /// What the endpoint does.
    #[serde(default)]
    pub description: Option<String>,
    /// Documentation group.
    #[serde(default)]
    pub group: Option<String>,
    /// Contract version.
    #[serde(default)]
    pub version: Option<String>,
}

impl TryFrom<RawDescriptor> for EndpointDescriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        let path = raw.path.ok_or(DescriptorError::MissingField("path"))?;
        let method = raw.method.ok_or(DescriptorError::MissingField("method"))?;
        let method = HttpMethod::from_str(method.trim())
            .map_err(|_| DescriptorError::UnknownMethod(method.clone()))?;
        let description = raw
            .description
            .ok_or(DescriptorError::MissingField("description"))?;
        let group = raw
            .group
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(default_group);

        let descriptor = EndpointDescriptor {
            path,
            method,
            description,
            group,
            version: raw.version,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}
