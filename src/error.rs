//! Unified error types for the endpoint registry.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::endpoint::HttpMethod;
use crate::metrics;

/// Unified error type for the endpoint registry.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Startup sequence failed; the process must not serve traffic.
    #[error("bootstrap error: {0}")]
    Bootstrap(#[from] BootstrapError),
}

/// Fatal startup errors raised while loading endpoint modules.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// A module broke the descriptor/registration contract.
    #[error(transparent)]
    Contract(#[from] ModuleContractError),

    /// No loader knows the requested module identifier.
    #[error("unknown endpoint module: {id}")]
    UnknownModule {
        /// The identifier that failed to resolve.
        id: String,
    },

    /// The module exists but could not be read or parsed.
    #[error("failed to load endpoint module {id}: {reason}")]
    LoadFailed {
        /// Module identifier.
        id: String,
        /// Reason for failure.
        reason: String,
    },

    /// Two loaders offered a module with the same identifier.
    #[error("endpoint module {id} is provided by more than one loader")]
    DuplicateModule {
        /// The ambiguous identifier.
        id: String,
    },

    /// A path pattern conflicts with one already committed, or is malformed.
    #[error("module {module} registers {path}, which the router cannot accept: {reason}")]
    UnroutablePath {
        /// Module whose routes were refused.
        module: String,
        /// The refused path.
        path: String,
        /// Matcher diagnostic.
        reason: String,
    },

    /// Module directories must be absolute.
    #[error("module directory must be an absolute path: {}", .0.display())]
    RelativeModuleDir(PathBuf),

    /// The module directory could not be scanned.
    #[error("failed to scan module directory {}: {source}", .path.display())]
    ScanFailed {
        /// Directory being scanned.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// A loaded module's exports do not match what it registered.
#[derive(Error, Debug)]
pub enum ModuleContractError {
    /// The module exported no descriptors at all.
    #[error("module {module} exports no endpoint descriptors")]
    EmptyExport {
        /// Offending module.
        module: String,
    },

    /// A descriptor failed structural validation.
    #[error("module {module} exports an invalid descriptor (#{index}): {source}")]
    InvalidDescriptor {
        /// Offending module.
        module: String,
        /// Position of the descriptor in the module's export.
        index: usize,
        /// What was wrong with it.
        #[source]
        source: DescriptorError,
    },

    /// The same route is documented twice by one module.
    #[error("module {module} documents {method} {path} more than once")]
    DuplicateDescriptor {
        /// Offending module.
        module: String,
        /// Route method.
        method: HttpMethod,
        /// Route path.
        path: String,
    },

    /// A route was registered without a matching descriptor.
    #[error("module {module} registers {method} {path} without documenting it")]
    UndocumentedRoute {
        /// Offending module.
        module: String,
        /// Route method.
        method: HttpMethod,
        /// Route path.
        path: String,
    },

    /// A descriptor was exported for a route that was never registered.
    #[error("module {module} documents {method} {path} but never registers it")]
    UnregisteredRoute {
        /// Offending module.
        module: String,
        /// Route method.
        method: HttpMethod,
        /// Route path.
        path: String,
    },

    /// The route is owned by the registry itself (discovery, OpenAPI, metrics).
    #[error("module {module} claims {method} {path}, which is reserved by the registry")]
    ReservedRoute {
        /// Offending module.
        module: String,
        /// Route method.
        method: HttpMethod,
        /// Route path.
        path: String,
    },

    /// Two modules claim overlapping routes and duplicates are rejected.
    #[error("{method} {path} from module {module} overlaps a route of module {previous}")]
    DuplicateEndpoint {
        /// Module registering the later route.
        module: String,
        /// Module that registered the earlier route.
        previous: String,
        /// Route method.
        method: HttpMethod,
        /// Route path.
        path: String,
    },
}

/// Structural problems in an exported descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// A required field was absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// Paths must start with `/`.
    #[error("path {0:?} must start with '/'")]
    RelativePath(String),

    /// Description must contain more than whitespace.
    #[error("description must not be empty")]
    EmptyDescription,

    /// The method is not one of the known verbs.
    #[error("unknown http method {0:?}")]
    UnknownMethod(String),

    /// Version is not a semantic version.
    #[error("version {0:?} is not a semantic version")]
    InvalidVersion(String),
}

/// Failure raised inside an endpoint handler.
///
/// Handlers return this instead of panicking so that every failure reaches
/// the client as a structured JSON body.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Unexpected failure while computing a response.
    #[error("{message}: {detail}")]
    Internal {
        /// Human-readable message.
        message: String,
        /// Technical detail.
        detail: String,
    },

    /// The request could not be interpreted.
    #[error("{message}: {detail}")]
    BadRequest {
        /// Human-readable message.
        message: String,
        /// Technical detail.
        detail: String,
    },
}

impl HandlerError {
    /// Create an internal error from any displayable cause.
    pub fn internal(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Internal {
            message: message.into(),
            detail: cause.to_string(),
        }
    }

    /// Create a bad-request error from any displayable cause.
    pub fn bad_request(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::BadRequest {
            message: message.into(),
            detail: cause.to_string(),
        }
    }

    /// HTTP status reported to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

/// Body sent for every handler failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Always "error".
    pub status: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Technical detail.
    pub error: String,
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, detail) = match self {
            Self::Internal { message, detail } | Self::BadRequest { message, detail } => {
                (message, detail)
            }
        };

        if status.is_server_error() {
            tracing::error!(%message, %detail, "handler failed");
        } else {
            tracing::debug!(%message, %detail, "rejected request");
        }
        metrics::inc_handler_errors(status.as_u16());

        let body = ErrorBody {
            status: "error",
            message,
            error: detail,
        };
        (status, Json(body)).into_response()
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
