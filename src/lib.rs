//! Self-describing HTTP endpoint registry.
//!
//! Every feature ships as an endpoint module that both registers its
//! route handlers and exports documentation descriptors for them. A one-shot
//! bootstrap loads the modules in a deterministic order, cross-checks each
//! module's routes against its descriptors, and serves the collected
//! descriptors as a live discovery document:
//!
//! ```text
//! GET /api/
//! {
//!   "name": "endpoint-registry",
//!   "version": "0.1.0",
//!   "status": "ok",
//!   "count": 2,
//!   "endpoints": [
//!     { "path": "/api/ping", "method": "GET", "description": "Responds with pong", "group": "General" },
//!     { "path": "/api/time", "method": "GET", "description": "Current server time", "group": "General" }
//!   ],
//!   "generated_at": "2024-06-01T12:00:00Z"
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`cache`]: TTL cache for expensive handlers
//! - [`endpoint`]: Descriptors and the endpoint module contract
//! - [`registry`]: Descriptor aggregator and route dispatcher
//! - [`bootstrap`]: Module loaders and the startup sequence
//! - [`api`]: Built-in modules, discovery routes and router assembly
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
