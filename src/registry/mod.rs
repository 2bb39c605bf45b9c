//! Endpoint registry: the descriptor aggregator and the route dispatcher.

pub mod aggregator;
pub mod dispatcher;
pub mod openapi;

use serde::Deserialize;
use strum::{Display, EnumString};

pub use aggregator::{AggregatedDocument, Aggregator, DocumentMeta};
pub use dispatcher::{Dispatcher, RouteInfo};
pub use openapi::build_openapi;

/// How overlapping `(path, method)` registrations across modules are handled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DuplicatePolicy {
    /// Log a warning; the later registration wins.
    #[default]
    Warn,
    /// Abort bootstrap.
    Reject,
}
