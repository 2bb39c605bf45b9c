//! Endpoint descriptors and the module contract every feature implements.

pub mod descriptor;
pub mod module;

pub use descriptor::{EndpointDescriptor, HttpMethod, RawDescriptor, DEFAULT_GROUP};
pub use module::{verify_contract, EndpointModule, ModuleRoutes, Route, RouteHandler};
