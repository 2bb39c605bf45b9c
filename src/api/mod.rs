//! HTTP API: built-in endpoint modules, discovery routes and router assembly.

pub mod discovery;
pub mod handlers;
pub mod modules;
pub mod routes;
pub mod state;

pub use modules::{builtin_loader, default_loader};
pub use routes::{build_app, create_router};
pub use state::AppState;
