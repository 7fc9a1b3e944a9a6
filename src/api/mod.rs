//! HTTP API surface

pub mod handlers;
pub mod models;

pub use handlers::{build_router, AppState};
