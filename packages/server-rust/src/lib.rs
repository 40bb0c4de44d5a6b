//! `reqscope` server — tower/axum entry-point layer and demo HTTP server.
//!
//! [`middleware::ContextLayer`] binds a `reqscope_core::RequestContext` to
//! every request it wraps; handlers and anything they call reach request
//! state through `reqscope_core::accessors`.

pub mod cli;
pub mod error;
pub mod middleware;
pub mod network;
pub mod telemetry;

pub use error::ApiError;
pub use middleware::{ContextLayer, ContextService, Ctx};
pub use network::{NetworkConfig, NetworkModule};
