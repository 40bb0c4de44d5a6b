//! Request-context middleware for axum/tower hosts.
//!
//! - [`context`]: the entry-point layer that binds a context per request
//! - [`extract`]: axum extractor for the bound context

pub mod context;
pub mod extract;

pub use context::{ContextLayer, ContextService};
pub use extract::Ctx;
