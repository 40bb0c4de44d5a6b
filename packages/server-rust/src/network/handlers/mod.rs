//! HTTP handler definitions for the demo server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors, and also installed as the application handle of every
//! request context) and re-exports all handler functions.

pub mod health;
pub mod whoami;

pub use health::health_handler;
pub use whoami::whoami_handler;

use std::sync::Arc;
use std::time::Instant;

use super::NetworkConfig;

/// Shared application state.
///
/// Holds `Arc` references so cloning is cheap. Handlers reach it either via
/// `State` extraction or ambiently through `reqscope_core::accessors::app()`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Network configuration (bind address, timeouts, correlation header).
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
