//! Network module with deferred startup lifecycle.
//!
//! `new()` captures configuration, `start()` binds the TCP listener, and
//! `serve()` starts accepting connections. Splitting bind from serve lets
//! the caller learn the OS-assigned port before traffic flows.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use reqscope_core::{AppHandle, ContextConfig};
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{health_handler, whoami_handler, AppState};
use super::middleware::build_http_layers;
use crate::middleware::ContextLayer;

/// Manages the HTTP server lifecycle.
///
/// 1. `new()` -- stores network and request-context configuration
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    context_config: ContextConfig,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    ///
    /// `context_config` is handed verbatim to every request context.
    #[must_use]
    pub fn new(config: NetworkConfig, context_config: ContextConfig) -> Self {
        Self {
            config,
            context_config,
            listener: None,
        }
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health` -- status, uptime, and correlation settings JSON
    /// - `GET /whoami` -- request introspection via ambient accessors
    pub fn build_router(&self) -> Router {
        let state = AppState {
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        };

        let context = ContextLayer::new(self.context_config.clone())
            .with_app(AppHandle::new(state.clone()))
            .with_header_name(self.config.request_id_header.clone())
            .echo_request_id(self.config.echo_request_id)
            .trust_forwarded_headers(self.config.trust_forwarded_headers);

        let layers = build_http_layers(&self.config, context);

        Router::new()
            .route("/health", get(health_handler))
            .route("/whoami", get(whoami_handler))
            .layer(layers)
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until the shutdown future resolves, then waits
    /// for in-flight requests to finish.
    ///
    /// Peer addresses are recorded as `ConnectInfo<SocketAddr>` so request
    /// contexts can fall back to them for the client address.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, or if the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;

        info!("Serving HTTP connections");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!("Server stopped");
        Ok(())
    }
}
