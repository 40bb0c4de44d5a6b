//! Network configuration types for the demo server.

use std::time::Duration;

use axum::http::header::HeaderName;
use reqscope_core::id::REQUEST_ID_HEADER;

/// Top-level network configuration for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
    /// Inbound correlation header adopted as the request id.
    pub request_id_header: HeaderName,
    /// Copy the request id onto every response.
    pub echo_request_id: bool,
    /// Prefer `x-forwarded-for` / `x-real-ip` over the peer address.
    pub trust_forwarded_headers: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            request_id_header: HeaderName::from_static(REQUEST_ID_HEADER),
            echo_request_id: true,
            trust_forwarded_headers: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_config_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 0);
        assert_eq!(config.cors_origins, vec!["*"]);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.request_id_header, "x-request-id");
        assert!(config.echo_request_id);
        assert!(config.trust_forwarded_headers);
    }
}
