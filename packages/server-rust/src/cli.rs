//! Command-line interface of the demo server.

use std::time::Duration;

use anyhow::Context as _;
use axum::http::header::HeaderName;
use clap::Parser;
use reqscope_core::id::REQUEST_ID_HEADER;
use reqscope_core::ContextConfig;
use serde_json::Value;

use crate::network::NetworkConfig;
use crate::telemetry::LogFormat;

/// Demo HTTP server whose handlers read request state ambiently.
#[derive(Debug, Parser)]
#[command(name = "reqscope-demo", version, about)]
pub struct Cli {
    /// Bind address.
    #[arg(long, env = "REQSCOPE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on (0 = OS-assigned).
    #[arg(long, env = "REQSCOPE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Maximum request processing time in seconds.
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Inbound correlation header adopted as the request id.
    #[arg(long, default_value = REQUEST_ID_HEADER)]
    pub request_id_header: String,

    /// Do not copy the request id onto responses.
    #[arg(long)]
    pub no_echo_request_id: bool,

    /// Use the peer address as the client address even when
    /// `x-forwarded-for` or `x-real-ip` is present.
    #[arg(long)]
    pub no_trust_forwarded: bool,

    /// Allowed CORS origin; repeatable. `*` allows any origin.
    #[arg(long = "cors-origin", value_name = "ORIGIN", default_value = "*")]
    pub cors_origins: Vec<String>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "REQSCOPE_LOG", default_value = "info")]
    pub log_filter: String,

    /// Request-context configuration entry; repeatable. Values that parse
    /// as JSON are stored as JSON, anything else as a string.
    #[arg(long = "config", value_name = "KEY=VALUE", value_parser = parse_config_entry)]
    pub config: Vec<(String, Value)>,
}

impl Cli {
    /// Network settings derived from the flags.
    ///
    /// # Errors
    ///
    /// Returns an error if `--request-id-header` is not a valid header name.
    pub fn network_config(&self) -> anyhow::Result<NetworkConfig> {
        let request_id_header = HeaderName::from_bytes(self.request_id_header.as_bytes())
            .with_context(|| format!("invalid header name {:?}", self.request_id_header))?;

        Ok(NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            request_id_header,
            echo_request_id: !self.no_echo_request_id,
            trust_forwarded_headers: !self.no_trust_forwarded,
            cors_origins: self.cors_origins.clone(),
            ..NetworkConfig::default()
        })
    }

    /// The configuration handed to every request context.
    #[must_use]
    pub fn context_config(&self) -> ContextConfig {
        self.config.iter().cloned().collect()
    }
}

/// Parses one `KEY=VALUE` pair.
///
/// # Errors
///
/// Returns a message when `=` is missing or the key is empty.
pub fn parse_config_entry(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}
