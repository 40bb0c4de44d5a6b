//! Introspection endpoint built entirely from ambient request state.
//!
//! The handler takes no extractors: everything it reports is looked up
//! through `reqscope_core::accessors`, including from a spawned task.

use axum::http::header::{HeaderName, HeaderValue};
use axum::Json;
use reqscope_core::{accessors, scope};
use serde_json::{json, Value};

use super::AppState;
use crate::error::ApiError;

/// Response header staged through the response handle.
pub const HANDLED_BY_HEADER: &str = "x-handled-by";

/// Describes the current request: identity, origin, timing, configuration,
/// and metadata.
///
/// # Errors
///
/// Returns [`ApiError::Context`] when the route is not behind `ContextLayer`.
pub async fn whoami_handler() -> Result<Json<Value>, ApiError> {
    let ctx = accessors::context()?;
    let req = accessors::req()?;
    let config = accessors::config()?;

    ctx.set_metadata("handler", "whoami");
    tag_response()?;

    // The spawned task is a separate tokio task; `scope::spawn` keeps it
    // inside this request's chain.
    let continuation_request_id = scope::spawn(async { accessors::request_id().ok() })
        .await
        .ok()
        .flatten();

    let uptime_secs = accessors::app()?
        .downcast_ref::<AppState>()
        .map(|state| state.start_time.elapsed().as_secs());

    #[allow(clippy::cast_possible_truncation)]
    let elapsed_ms = ctx.elapsed_time().as_millis() as u64;

    accessors::logger()?.info_with(
        "whoami served",
        json!({ "elapsedMs": elapsed_ms, "continuation": continuation_request_id }),
    );

    Ok(Json(json!({
        "request_id": ctx.request_id(),
        "method": req.method().as_str(),
        "url": req.url(),
        "ip": req.client_ip(),
        "elapsed_ms": elapsed_ms,
        "config": config.as_map(),
        "metadata": ctx.get_all_metadata(),
        "continuation_request_id": continuation_request_id,
        "uptime_secs": uptime_secs,
    })))
}

/// Stages the `x-handled-by` header without being handed the response.
fn tag_response() -> Result<(), ApiError> {
    accessors::res()?.set_header(
        HeaderName::from_static(HANDLED_BY_HEADER),
        HeaderValue::from_static("whoami"),
    );
    Ok(())
}
