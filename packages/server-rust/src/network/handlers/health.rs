//! Health endpoint handler.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Returns liveness information and the correlation settings requests are
/// handled with.
///
/// Reads the uptime from `State` rather than the ambient context, so it
/// keeps working for routes mounted outside the context layer.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let uptime_secs = state.start_time.elapsed().as_secs();

    Json(json!({
        "status": "ok",
        "uptime_secs": uptime_secs,
        "request_id_header": state.config.request_id_header.as_str(),
        "request_timeout_secs": state.config.request_timeout.as_secs(),
    }))
}
