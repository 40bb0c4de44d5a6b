//! HTTP-facing error type for handlers that use ambient request state.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqscope_core::ContextError;
use serde_json::json;

/// Errors returned by handlers and extractors in this crate.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Ambient state was requested outside a bound request chain. This is
    /// a wiring bug (the route is not behind `ContextLayer`), reported as 500.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let status = match self {
            Self::Context(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn context_error_maps_to_500_with_json_body() {
        let err = ApiError::from(ContextError::NoActiveContext { accessor: "req" });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().contains("`req()`"));
    }
}
