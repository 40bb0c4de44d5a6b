//! Axum extractor for the request context bound by [`super::ContextLayer`].

use std::ops::Deref;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use reqscope_core::{accessors, RequestContext};

use crate::error::ApiError;

/// The current request's context, extracted in a handler signature.
///
/// Reads the context the layer stored in the request extensions and falls
/// back to the task-scoped binding. Rejects with [`ApiError`] (500) when the
/// route is not behind the layer.
#[derive(Debug, Clone)]
pub struct Ctx(pub Arc<RequestContext>);

impl Deref for Ctx {
    type Target = RequestContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<Arc<RequestContext>>() {
            return Ok(Self(Arc::clone(ctx)));
        }
        Ok(Self(accessors::context()?))
    }
}
