//! Entry-point layer that binds a [`RequestContext`] to each request.
//!
//! For every inbound request the service resolves a request id, builds a
//! context from the request line, headers, peer address, the layer's
//! application handle and configuration, and then runs the inner service
//! (both its synchronous `call` and the returned future) with that context
//! bound. It performs no fallible work itself: inner errors are returned
//! unchanged.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::ConnectInfo;
use http::header::{HeaderName, HeaderValue};
use http::{Request, Response};
use reqscope_core::id::{resolve_request_id, REQUEST_ID_HEADER};
use reqscope_core::{
    scope, AppHandle, ContextConfig, LoggerFactory, RequestContext, RequestHandle,
    ResponseHandle,
};
use tower::{Layer, Service};

// ---------------------------------------------------------------------------
// ContextLayer
// ---------------------------------------------------------------------------

/// Tower layer that scopes every request in its own [`RequestContext`].
#[derive(Debug, Clone)]
pub struct ContextLayer {
    app: AppHandle,
    config: Arc<ContextConfig>,
    header_name: HeaderName,
    echo_request_id: bool,
    trust_forwarded: bool,
    loggers: LoggerFactory,
}

impl ContextLayer {
    /// Creates a layer that hands `config` to every context.
    ///
    /// Defaults: empty application handle, `x-request-id` correlation
    /// header echoed on responses, loggers emitting through `tracing`.
    #[must_use]
    pub fn new(config: ContextConfig) -> Self {
        Self {
            app: AppHandle::empty(),
            config: Arc::new(config),
            header_name: HeaderName::from_static(REQUEST_ID_HEADER),
            echo_request_id: true,
            trust_forwarded: true,
            loggers: LoggerFactory::default(),
        }
    }

    #[must_use]
    pub fn with_app(mut self, app: AppHandle) -> Self {
        self.app = app;
        self
    }

    /// Sets the inbound correlation header (also used for the echo).
    #[must_use]
    pub fn with_header_name(mut self, header_name: HeaderName) -> Self {
        self.header_name = header_name;
        self
    }

    #[must_use]
    pub fn with_logger_factory(mut self, loggers: LoggerFactory) -> Self {
        self.loggers = loggers;
        self
    }

    /// Whether the request id is copied onto the response.
    #[must_use]
    pub fn echo_request_id(mut self, enabled: bool) -> Self {
        self.echo_request_id = enabled;
        self
    }

    /// Whether `x-forwarded-for` / `x-real-ip` may override the peer
    /// address as the client address. Disable when not behind a proxy that
    /// overwrites these headers, since clients can set them freely.
    #[must_use]
    pub fn trust_forwarded_headers(mut self, enabled: bool) -> Self {
        self.trust_forwarded = enabled;
        self
    }

    #[must_use]
    pub fn config(&self) -> &Arc<ContextConfig> {
        &self.config
    }

    fn context_for<B>(&self, req: &Request<B>) -> Arc<RequestContext> {
        let request_id = resolve_request_id(req.headers(), self.header_name.as_str());
        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let handle = RequestHandle::new(
            req.method().clone(),
            req.uri().clone(),
            req.headers().clone(),
        )
        .with_version(req.version())
        .with_remote_addr(remote_addr)
        .with_trusted_forwarding(self.trust_forwarded);

        Arc::new(RequestContext::with_logger_factory(
            self.app.clone(),
            Arc::new(handle),
            Arc::new(ResponseHandle::new()),
            Arc::clone(&self.config),
            request_id,
            &self.loggers,
        ))
    }
}

impl Default for ContextLayer {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

impl<S> Layer<S> for ContextLayer {
    type Service = ContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ContextService {
            inner,
            layer: self.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContextService
// ---------------------------------------------------------------------------

/// Service wrapper produced by [`ContextLayer`].
#[derive(Debug, Clone)]
pub struct ContextService<S> {
    inner: S,
    layer: ContextLayer,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ContextService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<ResBody>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let ctx = self.layer.context_for(&req);
        req.extensions_mut().insert(Arc::clone(&ctx));

        tracing::debug!(request_id = ctx.request_id(), "request context bound");

        let echo = if self.layer.echo_request_id {
            HeaderValue::from_bytes(ctx.request_id().as_bytes())
                .ok()
                .map(|value| (self.layer.header_name.clone(), value))
        } else {
            None
        };
        let staged = Arc::clone(ctx.res());

        let inner = &mut self.inner;
        let fut = scope::run_sync(Arc::clone(&ctx), || inner.call(req));
        let fut = scope::run(ctx, fut);

        Box::pin(async move {
            let mut response = fut.await?;
            staged.apply(&mut response);
            if let Some((name, value)) = echo {
                response.headers_mut().entry(name).or_insert(value);
            }
            Ok::<_, S::Error>(response)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
