//! Global lookups into the current request context.
//!
//! Each accessor reads the binding established by [`crate::scope::run`]
//! and projects out one field. Outside a bound chain they return
//! [`ContextError::NoActiveContext`] naming the accessor; they never fall
//! back to a default.

use std::sync::Arc;

use crate::config::ContextConfig;
use crate::context::RequestContext;
use crate::error::ContextError;
use crate::handles::{AppHandle, RequestHandle, ResponseHandle};
use crate::logger::RequestLogger;
use crate::scope;

fn require(accessor: &'static str) -> Result<Arc<RequestContext>, ContextError> {
    scope::current().ok_or(ContextError::NoActiveContext { accessor })
}

/// The whole current context.
///
/// # Errors
///
/// Returns [`ContextError::NoActiveContext`] when no context is bound.
pub fn context() -> Result<Arc<RequestContext>, ContextError> {
    require("context")
}

/// The application handle of the current request.
///
/// # Errors
///
/// Returns [`ContextError::NoActiveContext`] when no context is bound.
pub fn app() -> Result<AppHandle, ContextError> {
    require("app").map(|ctx| ctx.app().clone())
}

/// The inbound request of the current chain.
///
/// # Errors
///
/// Returns [`ContextError::NoActiveContext`] when no context is bound.
pub fn req() -> Result<Arc<RequestHandle>, ContextError> {
    require("req").map(|ctx| Arc::clone(ctx.req()))
}

/// The response staging handle of the current chain.
///
/// # Errors
///
/// Returns [`ContextError::NoActiveContext`] when no context is bound.
pub fn res() -> Result<Arc<ResponseHandle>, ContextError> {
    require("res").map(|ctx| Arc::clone(ctx.res()))
}

/// The configuration the entry-point layer was built with.
///
/// # Errors
///
/// Returns [`ContextError::NoActiveContext`] when no context is bound.
pub fn config() -> Result<Arc<ContextConfig>, ContextError> {
    require("config").map(|ctx| Arc::clone(ctx.config()))
}

/// The request-bound logger.
///
/// # Errors
///
/// Returns [`ContextError::NoActiveContext`] when no context is bound.
pub fn logger() -> Result<RequestLogger, ContextError> {
    require("logger").map(|ctx| ctx.logger().clone())
}

/// The identifier of the current request.
///
/// # Errors
///
/// Returns [`ContextError::NoActiveContext`] when no context is bound.
pub fn request_id() -> Result<String, ContextError> {
    require("request_id").map(|ctx| ctx.request_id().to_owned())
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, Method, Uri};
    use serde_json::json;

    use super::*;
    use crate::logger::{LoggerFactory, MemorySink};

    struct App {
        version: u32,
    }

    fn ctx(id: &str, sink: &Arc<MemorySink>) -> Arc<RequestContext> {
        Arc::new(RequestContext::with_logger_factory(
            AppHandle::new(App { version: 3 }),
            Arc::new(RequestHandle::new(
                Method::GET,
                Uri::from_static("/accounts/7"),
                HeaderMap::new(),
            )),
            Arc::new(ResponseHandle::new()),
            Arc::new(ContextConfig::new().with("db", "primary")),
            id,
            &LoggerFactory::new(sink.clone()),
        ))
    }

    fn assert_absent<T: std::fmt::Debug>(result: Result<T, ContextError>, accessor: &str) {
        match result {
            Err(ContextError::NoActiveContext { accessor: name }) => assert_eq!(name, accessor),
            other => panic!("expected NoActiveContext for {accessor}, got {other:?}"),
        }
    }

    #[test]
    fn every_accessor_fails_outside_scope() {
        assert_absent(context(), "context");
        assert_absent(app(), "app");
        assert_absent(req(), "req");
        assert_absent(res(), "res");
        assert_absent(config(), "config");
        assert_absent(logger(), "logger");
        assert_absent(request_id(), "request_id");
    }

    #[tokio::test]
    async fn absent_then_present_then_absent() {
        let sink = Arc::new(MemorySink::new());
        assert!(config().is_err());

        scope::run(ctx("r-1", &sink), async {
            tokio::task::yield_now().await;
            assert_eq!(config().unwrap().get("db"), Some(&json!("primary")));
        })
        .await;

        assert!(config().is_err());
    }

    #[tokio::test]
    async fn accessors_project_current_fields() {
        let sink = Arc::new(MemorySink::new());
        let bound = ctx("r-2", &sink);

        scope::run(Arc::clone(&bound), async {
            assert!(Arc::ptr_eq(&context().unwrap(), &bound));
            assert_eq!(app().unwrap().downcast_ref::<App>().unwrap().version, 3);
            assert_eq!(req().unwrap().url(), "/accounts/7");
            assert!(Arc::ptr_eq(&res().unwrap(), bound.res()));
            assert_eq!(request_id().unwrap(), "r-2");

            logger().unwrap().info_with("loaded account", json!({"account": 7}));

            context().unwrap().set_metadata("seen", true);
        })
        .await;

        assert_eq!(bound.get_metadata("seen"), Some(json!(true)));
        let record = &sink.records()[0];
        assert_eq!(record.fields["requestId"], "r-2");
        assert_eq!(record.fields["account"], 7);
    }

    #[tokio::test]
    async fn interleaved_chains_see_their_own_fields() {
        let sink = Arc::new(MemorySink::new());

        let chain = |label: &'static str| async move {
            for _ in 0..5 {
                tokio::task::yield_now().await;
                assert_eq!(request_id().unwrap(), label);
                context().unwrap().set_metadata("owner", label);
                tokio::task::yield_now().await;
                assert_eq!(
                    context().unwrap().get_metadata_as::<String>("owner").as_deref(),
                    Some(label)
                );
            }
        };

        let a = ctx("A", &sink);
        let b = ctx("B", &sink);
        tokio::join!(
            scope::run(Arc::clone(&a), chain("A")),
            scope::run(Arc::clone(&b), chain("B")),
        );

        assert_eq!(a.get_metadata("owner"), Some(json!("A")));
        assert_eq!(b.get_metadata("owner"), Some(json!("B")));
    }
}
