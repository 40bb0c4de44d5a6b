//! Task-scoped binding of the current [`RequestContext`].
//!
//! The binding is a tokio task-local: it is installed for every poll of the
//! future passed to [`run`], so it survives `.await` suspension points and
//! is invisible to every other task, however their polls interleave on the
//! same thread. Nested [`run`] calls shadow the outer binding for their
//! extent and restore it afterwards.
//!
//! Tokio does not inherit task-locals into spawned tasks. Continuations that
//! should stay in the request chain go through [`bind`], [`spawn`], or
//! [`spawn_local`], which capture the binding current at the call site.

use std::future::Future;
use std::sync::Arc;

use tokio::task::futures::TaskLocalFuture;
use tokio::task::JoinHandle;

use crate::context::RequestContext;

tokio::task_local! {
    static CURRENT: Arc<RequestContext>;
}

/// Returns the context bound to the calling chain, or `None`.
#[must_use]
pub fn current() -> Option<Arc<RequestContext>> {
    CURRENT.try_with(Arc::clone).ok()
}

/// Runs `fut` with `ctx` bound as the current context.
pub fn run<F>(ctx: Arc<RequestContext>, fut: F) -> TaskLocalFuture<Arc<RequestContext>, F>
where
    F: Future,
{
    CURRENT.scope(ctx, fut)
}

/// Runs `f` synchronously with `ctx` bound as the current context.
pub fn run_sync<F, R>(ctx: Arc<RequestContext>, f: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT.sync_scope(ctx, f)
}

/// Wraps `fut` so it runs under the context current at this call, if any.
///
/// The binding is captured eagerly, so the returned future can be handed
/// to any executor or spawned later.
pub fn bind<F>(fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    let ctx = current();
    async move {
        match ctx {
            Some(ctx) => CURRENT.scope(ctx, fut).await,
            None => fut.await,
        }
    }
}

/// Spawns `fut` on the tokio runtime, carrying the current binding along.
pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(bind(fut))
}

/// Spawns a `!Send` future on the current `LocalSet`, carrying the current
/// binding along.
///
/// # Panics
///
/// Panics if called outside a `tokio::task::LocalSet`.
pub fn spawn_local<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    tokio::task::spawn_local(bind(fut))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::{HeaderMap, Method, Uri};

    use super::*;
    use crate::config::ContextConfig;
    use crate::handles::{AppHandle, RequestHandle, ResponseHandle};

    fn ctx(id: &str) -> Arc<RequestContext> {
        Arc::new(RequestContext::new(
            AppHandle::empty(),
            Arc::new(RequestHandle::new(
                Method::GET,
                Uri::from_static("/"),
                HeaderMap::new(),
            )),
            Arc::new(ResponseHandle::new()),
            Arc::new(ContextConfig::new()),
            id,
        ))
    }

    fn current_id() -> Option<String> {
        current().map(|c| c.request_id().to_owned())
    }

    #[tokio::test]
    async fn current_is_none_outside_run() {
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn run_binds_across_await_points() {
        let observed = run(ctx("a"), async {
            let before = current_id();
            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
            (before, current_id())
        })
        .await;

        assert_eq!(observed.0.as_deref(), Some("a"));
        assert_eq!(observed.1.as_deref(), Some("a"));
        assert!(current().is_none());
    }

    #[test]
    fn run_sync_binds_for_closure_extent() {
        assert!(current().is_none());
        let seen = run_sync(ctx("sync"), current_id);
        assert_eq!(seen.as_deref(), Some("sync"));
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn nested_run_shadows_then_restores() {
        run(ctx("outer"), async {
            assert_eq!(current_id().as_deref(), Some("outer"));

            run(ctx("inner"), async {
                tokio::task::yield_now().await;
                assert_eq!(current_id().as_deref(), Some("inner"));
            })
            .await;

            tokio::task::yield_now().await;
            assert_eq!(current_id().as_deref(), Some("outer"));

            let inner_sync = run_sync(ctx("inner-sync"), current_id);
            assert_eq!(inner_sync.as_deref(), Some("inner-sync"));
            assert_eq!(current_id().as_deref(), Some("outer"));
        })
        .await;
    }

    #[tokio::test]
    async fn interleaved_chains_are_isolated() {
        async fn chain(id: &'static str, steps: u64) -> Vec<String> {
            let mut seen = Vec::new();
            for step in 0..steps {
                tokio::time::sleep(Duration::from_millis(step % 3)).await;
                seen.push(current_id().unwrap_or_default());
                if let Some(c) = current() {
                    c.set_metadata("last_step", step);
                    assert_eq!(c.get_metadata_as::<u64>("last_step"), Some(step));
                }
                tokio::task::yield_now().await;
            }
            seen.push(id.to_owned());
            seen
        }

        let (a, b) = tokio::join!(run(ctx("A"), chain("A", 8)), run(ctx("B"), chain("B", 8)));

        assert!(a.iter().all(|id| id == "A"), "chain A saw {a:?}");
        assert!(b.iter().all(|id| id == "B"), "chain B saw {b:?}");
    }

    #[tokio::test]
    async fn plain_spawn_does_not_inherit_binding() {
        let seen = run(ctx("parent"), async {
            tokio::spawn(async { current_id() }).await.unwrap()
        })
        .await;
        assert!(seen.is_none());
    }

    #[tokio::test]
    async fn spawn_carries_binding_into_continuation() {
        let seen = run(ctx("parent"), async {
            spawn(async {
                tokio::time::sleep(Duration::from_millis(2)).await;
                current_id()
            })
            .await
            .unwrap()
        })
        .await;
        assert_eq!(seen.as_deref(), Some("parent"));
    }

    #[tokio::test]
    async fn spawned_continuation_outlives_run() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        run(ctx("detached"), async move {
            spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                let _ = tx.send(current_id());
            });
        })
        .await;

        assert!(current().is_none());
        assert_eq!(rx.await.unwrap().as_deref(), Some("detached"));
    }

    #[tokio::test]
    async fn bind_without_binding_runs_unscoped() {
        let seen = bind(async { current_id() }).await;
        assert!(seen.is_none());
    }

    #[tokio::test]
    async fn spawn_local_carries_binding() {
        let local = tokio::task::LocalSet::new();
        let seen = local
            .run_until(run(ctx("local"), async {
                spawn_local(async { current_id() }).await.unwrap()
            }))
            .await;
        assert_eq!(seen.as_deref(), Some("local"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn isolation_holds_on_multi_thread_runtime() {
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let id = format!("req-{i}");
                let c = ctx(&id);
                tokio::spawn(run(c, async move {
                    for _ in 0..10 {
                        tokio::task::yield_now().await;
                        assert_eq!(current_id().as_deref(), Some(id.as_str()));
                    }
                    id
                }))
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), format!("req-{i}"));
        }
    }
}
