//! Handler invocation.
//!
//! # Responsibilities
//! - Run one matched handler for one request
//! - Treat blocking and suspending handlers the same way
//! - Turn returned errors and panics into a [`HandlerFailure`]
//!
//! # Design Decisions
//! - States move `Pending → Invoking → Completed | Failed`, once each
//! - A suspended handler yields to the runtime; nothing here blocks a worker
//! - Dropping the dispatch future cancels the handler at its next `.await`

use futures::FutureExt;
use jsweb_router::{Method, Route, RouteId};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::handler::{BoxedHandler, Handler};
use crate::{RequestContext, Response};

/// Lifecycle of a single dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Pending,
    Invoking,
    Completed,
    Failed,
}

impl DispatchState {
    pub fn is_finished(&self) -> bool {
        matches!(self, DispatchState::Completed | DispatchState::Failed)
    }
}

/// How a handler failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The handler panicked
    Panicked,
    /// The handler returned an error
    Errored,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Panicked => f.write_str("panicked"),
            FailureKind::Errored => f.write_str("returned an error"),
        }
    }
}

/// Structured report of a failed handler
///
/// `message` is the rendered error chain or panic payload. For a returned
/// error the original value is kept in `error` and exposed as the
/// [`source`](std::error::Error::source), so callers can downcast it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("handler for {method} {path} (route {route} `{pattern}`) {kind}: {message}")]
pub struct HandlerFailure {
    pub kind: FailureKind,
    pub route: RouteId,
    pub pattern: String,
    pub method: Method,
    pub path: String,
    /// Error chain or panic payload
    pub message: String,
    /// The error the handler returned; `None` for panics
    #[source]
    pub error: Option<HandlerError>,
}

impl HandlerFailure {
    /// The handler's error as `E`, if that is what it returned
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.as_ref()?.downcast_ref::<E>()
    }
}

/// Shared handle to the error a handler returned
///
/// Displays as the error itself and continues its source chain. Two handles
/// are equal when they point at the same error.
#[derive(Debug, Clone)]
pub struct HandlerError(Arc<anyhow::Error>);

impl HandlerError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl std::ops::Deref for HandlerError {
    type Target = anyhow::Error;

    fn deref(&self) -> &anyhow::Error {
        &self.0
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&**self.0)
    }
}

impl PartialEq for HandlerError {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for HandlerError {}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }
}

/// One pending handler invocation
///
/// # Examples
///
/// ```
/// use jsweb::{blocking_fn, BoxedHandler, Config, Dispatch, DispatchState, RequestContext};
/// use jsweb_router::{Method, RouteTable};
/// use std::sync::Arc;
///
/// # tokio_test(async {
/// let mut table: RouteTable<BoxedHandler> = RouteTable::new();
/// table.register("/ping", &[Method::Get], Arc::new(blocking_fn(|_| "pong"))).unwrap();
///
/// let found = table.match_route(&Method::Get, "/ping").into_match().unwrap();
/// let ctx = RequestContext::new(Method::Get, "/ping", Default::default(), Default::default(), Arc::new(Config::default()));
///
/// let dispatch = Dispatch::new(found.route, ctx);
/// let state = dispatch.subscribe();
/// assert_eq!(dispatch.state(), DispatchState::Pending);
///
/// let response = dispatch.run().await.unwrap();
/// assert_eq!(response.text_body(), "pong");
/// assert_eq!(*state.borrow(), DispatchState::Completed);
/// # });
/// # fn tokio_test<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct Dispatch {
    handler: BoxedHandler,
    ctx: RequestContext,
    route: RouteId,
    pattern: String,
    state: watch::Sender<DispatchState>,
}

impl Dispatch {
    /// Prepares a dispatch of `route`'s handler; `ctx` should already carry
    /// the extracted parameters
    pub fn new(route: &Route<BoxedHandler>, ctx: RequestContext) -> Self {
        Self {
            handler: route.handler().clone(),
            ctx,
            route: route.id(),
            pattern: route.source().to_string(),
            state: watch::Sender::new(DispatchState::Pending),
        }
    }

    pub fn state(&self) -> DispatchState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition
    pub fn subscribe(&self) -> watch::Receiver<DispatchState> {
        self.state.subscribe()
    }

    /// Invokes the handler and waits for its result
    ///
    /// Never panics on behalf of the handler: both returned errors and panics
    /// come back as a [`HandlerFailure`].
    pub async fn run(self) -> Result<Response, HandlerFailure> {
        let Dispatch {
            handler,
            ctx,
            route,
            pattern,
            state,
        } = self;
        let method = ctx.method.clone();
        let path = ctx.path.clone();

        state.send_replace(DispatchState::Invoking);
        trace!(route = %route, "invoking handler");

        // Blocking handlers do their work inside `call`, so it needs its own guard
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| handler.call(ctx))) {
            Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
            Err(payload) => Err(payload),
        };

        let failure = |kind, message, error| HandlerFailure {
            kind,
            route,
            pattern: pattern.clone(),
            method: method.clone(),
            path: path.clone(),
            message,
            error,
        };
        let result = match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(failure(
                FailureKind::Errored,
                format!("{:#}", err),
                Some(HandlerError::from(err)),
            )),
            Err(payload) => Err(failure(
                FailureKind::Panicked,
                panic_message(payload.as_ref()),
                None,
            )),
        };

        let finished = if result.is_ok() {
            DispatchState::Completed
        } else {
            DispatchState::Failed
        };
        state.send_replace(finished);
        debug!(route = %route, state = ?finished, "dispatch finished");

        result
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("route", &self.route)
            .field("pattern", &self.pattern)
            .field("state", &self.state())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Runs the handler of a matched route with the given context
pub async fn dispatch(
    route: &Route<BoxedHandler>,
    ctx: RequestContext,
) -> Result<Response, HandlerFailure> {
    Dispatch::new(route, ctx).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{blocking_fn, handler_fn};
    use crate::Config;
    use axum::body::Bytes;
    use axum::http::HeaderMap;
    use jsweb_router::RouteTable;
    use std::sync::Arc;

    fn table_with(handler: BoxedHandler) -> RouteTable<BoxedHandler> {
        let mut table = RouteTable::new();
        table.register("/items/<id:int>", &[Method::Get], handler).unwrap();
        table
    }

    fn ctx_for(table: &RouteTable<BoxedHandler>, path: &str) -> (RequestContext, RouteId) {
        let found = table.match_route(&Method::Get, path).into_match().unwrap();
        let ctx = RequestContext::new(
            Method::Get,
            path,
            HeaderMap::new(),
            Bytes::new(),
            Arc::new(Config::for_testing()),
        )
        .with_params(found.params);
        (ctx, found.route.id())
    }

    #[tokio::test]
    async fn test_completed() {
        let table = table_with(Arc::new(handler_fn(|ctx: RequestContext| async move {
            format!("item {}", ctx.params.int("id").unwrap_or_default())
        })));
        let (ctx, id) = ctx_for(&table, "/items/7");

        let dispatch = Dispatch::new(table.get(id).unwrap(), ctx);
        let state = dispatch.subscribe();
        assert_eq!(dispatch.state(), DispatchState::Pending);

        let response = dispatch.run().await.unwrap();
        assert_eq!(response.text_body(), "item 7");
        assert_eq!(*state.borrow(), DispatchState::Completed);
    }

    #[tokio::test]
    async fn test_errored() {
        let table = table_with(Arc::new(blocking_fn(|_ctx| -> anyhow::Result<Response> {
            Err(anyhow::anyhow!("db down").context("loading item"))
        })));
        let (ctx, id) = ctx_for(&table, "/items/1");

        let dispatch = Dispatch::new(table.get(id).unwrap(), ctx);
        let state = dispatch.subscribe();
        let failure = dispatch.run().await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Errored);
        assert_eq!(failure.message, "loading item: db down");
        assert_eq!(failure.pattern, "/items/<id:int>");
        assert_eq!(failure.path, "/items/1");
        assert_eq!(failure.method, Method::Get);
        assert_eq!(*state.borrow(), DispatchState::Failed);
    }

    #[tokio::test]
    async fn test_blocking_panic_is_caught() {
        let table = table_with(Arc::new(blocking_fn(|_ctx| -> &'static str {
            panic!("sync handler exploded")
        })));
        let (ctx, id) = ctx_for(&table, "/items/1");

        let failure = dispatch(table.get(id).unwrap(), ctx).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Panicked);
        assert_eq!(failure.message, "sync handler exploded");
        assert!(failure.error.is_none());
        assert!(std::error::Error::source(&failure).is_none());
    }

    #[derive(Debug, PartialEq)]
    struct Teapot {
        brew: &'static str,
    }

    impl fmt::Display for Teapot {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "cannot brew {}", self.brew)
        }
    }

    impl std::error::Error for Teapot {}

    #[tokio::test]
    async fn test_original_error_is_kept() {
        let table = table_with(Arc::new(handler_fn(|_ctx: RequestContext| async {
            Err::<Response, _>(anyhow::Error::new(Teapot { brew: "coffee" }))
        })));
        let (ctx, id) = ctx_for(&table, "/items/1");

        let failure = dispatch(table.get(id).unwrap(), ctx).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Errored);
        assert_eq!(failure.message, "cannot brew coffee");
        assert_eq!(failure.downcast_ref::<Teapot>(), Some(&Teapot { brew: "coffee" }));

        let source = std::error::Error::source(&failure).unwrap();
        assert_eq!(source.to_string(), "cannot brew coffee");

        // Clones share the same error
        assert_eq!(failure.clone(), failure);
    }

    #[tokio::test]
    async fn test_async_panic_is_caught() {
        let table = table_with(Arc::new(handler_fn(|ctx: RequestContext| async move {
            tokio::task::yield_now().await;
            if ctx.params.int("id") == Some(13) {
                panic!("unlucky item {}", 13);
            }
            "fine"
        })));
        let (ctx, id) = ctx_for(&table, "/items/13");

        let failure = dispatch(table.get(id).unwrap(), ctx).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Panicked);
        assert_eq!(failure.message, "unlucky item 13");
        assert!(failure.to_string().contains("panicked"));
    }

    #[tokio::test]
    async fn test_dropping_future_cancels_handler() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let tx = std::sync::Mutex::new(Some(tx));
        let table = table_with(Arc::new(handler_fn(move |_ctx: RequestContext| {
            let guard = tx.lock().unwrap().take();
            async move {
                let _guard = guard;
                futures::future::pending::<()>().await;
                "unreachable"
            }
        })));
        let (ctx, id) = ctx_for(&table, "/items/1");

        let dispatch = Dispatch::new(table.get(id).unwrap(), ctx);
        let state = dispatch.subscribe();
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), dispatch.run()).await;

        assert!(timed_out.is_err());
        assert_eq!(*state.borrow(), DispatchState::Invoking);
        // The handler's captured sender was dropped along with the future
        assert!(rx.await.is_err());
    }
}
