// File: src/handler.rs
// Purpose: Handler capability and adapters for async and blocking functions

use axum::http::StatusCode;
use futures::future::{self, BoxFuture};
use std::future::Future;
use std::sync::Arc;

use crate::{RequestContext, Response};

/// What every handler eventually produces
pub type HandlerResult = anyhow::Result<Response>;

/// Boxed future returned by [`Handler::call`]
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

/// A callable that accepts a request context and produces a response or fails
///
/// Async and blocking functions are both adapted into this one shape, see
/// [`handler_fn`] and [`blocking_fn`].
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: RequestContext) -> HandlerFuture;
}

/// Shared, type-erased handler stored in the route table
pub type BoxedHandler = Arc<dyn Handler>;

impl Handler for BoxedHandler {
    fn call(&self, ctx: RequestContext) -> HandlerFuture {
        (**self).call(ctx)
    }
}

/// Conversion from a handler's return value into a [`HandlerResult`]
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for Response {
    fn into_handler_result(self) -> HandlerResult {
        Ok(self)
    }
}

impl IntoHandlerResult for String {
    fn into_handler_result(self) -> HandlerResult {
        Ok(Response::html(self))
    }
}

impl IntoHandlerResult for &'static str {
    fn into_handler_result(self) -> HandlerResult {
        Ok(Response::html(self))
    }
}

impl IntoHandlerResult for serde_json::Value {
    fn into_handler_result(self) -> HandlerResult {
        Ok(Response::json(&self))
    }
}

impl IntoHandlerResult for (StatusCode, String) {
    fn into_handler_result(self) -> HandlerResult {
        Ok(Response::text(self.1).with_status(self.0))
    }
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
    T: IntoHandlerResult,
    E: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> HandlerResult {
        match self {
            Ok(value) => value.into_handler_result(),
            Err(err) => Err(err.into()),
        }
    }
}

/// Handler backed by an async function or closure
pub struct FnHandler<F> {
    f: F,
}

impl<F, Fut, R> Handler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult,
{
    fn call(&self, ctx: RequestContext) -> HandlerFuture {
        let fut = (self.f)(ctx);
        Box::pin(async move { fut.await.into_handler_result() })
    }
}

/// Wraps an async function as a [`Handler`]
///
/// ```
/// use jsweb::{handler_fn, RequestContext};
///
/// let handler = handler_fn(|ctx: RequestContext| async move {
///     format!("user {}", ctx.params.int("id").unwrap_or_default())
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut, R>(f: F) -> FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult,
{
    FnHandler { f }
}

/// Handler backed by a function that completes immediately
///
/// The function runs inline when the handler is called; the returned future
/// is already resolved.
pub struct BlockingHandler<F> {
    f: F,
}

impl<F, R> Handler for BlockingHandler<F>
where
    F: Fn(RequestContext) -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
    fn call(&self, ctx: RequestContext) -> HandlerFuture {
        Box::pin(future::ready((self.f)(ctx).into_handler_result()))
    }
}

/// Wraps a plain function as a [`Handler`]
pub fn blocking_fn<F, R>(f: F) -> BlockingHandler<F>
where
    F: Fn(RequestContext) -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
    BlockingHandler { f }
}

/// Headers added by [`never_cache`]
pub const NEVER_CACHE_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-store, no-cache, must-revalidate, max-age=0"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

/// Handler wrapper that forbids caching of successful responses
pub struct NeverCache<H> {
    inner: H,
}

impl<H: Handler> Handler for NeverCache<H> {
    fn call(&self, ctx: RequestContext) -> HandlerFuture {
        let fut = self.inner.call(ctx);
        Box::pin(async move {
            let response = fut.await?;
            Ok(NEVER_CACHE_HEADERS
                .iter()
                .fold(response, |response, (name, value)| response.with_header(name, value)))
        })
    }
}

/// Marks every response of `handler` as uncacheable
pub fn never_cache<H: Handler>(handler: H) -> NeverCache<H> {
    NeverCache { inner: handler }
}
