//! Request pipeline around routing.
//!
//! # Responsibilities
//! - Run application-wide layers before a request reaches the route table
//! - Let a layer answer on its own or pass the request on through [`Next`]
//!
//! # Design Decisions
//! - Layers run in the order they were added; the first added is outermost
//! - The end of the chain is static file lookup followed by routing and dispatch
//! - Layers see the request before matching, so `params` is still empty

use futures::future::{self, BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::debug;

use crate::app::{App, Outcome};
use crate::{RequestContext, Response};

/// A layer wrapped around every request of an [`App`]
///
/// ```
/// use futures::future::{BoxFuture, FutureExt};
/// use jsweb::{App, Config, Middleware, Next, Outcome, RequestContext};
///
/// struct ServerHeader;
///
/// impl Middleware for ServerHeader {
///     fn call<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Outcome> {
///         async move {
///             match next.run(ctx).await {
///                 Outcome::Response(response) => {
///                     Outcome::Response(response.with_header("Server", "jsweb"))
///                 }
///                 other => other,
///             }
///         }
///         .boxed()
///     }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let mut app = App::new(Config::default());
/// app.add_middleware(ServerHeader).unwrap();
/// app.get("/", |_ctx| async { "home" }).unwrap();
///
/// let outcome = app.handle_request("GET", "/", Default::default(), Default::default()).await;
/// assert_eq!(outcome.response().unwrap().header("server"), Some("jsweb"));
/// # });
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Outcome>;
}

pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The rest of the pipeline after the current layer
pub struct Next<'a> {
    app: &'a App,
    chain: &'a [BoxedMiddleware],
}

impl<'a> Next<'a> {
    pub(crate) fn new(app: &'a App, chain: &'a [BoxedMiddleware]) -> Self {
        Self { app, chain }
    }

    /// Passes the request to the next layer, or to routing after the last one
    pub fn run(self, ctx: RequestContext) -> BoxFuture<'a, Outcome> {
        match self.chain.split_first() {
            Some((layer, rest)) => layer.call(ctx, Next::new(self.app, rest)),
            None => self.app.serve(ctx).boxed(),
        }
    }
}

/// Layer built from a function that may answer a request before routing
///
/// Returning `None` lets the request continue.
pub struct BeforeRequest<F> {
    f: F,
}

/// Wraps `f` as a [`Middleware`] that runs before routing
///
/// ```
/// use jsweb::{before_request, App, Config, Response, StatusCode};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let mut app = App::new(Config::default());
/// app.add_middleware(before_request(|ctx| {
///     ctx.get_header("authorization")
///         .is_none()
///         .then(|| Response::text("login required").with_status(StatusCode::UNAUTHORIZED))
/// }))
/// .unwrap();
/// app.get("/", |_ctx| async { "home" }).unwrap();
///
/// let outcome = app.handle_request("GET", "/", Default::default(), Default::default()).await;
/// assert_eq!(outcome.status(), StatusCode::UNAUTHORIZED);
/// # });
/// ```
pub fn before_request<F>(f: F) -> BeforeRequest<F>
where
    F: Fn(&RequestContext) -> Option<Response> + Send + Sync + 'static,
{
    BeforeRequest { f }
}

impl<F> Middleware for BeforeRequest<F>
where
    F: Fn(&RequestContext) -> Option<Response> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Outcome> {
        match (self.f)(&ctx) {
            Some(response) => {
                debug!(path = %ctx.path, status = response.status().as_u16(), "answered before routing");
                future::ready(Outcome::Response(response)).boxed()
            }
            None => next.run(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use axum::http::StatusCode;
    use std::sync::Mutex;

    /// Records its tag on the way in and on the way out
    struct Trace {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Trace {
        fn call<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Outcome> {
            async move {
                self.log.lock().unwrap().push(format!("{} in", self.tag));
                let outcome = next.run(ctx).await;
                self.log.lock().unwrap().push(format!("{} out", self.tag));
                outcome
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_layers_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut app = App::new(Config::for_testing());
        for tag in ["outer", "inner"] {
            app.add_middleware(Trace {
                tag,
                log: Arc::clone(&log),
            })
            .unwrap();
        }
        app.get("/", {
            let log = Arc::clone(&log);
            move |_ctx| {
                log.lock().unwrap().push("handler".to_string());
                async { "ok" }
            }
        })
        .unwrap();

        let outcome = app
            .handle_request("GET", "/", Default::default(), Default::default())
            .await;
        assert!(outcome.is_response());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer in", "inner in", "handler", "inner out", "outer out"]
        );
    }

    #[tokio::test]
    async fn test_before_request_short_circuits() {
        let mut app = App::new(Config::for_testing());
        app.add_middleware(before_request(|ctx| {
            (ctx.path == "/maintenance")
                .then(|| Response::text("down").with_status(StatusCode::SERVICE_UNAVAILABLE))
        }))
        .unwrap();
        app.get("/maintenance", |_ctx| async { "unreachable" }).unwrap();
        app.get("/up", |_ctx| async { "up" }).unwrap();

        let outcome = app
            .handle_request("GET", "/maintenance", Default::default(), Default::default())
            .await;
        assert_eq!(outcome.status(), StatusCode::SERVICE_UNAVAILABLE);

        let outcome = app
            .handle_request("GET", "/up", Default::default(), Default::default())
            .await;
        assert_eq!(outcome.response().unwrap().text_body(), "up");
    }

    #[tokio::test]
    async fn test_layers_see_unmatched_requests() {
        let mut app = App::new(Config::for_testing());
        app.add_middleware(before_request(|ctx| {
            ctx.path
                .starts_with("/legacy/")
                .then(|| Response::redirect("/"))
        }))
        .unwrap();

        let outcome = app
            .handle_request("GET", "/legacy/page", Default::default(), Default::default())
            .await;
        assert_eq!(outcome.status(), StatusCode::SEE_OTHER);
    }
}
