//! Application object.
//!
//! # Responsibilities
//! - Own the route table and the shared configuration
//! - Accept route registrations while setting up
//! - Answer requests: match, dispatch, and report one [`Outcome`] each
//!
//! # Design Decisions
//! - No global registry: every request goes through an explicit `App`
//! - Registration needs `&mut App`, serving needs only `&App`
//! - The first request seals the app; later registrations fail
//! - "No route" and "wrong method" stay separate all the way to the status code
//! - Middleware wraps static file lookup and routing; static mounts win over routes

use axum::body::{Bytes, Body};
use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use jsweb_router::{
    MatchResult, Method, RouteDef, RouteError, RouteId, RouteTable, UrlBuildError,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, field, info, info_span, warn, Instrument, Span};

use crate::blueprint::Blueprint;
use crate::dispatch::{dispatch, HandlerFailure};
use crate::handler::{blocking_fn, handler_fn, BoxedHandler, Handler, IntoHandlerResult};
use crate::logging::ACCESS_TARGET;
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::static_files::StaticFiles;
use crate::{Config, RequestContext, Response};

/// Largest request body the HTTP bridge buffers
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Result of handling one request
#[derive(Debug)]
pub enum Outcome {
    /// The handler produced a response
    Response(Response),
    /// No route matches the path
    NotFound,
    /// A route matches the path, but none allows the method
    MethodNotAllowed { allowed: Vec<Method> },
    /// The handler failed
    Failed(HandlerFailure),
}

impl Outcome {
    /// Status code the outcome maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Response(response) => response.status(),
            Outcome::NotFound => StatusCode::NOT_FOUND,
            Outcome::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Outcome::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Outcome::Response(_))
    }

    /// The handler's response, if there is one
    pub fn response(&self) -> Option<&Response> {
        match self {
            Outcome::Response(response) => Some(response),
            _ => None,
        }
    }

    /// Maps the outcome onto a response
    ///
    /// 404 for no route, 405 with an `Allow` header for a wrong method, 500
    /// for a failed handler.
    pub fn into_response(self) -> Response {
        self.render(false)
    }

    /// Like [`into_response`](Self::into_response); with `debug` a failed
    /// handler's message is included in the 500 body
    pub fn render(self, debug: bool) -> Response {
        match self {
            Outcome::Response(response) => response,
            Outcome::NotFound => Response::text("Not Found").with_status(StatusCode::NOT_FOUND),
            Outcome::MethodNotAllowed { allowed } => {
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                Response::text("Method Not Allowed")
                    .with_status(StatusCode::METHOD_NOT_ALLOWED)
                    .with_header("Allow", allow)
            }
            Outcome::Failed(failure) if debug => Response::text(failure.to_string())
                .with_status(StatusCode::INTERNAL_SERVER_ERROR),
            Outcome::Failed(_) => Response::text("Internal Server Error")
                .with_status(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> axum::response::Response {
        IntoResponse::into_response(self.render(false))
    }
}

/// A jsweb application
///
/// ```
/// use jsweb::{App, Config, Outcome};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let mut app = App::new(Config::default());
/// app.get("/hello/<name>", |ctx| async move {
///     format!("Hello, {}!", ctx.params.str("name").unwrap_or("stranger"))
/// })
/// .unwrap();
///
/// let outcome = app.handle_request("GET", "/hello/ada", Default::default(), Default::default()).await;
/// assert_eq!(outcome.response().unwrap().text_body(), "Hello, ada!");
///
/// let outcome = app.handle_request("POST", "/hello/ada", Default::default(), Default::default()).await;
/// assert!(matches!(outcome, Outcome::MethodNotAllowed { .. }));
/// # });
/// ```
pub struct App {
    config: Arc<Config>,
    routes: RouteTable<BoxedHandler>,
    middleware: Vec<BoxedMiddleware>,
    /// Blueprint static folders, checked before `static_root`
    blueprint_statics: Vec<StaticFiles>,
    static_root: Option<StaticFiles>,
    sealed: AtomicBool,
}

impl App {
    /// New app; mounts `config.static_files.dir` when it is set
    pub fn new(config: Config) -> Self {
        let static_root = config
            .static_files
            .dir
            .as_ref()
            .map(|dir| StaticFiles::new(&config.static_files.url, dir.clone()));
        Self {
            config: Arc::new(config),
            routes: RouteTable::new(),
            middleware: Vec::new(),
            blueprint_statics: Vec::new(),
            static_root,
            sealed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable<BoxedHandler> {
        &self.routes
    }

    /// Ends the setup phase; every later registration fails
    pub fn seal(&self) {
        if !self.sealed.swap(true, Ordering::AcqRel) {
            debug!(routes = self.routes.len(), "route table sealed");
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    fn ensure_open(&self, pattern: &str) -> Result<(), RouteError> {
        if self.is_sealed() {
            error!(pattern, "route registered after the app started serving");
            return Err(RouteError::RegistrationClosed {
                pattern: pattern.to_string(),
            });
        }
        Ok(())
    }

    /// Registers a full route declaration
    pub fn route_def<H: Handler>(&mut self, def: RouteDef<H>) -> Result<RouteId, RouteError> {
        self.ensure_open(&def.pattern)?;
        self.routes
            .register_route(def.map_handler(|handler| Arc::new(handler) as BoxedHandler))
    }

    /// Registers `handler` for `pattern` and `methods`
    pub fn route<H: Handler>(
        &mut self,
        pattern: &str,
        methods: &[Method],
        handler: H,
    ) -> Result<RouteId, RouteError> {
        self.route_def(RouteDef::new(pattern, methods.iter().cloned(), handler))
    }

    /// Registers an async function
    pub fn route_fn<F, Fut, R>(
        &mut self,
        pattern: &str,
        methods: &[Method],
        f: F,
    ) -> Result<RouteId, RouteError>
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.route(pattern, methods, handler_fn(f))
    }

    /// Registers a function that completes without suspending
    pub fn route_blocking<F, R>(
        &mut self,
        pattern: &str,
        methods: &[Method],
        f: F,
    ) -> Result<RouteId, RouteError>
    where
        F: Fn(RequestContext) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.route(pattern, methods, blocking_fn(f))
    }

    pub fn get<F, Fut, R>(&mut self, pattern: &str, f: F) -> Result<RouteId, RouteError>
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.route_fn(pattern, &[Method::Get], f)
    }

    pub fn post<F, Fut, R>(&mut self, pattern: &str, f: F) -> Result<RouteId, RouteError>
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.route_fn(pattern, &[Method::Post], f)
    }

    pub fn put<F, Fut, R>(&mut self, pattern: &str, f: F) -> Result<RouteId, RouteError>
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.route_fn(pattern, &[Method::Put], f)
    }

    pub fn patch<F, Fut, R>(&mut self, pattern: &str, f: F) -> Result<RouteId, RouteError>
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.route_fn(pattern, &[Method::Patch], f)
    }

    pub fn delete<F, Fut, R>(&mut self, pattern: &str, f: F) -> Result<RouteId, RouteError>
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.route_fn(pattern, &[Method::Delete], f)
    }

    /// Adds a layer around every request; the first added runs outermost
    pub fn add_middleware<M: Middleware>(&mut self, middleware: M) -> Result<(), RouteError> {
        self.ensure_open(std::any::type_name::<M>())?;
        self.middleware.push(Arc::new(middleware));
        Ok(())
    }

    /// Serves `dir` under `url_path`, replacing any configured static mount
    pub fn static_files(
        &mut self,
        url_path: &str,
        dir: impl Into<std::path::PathBuf>,
    ) -> Result<(), RouteError> {
        self.ensure_open(url_path)?;
        let mount = StaticFiles::new(url_path, dir);
        debug!(url = mount.url_path(), dir = ?mount.dir(), "mounted static files");
        self.static_root = Some(mount);
        Ok(())
    }

    /// Registers every route of a blueprint, or none of them
    pub fn register_blueprint(&mut self, blueprint: Blueprint) -> Result<Vec<RouteId>, RouteError> {
        self.ensure_open(blueprint.prefix())?;
        let name = blueprint.name().to_string();
        let static_mount = blueprint.static_mount();

        let mut staged = self.routes.clone();
        let ids = blueprint
            .into_defs()
            .map(|def| def.and_then(|def| staged.register_route(def)))
            .collect::<Result<Vec<_>, _>>()?;

        self.routes = staged;
        self.blueprint_statics.extend(static_mount);
        debug!(blueprint = %name, routes = ids.len(), "registered blueprint");
        Ok(ids)
    }

    /// Builds the path of a named route
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, UrlBuildError> {
        self.routes.url_for_params(name, params)
    }

    /// Handles one request
    ///
    /// `target` is the request path, optionally followed by a query string.
    /// Seals the app on first use.
    pub async fn handle_request(
        &self,
        method: &str,
        target: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Outcome {
        self.seal();
        let method = Method::parse(method);

        let span = info_span!(
            "dispatch",
            method = %method,
            path = %target,
            route = field::Empty
        );
        let outcome = self
            .run_pipeline(method.clone(), target, headers, body)
            .instrument(span.clone())
            .await;

        span.in_scope(|| {
            info!(
                target: ACCESS_TARGET,
                status = outcome.status().as_u16(),
                "{} {}",
                method,
                target
            )
        });
        outcome
    }

    async fn run_pipeline(
        &self,
        method: Method,
        target: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Outcome {
        if target.len() > self.config.routing.max_path_length {
            warn!(
                length = target.len(),
                limit = self.config.routing.max_path_length,
                "request target too long"
            );
            return Outcome::NotFound;
        }

        let ctx = RequestContext::new(method, target, headers, body, Arc::clone(&self.config));
        Next::new(self, &self.middleware).run(ctx).await
    }

    /// Innermost pipeline stage: static mounts, then the route table
    pub(crate) async fn serve(&self, ctx: RequestContext) -> Outcome {
        let mounts = self.blueprint_statics.iter().chain(self.static_root.as_ref());
        for mount in mounts {
            if let Some(relative) = mount.relative(&ctx.path) {
                return mount.serve(&ctx.method, relative).await;
            }
        }

        match self.routes.match_route(&ctx.method, &ctx.path) {
            MatchResult::NoMatch => {
                debug!("no route matched");
                Outcome::NotFound
            }
            MatchResult::MethodNotAllowed { allowed } => {
                warn!(?allowed, "method not allowed");
                Outcome::MethodNotAllowed { allowed }
            }
            MatchResult::Matched(found) => {
                let route = found.route;
                Span::current().record("route", route.source());

                let ctx = ctx
                    .with_params(found.params)
                    .with_route(route.source(), route.name());

                match dispatch(route, ctx).await {
                    Ok(response) => Outcome::Response(response),
                    Err(failure) => {
                        error!(%failure, "handler failed");
                        Outcome::Failed(failure)
                    }
                }
            }
        }
    }

    /// Bridges an axum/hyper request into [`handle_request`](Self::handle_request)
    pub async fn handle_http(&self, request: Request) -> axum::response::Response {
        let (parts, body) = request.into_parts();
        let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "could not read request body");
                return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
            }
        };
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        self.handle_request(parts.method.as_str(), target, parts.headers, body)
            .await
            .render(self.config.debug)
            .into_response()
    }

    /// An axum router that sends every request through this app
    pub fn into_router(self) -> axum::Router {
        self.seal();
        let app = Arc::new(self);
        axum::Router::new().fallback(move |request: Request<Body>| {
            let app = Arc::clone(&app);
            async move { app.handle_http(request).await }
        })
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware.len())
            .field("static_root", &self.static_root)
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
