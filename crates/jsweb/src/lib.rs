// jsweb - request dispatch and application object
// Routing lives in jsweb-router; this crate adds handlers, dispatch, middleware, config and logging

pub mod app;
pub mod blueprint;
pub mod config;
pub mod dispatch;
pub mod handler;
pub mod logging;
pub mod middleware;
pub mod request_context;
pub mod response;
pub mod static_files;

// Re-export framework types
pub use app::{App, Outcome};
pub use blueprint::Blueprint;
pub use config::{Config, StaticFilesConfig};
pub use dispatch::{dispatch, Dispatch, DispatchState, FailureKind, HandlerError, HandlerFailure};
pub use handler::{
    blocking_fn, handler_fn, never_cache, BlockingHandler, BoxedHandler, FnHandler, Handler,
    HandlerFuture, HandlerResult, IntoHandlerResult, NeverCache,
};
pub use middleware::{before_request, BeforeRequest, BoxedMiddleware, Middleware, Next};
pub use request_context::{QueryParams, RequestContext};
pub use response::Response;
pub use static_files::StaticFiles;

// Re-export routing types
pub use jsweb_router as router;
pub use jsweb_router::{Method, ParamValue, Params, RouteDef, RouteError, RouteId, UrlBuildError};

// Re-export commonly used types from dependencies
pub use axum;
pub use axum::http::StatusCode;
