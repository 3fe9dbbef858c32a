// File: src/blueprint.rs
// Purpose: Named route groups mounted under a URL prefix

use jsweb_router::{Method, PatternError, RouteDef, RouteError};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::handler::{handler_fn, BoxedHandler, Handler, IntoHandlerResult};
use crate::static_files::StaticFiles;
use crate::RequestContext;

/// A group of routes registered together under one prefix
///
/// Patterns are joined onto the prefix as written, so `/` inside a
/// blueprint mounted at `/auth` becomes `/auth/`. Route names are qualified
/// with the blueprint name: `login` in blueprint `auth` is `auth.login`.
/// A blueprint may also carry its own static folder, served under
/// `<prefix>/static` ahead of the application's static mount.
///
/// ```
/// use jsweb::{blocking_fn, App, Blueprint, Config};
/// use jsweb_router::{Method, PatternError, RouteDef, RouteError};
///
/// let auth = Blueprint::new("auth", "/auth")
///     .route(RouteDef::new("/login", [Method::Get, Method::Post], blocking_fn(|_| "login")).with_name("login"));
///
/// let mut app = App::new(Config::default());
/// app.register_blueprint(auth).unwrap();
/// assert_eq!(app.url_for("auth.login", &[]).unwrap(), "/auth/login");
/// ```
pub struct Blueprint {
    name: String,
    prefix: String,
    routes: Vec<RouteDef<BoxedHandler>>,
    static_folder: Option<PathBuf>,
}

impl Blueprint {
    pub fn new(name: impl Into<String>, url_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: url_prefix.into(),
            routes: Vec::new(),
            static_folder: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Serves `folder` under `<prefix>/static`
    pub fn with_static_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.static_folder = Some(folder.into());
        self
    }

    pub(crate) fn static_mount(&self) -> Option<StaticFiles> {
        let folder = self.static_folder.as_ref()?;
        Some(StaticFiles::new(
            format!("{}/static", normalize_prefix(&self.prefix)),
            folder.clone(),
        ))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Adds a full route declaration
    pub fn route<H: Handler>(mut self, def: RouteDef<H>) -> Self {
        self.routes
            .push(def.map_handler(|handler| Arc::new(handler) as BoxedHandler));
        self
    }

    /// Adds an async handler for `GET`
    pub fn get<F, Fut, R>(self, pattern: &str, f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.route(RouteDef::new(pattern, [Method::Get], handler_fn(f)))
    }

    /// Adds an async handler for `POST`
    pub fn post<F, Fut, R>(self, pattern: &str, f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.route(RouteDef::new(pattern, [Method::Post], handler_fn(f)))
    }

    /// Declarations with the prefix applied and names qualified
    ///
    /// A pattern without its own leading `/` is rejected before joining, so
    /// `users` under `/admin` never turns into `/adminusers`.
    pub(crate) fn into_defs(
        self,
    ) -> impl Iterator<Item = Result<RouteDef<BoxedHandler>, RouteError>> {
        let Blueprint {
            name,
            prefix,
            routes,
            ..
        } = self;
        let prefix = normalize_prefix(&prefix);

        routes.into_iter().map(move |mut def| {
            if !def.pattern.starts_with('/') {
                return Err(PatternError::MissingLeadingSlash {
                    pattern: def.pattern,
                }
                .into());
            }
            def.pattern = format!("{}{}", prefix, def.pattern);
            def.name = def.name.map(|route_name| format!("{}.{}", name, route_name));
            Ok(def)
        })
    }
}

/// `auth/` → `/auth`, `/` → ``
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
