//! Route table.
//!
//! # Responsibilities
//! - Compile and store routes in registration order
//! - Reject duplicate (pattern, method) pairs and duplicate names
//! - Narrow the routes worth matching by the first path segment
//! - Reverse routing for named routes
//!
//! # Design Decisions
//! - Append-only: routes are never removed or reordered
//! - Registration order doubles as the tie-break between overlapping patterns
//! - The index is an optimization only; the matcher re-validates every candidate

use std::collections::HashMap;

use tracing::debug;

use crate::method::merge_methods;
use crate::path::{decode_segment, split_segments};
use crate::route::{compile, Route, RouteDef, RouteId};
use crate::{Method, Pattern, RouteError, Segment, UrlBuildError};

/// Where a pattern lives in the first-segment index
enum IndexKey<'a> {
    /// Zero-segment pattern `/`
    Root,
    Literal(&'a str),
    /// First segment is a variable, so any path may match
    Wildcard,
}

fn index_key(pattern: &Pattern) -> IndexKey<'_> {
    match pattern.first() {
        None => IndexKey::Root,
        Some(Segment::Literal(text)) => IndexKey::Literal(text),
        Some(Segment::Variable { .. }) => IndexKey::Wildcard,
    }
}

/// Ordered collection of routes with a first-segment index
///
/// # Examples
///
/// ```
/// use jsweb_router::{Method, RouteTable};
///
/// let mut table = RouteTable::new();
/// table.register("/users", &[Method::Get], "list").unwrap();
/// table.register("/users", &[Method::Post], "create").unwrap();
/// assert!(table.register("/users", &[Method::Get], "again").is_err());
/// assert_eq!(table.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RouteTable<H> {
    routes: Vec<Route<H>>,
    by_first_literal: HashMap<String, Vec<usize>>,
    wildcard: Vec<usize>,
    root: Vec<usize>,
    named: HashMap<String, usize>,
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            by_first_literal: HashMap::new(),
            wildcard: Vec::new(),
            root: Vec::new(),
            named: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// All routes in registration order
    pub fn routes(&self) -> &[Route<H>] {
        &self.routes
    }

    pub fn get(&self, id: RouteId) -> Option<&Route<H>> {
        self.routes.get(id.0)
    }

    /// Registers a handler for a pattern and a set of methods
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidPattern`] when the pattern does not compile
    /// - [`RouteError::DuplicateRoute`] when the same pattern shape is
    ///   already registered for one of the methods
    /// - [`RouteError::NoMethods`] when `methods` is empty
    pub fn register(
        &mut self,
        pattern: &str,
        methods: &[Method],
        handler: H,
    ) -> Result<RouteId, RouteError> {
        self.register_route(RouteDef::new(pattern, methods.iter().cloned(), handler))
    }

    /// Registers a full declaration, including name and metadata
    pub fn register_route(&mut self, def: RouteDef<H>) -> Result<RouteId, RouteError> {
        let pattern = compile(&def.pattern)?;

        let mut methods = Vec::new();
        merge_methods(&mut methods, &def.methods);
        if methods.is_empty() {
            return Err(RouteError::NoMethods(def.pattern));
        }

        if let Some(name) = &def.name {
            if self.named.contains_key(name) {
                return Err(RouteError::DuplicateName(name.clone()));
            }
        }

        let twin = def
            .trailing_slash_twin
            .then(|| pattern.trailing_slash_twin())
            .flatten();

        self.check_duplicates(&def.pattern, &pattern, twin.as_ref(), &methods)?;

        let id = RouteId(self.routes.len());
        let route = Route {
            id,
            source: def.pattern,
            pattern,
            twin,
            methods,
            handler: def.handler,
            name: def.name,
            metadata: def.metadata,
        };

        for pattern in route.patterns() {
            let bucket = match index_key(pattern) {
                IndexKey::Root => &mut self.root,
                IndexKey::Literal(text) => self.by_first_literal.entry(text.to_string()).or_default(),
                IndexKey::Wildcard => &mut self.wildcard,
            };
            if bucket.last() != Some(&id.0) {
                bucket.push(id.0);
            }
        }
        if let Some(name) = &route.name {
            self.named.insert(name.clone(), id.0);
        }

        debug!(
            route = %route.source,
            methods = ?route.methods,
            name = route.name.as_deref().unwrap_or(""),
            "registered route {}",
            id
        );
        self.routes.push(route);
        Ok(id)
    }

    fn check_duplicates(
        &self,
        source: &str,
        pattern: &Pattern,
        twin: Option<&Pattern>,
        methods: &[Method],
    ) -> Result<(), RouteError> {
        let ours: Vec<&Pattern> = std::iter::once(pattern).chain(twin).collect();

        let clash = self
            .routes
            .iter()
            .filter(|existing| {
                existing
                    .patterns()
                    .any(|theirs| ours.iter().any(|p| p.same_shape(theirs)))
            })
            .find_map(|existing| methods.iter().find(|m| existing.allows(m)));

        match clash {
            Some(method) => Err(RouteError::DuplicateRoute {
                pattern: source.to_string(),
                method: method.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Routes that could match `path`, in registration order
    ///
    /// Narrowing step only: every returned route still has to pass full
    /// matching.
    pub fn lookup_candidates(&self, path: &str) -> Vec<&Route<H>> {
        self.candidates_for(&split_segments(path))
    }

    pub(crate) fn candidates_for(&self, segments: &[&str]) -> Vec<&Route<H>> {
        let mut ids: Vec<usize> = self.wildcard.clone();

        match segments.first() {
            None => ids.extend_from_slice(&self.root),
            Some(first) => {
                if let Some(bucket) = self.by_first_literal.get(*first) {
                    ids.extend_from_slice(bucket);
                }
                if let Some(decoded) = decode_segment(first).filter(|d| d.as_ref() != *first) {
                    if let Some(bucket) = self.by_first_literal.get(decoded.as_ref()) {
                        ids.extend_from_slice(bucket);
                    }
                }
            }
        }

        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().map(|id| &self.routes[id]).collect()
    }

    /// Gets a route by its name
    pub fn get_route_by_name(&self, name: &str) -> Option<&Route<H>> {
        self.named.get(name).map(|&id| &self.routes[id])
    }

    /// Builds the path of a named route
    ///
    /// # Examples
    ///
    /// ```
    /// use jsweb_router::{Method, RouteDef, RouteTable};
    /// use std::collections::HashMap;
    ///
    /// let mut table = RouteTable::new();
    /// table
    ///     .register_route(RouteDef::new("/posts/<year:int>/<slug>", [Method::Get], ()).with_name("post.show"))
    ///     .unwrap();
    ///
    /// let mut params = HashMap::new();
    /// params.insert("year".to_string(), "2024".to_string());
    /// params.insert("slug".to_string(), "hello-world".to_string());
    ///
    /// assert_eq!(table.url_for("post.show", &params).unwrap(), "/posts/2024/hello-world");
    /// ```
    pub fn url_for(&self, name: &str, params: &HashMap<String, String>) -> Result<String, UrlBuildError> {
        self.get_route_by_name(name)
            .ok_or_else(|| UrlBuildError::UnknownName(name.to_string()))?
            .generate_url(params)
    }

    /// Convenience form of [`url_for`](Self::url_for) taking tuples
    pub fn url_for_params(&self, name: &str, params: &[(&str, &str)]) -> Result<String, UrlBuildError> {
        let param_map: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        self.url_for(name, &param_map)
    }
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources<H>(routes: Vec<&Route<H>>) -> Vec<&str> {
        routes.into_iter().map(|r| r.source()).collect()
    }

    #[test]
    fn test_candidates_grouped_by_first_literal() {
        let mut table = RouteTable::new();
        table.register("/users/<id>", &[Method::Get], ()).unwrap();
        table.register("/posts/<id>", &[Method::Get], ()).unwrap();
        table.register("/<page>", &[Method::Get], ()).unwrap();
        table.register("/users", &[Method::Get], ()).unwrap();
        table.register("/", &[Method::Get], ()).unwrap();

        assert_eq!(
            sources(table.lookup_candidates("/users/1")),
            vec!["/users/<id>", "/<page>", "/users"]
        );
        assert_eq!(sources(table.lookup_candidates("/posts")), vec!["/posts/<id>", "/<page>"]);
        assert_eq!(sources(table.lookup_candidates("/")), vec!["/<page>", "/"]);
        assert_eq!(sources(table.lookup_candidates("/nothing")), vec!["/<page>"]);
    }

    #[test]
    fn test_candidates_use_decoded_first_segment() {
        let mut table = RouteTable::new();
        table.register("/café", &[Method::Get], ()).unwrap();
        assert_eq!(sources(table.lookup_candidates("/caf%C3%A9")), vec!["/café"]);
    }

    #[test]
    fn test_duplicate_shape_ignores_variable_names() {
        let mut table = RouteTable::new();
        table.register("/users/<id>", &[Method::Get], ()).unwrap();
        let err = table.register("/users/<name>", &[Method::Get], ()).unwrap_err();
        assert_eq!(
            err,
            RouteError::DuplicateRoute {
                pattern: "/users/<name>".to_string(),
                method: Method::Get
            }
        );
        // A different type is a different shape
        assert!(table.register("/users/<id:int>", &[Method::Get], ()).is_ok());
    }

    #[test]
    fn test_duplicate_only_on_overlapping_methods() {
        let mut table = RouteTable::new();
        table.register("/items", &[Method::Get, Method::Head], ()).unwrap();
        assert!(table.register("/items", &[Method::Post], ()).is_ok());
        assert!(matches!(
            table.register("/items", &[Method::Delete, Method::Head], ()),
            Err(RouteError::DuplicateRoute { method: Method::Head, .. })
        ));
    }

    #[test]
    fn test_no_methods() {
        let mut table: RouteTable<()> = RouteTable::new();
        assert_eq!(
            table.register("/x", &[], ()),
            Err(RouteError::NoMethods("/x".to_string()))
        );
    }

    #[test]
    fn test_failed_registration_leaves_table_untouched() {
        let mut table = RouteTable::new();
        table.register("/a", &[Method::Get], ()).unwrap();
        assert!(table.register("/b/<x", &[Method::Get], ()).is_err());
        assert_eq!(table.len(), 1);
        assert!(table.lookup_candidates("/b/1").is_empty());
    }

    #[test]
    fn test_duplicate_name() {
        let mut table = RouteTable::new();
        table
            .register_route(RouteDef::new("/a", [Method::Get], ()).with_name("a"))
            .unwrap();
        assert_eq!(
            table
                .register_route(RouteDef::new("/b", [Method::Get], ()).with_name("a"))
                .unwrap_err(),
            RouteError::DuplicateName("a".to_string())
        );
    }

    #[test]
    fn test_twin_collides_with_explicit_slash_route() {
        let mut table = RouteTable::new();
        table.register("/about/", &[Method::Get], ()).unwrap();
        assert!(matches!(
            table.register_route(RouteDef::new("/about", [Method::Get], ()).with_trailing_slash_twin()),
            Err(RouteError::DuplicateRoute { .. })
        ));
    }

    #[test]
    fn test_url_for_unknown_name() {
        let table: RouteTable<()> = RouteTable::new();
        assert_eq!(
            table.url_for_params("nope", &[]),
            Err(UrlBuildError::UnknownName("nope".to_string()))
        );
    }
}
