/// Route declarations and registered routes
///
/// Contains pure functional components for pattern parsing and the route
/// types stored in the [`RouteTable`](crate::RouteTable).
pub mod parser;
pub mod pattern;

use std::collections::HashMap;
use std::fmt;

use crate::matcher::{match_segments, MatchFailure};
use crate::{Method, ParamType, Params, UrlBuildError};
pub use parser::compile;
pub use pattern::{classify_segment, parse_param_with_annotation, Pattern, Segment};

/// Identity of a registered route; also its registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub(crate) usize);

impl RouteId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A route declaration, before compilation and registration
///
/// # Examples
///
/// ```
/// use jsweb_router::{Method, RouteDef, RouteTable};
///
/// let mut table = RouteTable::new();
/// let def = RouteDef::new("/users/<id:integer>", [Method::Get], "show_user")
///     .with_name("users.show")
///     .with_meta("summary", "Fetch one user");
/// table.register_route(def).unwrap();
///
/// assert_eq!(table.url_for_params("users.show", &[("id", "7")]).unwrap(), "/users/7");
/// ```
#[derive(Debug, Clone)]
pub struct RouteDef<H> {
    pub pattern: String,
    pub methods: Vec<Method>,
    pub handler: H,
    pub name: Option<String>,
    pub metadata: HashMap<String, String>,
    /// Also match the pattern with its trailing slash toggled
    pub trailing_slash_twin: bool,
}

impl<H> RouteDef<H> {
    pub fn new(
        pattern: impl Into<String>,
        methods: impl IntoIterator<Item = Method>,
        handler: H,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            methods: methods.into_iter().collect(),
            handler,
            name: None,
            metadata: HashMap::new(),
            trailing_slash_twin: false,
        }
    }

    /// Sets the name used by reverse routing
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets a metadata key-value pair
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Declares both the slash and no-slash forms of the path
    pub fn with_trailing_slash_twin(mut self) -> Self {
        self.trailing_slash_twin = true;
        self
    }

    /// Transforms the handler, keeping everything else
    pub fn map_handler<T>(self, f: impl FnOnce(H) -> T) -> RouteDef<T> {
        RouteDef {
            pattern: self.pattern,
            methods: self.methods,
            handler: f(self.handler),
            name: self.name,
            metadata: self.metadata,
            trailing_slash_twin: self.trailing_slash_twin,
        }
    }
}

/// A registered route
///
/// Immutable once it sits in the table.
#[derive(Debug, Clone)]
pub struct Route<H> {
    pub(crate) id: RouteId,
    pub(crate) source: String,
    pub(crate) pattern: Pattern,
    pub(crate) twin: Option<Pattern>,
    pub(crate) methods: Vec<Method>,
    pub(crate) handler: H,
    pub(crate) name: Option<String>,
    pub(crate) metadata: HashMap<String, String>,
}

impl<H> Route<H> {
    pub fn id(&self) -> RouteId {
        self.id
    }

    /// The declaration string as registered
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Patterns this route answers to: the declared one, then its twin
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        std::iter::once(&self.pattern).chain(self.twin.as_ref())
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get_meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Structural match against already-split path segments
    ///
    /// Tries the declared pattern first, then the trailing-slash twin; the
    /// failure reported is the declared pattern's.
    pub fn match_segments(&self, path: &[&str]) -> Result<Params, MatchFailure> {
        match match_segments(&self.pattern, path) {
            Ok(params) => Ok(params),
            Err(failure) => self
                .twin
                .as_ref()
                .and_then(|twin| match_segments(twin, path).ok())
                .ok_or(failure),
        }
    }

    /// Builds a concrete path by substituting parameters
    ///
    /// Every value must satisfy its variable's type. Values are
    /// percent-encoded; greedy values keep their `/` separators.
    pub fn generate_url(&self, params: &HashMap<String, String>) -> Result<String, UrlBuildError> {
        let route_label = || self.name.clone().unwrap_or_else(|| self.source.clone());

        let parts = self
            .pattern
            .segments()
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => Ok(text.clone()),
                Segment::Variable { name, ty, optional } => {
                    let value = match params.get(name) {
                        Some(value) => value.as_str(),
                        None if *optional => "",
                        None => {
                            return Err(UrlBuildError::MissingParam {
                                route: route_label(),
                                param: name.clone(),
                            })
                        }
                    };
                    if ty.convert(value).is_none() {
                        return Err(UrlBuildError::InvalidParam {
                            route: route_label(),
                            param: name.clone(),
                            value: value.to_string(),
                        });
                    }
                    Ok(encode_value(*ty, value))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if parts.is_empty() {
            return Ok("/".to_string());
        }
        Ok(parts.iter().fold(String::new(), |mut url, part| {
            url.push('/');
            url.push_str(part);
            url
        }))
    }
}

fn encode_value(ty: ParamType, value: &str) -> String {
    if ty.is_greedy() {
        value
            .split('/')
            .map(|part| urlencoding::encode(part).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    } else {
        urlencoding::encode(value).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(pattern: &str) -> Route<()> {
        Route {
            id: RouteId(0),
            source: pattern.to_string(),
            pattern: compile(pattern).unwrap(),
            twin: None,
            methods: vec![Method::Get],
            handler: (),
            name: Some("test".to_string()),
            metadata: HashMap::new(),
        }
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_generate_url() {
        let route = route("/users/<id:int>/posts/<slug>");
        let url = route
            .generate_url(&params(&[("id", "5"), ("slug", "hello world")]))
            .unwrap();
        assert_eq!(url, "/users/5/posts/hello%20world");
    }

    #[test]
    fn test_generate_url_root() {
        assert_eq!(route("/").generate_url(&HashMap::new()).unwrap(), "/");
    }

    #[test]
    fn test_generate_url_greedy_keeps_slashes() {
        let route = route("/files/<rest:path>");
        let url = route.generate_url(&params(&[("rest", "a/b c/d.txt")])).unwrap();
        assert_eq!(url, "/files/a/b%20c/d.txt");
    }

    #[test]
    fn test_generate_url_missing_param() {
        let err = route("/users/<id:int>").generate_url(&HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            UrlBuildError::MissingParam {
                route: "test".to_string(),
                param: "id".to_string()
            }
        );
    }

    #[test]
    fn test_generate_url_rejects_wrong_type() {
        let err = route("/users/<id:int>")
            .generate_url(&params(&[("id", "abc")]))
            .unwrap_err();
        assert!(matches!(err, UrlBuildError::InvalidParam { .. }));
    }

    #[test]
    fn test_twin_matches_other_slash_form() {
        let mut route = route("/about");
        route.twin = route.pattern.trailing_slash_twin();
        assert!(route.match_segments(&["about"]).is_ok());
        assert!(route.match_segments(&["about", ""]).is_ok());
        assert!(route.match_segments(&["about", "x"]).is_err());
    }
}
