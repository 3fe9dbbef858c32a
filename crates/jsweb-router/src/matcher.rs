//! Request matching.
//!
//! # Responsibilities
//! - Compare a split request path against a compiled pattern
//! - Convert captured text into typed parameter values
//! - Pick the winning route for a (method, path) pair
//!
//! # Design Decisions
//! - Literal comparison is case-sensitive
//! - Conversion failures reject the route, never the request
//! - Registration order is the only precedence: the first structural match
//!   that allows the method wins
//! - "No route" and "route exists, wrong method" stay distinct outcomes

use tracing::trace;

use crate::method::merge_methods;
use crate::path::{decode_segment, split_query, split_segments};
use crate::{Method, ParamType, Params, Pattern, Route, RouteTable, Segment};

/// Why a pattern did not structurally match a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchFailure {
    /// The literal at `index` differs from the path segment
    LiteralMismatch { index: usize },
    /// The segment for `name` does not convert to its declared type
    TypeConversionFailure { name: String, ty: ParamType },
    /// The path has too few or too many segments
    SegmentCountMismatch { expected: usize, actual: usize },
}

/// A route selected for a request, with its extracted parameters
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub route: &'a Route<H>,
    pub params: Params,
}

/// Outcome of matching one request; exactly one per request
#[derive(Debug)]
pub enum MatchResult<'a, H> {
    Matched(RouteMatch<'a, H>),
    NoMatch,
    /// Some route matched the path, none allowed the method
    MethodNotAllowed { allowed: Vec<Method> },
}

impl<'a, H> MatchResult<'a, H> {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchResult::Matched(_))
    }

    pub fn into_match(self) -> Option<RouteMatch<'a, H>> {
        match self {
            MatchResult::Matched(m) => Some(m),
            _ => None,
        }
    }
}

/// Segment-wise comparison of one pattern against one path
pub(crate) fn match_segments(pattern: &Pattern, path: &[&str]) -> Result<Params, MatchFailure> {
    let segments = pattern.segments();
    let count_mismatch = || MatchFailure::SegmentCountMismatch {
        expected: segments.len(),
        actual: path.len(),
    };

    // Without a greedy tail the counts must agree; with one, the tail may take zero or more
    let fixed = if pattern.has_greedy_tail() {
        segments.len() - 1
    } else {
        segments.len()
    };
    if path.len() < fixed || (!pattern.has_greedy_tail() && path.len() != fixed) {
        return Err(count_mismatch());
    }

    let mut params = Params::new();
    for (index, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Literal(text) => {
                let actual = path[index];
                let equal = actual == text.as_str()
                    || (actual.contains('%') && decode_segment(actual).as_deref() == Some(text.as_str()));
                if !equal {
                    return Err(MatchFailure::LiteralMismatch { index });
                }
            }
            Segment::Variable { name, ty, optional } if ty.is_greedy() => {
                let conversion_failure = || MatchFailure::TypeConversionFailure {
                    name: name.clone(),
                    ty: *ty,
                };
                let rest = path[index..]
                    .iter()
                    .map(|raw| decode_segment(raw).ok_or_else(&conversion_failure))
                    .collect::<Result<Vec<_>, _>>()?
                    .join("/");
                if rest.is_empty() && !optional {
                    return Err(count_mismatch());
                }
                params.insert(name.clone(), crate::ParamValue::Path(rest));
            }
            Segment::Variable { name, ty, .. } => {
                let value = decode_segment(path[index])
                    .and_then(|decoded| ty.convert(&decoded))
                    .ok_or_else(|| MatchFailure::TypeConversionFailure {
                        name: name.clone(),
                        ty: *ty,
                    })?;
                params.insert(name.clone(), value);
            }
        }
    }
    Ok(params)
}

impl<H> RouteTable<H> {
    /// Finds the route for a request
    ///
    /// The query string and fragment are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use jsweb_router::{MatchResult, Method, RouteTable};
    ///
    /// let mut table = RouteTable::new();
    /// table.register("/users/<id:integer>", &[Method::Get], "show").unwrap();
    ///
    /// match table.match_route(&Method::Get, "/users/42") {
    ///     MatchResult::Matched(m) => assert_eq!(m.params.int("id"), Some(42)),
    ///     other => panic!("unexpected {:?}", other),
    /// }
    ///
    /// assert!(matches!(table.match_route(&Method::Get, "/users/abc"), MatchResult::NoMatch));
    /// assert!(matches!(
    ///     table.match_route(&Method::Post, "/users/42"),
    ///     MatchResult::MethodNotAllowed { .. }
    /// ));
    /// ```
    pub fn match_route(&self, method: &Method, target: &str) -> MatchResult<'_, H> {
        let (path, _query) = split_query(target);
        let segments = split_segments(path);

        let mut allowed: Vec<Method> = Vec::new();
        let mut structural = false;

        for route in self.candidates_for(&segments) {
            match route.match_segments(&segments) {
                Ok(params) if route.allows(method) => {
                    trace!(route = %route.source(), "matched");
                    return MatchResult::Matched(RouteMatch { route, params });
                }
                Ok(_) => {
                    structural = true;
                    merge_methods(&mut allowed, route.methods());
                }
                Err(failure) => {
                    trace!(route = %route.source(), ?failure, "rejected");
                }
            }
        }

        if structural {
            MatchResult::MethodNotAllowed { allowed }
        } else {
            MatchResult::NoMatch
        }
    }
}
