//! Setup-time errors raised while compiling patterns and registering routes
//!
//! Every variant is fatal to the single call that produced it; routes that
//! were registered before the failing call stay untouched.
use thiserror::Error;

use crate::Method;

/// A route declaration string could not be compiled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern `{pattern}` must start with `/`")]
    MissingLeadingSlash { pattern: String },

    #[error("pattern `{pattern}`: variable segment `{segment}` has no closing `>`")]
    UnclosedVariable { pattern: String, segment: String },

    #[error("pattern `{pattern}`: stray `<` or `>` in segment `{segment}`")]
    StrayDelimiter { pattern: String, segment: String },

    #[error("pattern `{pattern}`: `{name}` is not a valid variable name")]
    InvalidName { pattern: String, name: String },

    #[error("pattern `{pattern}`: unrecognized type annotation `{annotation}` on `{name}`")]
    UnknownType {
        pattern: String,
        name: String,
        annotation: String,
    },

    #[error("pattern `{pattern}`: greedy variable `{name}` must be the final segment")]
    GreedyNotLast { pattern: String, name: String },

    #[error("pattern `{pattern}`: variable `{name}` is declared more than once")]
    DuplicateVariable { pattern: String, name: String },
}

/// Registration into a [`RouteTable`](crate::RouteTable) failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    #[error("route `{pattern}` is already registered for {method}")]
    DuplicateRoute { pattern: String, method: Method },

    #[error("route name `{0}` is already registered")]
    DuplicateName(String),

    #[error("route `{0}` declares no methods")]
    NoMethods(String),

    #[error("routes are sealed; `{pattern}` cannot be registered while serving")]
    RegistrationClosed { pattern: String },
}

/// Reverse routing through [`RouteTable::url_for`](crate::RouteTable::url_for) failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlBuildError {
    #[error("no route is named `{0}`")]
    UnknownName(String),

    #[error("route `{route}` needs a value for `{param}`")]
    MissingParam { route: String, param: String },

    #[error("route `{route}`: `{value}` is not a valid value for `{param}`")]
    InvalidParam {
        route: String,
        param: String,
        value: String,
    },
}
