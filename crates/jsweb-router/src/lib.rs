//! # jsweb router
//!
//! URL routing core for the jsweb framework:
//! - Static routes (`/about`)
//! - Typed variables (`/users/<id:integer>`, `/files/<id:uuid>`)
//! - Greedy tails (`/static/<file:path>`), optionally empty (`/docs/<page:path?>`)
//! - Method-aware matching that tells "no route" apart from "wrong method"
//! - Reverse routing through route names
//!
//! ## Matching Rules
//!
//! Routes are tried in registration order. The first route whose pattern
//! matches the path and whose method set contains the request method wins.
//! There is no specificity ranking: register `/users/me` before
//! `/users/<name>` if both should be reachable.
//!
//! Trailing slashes are significant. `/users` and `/users/` are different
//! paths unless a route opts into its trailing-slash twin.
//!
//! ## Example
//!
//! ```
//! use jsweb_router::{MatchResult, Method, RouteTable};
//!
//! let mut table = RouteTable::new();
//! table.register("/", &[Method::Get], "index").unwrap();
//! table.register("/users/<id:int>", &[Method::Get, Method::Put], "user").unwrap();
//!
//! let found = table.match_route(&Method::Put, "/users/9?verbose=1").into_match().unwrap();
//! assert_eq!(*found.route.handler(), "user");
//! assert_eq!(found.params.int("id"), Some(9));
//!
//! match table.match_route(&Method::Delete, "/users/9") {
//!     MatchResult::MethodNotAllowed { allowed } => {
//!         assert_eq!(allowed, vec![Method::Get, Method::Put]);
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```
//!
//! ## Concurrency
//!
//! The table is mutated only through `&mut self` and matched through
//! `&self`, so a table shared behind an `Arc` is read-only for every
//! request. Matching allocates only the extracted parameters.

mod error;
pub mod matcher;
mod method;
pub mod path;
pub mod route;
mod table;
mod value;

pub use error::{PatternError, RouteError, UrlBuildError};
pub use matcher::{MatchFailure, MatchResult, RouteMatch};
pub use method::{ExtensionMethod, Method};
pub use route::pattern::ParamType;
pub use route::{compile, Pattern, Route, RouteDef, RouteId, Segment};
pub use table::RouteTable;
pub use value::{ParamValue, Params};
