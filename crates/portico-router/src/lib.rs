//! # Portico Router
//!
//! Route table and request matcher for the Portico dispatch core.
//!
//! Routes are registered at startup as `(methods, pattern, controller,
//! name)` tuples with optional per-route pipeline stages. Matching an
//! incoming `(method, path)` pair produces exactly one of three outcomes:
//!
//! - [`RouteMatch::Matched`] (200): the first registered route whose
//!   pattern matches the path and whose method set contains the method
//! - [`RouteMatch::MethodNotAllowed`] (405): a pattern matched, but no
//!   pattern-matching route allows the method
//! - [`RouteMatch::NotFound`] (404): no pattern matched at all
//!
//! Matching precedence is **registration order**, never specificity: the
//! first pattern match in insertion order is authoritative even if a later,
//! more specific pattern would also match.
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use portico_router::{HandlerRef, RouteMatch, Router};
//!
//! let mut router = Router::new();
//! router.add_route(
//!     vec![Method::GET],
//!     "/posts/:id",
//!     HandlerRef::parse("Posts:show"),
//!     "post-detail",
//! );
//!
//! match router.match_route(&Method::GET, "/posts/42") {
//!     RouteMatch::Matched { route, params } => {
//!         assert_eq!(route.name(), "post-detail");
//!         assert_eq!(params.get("id"), Some("42"));
//!     }
//!     _ => unreachable!(),
//! }
//! ```

#![forbid(unsafe_code)]

mod params;
mod route;
mod router;

pub use params::Params;
pub use route::{HandlerRef, Route, StageSpec};
pub use router::{RouteMatch, Router};
