//! Route table and the three-way match decision.

use http::{Method, StatusCode};
use tracing::{debug, warn};

use crate::params::Params;
use crate::route::{HandlerRef, Route};

/// The outcome of matching a request against the route table.
///
/// Every variant is a terminal classification with an associated status
/// code; 404 and 405 are data to be resolved into fallback handlers, never
/// errors.
#[derive(Debug, Clone)]
pub enum RouteMatch {
    /// The first registered route whose pattern matches the path and whose
    /// method set contains the request method.
    Matched {
        /// The matched route record.
        route: Route,
        /// Placeholder values captured from the path.
        params: Params,
    },
    /// At least one pattern matched the path, but none of the matching
    /// routes allow the request method.
    MethodNotAllowed {
        /// Union of the method sets of all pattern-matching routes, in
        /// registration order.
        allowed: Vec<Method>,
    },
    /// No registered pattern matched the path.
    NotFound,
}

impl RouteMatch {
    /// The status code classification of this outcome.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Matched { .. } => StatusCode::OK,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

/// An ordered route table.
///
/// Routes are registered at startup and matched in registration order:
/// the first route whose pattern matches the path and whose method set
/// contains the method wins, even if a later pattern is more specific.
///
/// The table is immutable once matching begins; per-request use clones the
/// startup-built router so shared state stays read-only.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty route table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route and returns it for fluent stage attachment.
    ///
    /// Route names are expected to be unique; registering a second route
    /// under an existing name keeps both entries but logs a warning, since
    /// the earlier one still shadows the later wherever their patterns
    /// overlap.
    pub fn add_route(
        &mut self,
        methods: Vec<Method>,
        pattern: &str,
        controller: HandlerRef,
        name: &str,
    ) -> &mut Route {
        if self.routes.iter().any(|r| r.name() == name) {
            warn!(route = name, "duplicate route name registered");
        }
        let route = Route::new(methods, pattern, controller, name);
        debug!(route = name, pattern = route.pattern(), "route registered");
        self.routes.push(route);
        self.routes.last_mut().expect("route was just pushed")
    }

    /// Matches a request against the table.
    ///
    /// Deterministic for a given table and `(method, path)` pair. The scan
    /// continues past routes that match the pattern but not the method, so
    /// a later route registered for the same pattern with the right method
    /// still produces [`RouteMatch::Matched`].
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> RouteMatch {
        let mut allowed: Vec<Method> = Vec::new();
        let mut pattern_matched = false;

        for route in &self.routes {
            let Some(params) = route.match_path(path) else {
                continue;
            };
            if route.allows(method) {
                debug!(route = route.name(), %method, path, "route matched");
                return RouteMatch::Matched {
                    route: route.clone(),
                    params,
                };
            }
            pattern_matched = true;
            for m in route.methods() {
                if !allowed.contains(m) {
                    allowed.push(m.clone());
                }
            }
        }

        if pattern_matched {
            debug!(%method, path, "method not allowed");
            RouteMatch::MethodNotAllowed { allowed }
        } else {
            debug!(%method, path, "no route matched");
            RouteMatch::NotFound
        }
    }

    /// Returns the registered routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
