//! Route records and the fluent stage-attachment builder.

use std::fmt;

use http::Method;
use serde_json::Value;

use crate::params::Params;

/// The entry point a pipeline stage is invoked with when the reference
/// names no explicit action.
const DEFAULT_ACTION: &str = "run";

/// A reference to a registered handler: service name plus entry-point name.
///
/// Parsed from the `"Service:action"` form used in route and middleware
/// tables; a bare `"Service"` reference defaults to the `run` entry point.
///
/// # Example
///
/// ```rust
/// use portico_router::HandlerRef;
///
/// let full = HandlerRef::parse("Auth:check");
/// assert_eq!(full.service(), "Auth");
/// assert_eq!(full.action(), "check");
///
/// let bare = HandlerRef::parse("Posts");
/// assert_eq!(bare.action(), "run");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRef {
    service: String,
    action: String,
}

impl HandlerRef {
    /// Creates a reference from explicit service and action names.
    #[must_use]
    pub fn new(service: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            action: action.into(),
        }
    }

    /// Parses a `"Service:action"` reference; the action defaults to `run`.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        match reference.split_once(':') {
            Some((service, action)) if !action.is_empty() => Self::new(service, action),
            _ => Self::new(reference.trim_end_matches(':'), DEFAULT_ACTION),
        }
    }

    /// The registered service name of the handler.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The entry-point name invoked on the handler.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.action)
    }
}

/// One pipeline stage attached to a route or to the global middleware
/// table: a handler reference plus opaque configuration data interpreted
/// by the handler itself.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    /// The handler this stage invokes.
    pub handler: HandlerRef,
    /// Opaque per-stage configuration data.
    pub data: Value,
}

impl StageSpec {
    /// Creates a stage spec.
    #[must_use]
    pub fn new(handler: HandlerRef, data: Value) -> Self {
        Self { handler, data }
    }
}

/// A registered route: method set, path pattern, target controller, and
/// the ordered per-route pipeline stages.
///
/// Routes are created through [`Router::add_route`](crate::Router::add_route)
/// at startup and are immutable once matching begins. The returned mutable
/// reference supports fluent stage attachment:
///
/// ```rust
/// use http::Method;
/// use portico_router::{HandlerRef, Router};
/// use serde_json::json;
///
/// let mut router = Router::new();
/// router
///     .add_route(
///         vec![Method::GET, Method::POST],
///         "/account",
///         HandlerRef::parse("Account:show"),
///         "account",
///     )
///     .stage(HandlerRef::parse("Auth:check"), json!({"redirect": "/login"}))
///     .stage(HandlerRef::parse("Csrf:verify"), json!(null));
/// ```
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    methods: Vec<Method>,
    pattern: String,
    controller: HandlerRef,
    stages: Vec<StageSpec>,
}

impl Route {
    pub(crate) fn new(
        methods: Vec<Method>,
        pattern: impl Into<String>,
        controller: HandlerRef,
        name: impl Into<String>,
    ) -> Self {
        let mut deduped: Vec<Method> = Vec::with_capacity(methods.len());
        for method in methods {
            if !deduped.contains(&method) {
                deduped.push(method);
            }
        }
        Self {
            name: name.into(),
            methods: deduped,
            pattern: normalize_pattern(&pattern.into()),
            controller,
            stages: Vec::new(),
        }
    }

    /// Appends a pipeline stage to this route, preserving attachment order.
    pub fn stage(&mut self, handler: HandlerRef, data: Value) -> &mut Self {
        self.stages.push(StageSpec::new(handler, data));
        self
    }

    /// The unique route name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The allowed HTTP methods, in registration order.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// The normalized path pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The controller invoked as the terminal pipeline stage.
    #[must_use]
    pub fn controller(&self) -> &HandlerRef {
        &self.controller
    }

    /// The per-route pipeline stages, in attachment order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Returns true if this route allows `method`.
    #[must_use]
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Matches `path` against the pattern, capturing placeholder values.
    ///
    /// A `:name` pattern segment captures exactly one non-empty path
    /// segment; every other segment must match literally. Empty segments
    /// (leading, trailing, doubled slashes) are ignored on both sides.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let pattern_segments: Vec<&str> = segments(&self.pattern);
        let path_segments: Vec<&str> = segments(path);

        if pattern_segments.len() != path_segments.len() {
            return None;
        }

        let mut params = Params::new();
        for (pattern_segment, path_segment) in pattern_segments.iter().zip(&path_segments) {
            if let Some(name) = pattern_segment.strip_prefix(':') {
                params.push(name, *path_segment);
            } else if pattern_segment != path_segment {
                return None;
            }
        }
        Some(params)
    }
}

/// Collapses a pattern to a single-leading-slash, no-trailing-slash form.
fn normalize_pattern(pattern: &str) -> String {
    let trimmed = pattern.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_ref_parses_service_and_action() {
        let r = HandlerRef::parse("Blog:list");
        assert_eq!(r.service(), "Blog");
        assert_eq!(r.action(), "list");
        assert_eq!(r.to_string(), "Blog:list");
    }

    #[test]
    fn handler_ref_defaults_action_to_run() {
        assert_eq!(HandlerRef::parse("Blog").action(), "run");
        assert_eq!(HandlerRef::parse("Blog:").action(), "run");
    }

    #[test]
    fn route_dedupes_methods() {
        let route = Route::new(
            vec![Method::GET, Method::GET, Method::POST],
            "/x",
            HandlerRef::parse("X"),
            "x",
        );
        assert_eq!(route.methods(), &[Method::GET, Method::POST]);
    }

    #[test]
    fn pattern_is_normalized() {
        let route = Route::new(vec![Method::GET], "posts/", HandlerRef::parse("P"), "p");
        assert_eq!(route.pattern(), "/posts");

        let root = Route::new(vec![Method::GET], "/", HandlerRef::parse("H"), "home");
        assert_eq!(root.pattern(), "/");
    }

    #[test]
    fn literal_match() {
        let route = Route::new(vec![Method::GET], "/posts", HandlerRef::parse("P"), "p");
        assert!(route.match_path("/posts").is_some());
        assert!(route.match_path("/posts/").is_some());
        assert!(route.match_path("/post").is_none());
        assert!(route.match_path("/posts/7").is_none());
    }

    #[test]
    fn placeholder_match_captures_value() {
        let route = Route::new(
            vec![Method::GET],
            "/posts/:id/comments/:cid",
            HandlerRef::parse("C"),
            "comment",
        );
        let params = route.match_path("/posts/42/comments/7").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("cid"), Some("7"));
    }

    #[test]
    fn placeholder_requires_nonempty_segment() {
        let route = Route::new(vec![Method::GET], "/posts/:id", HandlerRef::parse("P"), "p");
        assert!(route.match_path("/posts").is_none());
        // "//" collapses to no segment
        assert!(route.match_path("/posts//").is_none());
    }

    #[test]
    fn root_pattern_matches_root_path() {
        let route = Route::new(vec![Method::GET], "/", HandlerRef::parse("Home"), "home");
        assert!(route.match_path("/").is_some());
        assert!(route.match_path("").is_some());
        assert!(route.match_path("/x").is_none());
    }

    #[test]
    fn stage_attachment_order_is_preserved() {
        let mut route = Route::new(vec![Method::GET], "/x", HandlerRef::parse("X"), "x");
        route
            .stage(HandlerRef::parse("First"), Value::Null)
            .stage(HandlerRef::parse("Second"), Value::Null);

        let names: Vec<_> = route.stages().iter().map(|s| s.handler.service()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }
}
