//! Request-scoped shared state.

use http::{Method, StatusCode};
use indexmap::IndexMap;
use portico_router::Params;
use serde_json::Value;

/// The mutable, request-scoped data bag passed through every pipeline
/// stage.
///
/// One context is created per request, owned by the dispatch for the
/// request's lifetime, and never shared across requests. Structured fields
/// carry the dispatch decision (method, matched path, locale, status,
/// placeholder values, matched route name); the ordered value bag is free
/// for any stage to read and write.
///
/// # Example
///
/// ```rust
/// use http::{Method, StatusCode};
/// use portico_core::RequestContext;
/// use serde_json::json;
///
/// let mut ctx = RequestContext::new(Method::GET, "/posts/42");
/// ctx.set("title", json!("Hello"));
///
/// assert_eq!(ctx.status(), StatusCode::OK);
/// assert_eq!(ctx.get("title"), Some(&json!("Hello")));
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    locale: String,
    status: StatusCode,
    params: Params,
    matched_route: Option<String>,
    values: IndexMap<String, Value>,
}

impl RequestContext {
    /// Creates a context for one request.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            locale: String::new(),
            status: StatusCode::OK,
            params: Params::new(),
            matched_route: None,
            values: IndexMap::new(),
        }
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request path as used for route matching (base URI and locale
    /// prefix already stripped).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The active locale code for this request.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Sets the active locale code.
    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = locale.into();
    }

    /// Returns the context with the locale set.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// The dispatch status classification (200, 404 or 405).
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Records the dispatch status classification.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Placeholder values captured by the route match.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Stores the placeholder values captured by the route match.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// The name of the matched route, if the dispatch matched one.
    #[must_use]
    pub fn matched_route(&self) -> Option<&str> {
        self.matched_route.as_deref()
    }

    /// Records the matched route name.
    pub fn set_matched_route(&mut self, name: impl Into<String>) {
        self.matched_route = Some(name.into());
    }

    /// Writes a value into the shared bag, replacing any prior value under
    /// the same key.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Reads a value from the shared bag.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Removes and returns a value from the shared bag.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    /// Iterates over the bag entries in insertion order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let ctx = RequestContext::new(Method::GET, "/");
        assert_eq!(ctx.method(), &Method::GET);
        assert_eq!(ctx.path(), "/");
        assert_eq!(ctx.status(), StatusCode::OK);
        assert_eq!(ctx.locale(), "");
        assert!(ctx.matched_route().is_none());
        assert!(ctx.params().is_empty());
    }

    #[test]
    fn bag_set_get_remove() {
        let mut ctx = RequestContext::new(Method::POST, "/submit");
        ctx.set("count", json!(1));
        ctx.set("count", json!(2));

        assert_eq!(ctx.get("count"), Some(&json!(2)));
        assert_eq!(ctx.remove("count"), Some(json!(2)));
        assert_eq!(ctx.get("count"), None);
    }

    #[test]
    fn bag_preserves_insertion_order() {
        let mut ctx = RequestContext::new(Method::GET, "/");
        ctx.set("first", json!(1));
        ctx.set("second", json!(2));
        ctx.set("third", json!(3));

        let keys: Vec<_> = ctx.values().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["first", "second", "third"]);
    }

    #[test]
    fn dispatch_fields() {
        let mut ctx = RequestContext::new(Method::GET, "/posts/7").with_locale("en");
        let mut params = Params::new();
        params.push("id", "7");
        ctx.set_params(params);
        ctx.set_matched_route("post-detail");
        ctx.set_status(StatusCode::OK);

        assert_eq!(ctx.locale(), "en");
        assert_eq!(ctx.params().get("id"), Some("7"));
        assert_eq!(ctx.matched_route(), Some("post-detail"));
    }
}
