//! Process-wide published values, computed once at startup.

use crate::language::Locale;

/// The immutable values every collaborator may read after startup: debug
/// flag, base URI, base URL, base path, and the active locale.
///
/// Constructed exactly once during boot, before any locale-sensitive
/// component initializes, and never mutated afterwards: the explicit
/// replacement for mutable process-global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    debug: bool,
    base_uri: String,
    base_url: String,
    base_path: String,
    locale: Locale,
}

impl RuntimeSettings {
    /// Builds the published values from the sanitized base URI and the
    /// bootstrap environment.
    #[must_use]
    pub fn new(
        debug: bool,
        base_uri: impl Into<String>,
        scheme: &str,
        host: &str,
        locale: Locale,
    ) -> Self {
        let base_uri = base_uri.into();
        let base_url = format!("{scheme}://{host}{base_uri}");
        // Same as the URL but with a guaranteed trailing slash.
        let base_path = format!("{}/", base_url.trim_end_matches('/'));
        Self {
            debug,
            base_uri,
            base_url,
            base_path,
            locale,
        }
    }

    /// Collapses a configured base URI to a single-leading-slash,
    /// no-trailing-slash form. A root or empty base URI collapses to the
    /// empty string so request paths keep their leading slash when the
    /// prefix is stripped.
    ///
    /// ```rust
    /// use portico::RuntimeSettings;
    ///
    /// assert_eq!(RuntimeSettings::sanitize_base_uri("blog/"), "/blog");
    /// assert_eq!(RuntimeSettings::sanitize_base_uri("/blog"), "/blog");
    /// assert_eq!(RuntimeSettings::sanitize_base_uri("/"), "");
    /// assert_eq!(RuntimeSettings::sanitize_base_uri(""), "");
    /// ```
    #[must_use]
    pub fn sanitize_base_uri(raw: &str) -> String {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    /// True when the application runs in development mode.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// The sanitized base URI (`/blog` or the empty string).
    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// The absolute base URL (`https://example.com/blog`).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The base URL with a guaranteed trailing slash.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// The active locale resolved at startup.
    #[must_use]
    pub fn locale(&self) -> &Locale {
        &self.locale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locale() -> Locale {
        Locale {
            code: "en".to_string(),
            timezone: "America/New_York".to_string(),
            encoding: "utf-8".to_string(),
        }
    }

    #[test]
    fn sanitize_collapses_slashes() {
        assert_eq!(RuntimeSettings::sanitize_base_uri("blog/"), "/blog");
        assert_eq!(RuntimeSettings::sanitize_base_uri("//blog//"), "/blog");
        assert_eq!(RuntimeSettings::sanitize_base_uri("blog/admin/"), "/blog/admin");
        assert_eq!(RuntimeSettings::sanitize_base_uri("/"), "");
        assert_eq!(RuntimeSettings::sanitize_base_uri(""), "");
    }

    #[test]
    fn base_url_and_path_derivation() {
        let settings = RuntimeSettings::new(false, "/blog", "https", "example.com", locale());
        assert_eq!(settings.base_url(), "https://example.com/blog");
        assert_eq!(settings.base_path(), "https://example.com/blog/");
    }

    #[test]
    fn root_base_uri_keeps_single_trailing_slash_on_path() {
        let settings = RuntimeSettings::new(true, "", "http", "localhost", locale());
        assert_eq!(settings.base_uri(), "");
        assert_eq!(settings.base_url(), "http://localhost");
        assert_eq!(settings.base_path(), "http://localhost/");
        assert!(settings.debug());
    }

    #[test]
    fn locale_is_published() {
        let settings = RuntimeSettings::new(false, "", "http", "h", locale());
        assert_eq!(settings.locale().code, "en");
        assert_eq!(settings.locale().timezone, "America/New_York");
    }
}
