//! Locale detection from the request URI, with host-based fallback.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Attributes associated with one supported locale code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleSpec {
    /// Timezone identifier (e.g. `Europe/Prague`).
    pub timezone: String,
    /// Character-encoding identifier (e.g. `utf-8`).
    pub encoding: String,
}

/// The supported locale table, in configuration order.
pub type LanguageTable = IndexMap<String, LocaleSpec>;

/// The resolved active locale of a request: code plus its configured
/// attributes. Exactly one is active per request, resolved once and
/// unchanged for the pipeline's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    /// The short locale code (e.g. `en`).
    pub code: String,
    /// Timezone identifier from the language table.
    pub timezone: String,
    /// Character-encoding identifier from the language table.
    pub encoding: String,
}

impl Locale {
    fn from_spec(code: impl Into<String>, spec: &LocaleSpec) -> Self {
        Self {
            code: code.into(),
            timezone: spec.timezone.clone(),
            encoding: spec.encoding.clone(),
        }
    }
}

/// How the active locale is chosen when the request URI carries no
/// supported locale prefix.
///
/// The by-host form is an **ordered** mapping from host-matching regex to
/// locale code: the first pattern matching the host wins, and when none
/// match, the first entry is the fallback of last resort; ordering is
/// meaningful, an unmatched host is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultLocaleRule {
    /// A single fixed locale code.
    Fixed(String),
    /// Ordered host pattern → locale code mapping.
    ByHost(IndexMap<String, String>),
}

/// Errors raised during locale resolution. All are fatal at startup.
#[derive(Error, Debug)]
pub enum LanguageError {
    /// The by-host fallback mapping is empty.
    #[error("default language is not set")]
    DefaultLanguageUndefined,

    /// The default rule produced a code absent from the language table.
    #[error("locale `{code}` is not present in the language table")]
    UnknownLocale {
        /// The unresolvable locale code.
        code: String,
    },

    /// A host pattern in the by-host rule is not a valid regex.
    #[error("invalid host pattern `{pattern}` in default language rule")]
    HostPattern {
        /// The offending pattern.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: Box<regex::Error>,
    },
}

/// Determines the active locale for a request.
///
/// # Algorithm
///
/// 1. Strip the base URI prefix from the request URI.
/// 2. A leading two-letter alphabetic segment (case-insensitive, bounded
///    by `/` or end of path) is the candidate code.
/// 3. A candidate present in the language table is the active locale.
/// 4. Otherwise the [`DefaultLocaleRule`] applies; its resulting code must
///    itself be present in the language table.
pub struct LanguageResolver;

impl LanguageResolver {
    /// Resolves the active locale for one request.
    pub fn resolve(
        request_uri: &str,
        base_uri: &str,
        languages: &LanguageTable,
        default_rule: &DefaultLocaleRule,
        host: &str,
    ) -> Result<Locale, LanguageError> {
        if let Some(code) = Self::uri_candidate(request_uri, base_uri) {
            if let Some(spec) = languages.get(&code) {
                debug!(locale = %code, "locale resolved from request URI");
                return Ok(Locale::from_spec(code, spec));
            }
        }

        let code = Self::default_code(default_rule, host)?;
        let spec = languages
            .get(&code)
            .ok_or_else(|| LanguageError::UnknownLocale { code: code.clone() })?;
        debug!(locale = %code, host, "locale resolved from default rule");
        Ok(Locale::from_spec(code, spec))
    }

    /// Extracts the candidate locale code from the URI, lowercased.
    fn uri_candidate(request_uri: &str, base_uri: &str) -> Option<String> {
        let path = request_uri.split('?').next().unwrap_or(request_uri);
        let relative = path.strip_prefix(base_uri).unwrap_or(path);
        let first = relative
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or("");

        (first.len() == 2 && first.chars().all(|c| c.is_ascii_alphabetic()))
            .then(|| first.to_ascii_lowercase())
    }

    /// Applies the default rule for a request that carries no supported
    /// locale prefix.
    fn default_code(rule: &DefaultLocaleRule, host: &str) -> Result<String, LanguageError> {
        match rule {
            DefaultLocaleRule::Fixed(code) => Ok(code.clone()),
            DefaultLocaleRule::ByHost(mapping) => {
                for (pattern, code) in mapping {
                    let matcher =
                        Regex::new(pattern).map_err(|source| LanguageError::HostPattern {
                            pattern: pattern.clone(),
                            source: Box::new(source),
                        })?;
                    if matcher.is_match(host) {
                        return Ok(code.clone());
                    }
                }
                // No pattern matched: the first entry is the fallback of
                // last resort, in mapping order.
                mapping
                    .values()
                    .next()
                    .cloned()
                    .ok_or(LanguageError::DefaultLanguageUndefined)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(codes: &[&str]) -> LanguageTable {
        codes
            .iter()
            .map(|code| {
                (
                    (*code).to_string(),
                    LocaleSpec {
                        timezone: format!("Zone/{code}"),
                        encoding: "utf-8".to_string(),
                    },
                )
            })
            .collect()
    }

    fn fixed(code: &str) -> DefaultLocaleRule {
        DefaultLocaleRule::Fixed(code.to_string())
    }

    #[test]
    fn every_supported_prefix_resolves_to_its_locale() {
        let languages = table(&["en", "cs", "de"]);
        for code in ["en", "cs", "de"] {
            let locale = LanguageResolver::resolve(
                &format!("/{code}/posts"),
                "",
                &languages,
                &fixed("en"),
                "example.com",
            )
            .unwrap();
            assert_eq!(locale.code, code);
            assert_eq!(locale.timezone, format!("Zone/{code}"));
        }
    }

    #[test]
    fn prefix_matching_is_case_insensitive() {
        let languages = table(&["en"]);
        let locale =
            LanguageResolver::resolve("/EN/posts", "", &languages, &fixed("en"), "host").unwrap();
        assert_eq!(locale.code, "en");
    }

    #[test]
    fn base_uri_is_stripped_before_prefix_extraction() {
        let languages = table(&["en", "cs"]);
        let locale =
            LanguageResolver::resolve("/blog/cs/posts", "/blog", &languages, &fixed("en"), "host")
                .unwrap();
        assert_eq!(locale.code, "cs");
    }

    #[test]
    fn unsupported_prefix_falls_back_to_the_default_rule() {
        let languages = table(&["en", "cs"]);
        for uri in ["/fr/posts", "/posts", "/", "/p/x"] {
            let locale =
                LanguageResolver::resolve(uri, "", &languages, &fixed("cs"), "host").unwrap();
            assert_eq!(locale.code, "cs", "uri {uri}");
        }
    }

    #[test]
    fn query_string_does_not_affect_the_candidate() {
        let languages = table(&["en"]);
        let locale =
            LanguageResolver::resolve("/en?page=2", "", &languages, &fixed("en"), "host").unwrap();
        assert_eq!(locale.code, "en");
    }

    #[test]
    fn three_letter_segment_is_no_candidate() {
        let languages = table(&["en"]);
        let locale =
            LanguageResolver::resolve("/eng/posts", "", &languages, &fixed("en"), "host").unwrap();
        assert_eq!(locale.code, "en");
    }

    #[test]
    fn by_host_rule_returns_first_matching_pattern() {
        let languages = table(&["en", "cs"]);
        let rule = DefaultLocaleRule::ByHost(
            [
                (r"\.cz$".to_string(), "cs".to_string()),
                (r"\.com$".to_string(), "en".to_string()),
            ]
            .into_iter()
            .collect(),
        );

        let locale =
            LanguageResolver::resolve("/posts", "", &languages, &rule, "example.cz").unwrap();
        assert_eq!(locale.code, "cs");

        let locale =
            LanguageResolver::resolve("/posts", "", &languages, &rule, "example.com").unwrap();
        assert_eq!(locale.code, "en");
    }

    #[test]
    fn by_host_rule_falls_back_to_first_entry() {
        let languages = table(&["cs", "en"]);
        let rule = DefaultLocaleRule::ByHost(
            [
                (r"\.cz$".to_string(), "cs".to_string()),
                (r"\.com$".to_string(), "en".to_string()),
            ]
            .into_iter()
            .collect(),
        );

        // Neither pattern matches; the first entry wins by order.
        let locale =
            LanguageResolver::resolve("/posts", "", &languages, &rule, "example.org").unwrap();
        assert_eq!(locale.code, "cs");
    }

    #[test]
    fn empty_by_host_rule_is_fatal() {
        let languages = table(&["en"]);
        let rule = DefaultLocaleRule::ByHost(IndexMap::new());
        let err = LanguageResolver::resolve("/posts", "", &languages, &rule, "host").unwrap_err();
        assert!(matches!(err, LanguageError::DefaultLanguageUndefined));
    }

    #[test]
    fn default_code_missing_from_table_is_fatal() {
        let languages = table(&["en"]);
        let err =
            LanguageResolver::resolve("/posts", "", &languages, &fixed("de"), "host").unwrap_err();
        assert!(matches!(err, LanguageError::UnknownLocale { code } if code == "de"));
    }

    #[test]
    fn invalid_host_pattern_is_fatal() {
        let languages = table(&["en"]);
        let rule = DefaultLocaleRule::ByHost(
            [("(unclosed".to_string(), "en".to_string())].into_iter().collect(),
        );
        let err = LanguageResolver::resolve("/posts", "", &languages, &rule, "host").unwrap_err();
        assert!(matches!(err, LanguageError::HostPattern { .. }));
    }

    #[test]
    fn rule_deserializes_from_both_shapes() {
        let fixed: DefaultLocaleRule = serde_json::from_str(r#""en""#).unwrap();
        assert_eq!(fixed, DefaultLocaleRule::Fixed("en".to_string()));

        let by_host: DefaultLocaleRule =
            serde_json::from_str(r#"{"\\.cz$": "cs", "\\.com$": "en"}"#).unwrap();
        match by_host {
            DefaultLocaleRule::ByHost(mapping) => {
                let order: Vec<_> = mapping.values().collect();
                assert_eq!(order, vec!["cs", "en"]);
            }
            DefaultLocaleRule::Fixed(_) => panic!("expected by-host rule"),
        }
    }
}
