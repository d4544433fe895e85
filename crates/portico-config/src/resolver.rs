//! The four-tier override cascade.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::document::{ConfigDocument, DocumentMap};
use crate::error::ConfigError;

/// File extensions tried for each cascade stem, in priority order.
const EXTENSIONS: [&str; 2] = ["toml", "json"];

/// Loads configuration documents by logical name, honoring the
/// locale-and-local override cascade.
///
/// The resolver carries the active locale; before language resolution has
/// run it carries none, and the locale tiers of the cascade are skipped.
/// Each `load` call is independent (results are not cached) and is
/// deterministic and idempotent for an unchanged filesystem.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    locale: Option<String>,
}

impl ConfigResolver {
    /// Creates a resolver with no active locale.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the resolver with the active locale set.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Sets the active locale for subsequent loads.
    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = Some(locale.into());
    }

    /// The active locale, if one has been resolved yet.
    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Loads one document variant for `name` from `dir`.
    ///
    /// Candidate stems are tried in cascade order: `name.L.local`,
    /// `name.local` (both only when `prefer_local`), `name.L`, `name`,
    /// and the first stem with an existing file wins. A later stem is only
    /// attempted when every earlier one is absent; a found file that fails
    /// to parse aborts the load with a parse error, never falling back.
    pub fn load(
        &self,
        name: &str,
        dir: &Path,
        prefer_local: bool,
    ) -> Result<ConfigDocument, ConfigError> {
        for stem in self.candidate_stems(name, prefer_local) {
            for extension in EXTENSIONS {
                let path = dir.join(format!("{stem}.{extension}"));
                if path.is_file() {
                    debug!(document = name, path = %path.display(), "configuration variant selected");
                    return Self::parse(name, &path);
                }
            }
        }
        Err(ConfigError::not_found(name, dir))
    }

    fn candidate_stems(&self, name: &str, prefer_local: bool) -> Vec<String> {
        let mut stems = Vec::with_capacity(4);
        if prefer_local {
            if let Some(locale) = &self.locale {
                stems.push(format!("{name}.{locale}.local"));
            }
            stems.push(format!("{name}.local"));
        }
        if let Some(locale) = &self.locale {
            stems.push(format!("{name}.{locale}"));
        }
        stems.push(name.to_string());
        stems
    }

    fn parse(name: &str, path: &Path) -> Result<ConfigDocument, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::read(path, source))?;

        let entries: DocumentMap = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|source| ConfigError::json(path, source))?,
            // Only .toml and .json paths are ever constructed above.
            _ => toml::from_str(&content).map_err(|source| ConfigError::toml(path, source))?,
        };

        Ok(ConfigDocument::new(name, path, entries))
    }
}
