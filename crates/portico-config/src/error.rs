//! Configuration error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while resolving and loading configuration documents.
///
/// All variants are fatal to startup: a missing required document and a
/// malformed document alike abort the boot, and a parse failure is never
/// treated as a cascade fallback.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No variant of the requested document exists in the directory.
    #[error("no variant of configuration document `{name}` found in {dir}")]
    NotFound {
        /// The logical document name.
        name: String,
        /// The directory that was searched.
        dir: PathBuf,
    },

    /// A variant exists but could not be read.
    #[error("failed to read configuration file {path}")]
    Read {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A TOML variant exists but is malformed.
    #[error("failed to parse TOML configuration {path}")]
    Toml {
        /// Path to the file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// A JSON variant exists but is malformed.
    #[error("failed to parse JSON configuration {path}")]
    Json {
        /// Path to the file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A document section does not deserialize into the requested type.
    #[error("invalid section `{section}` in document `{document}`")]
    Section {
        /// The logical document name.
        document: String,
        /// The section key.
        section: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A required section is absent from a document.
    #[error("missing section `{section}` in document `{document}`")]
    MissingSection {
        /// The logical document name.
        document: String,
        /// The section key.
        section: String,
    },
}

impl ConfigError {
    /// Creates a [`ConfigError::NotFound`] for a document name and search
    /// directory.
    pub fn not_found(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            name: name.into(),
            dir: dir.into(),
        }
    }

    /// Creates a [`ConfigError::Read`].
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn toml(path: &Path, source: toml::de::Error) -> Self {
        Self::Toml {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Creates a [`ConfigError::Section`].
    pub fn section(
        document: impl Into<String>,
        section: impl Into<String>,
        source: serde_json::Error,
    ) -> Self {
        Self::Section {
            document: document.into(),
            section: section.into(),
            source,
        }
    }

    /// Creates a [`ConfigError::MissingSection`].
    pub fn missing_section(document: impl Into<String>, section: impl Into<String>) -> Self {
        Self::MissingSection {
            document: document.into(),
            section: section.into(),
        }
    }

    /// True when the error means "no variant existed", as opposed to a
    /// variant existing and being unusable.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
