//! # Portico Config
//!
//! Cascading configuration loader for the Portico bootstrap core.
//!
//! Configuration lives on disk as *documents* identified by a logical name
//! (`app`, `routes`, ...). Several variants of one document may exist side
//! by side; [`ConfigResolver`] picks exactly one per load using a
//! four-tier override cascade keyed on the active locale `L`:
//!
//! | Priority | Stem        | Tried when          |
//! |----------|-------------|---------------------|
//! | 1        | `name.L.local` | `prefer_local` and a locale is set |
//! | 2        | `name.local`   | `prefer_local`      |
//! | 3        | `name.L`       | a locale is set     |
//! | 4        | `name`         | always              |
//!
//! The first **existing** file wins; a variant that exists but fails to
//! parse is a fatal error ([`ConfigError::Toml`] or [`ConfigError::Json`]),
//! never a fallback trigger. Each stem is tried as `.toml` then `.json`.
//!
//! # Example
//!
//! ```no_run
//! use portico_config::ConfigResolver;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), portico_config::ConfigError> {
//! let resolver = ConfigResolver::new().with_locale("en");
//! let doc = resolver.load("app", Path::new("config"), true)?;
//! println!("loaded {} from {}", doc.name(), doc.path().display());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod document;
mod error;
mod resolver;

pub use document::{ConfigDocument, ConfigStore, DocumentMap};
pub use error::ConfigError;
pub use resolver::ConfigResolver;
