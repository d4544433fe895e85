//! Loaded configuration documents and the merged configuration store.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ConfigError;

/// The ordered key → value mapping a document deserializes into.
///
/// Insertion order is semantic: middleware tables and host-fallback rules
/// are iterated in document order.
pub type DocumentMap = IndexMap<String, Value>;

/// One loaded configuration document: a logical name, the variant path
/// that won the cascade, and its ordered entries. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    name: String,
    path: PathBuf,
    entries: DocumentMap,
}

impl ConfigDocument {
    pub(crate) fn new(name: impl Into<String>, path: impl Into<PathBuf>, entries: DocumentMap) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            entries,
        }
    }

    /// The logical document name (`app`, `routes`, ...).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The path of the variant that won the cascade.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a top-level entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Deserializes a top-level entry into `T`.
    ///
    /// A missing key is [`ConfigError::MissingSection`]; a present key that
    /// does not fit `T` is [`ConfigError::Section`].
    pub fn section<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| ConfigError::missing_section(&self.name, key))?;
        serde_json::from_value(value.clone())
            .map_err(|source| ConfigError::section(&self.name, key, source))
    }

    /// Iterates over the entries in document order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Consumes the document, yielding its entries.
    #[must_use]
    pub fn into_entries(self) -> DocumentMap {
        self.entries
    }

    /// The number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the document has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The shared configuration store the orchestrator merges documents into
/// at startup.
///
/// After startup the store is registered as a read-only service; factories
/// read their own sub-trees through [`ConfigStore::get_path`] or the typed
/// [`ConfigStore::get_as`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
    entries: DocumentMap,
}

impl ConfigStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a top-level entry, replacing any prior value under the key.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Returns a top-level entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Walks a path of object keys from the top level.
    ///
    /// ```rust
    /// use portico_config::ConfigStore;
    /// use serde_json::json;
    ///
    /// let mut store = ConfigStore::new();
    /// store.set("services", json!({"Cookie": {"secure": true}}));
    ///
    /// assert_eq!(
    ///     store.get_path(&["services", "Cookie", "secure"]),
    ///     Some(&json!(true))
    /// );
    /// assert_eq!(store.get_path(&["services", "Session"]), None);
    /// ```
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.entries.get(*first)?;
        for key in rest {
            current = current.get(key)?;
        }
        Some(current)
    }

    /// Deserializes the value at a key path into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &[&str]) -> Result<T, ConfigError> {
        let section = path.join(".");
        let value = self
            .get_path(path)
            .ok_or_else(|| ConfigError::missing_section("store", section.clone()))?;
        serde_json::from_value(value.clone())
            .map_err(|source| ConfigError::section("store", section, source))
    }

    /// Merges every entry of a document into the store, later entries
    /// overriding earlier ones key by key.
    pub fn merge(&mut self, document: ConfigDocument) {
        for (key, value) in document.into_entries() {
            self.entries.insert(key, value);
        }
    }

    /// Merges entries into an object under `key`, creating it if absent.
    ///
    /// Used for the `services`/`models` documents, whose top-level entries
    /// are service names that belong under one sub-tree of the store.
    pub fn merge_into(&mut self, key: &str, entries: DocumentMap) {
        let target = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if !target.is_object() {
            *target = Value::Object(serde_json::Map::new());
        }
        if let Some(object) = target.as_object_mut() {
            for (entry_key, value) in entries {
                object.insert(entry_key, value);
            }
        }
    }

    /// Iterates over top-level entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
