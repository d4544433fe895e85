//! String-keyed lazy service registry.
//!
//! Services are registered as named factories at startup and built on
//! first resolution; every later resolution of the same name returns the
//! cached singleton. Factories receive the registry itself and may resolve
//! their dependencies through it; recursion between factories is detected
//! with a resolution-in-progress stack and reported as
//! [`RegistryError::CyclicDependency`] instead of overflowing the call
//! stack.
//!
//! Registration happens on `&mut self` during startup; resolution takes
//! `&self` so the populated registry can be shared read-mostly across
//! requests. Factories run with no internal lock held, which is what makes
//! re-entrant `resolve` calls from inside a factory legal.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use portico_core::ServiceRegistry;
//!
//! struct Clock;
//!
//! let mut registry = ServiceRegistry::new();
//! registry.register("Clock", |_| Ok(Arc::new(Clock)));
//!
//! let clock: Arc<Clock> = registry.resolve_as("Clock").unwrap();
//! ```

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::handler::Handler;

/// A type-erased shared service instance.
pub type Shared = Arc<dyn Any + Send + Sync>;

/// A service factory: builds one instance, given the registry for
/// dependency resolution.
pub type ServiceFactory = Box<dyn Fn(&ServiceRegistry) -> Result<Shared, RegistryError> + Send + Sync>;

/// Errors raised by registry operations. All of them indicate wiring bugs
/// and are fatal to the operation that triggered resolution.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Resolution was requested for a name that was never registered.
    #[error("service not registered: {name}")]
    ServiceNotFound {
        /// The unregistered service name.
        name: String,
    },

    /// Two or more factories resolve each other, directly or transitively.
    #[error("cyclic service dependency: {}", .chain.join(" -> "))]
    CyclicDependency {
        /// The resolution chain that closed the cycle, ending with the
        /// name that was already in progress.
        chain: Vec<String>,
    },

    /// A service resolved successfully but is not of the requested type.
    #[error("service {name} is not a {expected}")]
    ServiceType {
        /// The service name.
        name: String,
        /// The requested type.
        expected: &'static str,
    },

    /// A factory failed while constructing its service.
    #[error("factory for service {service} failed")]
    Factory {
        /// The service whose factory failed.
        service: String,
        /// The underlying construction error.
        #[source]
        source: anyhow::Error,
    },
}

impl RegistryError {
    /// Creates a [`RegistryError::Factory`] for `service`.
    pub fn factory(service: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Factory {
            service: service.into(),
            source: source.into(),
        }
    }
}

/// A string-keyed dependency container with lazy singleton resolution.
///
/// Names are unique: registering a factory under an existing name replaces
/// the prior registration (last registration wins) and discards any
/// instance already cached for it. Pre-built values registered through
/// [`ServiceRegistry::register_value`] bypass the factory mechanism and
/// are visible to [`ServiceRegistry::resolve`] as well.
#[derive(Default)]
pub struct ServiceRegistry {
    factories: HashMap<String, ServiceFactory>,
    values: HashMap<String, Shared>,
    instances: Mutex<HashMap<String, Shared>>,
    resolving: Mutex<Vec<String>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `name` without invoking it.
    ///
    /// Replaces any prior registration under the same name; an instance
    /// already cached for the old factory is discarded with it.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ServiceRegistry) -> Result<Shared, RegistryError> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(service = %name, "service factory registered");
        self.instances.get_mut().remove(&name);
        self.factories.insert(name, Box::new(factory));
    }

    /// Stores an already-constructed value under `name`, bypassing the
    /// factory mechanism.
    pub fn register_value<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: Arc<T>) {
        let name = name.into();
        debug!(service = %name, "service value registered");
        self.values.insert(name, value);
    }

    /// Registers a pipeline handler (controller or middleware) under `name`.
    ///
    /// Handlers are stored as values; a factory that needs to build its
    /// handler lazily can instead return `Arc::new(handler)` where
    /// `handler: Arc<dyn Handler>`.
    pub fn register_handler(&mut self, name: impl Into<String>, handler: Arc<dyn Handler>) {
        self.register_value(name, Arc::new(handler));
    }

    /// Returns true if `name` is registered, as a factory or as a value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name) || self.values.contains_key(name)
    }

    /// Resolves `name`, invoking its factory on first call and returning
    /// the cached instance on every later call.
    pub fn resolve(&self, name: &str) -> Result<Shared, RegistryError> {
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }
        if let Some(instance) = self.instances.lock().get(name) {
            return Ok(instance.clone());
        }

        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::ServiceNotFound { name: name.to_string() })?;

        {
            let mut resolving = self.resolving.lock();
            if resolving.iter().any(|in_progress| in_progress == name) {
                let mut chain = resolving.clone();
                chain.push(name.to_string());
                return Err(RegistryError::CyclicDependency { chain });
            }
            resolving.push(name.to_string());
        }

        // No lock is held here, so the factory may re-enter resolve().
        let built = factory(self);
        self.resolving.lock().retain(|in_progress| in_progress != name);
        let instance = built?;

        debug!(service = name, "service instantiated");
        let mut instances = self.instances.lock();
        let cached = instances.entry(name.to_string()).or_insert(instance);
        Ok(cached.clone())
    }

    /// Resolves `name` and downcasts it to `T`.
    ///
    /// This is the typed boundary: callers that require a specific service
    /// type use this instead of handling a service of unknown type.
    pub fn resolve_as<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        self.resolve(name)?
            .downcast::<T>()
            .map_err(|_| RegistryError::ServiceType {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Resolves `name` as a pipeline handler.
    pub fn resolve_handler(&self, name: &str) -> Result<Arc<dyn Handler>, RegistryError> {
        let shared = self.resolve(name)?;
        shared
            .downcast::<Arc<dyn Handler>>()
            .map(|handler| (*handler).clone())
            .map_err(|_| RegistryError::ServiceType {
                name: name.to_string(),
                expected: "pipeline handler",
            })
    }

    /// Retrieves a value stored with [`ServiceRegistry::register_value`].
    pub fn value(&self, name: &str) -> Result<Shared, RegistryError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::ServiceNotFound { name: name.to_string() })
    }

    /// Retrieves a stored value and downcasts it to `T`.
    pub fn value_as<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        self.value(name)?
            .downcast::<T>()
            .map_err(|_| RegistryError::ServiceType {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("factories", &self.factories.len())
            .field("values", &self.values.len())
            .field("instances", &self.instances.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Greeter {
        greeting: String,
    }

    #[test]
    fn factory_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();

        let mut registry = ServiceRegistry::new();
        registry.register("Greeter", move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Greeter {
                greeting: "hello".to_string(),
            }))
        });

        for _ in 0..3 {
            let greeter: Arc<Greeter> = registry.resolve_as("Greeter").unwrap();
            assert_eq!(greeter.greeting, "hello");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resolving_unknown_name_fails() {
        let registry = ServiceRegistry::new();
        let err = registry.resolve("Nothing").unwrap_err();
        assert!(matches!(err, RegistryError::ServiceNotFound { name } if name == "Nothing"));
    }

    #[test]
    fn factory_may_depend_on_other_services() {
        struct Inner(u32);
        struct Outer(u32);

        let mut registry = ServiceRegistry::new();
        // Registered after its dependent; resolution is lazy, so order of
        // registration does not matter for lookup.
        registry.register("Outer", |r| {
            let inner: Arc<Inner> = r.resolve_as("Inner")?;
            Ok(Arc::new(Outer(inner.0 + 1)))
        });
        registry.register("Inner", |_| Ok(Arc::new(Inner(41))));

        let outer: Arc<Outer> = registry.resolve_as("Outer").unwrap();
        assert_eq!(outer.0, 42);
    }

    #[test]
    fn mutual_recursion_is_reported_not_overflowed() {
        struct A;
        struct B;

        let mut registry = ServiceRegistry::new();
        registry.register("A", |r| {
            let _b = r.resolve("B")?;
            Ok(Arc::new(A))
        });
        registry.register("B", |r| {
            let _a = r.resolve("A")?;
            Ok(Arc::new(B))
        });

        let err = registry.resolve("A").unwrap_err();
        match err {
            RegistryError::CyclicDependency { chain } => {
                assert_eq!(chain, vec!["A", "B", "A"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn direct_cycle_chain_names_the_offender() {
        struct Selfish;

        let mut registry = ServiceRegistry::new();
        registry.register("Selfish", |r| {
            let _me = r.resolve("Selfish")?;
            Ok(Arc::new(Selfish))
        });

        let err = registry.resolve("Selfish").unwrap_err();
        assert!(err.to_string().contains("Selfish -> Selfish"));
    }

    #[test]
    fn cycle_detection_resets_after_failure() {
        struct Broken;
        struct Fine;

        let mut registry = ServiceRegistry::new();
        registry.register("Broken", |r| {
            let _me = r.resolve("Broken")?;
            Ok(Arc::new(Broken))
        });
        registry.register("Fine", |_| Ok(Arc::new(Fine)));

        assert!(registry.resolve("Broken").is_err());
        // The in-progress marker must not leak into later resolutions.
        assert!(registry.resolve("Fine").is_ok());
        assert!(registry.resolve("Broken").is_err());
    }

    #[test]
    fn last_registration_wins_and_drops_cached_instance() {
        let mut registry = ServiceRegistry::new();
        registry.register("Greeter", |_| {
            Ok(Arc::new(Greeter {
                greeting: "first".to_string(),
            }))
        });
        let first: Arc<Greeter> = registry.resolve_as("Greeter").unwrap();
        assert_eq!(first.greeting, "first");

        registry.register("Greeter", |_| {
            Ok(Arc::new(Greeter {
                greeting: "second".to_string(),
            }))
        });
        let second: Arc<Greeter> = registry.resolve_as("Greeter").unwrap();
        assert_eq!(second.greeting, "second");
    }

    #[test]
    fn values_bypass_factories() {
        let mut registry = ServiceRegistry::new();
        registry.register_value("Answer", Arc::new(42u32));

        let direct: Arc<u32> = registry.value_as("Answer").unwrap();
        assert_eq!(*direct, 42);

        // Values are visible through resolve() too.
        let resolved: Arc<u32> = registry.resolve_as("Answer").unwrap();
        assert_eq!(*resolved, 42);
    }

    #[test]
    fn typed_accessor_rejects_wrong_type() {
        let mut registry = ServiceRegistry::new();
        registry.register_value("Answer", Arc::new(42u32));

        let err = registry.value_as::<String>("Answer").unwrap_err();
        assert!(matches!(err, RegistryError::ServiceType { .. }));
    }

    #[test]
    fn contains_sees_factories_and_values() {
        let mut registry = ServiceRegistry::new();
        assert!(!registry.contains("Greeter"));

        registry.register("Greeter", |_| {
            Ok(Arc::new(Greeter {
                greeting: String::new(),
            }))
        });
        registry.register_value("Answer", Arc::new(0u32));

        assert!(registry.contains("Greeter"));
        assert!(registry.contains("Answer"));
    }

    #[test]
    fn factory_errors_propagate() {
        let mut registry = ServiceRegistry::new();
        registry.register("Flaky", |_| {
            Err(RegistryError::factory(
                "Flaky",
                std::io::Error::new(std::io::ErrorKind::Other, "boom"),
            ))
        });

        let err = registry.resolve("Flaky").unwrap_err();
        assert!(matches!(err, RegistryError::Factory { service, .. } if service == "Flaky"));
    }
}
