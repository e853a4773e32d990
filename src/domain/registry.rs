//! Name-to-constructor registries for pluggable implementations
//!
//! Both the answering backends and the API key repositories are selected by
//! a configuration name resolved once at startup. The registry stores
//! constructors rather than instances so that unconfigured implementations
//! never pay their initialization cost.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::domain::DomainError;

/// Deferred constructor for a registered implementation.
///
/// Construction is async because some implementations (the MongoDB
/// repository) perform I/O when they are built.
pub type Factory<T> = Box<dyn Fn() -> BoxFuture<'static, Result<Arc<T>, DomainError>> + Send + Sync>;

/// Maps stable implementation names to constructors.
///
/// Populated by the composition root during single-threaded startup and
/// read-only afterwards. Names are chosen by the implementation author,
/// not the caller.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    factories: HashMap<String, Factory<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry. `kind` names the capability in error
    /// messages (e.g. "backend", "API key repository").
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            factories: HashMap::new(),
        }
    }

    /// Register a constructor under a unique name.
    ///
    /// A second registration under the same name fails fast instead of
    /// silently replacing the first.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), DomainError>
    where
        F: Fn() -> BoxFuture<'static, Result<Arc<T>, DomainError>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(DomainError::configuration(format!(
                "{} '{}' is already registered",
                self.kind, name
            )));
        }
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// Get the constructor registered under `name`.
    pub fn get(&self, name: &str) -> Result<&Factory<T>, DomainError> {
        self.factories.get(name).ok_or_else(|| {
            DomainError::configuration(format!(
                "No {} registered under name '{}' (available: {})",
                self.kind,
                name,
                self.list().join(", ")
            ))
        })
    }

    /// Construct the implementation registered under `name`.
    pub async fn resolve(&self, name: &str) -> Result<Arc<T>, DomainError> {
        self.get(name)?().await
    }

    /// All registered names, for diagnostics.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<T: ?Sized> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    trait Named: Send + Sync + std::fmt::Debug {
        fn name(&self) -> &'static str;
    }

    #[derive(Debug)]
    struct Alpha;
    #[derive(Debug)]
    struct Beta;

    impl Named for Alpha {
        fn name(&self) -> &'static str {
            "alpha"
        }
    }

    impl Named for Beta {
        fn name(&self) -> &'static str {
            "beta"
        }
    }

    fn test_registry() -> Registry<dyn Named> {
        let mut registry: Registry<dyn Named> = Registry::new("widget");
        registry
            .register("alpha", || async { Ok(Arc::new(Alpha) as Arc<dyn Named>) }.boxed())
            .unwrap();
        registry
            .register("beta", || async { Ok(Arc::new(Beta) as Arc<dyn Named>) }.boxed())
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_resolve_registered_name() {
        let registry = test_registry();

        let widget = registry.resolve("alpha").await.unwrap();
        assert_eq!(widget.name(), "alpha");

        let widget = registry.resolve("beta").await.unwrap();
        assert_eq!(widget.name(), "beta");
    }

    #[tokio::test]
    async fn test_unknown_name_is_configuration_error() {
        let registry = test_registry();

        let err = registry.resolve("gamma").await.unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
        assert!(err.to_string().contains("gamma"));
        // Diagnostics include what is actually available
        assert!(err.to_string().contains("alpha"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = test_registry();

        let err = registry
            .register("alpha", || async { Ok(Arc::new(Alpha) as Arc<dyn Named>) }.boxed())
            .unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
    }

    #[test]
    fn test_list_returns_sorted_names() {
        let registry = test_registry();
        assert_eq!(registry.list(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_construction_is_deferred() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

        let mut registry: Registry<dyn Named> = Registry::new("widget");
        registry
            .register("counted", || {
                async {
                    CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(Alpha) as Arc<dyn Named>)
                }
                .boxed()
            })
            .unwrap();

        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 0);
        registry.resolve("counted").await.unwrap();
        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
    }
}
