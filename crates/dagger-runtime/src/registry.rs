//! Constructor registry.
//!
//! Generated factories call user code: `@Inject` constructors, `@Provides`
//! methods, members injectors and component dependency methods. At runtime
//! each of these is a closure registered under the factory name the code
//! generator assigned (`Database_Factory`, `AppModule_ProvideClockFactory`,
//! `app.Deps#clock()`).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Result, RuntimeError};
use crate::handle::Arguments;
use crate::memo::Instance;

/// User code invoked by a factory.
pub type Constructor = Arc<dyn Fn(&Arguments) -> Result<Instance> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ConstructorRegistry {
    constructors: IndexMap<String, Constructor>,
}

impl ConstructorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `factory`, replacing any earlier one.
    pub fn register<F>(&mut self, factory: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&Arguments) -> Result<Instance> + Send + Sync + 'static,
    {
        self.constructors
            .insert(factory.into(), Arc::new(constructor));
        self
    }

    pub fn with<F>(mut self, factory: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Instance> + Send + Sync + 'static,
    {
        self.register(factory, constructor);
        self
    }

    pub fn get(&self, factory: &str) -> Result<&Constructor> {
        self.constructors
            .get(factory)
            .ok_or_else(|| RuntimeError::MissingConstructor {
                factory: factory.to_string(),
            })
    }

    pub fn contains(&self, factory: &str) -> bool {
        self.constructors.contains_key(factory)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl fmt::Debug for ConstructorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorRegistry")
            .field("constructors", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_factory_name() {
        let registry = ConstructorRegistry::new()
            .with("Clock_Factory", |_| Ok(Arc::new(42u64) as Instance));

        assert!(registry.contains("Clock_Factory"));
        let constructor = registry.get("Clock_Factory").unwrap();
        let value = constructor(&Arguments::new("Clock_Factory", Vec::new())).unwrap();
        assert_eq!(value.downcast_ref::<u64>(), Some(&42));
    }

    #[test]
    fn test_missing_constructor() {
        let registry = ConstructorRegistry::new();
        assert!(matches!(
            registry.get("Database_Factory"),
            Err(RuntimeError::MissingConstructor { factory }) if factory == "Database_Factory"
        ));
    }
}
