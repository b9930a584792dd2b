//! Deferred handles and factory arguments.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use dagger_model::{BindingKey, ComponentPath, RequestKind};

use crate::component::ComponentInstance;
use crate::error::{Result, RuntimeError};
use crate::memo::{DoubleCheck, Instance};

/// `Provider<T>`: resolves its key on every call.
///
/// Scoped keys still return their memoized instance. The handle does not
/// keep its component alive.
#[derive(Clone)]
pub struct Provider {
    component: Weak<ComponentInstance>,
    path: ComponentPath,
    key: BindingKey,
}

impl Provider {
    pub(crate) fn new(component: &Arc<ComponentInstance>, key: BindingKey) -> Self {
        Self {
            component: Arc::downgrade(component),
            path: component.path().clone(),
            key,
        }
    }

    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    pub fn get(&self) -> Result<Instance> {
        let component = self
            .component
            .upgrade()
            .ok_or_else(|| RuntimeError::ComponentReleased(self.path.clone()))?;
        component.instance(&self.key)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provider<{}>", self.key)
    }
}

/// `Lazy<T>`: resolves its key on first use and returns that instance
/// afterwards.
#[derive(Debug)]
pub struct Lazy {
    provider: Provider,
    value: DoubleCheck,
}

impl Lazy {
    pub fn new(provider: Provider) -> Self {
        let value = DoubleCheck::new(provider.key.clone());
        Self { provider, value }
    }

    pub fn get(&self) -> Result<Instance> {
        self.value.get_or_init(|| self.provider.get())
    }
}

/// One value handed to a constructor, shaped by its request kind.
#[derive(Debug, Clone)]
pub enum Argument {
    Instance(Instance),
    Provider(Provider),
    Lazy(Arc<Lazy>),
    /// `Provider<Lazy<T>>`: every call yields a fresh [`Lazy`].
    ProviderOfLazy(Provider),
}

impl Argument {
    pub(crate) fn request(
        component: &Arc<ComponentInstance>,
        key: &BindingKey,
        kind: RequestKind,
    ) -> Result<Self> {
        Ok(match kind {
            RequestKind::Instance | RequestKind::MembersInjection => {
                Argument::Instance(component.instance(key)?)
            }
            RequestKind::Provider => Argument::Provider(Provider::new(component, key.clone())),
            RequestKind::Lazy => {
                Argument::Lazy(Arc::new(Lazy::new(Provider::new(component, key.clone()))))
            }
            RequestKind::ProviderOfLazy => {
                Argument::ProviderOfLazy(Provider::new(component, key.clone()))
            }
        })
    }

    /// The argument as a provided value. Handles are boxed as instances.
    pub fn into_instance(self) -> Instance {
        match self {
            Argument::Instance(instance) => instance,
            Argument::Provider(provider) | Argument::ProviderOfLazy(provider) => {
                Arc::new(provider) as Instance
            }
            Argument::Lazy(lazy) => lazy as Instance,
        }
    }
}

/// Arguments of one factory invocation, in parameter order.
#[derive(Debug)]
pub struct Arguments {
    factory: String,
    values: Vec<Argument>,
}

impl Arguments {
    pub fn new(factory: impl Into<String>, values: Vec<Argument>) -> Self {
        Self {
            factory: factory.into(),
            values,
        }
    }

    pub fn factory(&self) -> &str {
        &self.factory
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.values.get(index)
    }

    pub fn instance(&self, index: usize) -> Result<Instance> {
        match self.values.get(index) {
            Some(Argument::Instance(instance)) => Ok(Arc::clone(instance)),
            _ => Err(self.mismatch(index, "an instance")),
        }
    }

    /// The instance at `index` downcast to `T`.
    pub fn downcast<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>> {
        self.instance(index)?
            .downcast::<T>()
            .map_err(|_| self.mismatch(index, std::any::type_name::<T>()))
    }

    pub fn provider(&self, index: usize) -> Result<Provider> {
        match self.values.get(index) {
            Some(Argument::Provider(provider)) => Ok(provider.clone()),
            _ => Err(self.mismatch(index, "a provider")),
        }
    }

    pub fn lazy(&self, index: usize) -> Result<Arc<Lazy>> {
        match self.values.get(index) {
            Some(Argument::Lazy(lazy)) => Ok(Arc::clone(lazy)),
            Some(Argument::ProviderOfLazy(provider)) => Ok(Arc::new(Lazy::new(provider.clone()))),
            _ => Err(self.mismatch(index, "a lazy handle")),
        }
    }

    fn mismatch(&self, index: usize, expected: &'static str) -> RuntimeError {
        RuntimeError::ArgumentMismatch {
            factory: self.factory.clone(),
            index,
            expected,
        }
    }
}
