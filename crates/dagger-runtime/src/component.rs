//! Component instances.
//!
//! A [`ComponentInstance`] executes a [`ComponentImplementation`] the way
//! the emitted component class would: every factory specification becomes a
//! provider, scoped providers retain their instance in a memoization cell of
//! the owning component, and deferred parameters receive [`Provider`] or
//! [`Lazy`](crate::Lazy) handles instead of instances.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use tracing::{debug, trace};

use dagger_codegen::{
    ComponentImplementation, EntryPointBody, FactoryBody, FactorySpecification,
    MemoizationStrategy,
};
use dagger_model::declaration::MapKey;
use dagger_model::{BindingKey, BindingKind, ComponentPath};

use crate::error::{Result, RuntimeError};
use crate::handle::{Argument, Arguments, Provider};
use crate::memo::{Instance, Memo, relock};
use crate::registry::ConstructorRegistry;

/// Elements of a multibound `Set<T>`.
pub type SetValues = Vec<Instance>;

/// Entries of a multibound `Map<K, V>`, in contribution order. Values of
/// `Map<K, Provider<V>>` are [`Provider`] handles.
pub type MapValues = IndexMap<MapKey, Instance>;

/// Value of an `Optional<T>` binding.
pub type OptionalValue = Option<Instance>;

/// Instances a component is created with: `@BindsInstance` values and
/// component dependencies.
#[derive(Debug, Clone, Default)]
pub struct BoundInstances {
    values: IndexMap<BindingKey, Instance>,
}

impl BoundInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, key: BindingKey, instance: Instance) -> Self {
        self.values.insert(key, instance);
        self
    }

    pub fn get(&self, key: &BindingKey) -> Option<&Instance> {
        self.values.get(key)
    }
}

/// Generated implementations plus the user code they call.
#[derive(Debug, Default)]
pub struct Runtime {
    implementations: IndexMap<String, Arc<ComponentImplementation>>,
    registry: ConstructorRegistry,
}

impl Runtime {
    pub fn new(registry: ConstructorRegistry) -> Self {
        Self {
            implementations: IndexMap::new(),
            registry,
        }
    }

    pub fn with_implementation(mut self, implementation: ComponentImplementation) -> Self {
        self.add(implementation);
        self
    }

    pub fn add(&mut self, implementation: ComponentImplementation) {
        self.implementations
            .insert(implementation.class_name.clone(), Arc::new(implementation));
    }

    pub fn registry(&self) -> &ConstructorRegistry {
        &self.registry
    }

    pub fn implementation(&self, class_name: &str) -> Result<&Arc<ComponentImplementation>> {
        self.implementations
            .get(class_name)
            .ok_or_else(|| RuntimeError::UnknownComponent(class_name.to_string()))
    }

    /// Creates a root component instance, e.g. `DaggerAppComponent`.
    pub fn create(
        self: &Arc<Self>,
        class_name: &str,
        inputs: BoundInstances,
    ) -> Result<Arc<ComponentInstance>> {
        let implementation = Arc::clone(self.implementation(class_name)?);
        Ok(ComponentInstance::new(
            Arc::clone(self),
            implementation,
            None,
            inputs,
        ))
    }
}

/// A live component.
pub struct ComponentInstance {
    runtime: Arc<Runtime>,
    implementation: Arc<ComponentImplementation>,
    parent: Option<Arc<ComponentInstance>>,
    inputs: BoundInstances,
    positions: IndexMap<BindingKey, usize>,
    cells: Mutex<IndexMap<BindingKey, Arc<Memo>>>,
}

impl ComponentInstance {
    fn new(
        runtime: Arc<Runtime>,
        implementation: Arc<ComponentImplementation>,
        parent: Option<Arc<ComponentInstance>>,
        inputs: BoundInstances,
    ) -> Arc<Self> {
        let positions = implementation
            .factories
            .iter()
            .enumerate()
            .map(|(position, factory)| (factory.key.clone(), position))
            .collect();
        debug!(
            component = %implementation.class_name,
            factories = implementation.factories.len(),
            "created component instance"
        );
        Arc::new(Self {
            runtime,
            implementation,
            parent,
            inputs,
            positions,
            cells: Mutex::new(IndexMap::new()),
        })
    }

    pub fn path(&self) -> &ComponentPath {
        &self.implementation.component
    }

    pub fn implementation(&self) -> &ComponentImplementation {
        &self.implementation
    }

    pub fn parent(&self) -> Option<&Arc<ComponentInstance>> {
        self.parent.as_ref()
    }

    /// Provides `key` from this component or the nearest ancestor that
    /// has a provider for it.
    pub fn instance(self: &Arc<Self>, key: &BindingKey) -> Result<Instance> {
        if let Some(&position) = self.positions.get(key) {
            return self.produce(position);
        }
        match &self.parent {
            Some(parent) => parent.instance(key),
            None => Err(RuntimeError::UnknownKey {
                component: self.path().clone(),
                key: key.clone(),
            }),
        }
    }

    /// The instance of `key` downcast to `T`.
    pub fn get<T: Any + Send + Sync>(self: &Arc<Self>, key: &BindingKey) -> Result<Arc<T>> {
        self.instance(key)?
            .downcast::<T>()
            .map_err(|_| RuntimeError::TypeMismatch {
                key: key.clone(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn provider(self: &Arc<Self>, key: &BindingKey) -> Provider {
        Provider::new(self, key.clone())
    }

    /// Calls the entry point method `name`.
    pub fn entry_point(self: &Arc<Self>, name: &str) -> Result<Argument> {
        let entry = self
            .implementation
            .entry_points
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| RuntimeError::UnknownEntryPoint {
                component: self.path().clone(),
                name: name.to_string(),
            })?;
        match &entry.body {
            EntryPointBody::Provision { key, request } => Argument::request(self, key, *request),
            EntryPointBody::MembersInjection { key } => Ok(Argument::Instance(self.instance(key)?)),
            EntryPointBody::SubcomponentFactory { component } => {
                let child = self.subcomponent(component, BoundInstances::new())?;
                Ok(Argument::Instance(child as Instance))
            }
        }
    }

    /// Creates the subcomponent implemented by `class_name` below this
    /// instance.
    pub fn subcomponent(
        self: &Arc<Self>,
        class_name: &str,
        inputs: BoundInstances,
    ) -> Result<Arc<ComponentInstance>> {
        let implementation = Arc::clone(self.runtime.implementation(class_name)?);
        Ok(ComponentInstance::new(
            Arc::clone(&self.runtime),
            implementation,
            Some(Arc::clone(self)),
            inputs,
        ))
    }

    fn produce(self: &Arc<Self>, position: usize) -> Result<Instance> {
        let factory = self.dispatch(&self.implementation.factories[position])?;
        match factory.body.memoization() {
            Some(strategy) => {
                let cell = self.owner(&factory.owner).cell(&factory.key, strategy);
                cell.get_or_init(|| self.construct(factory))
            }
            None => self.construct(factory),
        }
    }

    /// Resolves a switch case to the factory it selects.
    fn dispatch<'a>(&'a self, factory: &'a FactorySpecification) -> Result<&'a FactorySpecification> {
        let FactoryBody::SwitchCase { provider, case, .. } = &factory.body else {
            return Ok(factory);
        };
        self.implementation
            .switching_providers
            .iter()
            .find(|p| p.name == *provider)
            .and_then(|p| p.cases.get(*case))
            .and_then(|name| self.implementation.factory_named(name))
            .ok_or_else(|| RuntimeError::UnknownKey {
                component: self.path().clone(),
                key: factory.key.clone(),
            })
    }

    fn construct(self: &Arc<Self>, factory: &FactorySpecification) -> Result<Instance> {
        trace!(component = %self.implementation.class_name, provider = %factory.name, "constructing");

        let mut arguments = Vec::with_capacity(factory.parameters.len());
        for parameter in &factory.parameters {
            let target = self.owner(&parameter.provided_by);
            arguments.push(Argument::request(&target, &parameter.key, parameter.kind)?);
        }

        match factory.binding_kind {
            BindingKind::Injection
            | BindingKind::Provision
            | BindingKind::MembersInjector
            | BindingKind::ComponentProvision => {
                let name = factory.factory.as_deref().unwrap_or(&factory.name);
                let constructor = self.runtime.registry.get(name)?;
                constructor(&Arguments::new(name, arguments))
            }
            BindingKind::Delegate => arguments
                .into_iter()
                .next()
                .map(Argument::into_instance)
                .ok_or_else(|| RuntimeError::MissingInstance {
                    key: factory.key.clone(),
                }),
            BindingKind::MultiboundSet => {
                let mut values = SetValues::new();
                for (parameter, argument) in factory.parameters.iter().zip(arguments) {
                    let value = argument.into_instance();
                    if parameter.elements {
                        let elements = value.downcast::<SetValues>().map_err(|_| {
                            RuntimeError::ArgumentMismatch {
                                factory: factory.name.clone(),
                                index: values.len(),
                                expected: "a set of elements",
                            }
                        })?;
                        values.extend(elements.iter().cloned());
                    } else {
                        values.push(value);
                    }
                }
                Ok(Arc::new(values) as Instance)
            }
            BindingKind::MultiboundMap => {
                let mut entries = MapValues::new();
                for (parameter, argument) in factory.parameters.iter().zip(arguments) {
                    let map_key = parameter.map_key.clone().ok_or_else(|| {
                        RuntimeError::MissingMapKey {
                            key: parameter.key.clone(),
                        }
                    })?;
                    entries.insert(map_key, argument.into_instance());
                }
                Ok(Arc::new(entries) as Instance)
            }
            BindingKind::Optional => {
                let value: OptionalValue = arguments.into_iter().next().map(Argument::into_instance);
                Ok(Arc::new(value) as Instance)
            }
            BindingKind::BoundInstance | BindingKind::ComponentDependency => self
                .inputs
                .get(&factory.key)
                .cloned()
                .ok_or_else(|| RuntimeError::MissingInstance {
                    key: factory.key.clone(),
                }),
            BindingKind::Component => {
                let component = self
                    .lineage()
                    .find(|c| c.path().leaf() == factory.origin.owner)
                    .unwrap_or_else(|| Arc::clone(self));
                Ok(component as Instance)
            }
            BindingKind::SubcomponentCreator => {
                let component = factory.factory.clone().ok_or_else(|| {
                    RuntimeError::UnknownComponent(factory.key.ty.to_string())
                })?;
                Ok(Arc::new(SubcomponentCreator {
                    parent: Arc::clone(self),
                    component,
                }) as Instance)
            }
        }
    }

    /// This instance followed by its ancestors.
    fn lineage(self: &Arc<Self>) -> impl Iterator<Item = Arc<ComponentInstance>> {
        std::iter::successors(Some(Arc::clone(self)), |c| c.parent.clone())
    }

    /// The instance at `path` in this lineage.
    fn owner(self: &Arc<Self>, path: &ComponentPath) -> Arc<ComponentInstance> {
        self.lineage()
            .find(|c| c.path() == path)
            .unwrap_or_else(|| Arc::clone(self))
    }

    fn cell(&self, key: &BindingKey, strategy: MemoizationStrategy) -> Arc<Memo> {
        let mut cells = relock(&self.cells);
        Arc::clone(
            cells
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Memo::new(strategy, key.clone()))),
        )
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("component", &self.implementation.class_name)
            .field("path", self.path())
            .finish_non_exhaustive()
    }
}

/// Builder or factory of a subcomponent, bound as its creator type.
#[derive(Debug)]
pub struct SubcomponentCreator {
    parent: Arc<ComponentInstance>,
    component: String,
}

impl SubcomponentCreator {
    /// Class name of the subcomponent implementation.
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn create(&self, inputs: BoundInstances) -> Result<Arc<ComponentInstance>> {
        self.parent.subcomponent(&self.component, inputs)
    }
}
