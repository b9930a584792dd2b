//! Factory specifications.
//!
//! These are the language-neutral descriptions handed to the emission
//! stage: what each generated provider is called, which keys it consumes,
//! and how its body obtains an instance. Nothing here contains source text.

use serde::{Deserialize, Serialize};

use dagger_model::binding::BindingKind;
use dagger_model::component::ComponentPath;
use dagger_model::declaration::MapKey;
use dagger_model::foundation::{BindingKey, DeclarationId, RequestKind};

/// How a scoped provider retains its instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemoizationStrategy {
    /// Lock-guarded lazy initialisation; one instance per component.
    DoubleCheck,
    /// Atomic publish without locking; used for `@Reusable`.
    SingleCheck,
}

/// How a provider's body obtains an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum FactoryBody {
    /// Calls the factory every time.
    DirectCall,
    /// Backing field initialised at most once.
    MemoizedField {
        strategy: MemoizationStrategy,
        field: String,
    },
    /// One case of an indexed switching provider.
    SwitchCase {
        provider: String,
        case: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        memoization: Option<MemoizationStrategy>,
    },
}

impl FactoryBody {
    pub fn memoization(&self) -> Option<MemoizationStrategy> {
        match self {
            FactoryBody::DirectCall => None,
            FactoryBody::MemoizedField { strategy, .. } => Some(*strategy),
            FactoryBody::SwitchCase { memoization, .. } => *memoization,
        }
    }
}

/// One input of a factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    pub key: BindingKey,
    pub kind: RequestKind,
    /// Component whose provider supplies the key.
    pub provided_by: ComponentPath,
    /// Map key of a map contribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_key: Option<MapKey>,
    /// `@ElementsIntoSet` contribution whose elements are merged.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub elements: bool,
}

/// A generated provider for one binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorySpecification {
    /// Provider name, unique within its component.
    pub name: String,
    pub key: BindingKey,
    pub binding_kind: BindingKind,
    pub origin: DeclarationId,
    /// User code the body invokes: a generated factory class such as
    /// `AppModule_ProvideClockFactory`, or a component dependency method.
    /// For subcomponent creators, the implementation they create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<String>,
    /// Component whose instance retains memoized values.
    pub owner: ComponentPath,
    pub parameters: Vec<ParameterSpec>,
    pub body: FactoryBody,
    pub shard: usize,
}

/// What an entry point method returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum EntryPointBody {
    Provision { key: BindingKey, request: RequestKind },
    MembersInjection { key: BindingKey },
    /// Creates the named subcomponent implementation.
    SubcomponentFactory { component: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPointSpec {
    pub id: DeclarationId,
    pub name: String,
    pub body: EntryPointBody,
}

/// A switching provider dispatching over consecutive factories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchingProvider {
    pub name: String,
    /// Provider names, indexed by case.
    pub cases: Vec<String>,
}

/// A slice of a large component's factories emitted as its own class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shard {
    pub name: String,
    pub factories: Vec<String>,
}

/// Whether providers are fields or switch cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DispatchMode {
    Direct,
    Switching,
}

/// Everything the emission stage needs for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentImplementation {
    pub component: ComponentPath,
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub dispatch: DispatchMode,
    /// Providers in dependency order: every instance parameter is produced
    /// before the factory that consumes it.
    pub factories: Vec<FactorySpecification>,
    pub entry_points: Vec<EntryPointSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub switching_providers: Vec<SwitchingProvider>,
    pub shards: Vec<Shard>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcomponents: Vec<String>,
}

impl ComponentImplementation {
    pub fn factory(&self, key: &BindingKey) -> Option<&FactorySpecification> {
        self.factories.iter().find(|f| f.key == *key)
    }

    pub fn factory_named(&self, name: &str) -> Option<&FactorySpecification> {
        self.factories.iter().find(|f| f.name == name)
    }
}
