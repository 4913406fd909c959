use std::{any::Any, sync::Arc};

use crate::types::{DynError, Instance, Key, TypeInfo};

/// Invocation handle: how to actually call the underlying factory or
/// constructor, opaque to the resolution engine. The first argument is the
/// owning module (or component dependency) instance, `None` for static and
/// constructor kinds. Arguments arrive in declared parameter order; a `None`
/// argument is a null produced by a nullable dependency.
pub type ProduceFn = Arc<
    dyn Fn(Option<&(dyn Any + Send + Sync)>, &[Option<Instance>]) -> Result<Option<Instance>, DynError>
        + Send
        + Sync,
>;

/// Converts a delegation target's value into the aliased key's shape,
/// e.g. wrapping a concrete service as a trait object.
pub type AdaptFn = Arc<dyn Fn(Instance) -> Result<Instance, DynError> + Send + Sync>;

/// Builds the optional-typed value for an optional binding: `None` means the
/// underlying key has no binding at all.
pub type WrapOptionalFn = Arc<dyn Fn(Option<Instance>) -> Result<Instance, DynError> + Send + Sync>;

/// One resolved set contribution, in declaration order.
pub enum SetContributionValue {
    /// A single element
    Single(Instance),
    /// A collection of elements to be merged into the set
    Elements(Instance),
}

/// Builds the concrete set value from resolved contributions. Element
/// equality (and therefore union semantics) belongs to the element type,
/// which only the front end knows.
pub type CollectSetFn =
    Arc<dyn Fn(Vec<SetContributionValue>) -> Result<Instance, DynError> + Send + Sync>;

/// Builds the concrete map value from entries the engine has already
/// ordered by key literal. For deferred maps each entry's value wraps a
/// [`Provider`](crate::provider::Provider).
pub type CollectMapFn =
    Arc<dyn Fn(Vec<(String, Instance)>) -> Result<Instance, DynError> + Send + Sync>;

/// A single declaration of the language-neutral binding declaration set,
/// as produced by an external front end.
#[derive(Clone)]
pub struct BindingDeclaration {
    pub key: Key,
    pub kind: DeclarationKind,
    pub scope: Option<&'static str>,
    pub nullable: bool,
    /// Human-readable source location, used only for diagnostics
    pub origin: String,
}

#[derive(Clone)]
pub enum DeclarationKind {
    /// A type's designated constructor; eligible for just-in-time synthesis
    /// when referenced without an explicit binding.
    Constructor {
        dependencies: Vec<Key>,
        produce: ProduceFn,
    },
    /// A factory method on a module; `requires_instance` distinguishes
    /// instance-level methods from static ones.
    Provider {
        requires_instance: bool,
        dependencies: Vec<Key>,
        produce: ProduceFn,
    },
    /// A concrete value supplied from outside the graph
    Instance { value: Option<Instance> },
    /// Aliases another key's binding
    Delegate {
        target: Key,
        adapt: Option<AdaptFn>,
    },
    /// Present/absent wrapper around another key
    Optional {
        target: Key,
        wrap: WrapOptionalFn,
    },
    /// Declares a set-valued key and how to build its concrete value
    SetBinding { collect: CollectSetFn },
    /// Contributes one element to a set-valued key
    IntoSet {
        requires_instance: bool,
        dependencies: Vec<Key>,
        produce: ProduceFn,
    },
    /// Contributes a collection of elements to a set-valued key
    ElementsIntoSet {
        requires_instance: bool,
        dependencies: Vec<Key>,
        produce: ProduceFn,
    },
    /// Declares a map-valued key; `deferred` maps hold a supplier per entry
    MapBinding {
        collect: CollectMapFn,
        deferred: bool,
    },
    /// Contributes one entry to a map-valued key
    IntoMap {
        map_key: String,
        requires_instance: bool,
        dependencies: Vec<Key>,
        produce: ProduceFn,
    },
}

impl BindingDeclaration {
    pub fn new(key: Key, origin: impl Into<String>, kind: DeclarationKind) -> Self {
        BindingDeclaration {
            key,
            kind,
            scope: None,
            nullable: false,
            origin: origin.into(),
        }
    }

    pub fn scoped(mut self, scope: &'static str) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Indexed form of a declaration. Aggregate kinds collapse many
/// contributions into one binding.
#[derive(Clone)]
pub(crate) struct Binding {
    pub key: Key,
    pub scope: Option<&'static str>,
    pub nullable: bool,
    pub origin: String,
    pub kind: BindingKind,
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            BindingKind::Provider { .. } => "Provider",
            BindingKind::Instance { .. } => "Instance",
            BindingKind::Delegate { .. } => "Delegate",
            BindingKind::Optional { .. } => "Optional",
            BindingKind::Set { .. } => "Set",
            BindingKind::Map { .. } => "Map",
        };
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("nullable", &self.nullable)
            .field("origin", &self.origin)
            .field("kind", &kind)
            .finish()
    }
}

#[derive(Clone)]
pub(crate) enum BindingKind {
    Provider {
        module: Option<TypeInfo>,
        dependencies: Vec<Key>,
        produce: ProduceFn,
        /// Apply member injection to the freshly constructed value
        /// (constructor bindings only)
        inject_members: bool,
    },
    Instance {
        value: Option<Instance>,
    },
    Delegate {
        target: Key,
        adapt: Option<AdaptFn>,
    },
    Optional {
        target: Key,
        wrap: WrapOptionalFn,
    },
    Set {
        contributions: Vec<SetContribution>,
        collect: CollectSetFn,
    },
    Map {
        entries: Vec<MapEntry>,
        collect: CollectMapFn,
        deferred: bool,
    },
}

#[derive(Clone)]
pub(crate) struct SetContribution {
    pub origin: String,
    pub module: Option<TypeInfo>,
    pub dependencies: Vec<Key>,
    pub produce: ProduceFn,
    /// Contribution yields a collection of elements rather than one
    pub elements: bool,
}

#[derive(Clone)]
pub(crate) struct MapEntry {
    pub literal: String,
    pub origin: String,
    pub module: Option<TypeInfo>,
    pub dependencies: Vec<Key>,
    pub produce: ProduceFn,
}
