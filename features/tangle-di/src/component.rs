use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use crate::{
    binding::{BindingDeclaration, ProduceFn},
    errors::{BuildError, DeclarationError, ResolveError, StructuralError},
    inject::InjectionTarget,
    module::{flatten_modules, ModuleDescriptor},
    provider::Provider,
    registry::IndexBuilder,
    resolver::{ResolverCore, ResolverHandle},
    scope::ScopeCache,
    types::{DynError, Injectable, Instance, Key, TypeInfo},
};

/// One key a component dependency exposes through an accessor
#[derive(Clone)]
pub struct ProvidedKey {
    pub key: Key,
    pub origin: String,
    pub produce: ProduceFn,
}

/// A declared component dependency: an externally supplied object whose
/// accessors contribute bindings to the graph.
#[derive(Clone)]
pub struct DependencyDescriptor {
    pub type_info: TypeInfo,
    pub provides: Vec<ProvidedKey>,
}

impl DependencyDescriptor {
    pub fn new<D: 'static>() -> Self {
        DependencyDescriptor {
            type_info: TypeInfo::of::<D>(),
            provides: Vec::new(),
        }
    }

    /// Exposes `key` via an accessor on the dependency instance
    pub fn provides<D: Injectable, T: Injectable>(
        mut self,
        key: Key,
        origin: impl Into<String>,
        get: impl Fn(&D) -> T + Send + Sync + 'static,
    ) -> Self {
        self.provides.push(ProvidedKey {
            key,
            origin: origin.into(),
            produce: Arc::new(move |dependency, _| {
                let dependency = dependency
                    .and_then(|value| value.downcast_ref::<D>())
                    .ok_or_else(|| -> DynError {
                        "component dependency instance has an unexpected type".into()
                    })?;
                Ok(Some(Instance::new(get(dependency))))
            }),
        });
        self
    }
}

/// A key whose value the builder supplies directly
#[derive(Clone, Copy)]
pub struct BoundInstance {
    pub key: Key,
    pub nullable: bool,
}

/// Declared return shape of a members-injection method
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum InjectorReturn {
    Unit,
    Target,
    Other,
}

/// A component method that mutates an externally constructed instance
#[derive(Clone)]
pub struct MembersInjector {
    pub name: String,
    pub target: TypeInfo,
    pub returns: InjectorReturn,
}

impl MembersInjector {
    pub fn new<T: 'static>(name: impl Into<String>, returns: InjectorReturn) -> Self {
        MembersInjector {
            name: name.into(),
            target: TypeInfo::of::<T>(),
            returns,
        }
    }
}

/// Shape of a component's builder as the front end extracted it
#[derive(Clone)]
pub struct BuilderDescriptor {
    pub name: String,
    pub is_interface: bool,
    pub has_marker: bool,
    pub module_setters: Vec<(&'static str, TypeInfo)>,
    pub dependency_setters: Vec<(&'static str, TypeInfo)>,
    pub instance_setters: Vec<(&'static str, Key)>,
}

impl BuilderDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        BuilderDescriptor {
            name: name.into(),
            is_interface: true,
            has_marker: true,
            module_setters: Vec::new(),
            dependency_setters: Vec::new(),
            instance_setters: Vec::new(),
        }
    }

    pub fn module_setter<M: 'static>(mut self, name: &'static str) -> Self {
        self.module_setters.push((name, TypeInfo::of::<M>()));
        self
    }

    pub fn dependency_setter<D: 'static>(mut self, name: &'static str) -> Self {
        self.dependency_setters.push((name, TypeInfo::of::<D>()));
        self
    }

    pub fn instance_setter(mut self, name: &'static str, key: Key) -> Self {
        self.instance_setters.push((name, key));
        self
    }
}

/// Root contract of a graph: requested keys, injection targets, activated
/// modules, declared dependencies, and builder requirements.
#[derive(Clone)]
pub struct ComponentDescriptor {
    pub name: String,
    pub is_interface: bool,
    pub has_marker: bool,
    pub is_public: bool,
    pub scope: Option<&'static str>,
    pub modules: Vec<ModuleDescriptor>,
    pub dependencies: Vec<DependencyDescriptor>,
    pub bound_instances: Vec<BoundInstance>,
    pub accessors: Vec<Key>,
    pub members_injectors: Vec<MembersInjector>,
    pub injection_targets: Vec<InjectionTarget>,
    pub constructibles: Vec<BindingDeclaration>,
    pub builder: Option<BuilderDescriptor>,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        ComponentDescriptor {
            name: name.into(),
            is_interface: true,
            has_marker: true,
            is_public: true,
            scope: None,
            modules: Vec::new(),
            dependencies: Vec::new(),
            bound_instances: Vec::new(),
            accessors: Vec::new(),
            members_injectors: Vec::new(),
            injection_targets: Vec::new(),
            constructibles: Vec::new(),
            builder: None,
        }
    }

    pub fn scope(mut self, scope: &'static str) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn module(mut self, module: ModuleDescriptor) -> Self {
        self.modules.push(module);
        self
    }

    pub fn dependency(mut self, dependency: DependencyDescriptor) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn bound_instance(mut self, key: Key, nullable: bool) -> Self {
        self.bound_instances.push(BoundInstance { key, nullable });
        self
    }

    pub fn accessor(mut self, key: Key) -> Self {
        self.accessors.push(key);
        self
    }

    pub fn members_injector(mut self, injector: MembersInjector) -> Self {
        self.members_injectors.push(injector);
        self
    }

    pub fn injection_target(mut self, target: InjectionTarget) -> Self {
        self.injection_targets.push(target);
        self
    }

    pub fn constructible(mut self, declaration: BindingDeclaration) -> Self {
        self.constructibles.push(declaration);
        self
    }

    pub fn builder_shape(mut self, builder: BuilderDescriptor) -> Self {
        self.builder = Some(builder);
        self
    }

    /// Zero-argument instantiation. Only permitted when the component
    /// declares no inputs a builder would have to supply.
    pub fn create(self) -> Result<Component, BuildError> {
        self.validate_structure()?;
        if !self.dependencies.is_empty() {
            let dependencies = self
                .dependencies
                .iter()
                .map(|d| d.type_info.type_name)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(StructuralError::RequiresBuilder {
                name: self.name.clone(),
                dependencies,
            }
            .into());
        }
        Component::assemble(Arc::new(self), BuilderInputs::default())
    }

    /// Starts explicit assembly through the component's builder
    pub fn builder(self) -> Result<ComponentBuilder, BuildError> {
        self.validate_structure()?;
        if let Some(builder) = &self.builder {
            Self::validate_builder_structure(builder)?;
        }
        Ok(ComponentBuilder {
            descriptor: Arc::new(self),
            inputs: BuilderInputs::default(),
        })
    }

    fn validate_structure(&self) -> Result<(), StructuralError> {
        if !self.is_interface {
            return Err(StructuralError::ComponentNotAnInterface(self.name.clone()));
        }
        if !self.has_marker {
            return Err(StructuralError::MissingComponentMarker(self.name.clone()));
        }
        if !self.is_public {
            return Err(StructuralError::ComponentNotPublic(self.name.clone()));
        }
        Ok(())
    }

    fn validate_builder_structure(builder: &BuilderDescriptor) -> Result<(), StructuralError> {
        if !builder.is_interface {
            return Err(StructuralError::BuilderNotAnInterface(builder.name.clone()));
        }
        if !builder.has_marker {
            return Err(StructuralError::MissingBuilderMarker(builder.name.clone()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct BuilderInputs {
    modules: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    dependencies: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    instances: HashMap<Key, Option<Instance>>,
}

/// Collects builder-supplied inputs before assembly. Setters are
/// last-write-wins; a setter for something the graph does not require is
/// rejected at the call.
pub struct ComponentBuilder {
    descriptor: Arc<ComponentDescriptor>,
    inputs: BuilderInputs,
}

impl std::fmt::Debug for ComponentBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentBuilder")
            .field("modules", &self.inputs.modules.len())
            .field("dependencies", &self.inputs.dependencies.len())
            .field("instances", &self.inputs.instances.len())
            .finish()
    }
}

impl ComponentBuilder {
    pub fn module<M: Injectable>(mut self, instance: M) -> Result<Self, BuildError> {
        let info = TypeInfo::of::<M>();
        let required = flatten_modules(&self.descriptor.modules)
            .iter()
            .any(|module| module.type_info.type_id == info.type_id);
        if !required {
            return Err(
                DeclarationError::UndeclaredModuleSetter(self.module_setter_name(info)).into(),
            );
        }
        self.inputs.modules.insert(info.type_id, Arc::new(instance));
        Ok(self)
    }

    pub fn dependency<D: Injectable>(mut self, instance: D) -> Result<Self, BuildError> {
        let info = TypeInfo::of::<D>();
        let required = self
            .descriptor
            .dependencies
            .iter()
            .any(|dependency| dependency.type_info.type_id == info.type_id);
        if !required {
            return Err(DeclarationError::UndeclaredDependencySetter(
                self.dependency_setter_name(info),
            )
            .into());
        }
        self.inputs
            .dependencies
            .insert(info.type_id, Arc::new(instance));
        Ok(self)
    }

    /// Binds a concrete value for `key`; `None` is an explicit null
    pub fn instance(mut self, key: Key, value: Option<Instance>) -> Result<Self, BuildError> {
        let declared = self
            .descriptor
            .bound_instances
            .iter()
            .any(|bound| bound.key == key);
        if !declared {
            return Err(DeclarationError::UndeclaredDependencySetter(
                self.instance_setter_name(key),
            )
            .into());
        }
        self.inputs.instances.insert(key, value);
        Ok(self)
    }

    pub fn instance_of<T: Injectable>(self, value: T) -> Result<Self, BuildError> {
        self.instance(Key::of::<T>(), Some(Instance::new(value)))
    }

    pub fn null_instance_of<T: Injectable>(self) -> Result<Self, BuildError> {
        self.instance(Key::of::<T>(), None)
    }

    pub fn build(self) -> Result<Component, BuildError> {
        Component::assemble(self.descriptor, self.inputs)
    }

    fn builder_name(&self) -> &str {
        self.descriptor
            .builder
            .as_ref()
            .map(|builder| builder.name.as_str())
            .unwrap_or("Builder")
    }

    fn module_setter_name(&self, info: TypeInfo) -> String {
        let setter = self.descriptor.builder.as_ref().and_then(|builder| {
            builder
                .module_setters
                .iter()
                .find(|(_, declared)| declared.type_id == info.type_id)
                .map(|(name, _)| *name)
        });
        match setter {
            Some(name) => format!("{}.{}", self.builder_name(), name),
            None => format!("{}.{}", self.builder_name(), info.type_name),
        }
    }

    fn dependency_setter_name(&self, info: TypeInfo) -> String {
        let setter = self.descriptor.builder.as_ref().and_then(|builder| {
            builder
                .dependency_setters
                .iter()
                .find(|(_, declared)| declared.type_id == info.type_id)
                .map(|(name, _)| *name)
        });
        match setter {
            Some(name) => format!("{}.{}", self.builder_name(), name),
            None => format!("{}.{}", self.builder_name(), info.type_name),
        }
    }

    fn instance_setter_name(&self, key: Key) -> String {
        let setter = self.descriptor.builder.as_ref().and_then(|builder| {
            builder
                .instance_setters
                .iter()
                .find(|(_, declared)| *declared == key)
                .map(|(name, _)| *name)
        });
        match setter {
            Some(name) => format!("{}.{}", self.builder_name(), name),
            None => format!("{}.{}", self.builder_name(), key),
        }
    }
}

/// A fully assembled graph for one component instance. The scope cache
/// lives and dies with this value.
pub struct Component {
    descriptor: Arc<ComponentDescriptor>,
    core: ResolverHandle,
}

impl Component {
    fn assemble(
        descriptor: Arc<ComponentDescriptor>,
        inputs: BuilderInputs,
    ) -> Result<Component, BuildError> {
        let flat = flatten_modules(&descriptor.modules);

        let mut module_instances: HashMap<TypeId, Arc<dyn Any + Send + Sync>> = HashMap::new();
        for module in &flat {
            if !module.requires_instance {
                continue;
            }
            let id = module.type_info.type_id;
            if let Some(instance) = inputs.modules.get(&id) {
                module_instances.insert(id, instance.clone());
            } else if let Some(default) = &module.default_instance {
                module_instances.insert(id, default.as_ref()());
            } else {
                return Err(
                    DeclarationError::MissingModule(module.type_info.type_name.to_string()).into(),
                );
            }
        }

        for dependency in &descriptor.dependencies {
            let id = dependency.type_info.type_id;
            let instance = inputs.dependencies.get(&id).ok_or_else(|| {
                DeclarationError::MissingDependency(dependency.type_info.type_name.to_string())
            })?;
            module_instances.insert(id, instance.clone());
        }

        let mut index = IndexBuilder::new();
        for module in &flat {
            index.add_module(module)?;
        }
        for dependency in &descriptor.dependencies {
            for provided in &dependency.provides {
                index.add_dependency_provider(
                    dependency.type_info,
                    provided.key,
                    provided.origin.clone(),
                    provided.produce.clone(),
                )?;
            }
        }
        for bound in &descriptor.bound_instances {
            match inputs.instances.get(&bound.key) {
                Some(value) if value.is_some() || bound.nullable => {
                    let origin = bound_instance_origin(&descriptor, bound.key);
                    index.add_instance(bound.key, value.clone(), bound.nullable, origin)?;
                }
                _ => {
                    return Err(
                        DeclarationError::MissingDependency(bound.key.to_string()).into()
                    );
                }
            }
        }
        for constructible in &descriptor.constructibles {
            index.add_constructible(constructible)?;
        }

        let injection_targets = descriptor
            .injection_targets
            .iter()
            .map(|target| (target.type_info.type_id, Arc::new(target.clone())))
            .collect();

        let core = ResolverHandle(Arc::new(ResolverCore {
            index: index.finish()?,
            cache: ScopeCache::new(),
            scope: descriptor.scope,
            module_instances,
            injection_targets,
        }));
        tracing::debug!(component = descriptor.name.as_str(), "component assembled");
        Ok(Component { descriptor, core })
    }

    /// Resolves a key to its produced value; `None` is a null from a
    /// nullable binding.
    pub fn resolve_key(&self, key: &Key) -> Result<Option<Instance>, ResolveError> {
        self.core.resolve(key)
    }

    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>, ResolveError> {
        self.resolve_with(Key::of::<T>())
    }

    pub fn resolve_qualified<T: Injectable>(
        &self,
        qualifier: &'static str,
    ) -> Result<Arc<T>, ResolveError> {
        self.resolve_with(Key::qualified::<T>(qualifier))
    }

    fn resolve_with<T: Injectable>(&self, key: Key) -> Result<Arc<T>, ResolveError> {
        match self.core.resolve(&key)? {
            Some(instance) => {
                instance
                    .downcast::<T>()
                    .map_err(|actual| ResolveError::DowncastFailed {
                        required: std::any::type_name::<T>(),
                        actual,
                    })
            }
            None => Err(ResolveError::UnexpectedNull { key }),
        }
    }

    /// Like [`resolve`](Component::resolve) but accepts null results
    pub fn resolve_nullable<T: Injectable>(&self) -> Result<Option<Arc<T>>, ResolveError> {
        match self.core.resolve(&Key::of::<T>())? {
            Some(instance) => instance
                .downcast::<T>()
                .map(Some)
                .map_err(|actual| ResolveError::DowncastFailed {
                    required: std::any::type_name::<T>(),
                    actual,
                }),
            None => Ok(None),
        }
    }

    /// A deferred, repeatable supplier for `T`'s key
    pub fn provider<T: Injectable>(&self) -> Provider {
        self.provider_for(Key::of::<T>())
    }

    pub fn provider_for(&self, key: Key) -> Provider {
        Provider::for_key(self.core.clone(), key)
    }

    /// Applies declared member injection to an externally constructed
    /// instance. A type with nothing declared is left untouched.
    pub fn inject<T: Injectable>(&self, target: &mut T) -> Result<(), ResolveError> {
        if let Some(injector) = self
            .descriptor
            .members_injectors
            .iter()
            .find(|injector| injector.target.type_id == TypeId::of::<T>())
        {
            if injector.returns == InjectorReturn::Other {
                return Err(ResolveError::InvalidInjectorShape(injector.name.clone()));
            }
        }
        self.core.inject_value(TypeId::of::<T>(), target)
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.descriptor.name)
            .field("scope", &self.descriptor.scope)
            .finish()
    }
}

fn bound_instance_origin(descriptor: &ComponentDescriptor, key: Key) -> String {
    let builder_name = descriptor
        .builder
        .as_ref()
        .map(|builder| builder.name.as_str())
        .unwrap_or("Builder");
    let setter = descriptor.builder.as_ref().and_then(|builder| {
        builder
            .instance_setters
            .iter()
            .find(|(_, declared)| *declared == key)
            .map(|(name, _)| *name)
    });
    match setter {
        Some(name) => format!("{}.{}", builder_name, name),
        None => format!("{}[{}]", builder_name, key),
    }
}
