use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use crate::{
    binding::{Binding, BindingKind, MapEntry, ProduceFn, SetContribution, SetContributionValue},
    errors::ResolveError,
    inject::InjectionTarget,
    provider::Provider,
    registry::BindingIndex,
    scope::ScopeCache,
    types::{Instance, Key, TypeInfo},
};

/// The live resolution state of one component instance: the binding index,
/// the component's scope cache, and the instances the builder seeded in.
pub(crate) struct ResolverCore {
    pub index: BindingIndex,
    pub cache: ScopeCache,
    pub scope: Option<&'static str>,
    pub module_instances: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    pub injection_targets: HashMap<TypeId, Arc<InjectionTarget>>,
}

/// Call stack of keys being resolved by one top-level request. Exists only
/// for cycle detection and chain diagnostics; discarded on return or error.
#[derive(Default)]
pub(crate) struct Frame {
    entries: Vec<FrameEntry>,
}

struct FrameEntry {
    key: Key,
    origin: Option<String>,
}

impl Frame {
    fn push(&mut self, key: Key) -> Result<(), ResolveError> {
        if self.entries.iter().any(|entry| entry.key == key) {
            return Err(ResolveError::DependencyCycle {
                key,
                chain: self.render_cycle(key),
            });
        }
        self.entries.push(FrameEntry { key, origin: None });
        Ok(())
    }

    fn pop(&mut self) {
        self.entries.pop();
    }

    /// Records which binding answered the key on top of the stack
    fn set_origin(&mut self, origin: &str) {
        if let Some(last) = self.entries.last_mut() {
            last.origin = Some(origin.to_string());
        }
    }

    /// The chain from the repeated key's first occurrence back around,
    /// terminated by the repetition itself.
    fn render_cycle(&self, key: Key) -> String {
        let start = self
            .entries
            .iter()
            .position(|entry| entry.key == key)
            .unwrap_or(0);
        let mut lines = Vec::new();
        for entry in &self.entries[start..] {
            lines.push(format!(" * Requested: {}", entry.key));
            if let Some(origin) = &entry.origin {
                lines.push(format!("     from {}", origin));
            }
        }
        lines.push(format!(" * Requested: {}", key));
        lines.push("     which forms a cycle.".to_string());
        lines.join("\n")
    }

    /// The full requesting chain, root request first
    fn render_requests(&self) -> String {
        let mut lines = Vec::new();
        for entry in &self.entries {
            lines.push(format!(" * Requested: {}", entry.key));
            if let Some(origin) = &entry.origin {
                lines.push(format!("     from {}", origin));
            }
        }
        lines.join("\n")
    }
}

/// Shared, cloneable entry point into one component's resolver state.
/// Deferred suppliers hold a clone and resolve through it later.
#[derive(Clone)]
pub(crate) struct ResolverHandle(pub(crate) Arc<ResolverCore>);

impl ResolverHandle {
    /// Resolves a key with a fresh resolution frame
    pub fn resolve(&self, key: &Key) -> Result<Option<Instance>, ResolveError> {
        let mut frame = Frame::default();
        self.resolve_in(key, &mut frame)
    }

    fn resolve_in(
        &self,
        key: &Key,
        frame: &mut Frame,
    ) -> Result<Option<Instance>, ResolveError> {
        frame.push(*key)?;
        let result = self.resolve_pushed(key, frame);
        frame.pop();
        result
    }

    fn resolve_pushed(
        &self,
        key: &Key,
        frame: &mut Frame,
    ) -> Result<Option<Instance>, ResolveError> {
        let Some(binding) = self.0.index.lookup(key) else {
            tracing::error!(key = %key, "no binding found");
            return Err(ResolveError::MissingBinding {
                key: *key,
                chain: frame.render_requests(),
            });
        };
        frame.set_origin(&binding.origin);

        match binding.scope {
            Some(scope) if self.0.scope != Some(scope) => {
                Err(ResolveError::ScopeNotProvided { key: *key, scope })
            }
            Some(_) => self
                .0
                .cache
                .get_or_compute(key, || self.produce(&binding, frame)),
            None => self.produce(&binding, frame),
        }
    }

    /// Resolves dependencies depth-first in declared order, invokes the
    /// underlying handle, and enforces the nullability contract.
    fn produce(
        &self,
        binding: &Binding,
        frame: &mut Frame,
    ) -> Result<Option<Instance>, ResolveError> {
        match &binding.kind {
            BindingKind::Instance { value } => Ok(value.clone()),
            BindingKind::Provider {
                module,
                dependencies,
                produce,
                inject_members,
            } => {
                let mut args = Vec::with_capacity(dependencies.len());
                for dependency in dependencies {
                    args.push(self.resolve_in(dependency, frame)?);
                }
                let mut value = self.invoke(&binding.origin, *module, produce, &args)?;
                if value.is_none() && !binding.nullable {
                    return Err(ResolveError::NullReturned {
                        origin: binding.origin.clone(),
                    });
                }
                tracing::debug!(origin = binding.origin.as_str(), "produced value");
                if *inject_members {
                    if let Some(instance) = &mut value {
                        self.inject_fresh(instance, frame)?;
                    }
                }
                Ok(value)
            }
            BindingKind::Delegate { target, adapt } => {
                let value = self.resolve_in(target, frame)?;
                match (value, adapt) {
                    (Some(instance), Some(adapt)) => adapt.as_ref()(instance)
                        .map(Some)
                        .map_err(|e| ResolveError::produce_failed(&binding.origin, e)),
                    (value, _) => Ok(value),
                }
            }
            BindingKind::Optional { target, wrap } => {
                if !self.0.index.has(target) {
                    return wrap.as_ref()(None)
                        .map(Some)
                        .map_err(|e| ResolveError::produce_failed(&binding.origin, e));
                }
                let underlying = self
                    .0
                    .index
                    .lookup(target)
                    .map(|b| b.origin.clone())
                    .unwrap_or_default();
                match self.resolve_in(target, frame)? {
                    None => Err(ResolveError::NullForOptional { origin: underlying }),
                    Some(instance) => wrap.as_ref()(Some(instance))
                        .map(Some)
                        .map_err(|e| ResolveError::produce_failed(&binding.origin, e)),
                }
            }
            BindingKind::Set {
                contributions,
                collect,
            } => {
                let mut values = Vec::with_capacity(contributions.len());
                for contribution in contributions {
                    let instance = self.produce_contribution(contribution, frame)?;
                    values.push(if contribution.elements {
                        SetContributionValue::Elements(instance)
                    } else {
                        SetContributionValue::Single(instance)
                    });
                }
                collect.as_ref()(values)
                    .map(Some)
                    .map_err(|e| ResolveError::produce_failed(&binding.origin, e))
            }
            BindingKind::Map {
                entries,
                collect,
                deferred,
            } => {
                let mut resolved = Vec::with_capacity(entries.len());
                for entry in entries {
                    if *deferred {
                        let provider = Provider::for_entry(self.clone(), entry.clone());
                        resolved.push((entry.literal.clone(), Instance::new(provider)));
                    } else {
                        resolved.push((entry.literal.clone(), self.produce_entry(entry, frame)?));
                    }
                }
                collect.as_ref()(resolved)
                    .map(Some)
                    .map_err(|e| ResolveError::produce_failed(&binding.origin, e))
            }
        }
    }

    fn produce_contribution(
        &self,
        contribution: &SetContribution,
        frame: &mut Frame,
    ) -> Result<Instance, ResolveError> {
        let mut args = Vec::with_capacity(contribution.dependencies.len());
        for dependency in &contribution.dependencies {
            args.push(self.resolve_in(dependency, frame)?);
        }
        self.invoke(&contribution.origin, contribution.module, &contribution.produce, &args)?
            .ok_or_else(|| ResolveError::NullReturned {
                origin: contribution.origin.clone(),
            })
    }

    fn produce_entry(
        &self,
        entry: &MapEntry,
        frame: &mut Frame,
    ) -> Result<Instance, ResolveError> {
        let mut args = Vec::with_capacity(entry.dependencies.len());
        for dependency in &entry.dependencies {
            args.push(self.resolve_in(dependency, frame)?);
        }
        self.invoke(&entry.origin, entry.module, &entry.produce, &args)?
            .ok_or_else(|| ResolveError::NullReturned {
                origin: entry.origin.clone(),
            })
    }

    /// Resolves one map entry from scratch, for deferred per-entry suppliers
    pub(crate) fn resolve_entry(&self, entry: &MapEntry) -> Result<Instance, ResolveError> {
        let mut frame = Frame::default();
        self.produce_entry(entry, &mut frame)
    }

    fn invoke(
        &self,
        origin: &str,
        module: Option<TypeInfo>,
        produce: &ProduceFn,
        args: &[Option<Instance>],
    ) -> Result<Option<Instance>, ResolveError> {
        let module_instance = match module {
            Some(info) => Some(self.0.module_instances.get(&info.type_id).ok_or_else(|| {
                ResolveError::produce_failed(
                    origin,
                    format!("no instance available for module {}", info).into(),
                )
            })?),
            None => None,
        };
        produce.as_ref()(module_instance.map(|arc| arc.as_ref()), args)
            .map_err(|e| ResolveError::produce_failed(origin, e))
    }

    /// Applies member injection to a value just built by its constructor
    fn inject_fresh(
        &self,
        instance: &mut Instance,
        frame: &mut Frame,
    ) -> Result<(), ResolveError> {
        let Some(target) = self.0.injection_targets.get(&instance.info.type_id).cloned() else {
            return Ok(());
        };
        let value = Arc::get_mut(&mut instance.value).ok_or_else(|| {
            ResolveError::produce_failed(
                instance.info.type_name,
                "freshly constructed value is already shared; members cannot be injected".into(),
            )
        })?;
        self.inject_members(&target, value, frame)
    }

    /// Applies a members-injection recipe: for each class, most-base first,
    /// all fields before all methods. Validation runs to completion before
    /// the first mutation.
    pub(crate) fn inject_members(
        &self,
        target: &InjectionTarget,
        value: &mut dyn Any,
        frame: &mut Frame,
    ) -> Result<(), ResolveError> {
        target.validate()?;
        for class in &target.classes {
            for field in &class.fields {
                let resolved = self.resolve_in(&field.key, frame)?;
                field.apply.as_ref()(value, resolved).map_err(|e| {
                    ResolveError::produce_failed(&format!("{}.{}", class.name, field.name), e)
                })?;
            }
            for method in &class.methods {
                let mut args = Vec::with_capacity(method.dependencies.len());
                for dependency in &method.dependencies {
                    args.push(self.resolve_in(dependency, frame)?);
                }
                method.apply.as_ref()(value, &args).map_err(|e| {
                    ResolveError::produce_failed(&format!("{}.{}()", class.name, method.name), e)
                })?;
            }
        }
        Ok(())
    }

    /// Member injection for an externally constructed instance
    pub(crate) fn inject_value(
        &self,
        type_id: TypeId,
        value: &mut dyn Any,
    ) -> Result<(), ResolveError> {
        let Some(target) = self.0.injection_targets.get(&type_id).cloned() else {
            return Ok(());
        };
        let mut frame = Frame::default();
        self.inject_members(&target, value, &mut frame)
    }
}
