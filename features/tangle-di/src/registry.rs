use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{
    binding::{
        Binding, BindingDeclaration, BindingKind, DeclarationKind, MapEntry, ProduceFn,
        SetContribution,
    },
    errors::DeclarationError,
    module::ModuleDescriptor,
    multibinding::{MapAggregateDeclaration, MapGroup, SetAggregateDeclaration, SetGroup},
    types::{Key, TypeInfo},
};

/// Collects declarations into an immutable [`BindingIndex`], rejecting
/// conflicting ones as they arrive.
pub(crate) struct IndexBuilder {
    bindings: HashMap<Key, Binding>,
    sets: HashMap<Key, SetGroup>,
    maps: HashMap<Key, MapGroup>,
    jit: HashMap<Key, Binding>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        IndexBuilder {
            bindings: HashMap::new(),
            sets: HashMap::new(),
            maps: HashMap::new(),
            jit: HashMap::new(),
        }
    }

    pub fn add_module(&mut self, module: &ModuleDescriptor) -> Result<(), DeclarationError> {
        let declarations = module.effective_declarations();
        tracing::debug!(
            module = module.type_info.type_name,
            declarations = declarations.len(),
            "registering module"
        );
        for declaration in declarations {
            self.add_declaration(Some(module.type_info), declaration)?;
        }
        Ok(())
    }

    pub fn add_declaration(
        &mut self,
        owner: Option<TypeInfo>,
        declaration: &BindingDeclaration,
    ) -> Result<(), DeclarationError> {
        let key = declaration.key;
        match &declaration.kind {
            DeclarationKind::Constructor {
                dependencies,
                produce,
            } => self.insert(Binding {
                key,
                scope: declaration.scope,
                nullable: declaration.nullable,
                origin: declaration.origin.clone(),
                kind: BindingKind::Provider {
                    module: None,
                    dependencies: dependencies.clone(),
                    produce: produce.clone(),
                    inject_members: true,
                },
            }),
            DeclarationKind::Provider {
                requires_instance,
                dependencies,
                produce,
            } => self.insert(Binding {
                key,
                scope: declaration.scope,
                nullable: declaration.nullable,
                origin: declaration.origin.clone(),
                kind: BindingKind::Provider {
                    module: requires_instance.then_some(owner).flatten(),
                    dependencies: dependencies.clone(),
                    produce: produce.clone(),
                    inject_members: false,
                },
            }),
            DeclarationKind::Instance { value } => self.insert(Binding {
                key,
                scope: declaration.scope,
                nullable: declaration.nullable,
                origin: declaration.origin.clone(),
                kind: BindingKind::Instance {
                    value: value.clone(),
                },
            }),
            DeclarationKind::Delegate { target, adapt } => self.insert(Binding {
                key,
                scope: declaration.scope,
                nullable: declaration.nullable,
                origin: declaration.origin.clone(),
                kind: BindingKind::Delegate {
                    target: *target,
                    adapt: adapt.clone(),
                },
            }),
            DeclarationKind::Optional { target, wrap } => self.insert(Binding {
                key,
                scope: declaration.scope,
                nullable: declaration.nullable,
                origin: declaration.origin.clone(),
                kind: BindingKind::Optional {
                    target: *target,
                    wrap: wrap.clone(),
                },
            }),
            DeclarationKind::SetBinding { collect } => {
                let group = self.sets.entry(key).or_insert_with(|| SetGroup::new(key));
                if let Some(existing) = &group.declared {
                    return Err(DeclarationError::DuplicateBinding {
                        key,
                        existing: existing.origin.clone(),
                        duplicate: declaration.origin.clone(),
                    });
                }
                group.declared = Some(SetAggregateDeclaration {
                    collect: collect.clone(),
                    scope: declaration.scope,
                    origin: declaration.origin.clone(),
                });
                Ok(())
            }
            DeclarationKind::IntoSet {
                requires_instance,
                dependencies,
                produce,
            }
            | DeclarationKind::ElementsIntoSet {
                requires_instance,
                dependencies,
                produce,
            } => {
                let elements = matches!(declaration.kind, DeclarationKind::ElementsIntoSet { .. });
                let group = self.sets.entry(key).or_insert_with(|| SetGroup::new(key));
                group.contributions.push(SetContribution {
                    origin: declaration.origin.clone(),
                    module: requires_instance.then_some(owner).flatten(),
                    dependencies: dependencies.clone(),
                    produce: produce.clone(),
                    elements,
                });
                Ok(())
            }
            DeclarationKind::MapBinding { collect, deferred } => {
                let group = self.maps.entry(key).or_insert_with(|| MapGroup::new(key));
                if let Some(existing) = &group.declared {
                    return Err(DeclarationError::DuplicateBinding {
                        key,
                        existing: existing.origin.clone(),
                        duplicate: declaration.origin.clone(),
                    });
                }
                group.declared = Some(MapAggregateDeclaration {
                    collect: collect.clone(),
                    deferred: *deferred,
                    scope: declaration.scope,
                    origin: declaration.origin.clone(),
                });
                Ok(())
            }
            DeclarationKind::IntoMap {
                map_key,
                requires_instance,
                dependencies,
                produce,
            } => {
                let group = self.maps.entry(key).or_insert_with(|| MapGroup::new(key));
                group.entries.push(MapEntry {
                    literal: map_key.clone(),
                    origin: declaration.origin.clone(),
                    module: requires_instance.then_some(owner).flatten(),
                    dependencies: dependencies.clone(),
                    produce: produce.clone(),
                });
                Ok(())
            }
        }
    }

    /// Registers a concrete value bound from outside the graph
    pub fn add_instance(
        &mut self,
        key: Key,
        value: Option<crate::types::Instance>,
        nullable: bool,
        origin: String,
    ) -> Result<(), DeclarationError> {
        self.insert(Binding {
            key,
            scope: None,
            nullable,
            origin,
            kind: BindingKind::Instance { value },
        })
    }

    /// Registers a key exposed by a component dependency's accessor
    pub fn add_dependency_provider(
        &mut self,
        dependency: TypeInfo,
        key: Key,
        origin: String,
        produce: ProduceFn,
    ) -> Result<(), DeclarationError> {
        self.insert(Binding {
            key,
            scope: None,
            nullable: false,
            origin,
            kind: BindingKind::Provider {
                module: Some(dependency),
                dependencies: Vec::new(),
                produce,
                inject_members: false,
            },
        })
    }

    /// Registers a designated constructor for just-in-time synthesis. The
    /// binding only enters the index when the key is referenced without an
    /// explicit declaration.
    pub fn add_constructible(
        &mut self,
        declaration: &BindingDeclaration,
    ) -> Result<(), DeclarationError> {
        let DeclarationKind::Constructor {
            dependencies,
            produce,
        } = &declaration.kind
        else {
            // Only designated constructors are synthesizable on demand
            return self.add_declaration(None, declaration);
        };
        if let Some(existing) = self.jit.get(&declaration.key) {
            return Err(DeclarationError::DuplicateBinding {
                key: declaration.key,
                existing: existing.origin.clone(),
                duplicate: declaration.origin.clone(),
            });
        }
        self.jit.insert(
            declaration.key,
            Binding {
                key: declaration.key,
                scope: declaration.scope,
                nullable: declaration.nullable,
                origin: declaration.origin.clone(),
                kind: BindingKind::Provider {
                    module: None,
                    dependencies: dependencies.clone(),
                    produce: produce.clone(),
                    inject_members: true,
                },
            },
        );
        Ok(())
    }

    pub fn finish(mut self) -> Result<BindingIndex, DeclarationError> {
        for (_, group) in self.sets.drain() {
            let binding = group.finish()?;
            Self::insert_into(&mut self.bindings, binding)?;
        }
        for (_, group) in self.maps.drain() {
            let binding = group.finish()?;
            Self::insert_into(&mut self.bindings, binding)?;
        }
        tracing::debug!(
            bindings = self.bindings.len(),
            constructible = self.jit.len(),
            "binding index assembled"
        );
        Ok(BindingIndex {
            bindings: RwLock::new(
                self.bindings
                    .into_iter()
                    .map(|(k, b)| (k, Arc::new(b)))
                    .collect(),
            ),
            jit: self.jit.into_iter().map(|(k, b)| (k, Arc::new(b))).collect(),
        })
    }

    fn insert(&mut self, binding: Binding) -> Result<(), DeclarationError> {
        Self::insert_into(&mut self.bindings, binding)
    }

    fn insert_into(
        bindings: &mut HashMap<Key, Binding>,
        binding: Binding,
    ) -> Result<(), DeclarationError> {
        let key = binding.key;
        if let Some(existing) = bindings.get(&key) {
            return Err(DeclarationError::DuplicateBinding {
                key,
                existing: existing.origin.clone(),
                duplicate: binding.origin,
            });
        }
        bindings.insert(key, binding);
        Ok(())
    }
}

/// Finalized lookup table from [`Key`] to [`Binding`]. Just-in-time
/// constructor bindings are synthesized into the table on first reference.
pub(crate) struct BindingIndex {
    bindings: RwLock<HashMap<Key, Arc<Binding>>>,
    jit: HashMap<Key, Arc<Binding>>,
}

impl BindingIndex {
    pub fn lookup(&self, key: &Key) -> Option<Arc<Binding>> {
        if let Some(binding) = self.bindings.read().expect("index lock poisoned").get(key) {
            return Some(binding.clone());
        }
        let synthesized = self.jit.get(key)?.clone();
        tracing::debug!(key = %key, "synthesized just-in-time constructor binding");
        self.bindings
            .write()
            .expect("index lock poisoned")
            .entry(*key)
            .or_insert_with(|| synthesized.clone());
        Some(synthesized)
    }

    pub fn has(&self, key: &Key) -> bool {
        self.bindings.read().expect("index lock poisoned").contains_key(key)
            || self.jit.contains_key(key)
    }
}
