use std::{any::Any, sync::Arc};

use crate::{
    errors::ResolveError,
    types::{DynError, Instance, Key, TypeInfo},
};

/// Writes a resolved value into one field of the target
pub type ApplyFieldFn =
    Arc<dyn Fn(&mut dyn Any, Option<Instance>) -> Result<(), DynError> + Send + Sync>;

/// Calls one injectable method on the target with resolved arguments
pub type ApplyMethodFn =
    Arc<dyn Fn(&mut dyn Any, &[Option<Instance>]) -> Result<(), DynError> + Send + Sync>;

/// Modifier flags the front end extracted for a member. The engine rejects
/// injection into members these mark as unreachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberModifiers {
    pub is_private: bool,
    pub is_static: bool,
    pub is_abstract: bool,
}

#[derive(Clone)]
pub struct FieldInjection {
    pub name: &'static str,
    pub key: Key,
    pub modifiers: MemberModifiers,
    pub apply: ApplyFieldFn,
}

impl FieldInjection {
    pub fn new(name: &'static str, key: Key, apply: ApplyFieldFn) -> Self {
        FieldInjection {
            name,
            key,
            modifiers: MemberModifiers::default(),
            apply,
        }
    }

    pub fn modifiers(mut self, modifiers: MemberModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[derive(Clone)]
pub struct MethodInjection {
    pub name: &'static str,
    pub dependencies: Vec<Key>,
    pub modifiers: MemberModifiers,
    pub apply: ApplyMethodFn,
}

impl MethodInjection {
    pub fn new(name: &'static str, dependencies: Vec<Key>, apply: ApplyMethodFn) -> Self {
        MethodInjection {
            name,
            dependencies,
            modifiers: MemberModifiers::default(),
            apply,
        }
    }

    pub fn modifiers(mut self, modifiers: MemberModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Injectable members declared directly on one class of a hierarchy
#[derive(Clone)]
pub struct ClassInjections {
    pub name: &'static str,
    pub fields: Vec<FieldInjection>,
    pub methods: Vec<MethodInjection>,
}

impl ClassInjections {
    pub fn new(name: &'static str) -> Self {
        ClassInjections {
            name,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldInjection) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodInjection) -> Self {
        self.methods.push(method);
        self
    }
}

/// Members-injection recipe for one target type: its ancestor chain with
/// the most-base injectable class first. Application order is fields before
/// methods within a class, base classes before derived ones; construction
/// precedes all of it.
#[derive(Clone)]
pub struct InjectionTarget {
    pub type_info: TypeInfo,
    pub classes: Vec<ClassInjections>,
}

impl InjectionTarget {
    pub fn new<T: 'static>() -> Self {
        InjectionTarget {
            type_info: TypeInfo::of::<T>(),
            classes: Vec::new(),
        }
    }

    /// Appends a class level; call in most-base-first order
    pub fn class(mut self, class: ClassInjections) -> Self {
        self.classes.push(class);
        self
    }

    /// Every dependency key the target pulls in, in application order
    pub fn member_keys(&self) -> Vec<Key> {
        let mut keys = Vec::new();
        for class in &self.classes {
            keys.extend(class.fields.iter().map(|f| f.key));
            for method in &class.methods {
                keys.extend(method.dependencies.iter().copied());
            }
        }
        keys
    }

    /// Rejects members that cannot be injected. Runs to completion before
    /// any part of a target instance is mutated.
    pub(crate) fn validate(&self) -> Result<(), ResolveError> {
        for class in &self.classes {
            for field in &class.fields {
                let member = format!("{}.{}", class.name, field.name);
                if field.modifiers.is_private {
                    return Err(ResolveError::PrivateField(member));
                }
                if field.modifiers.is_static {
                    return Err(ResolveError::StaticField(member));
                }
            }
            for method in &class.methods {
                if method.modifiers.is_abstract {
                    return Err(ResolveError::AbstractMethod(format!(
                        "{}.{}",
                        class.name, method.name
                    )));
                }
                let member = format!("{}.{}()", class.name, method.name);
                if method.modifiers.is_private {
                    return Err(ResolveError::PrivateMethod(member));
                }
                if method.modifiers.is_static {
                    return Err(ResolveError::StaticMethod(member));
                }
            }
        }
        Ok(())
    }
}
