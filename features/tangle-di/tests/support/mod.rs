#![allow(dead_code)]

//! Hand-rolled front end for the tests: builds the declaration shapes an
//! annotation scanner or reflection walker would normally extract.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use tangle_di::{
    ApplyFieldFn, ApplyMethodFn, BindingDeclaration, CollectMapFn, CollectSetFn, DeclarationKind,
    DynError, Injectable, Instance, Key, Provider,
};

pub fn type_mismatch(actual: &'static str) -> DynError {
    format!("unexpected value type: {actual}").into()
}

/// Downcasts a positional, non-null argument
pub fn arg<T: Injectable>(args: &[Option<Instance>], index: usize) -> Result<Arc<T>, DynError> {
    args[index]
        .as_ref()
        .ok_or_else(|| -> DynError { "unexpected null argument".into() })?
        .downcast::<T>()
        .map_err(type_mismatch)
}

/// A static factory method with no parameters
pub fn provides<T, F>(key: Key, origin: &str, make: F) -> BindingDeclaration
where
    T: Injectable,
    F: Fn() -> T + Send + Sync + 'static,
{
    BindingDeclaration::new(
        key,
        origin,
        DeclarationKind::Provider {
            requires_instance: false,
            dependencies: vec![],
            produce: Arc::new(move |_, _| Ok(Some(Instance::new(make())))),
        },
    )
}

/// A static factory method declared nullable
pub fn provides_nullable<T, F>(key: Key, origin: &str, make: F) -> BindingDeclaration
where
    T: Injectable,
    F: Fn() -> Option<T> + Send + Sync + 'static,
{
    BindingDeclaration::new(
        key,
        origin,
        DeclarationKind::Provider {
            requires_instance: false,
            dependencies: vec![],
            produce: Arc::new(move |_, _| Ok(make().map(Instance::new))),
        },
    )
    .nullable()
}

/// A static factory method with one parameter
pub fn provides1<A, T, F>(key: Key, dependency: Key, origin: &str, make: F) -> BindingDeclaration
where
    A: Injectable,
    T: Injectable,
    F: Fn(Arc<A>) -> T + Send + Sync + 'static,
{
    BindingDeclaration::new(
        key,
        origin,
        DeclarationKind::Provider {
            requires_instance: false,
            dependencies: vec![dependency],
            produce: Arc::new(move |_, args| Ok(Some(Instance::new(make(arg::<A>(args, 0)?))))),
        },
    )
}

/// An instance-level factory method reading state off its module
pub fn provides_from_module<M, T, F>(key: Key, origin: &str, make: F) -> BindingDeclaration
where
    M: Injectable,
    T: Injectable,
    F: Fn(&M) -> T + Send + Sync + 'static,
{
    BindingDeclaration::new(
        key,
        origin,
        DeclarationKind::Provider {
            requires_instance: true,
            dependencies: vec![],
            produce: Arc::new(move |module, _| {
                let module = module
                    .and_then(|value| value.downcast_ref::<M>())
                    .ok_or_else(|| -> DynError { "module instance missing".into() })?;
                Ok(Some(Instance::new(make(module))))
            }),
        },
    )
}

/// A designated constructor, eligible for just-in-time synthesis
pub fn constructor<T, F>(origin: &str, make: F) -> BindingDeclaration
where
    T: Injectable,
    F: Fn() -> T + Send + Sync + 'static,
{
    BindingDeclaration::new(
        Key::of::<T>(),
        origin,
        DeclarationKind::Constructor {
            dependencies: vec![],
            produce: Arc::new(move |_, _| Ok(Some(Instance::new(make())))),
        },
    )
}

/// Declares a set-valued key collected into a `HashSet<String>`
pub fn string_set(key: Key, origin: &str) -> BindingDeclaration {
    BindingDeclaration::new(
        key,
        origin,
        DeclarationKind::SetBinding {
            collect: string_set_collector(),
        },
    )
}

pub fn string_set_collector() -> CollectSetFn {
    Arc::new(|values| {
        let mut set = HashSet::new();
        for value in values {
            match value {
                tangle_di::SetContributionValue::Single(instance) => {
                    set.insert(instance.downcast::<String>().map_err(type_mismatch)?.as_ref().clone());
                }
                tangle_di::SetContributionValue::Elements(instance) => {
                    let elements = instance.downcast::<Vec<String>>().map_err(type_mismatch)?;
                    set.extend(elements.iter().cloned());
                }
            }
        }
        Ok(Instance::new(set))
    })
}

/// Contributes one string element
pub fn into_set<F>(key: Key, origin: &str, make: F) -> BindingDeclaration
where
    F: Fn() -> String + Send + Sync + 'static,
{
    BindingDeclaration::new(
        key,
        origin,
        DeclarationKind::IntoSet {
            requires_instance: false,
            dependencies: vec![],
            produce: Arc::new(move |_, _| Ok(Some(Instance::new(make())))),
        },
    )
}

/// Contributes a collection of string elements
pub fn elements_into_set<F>(key: Key, origin: &str, make: F) -> BindingDeclaration
where
    F: Fn() -> Vec<String> + Send + Sync + 'static,
{
    BindingDeclaration::new(
        key,
        origin,
        DeclarationKind::ElementsIntoSet {
            requires_instance: false,
            dependencies: vec![],
            produce: Arc::new(move |_, _| Ok(Some(Instance::new(make())))),
        },
    )
}

/// Declares a map-valued key collected into a `BTreeMap<String, String>`
pub fn string_map(key: Key, origin: &str) -> BindingDeclaration {
    BindingDeclaration::new(
        key,
        origin,
        DeclarationKind::MapBinding {
            collect: string_map_collector(),
            deferred: false,
        },
    )
}

pub fn string_map_collector() -> CollectMapFn {
    Arc::new(|entries| {
        let mut map = BTreeMap::new();
        for (literal, instance) in entries {
            map.insert(
                literal,
                instance.downcast::<String>().map_err(type_mismatch)?.as_ref().clone(),
            );
        }
        Ok(Instance::new(map))
    })
}

/// Declares a map-valued key whose entries stay deferred suppliers,
/// collected into a `BTreeMap<String, Provider>`
pub fn provider_map(key: Key, origin: &str) -> BindingDeclaration {
    BindingDeclaration::new(
        key,
        origin,
        DeclarationKind::MapBinding {
            collect: Arc::new(|entries| {
                let mut map = BTreeMap::new();
                for (literal, instance) in entries {
                    map.insert(
                        literal,
                        instance.downcast::<Provider>().map_err(type_mismatch)?.as_ref().clone(),
                    );
                }
                Ok(Instance::new(map))
            }),
            deferred: true,
        },
    )
}

/// Contributes one map entry
pub fn into_map<F>(key: Key, literal: &str, origin: &str, make: F) -> BindingDeclaration
where
    F: Fn() -> String + Send + Sync + 'static,
{
    BindingDeclaration::new(
        key,
        origin,
        DeclarationKind::IntoMap {
            map_key: literal.to_string(),
            requires_instance: false,
            dependencies: vec![],
            produce: Arc::new(move |_, _| Ok(Some(Instance::new(make())))),
        },
    )
}

/// Field setter writing a resolved value into a concrete target type
pub fn set_field<T, V, F>(assign: F) -> ApplyFieldFn
where
    T: Injectable,
    V: Injectable,
    F: Fn(&mut T, Arc<V>) + Send + Sync + 'static,
{
    Arc::new(move |target, value| {
        let target = target
            .downcast_mut::<T>()
            .ok_or_else(|| -> DynError { "unexpected injection target type".into() })?;
        let value = value
            .ok_or_else(|| -> DynError { "unexpected null member value".into() })?
            .downcast::<V>()
            .map_err(type_mismatch)?;
        assign(target, value);
        Ok(())
    })
}

/// Method invoker passing resolved arguments through to the target
pub fn call_method<T, F>(call: F) -> ApplyMethodFn
where
    T: Injectable,
    F: Fn(&mut T, &[Option<Instance>]) -> Result<(), DynError> + Send + Sync + 'static,
{
    Arc::new(move |target, args| {
        let target = target
            .downcast_mut::<T>()
            .ok_or_else(|| -> DynError { "unexpected injection target type".into() })?;
        call(target, args)
    })
}
