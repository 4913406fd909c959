//! Runtime object-graph resolution for dependency injection.
//!
//! A front end (annotation scanner, reflection walker, parser) extracts a
//! language-neutral set of binding declarations: constructors, factory
//! methods, bound instances, delegations, set/map contributions. It hands
//! them to this crate as [`ModuleDescriptor`]s and a [`ComponentDescriptor`].
//! The engine indexes the declarations, validates the component's builder
//! requirements, then resolves requested [`Key`]s recursively: depth-first,
//! left-to-right, with per-component scope caching, deferred [`Provider`]
//! suppliers, and chain-annotated errors for cycles and missing bindings.

pub mod binding;
pub mod component;
pub mod errors;
pub mod inject;
pub mod module;
pub mod provider;
pub mod types;

mod multibinding;
mod registry;
mod resolver;
mod scope;

pub use binding::{
    AdaptFn, BindingDeclaration, CollectMapFn, CollectSetFn, DeclarationKind, ProduceFn,
    SetContributionValue, WrapOptionalFn,
};
pub use component::{
    BoundInstance, BuilderDescriptor, Component, ComponentBuilder, ComponentDescriptor,
    DependencyDescriptor, InjectorReturn, MembersInjector, ProvidedKey,
};
pub use errors::{BuildError, DeclarationError, ResolveError, StructuralError};
pub use inject::{
    ApplyFieldFn, ApplyMethodFn, ClassInjections, FieldInjection, InjectionTarget,
    MemberModifiers, MethodInjection,
};
pub use module::{DefaultInstanceFn, ModuleDescriptor, ModuleLevel};
pub use provider::Provider;
pub use types::{DynError, Injectable, Instance, Key, TypeInfo};
