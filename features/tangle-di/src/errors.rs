use std::sync::Arc;

use thiserror::Error;

use crate::types::{DynError, Key};

/// Malformed component or builder declarations, reported before any
/// binding resolution is attempted.
#[derive(Error, Debug, Clone)]
pub enum StructuralError {
    #[error("{0} is not an interface. Only interface components are supported.")]
    ComponentNotAnInterface(String),
    #[error("{0} lacks a component marker")]
    MissingComponentMarker(String),
    #[error("Component interface {0} must be public in order to be created")]
    ComponentNotPublic(String),
    #[error("{0} is not an interface. Only interface component builders are supported.")]
    BuilderNotAnInterface(String),
    #[error("{0} lacks a component builder marker")]
    MissingBuilderMarker(String),
    #[error("{name} declares dependencies [{dependencies}] and therefore must be created with a builder")]
    RequiresBuilder { name: String, dependencies: String },
}

/// Conflicting or incomplete binding declarations, reported while the
/// graph is assembled.
#[derive(Error, Debug, Clone)]
pub enum DeclarationError {
    #[error("Duplicate binding for {key}: {existing} and {duplicate}")]
    DuplicateBinding {
        key: Key,
        existing: String,
        duplicate: String,
    },
    #[error("Duplicate map key \"{literal}\" for {key}: {existing} and {duplicate}")]
    DuplicateMapKey {
        key: Key,
        literal: String,
        existing: String,
        duplicate: String,
    },
    #[error("Contribution for {key} has no collection binding declared: {origin}")]
    MissingAggregate { key: Key, origin: String },
    #[error("Component builder has setters for modules that aren't required: {0}")]
    UndeclaredModuleSetter(String),
    #[error("Component builder has setters for dependencies that aren't required: {0}")]
    UndeclaredDependencySetter(String),
    #[error("{0} must be set")]
    MissingModule(String),
    #[error("{0} must be set")]
    MissingDependency(String),
}

/// Failures while resolving a requested key, carrying the full requesting
/// chain where one exists.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("No binding found for {key}\n{chain}")]
    MissingBinding { key: Key, chain: String },
    #[error("Dependency cycle for {key}\n{chain}")]
    DependencyCycle { key: Key, chain: String },
    #[error("{origin} returned null which is not allowed; declare the binding nullable to permit it.")]
    NullReturned { origin: String },
    #[error("{origin} returned null which is not allowed for optional bindings")]
    NullForOptional { origin: String },
    #[error("Binding for {key} produced null but the access site does not accept null")]
    UnexpectedNull { key: Key },
    #[error("Scope '{scope}' on {key} is not provided by this component")]
    ScopeNotProvided { key: Key, scope: &'static str },
    #[error("Binding {origin} failed: {error}")]
    ProduceFailed {
        origin: String,
        error: Arc<DynError>,
    },
    #[error("Failed to downcast, required: '{required}' actual: '{actual}'")]
    DowncastFailed {
        required: &'static str,
        actual: &'static str,
    },
    #[error("Members injection methods may only return the injected type or void: {0}")]
    InvalidInjectorShape(String),
    #[error("Injection into private fields is not supported: {0}")]
    PrivateField(String),
    #[error("Injection into static fields is not supported: {0}")]
    StaticField(String),
    #[error("Injection into private methods is not supported: {0}")]
    PrivateMethod(String),
    #[error("Injection into static methods is not supported: {0}")]
    StaticMethod(String),
    #[error("Injected methods may not be abstract: {0}")]
    AbstractMethod(String),
}

impl ResolveError {
    pub(crate) fn produce_failed(origin: &str, error: DynError) -> Self {
        ResolveError::ProduceFailed {
            origin: origin.to_string(),
            error: Arc::new(error),
        }
    }
}

/// Errors while assembling a component from its descriptor and builder
/// inputs. Structural problems are reported before declaration problems.
#[derive(Error, Debug, Clone)]
pub enum BuildError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
}
