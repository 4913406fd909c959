use std::sync::Arc;

use crate::{
    binding::MapEntry,
    errors::ResolveError,
    resolver::ResolverHandle,
    types::{Injectable, Instance, Key},
};

/// A deferred, repeatable supplier for one key.
///
/// Nothing is resolved until [`get`](Provider::get) is called, and every call
/// resolves afresh: an unscoped binding's factory runs again, a scoped one
/// still computes at most once through the component's cache. Aggregate keys
/// re-aggregate from scratch per call.
#[derive(Clone)]
pub struct Provider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    target: ProviderTarget,
    core: ResolverHandle,
}

enum ProviderTarget {
    Key(Key),
    /// A single map contribution, for per-entry suppliers in deferred maps
    Entry(MapEntry),
}

impl Provider {
    pub(crate) fn for_key(core: ResolverHandle, key: Key) -> Self {
        Provider {
            inner: Arc::new(ProviderInner {
                target: ProviderTarget::Key(key),
                core,
            }),
        }
    }

    pub(crate) fn for_entry(core: ResolverHandle, entry: MapEntry) -> Self {
        Provider {
            inner: Arc::new(ProviderInner {
                target: ProviderTarget::Entry(entry),
                core,
            }),
        }
    }

    /// Performs a fresh resolution of the underlying target
    pub fn get(&self) -> Result<Option<Instance>, ResolveError> {
        match &self.inner.target {
            ProviderTarget::Key(key) => self.inner.core.resolve(key),
            ProviderTarget::Entry(entry) => self.inner.core.resolve_entry(entry).map(Some),
        }
    }

    /// Resolves and downcasts, treating null as an error
    pub fn get_as<T: Injectable>(&self) -> Result<Arc<T>, ResolveError> {
        match self.get()? {
            Some(instance) => {
                instance
                    .downcast::<T>()
                    .map_err(|actual| ResolveError::DowncastFailed {
                        required: std::any::type_name::<T>(),
                        actual,
                    })
            }
            None => match &self.inner.target {
                ProviderTarget::Key(key) => Err(ResolveError::UnexpectedNull { key: *key }),
                ProviderTarget::Entry(entry) => Err(ResolveError::NullReturned {
                    origin: entry.origin.clone(),
                }),
            },
        }
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner.target {
            ProviderTarget::Key(key) => f.debug_tuple("Provider").field(&key.to_string()).finish(),
            ProviderTarget::Entry(entry) => {
                f.debug_tuple("Provider").field(&entry.origin).finish()
            }
        }
    }
}
