use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{errors::ResolveError, types::{Instance, Key}};

/// Per-component memoization of scoped bindings, keyed by [`Key`].
///
/// One slot exists per key; the slot's lock is held across compute-and-store
/// only, never across an unrelated key's subtree, so concurrent requests for
/// different keys proceed independently. A null result is a result and is
/// cached like any other.
pub(crate) struct ScopeCache {
    slots: Mutex<HashMap<Key, Arc<Slot>>>,
}

#[derive(Default)]
struct Slot {
    cell: Mutex<Option<Option<Instance>>>,
}

impl ScopeCache {
    pub fn new() -> Self {
        ScopeCache {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, computing and storing it on first
    /// request. `compute` runs at most once per key for the lifetime of this
    /// cache, no matter how many dependency chains request the key.
    pub fn get_or_compute(
        &self,
        key: &Key,
        compute: impl FnOnce() -> Result<Option<Instance>, ResolveError>,
    ) -> Result<Option<Instance>, ResolveError> {
        let slot = {
            let mut slots = self.slots.lock().expect("scope cache lock poisoned");
            slots.entry(*key).or_default().clone()
        };

        let mut cell = slot.cell.lock().expect("scope slot lock poisoned");
        if let Some(cached) = &*cell {
            tracing::trace!(key = %key, "scope cache hit");
            return Ok(cached.clone());
        }
        let value = compute()?;
        *cell = Some(value.clone());
        Ok(value)
    }
}
