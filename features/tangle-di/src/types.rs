use std::{
    any::{Any, TypeId},
    sync::Arc,
};

/// Opaque error produced by an invocation handle
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// We assume resolved values may be shared across threads,
/// so anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

/// Lookup identity of a binding: a type plus an optional qualifier.
///
/// Two keys address the same binding iff both parts match. Generic types
/// key on the reified type argument, so `Wrapper<String>` and `Wrapper<u64>`
/// are distinct keys.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Key {
    pub type_info: TypeInfo,
    pub qualifier: Option<&'static str>,
}
impl Key {
    pub fn of<T: 'static + ?Sized>() -> Key {
        Key {
            type_info: TypeInfo::of::<T>(),
            qualifier: None,
        }
    }

    pub fn qualified<T: 'static + ?Sized>(qualifier: &'static str) -> Key {
        Key {
            type_info: TypeInfo::of::<T>(),
            qualifier: Some(qualifier),
        }
    }
}
impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.qualifier {
            Some(qualifier) => write!(f, "@{} {}", qualifier, self.type_info),
            None => self.type_info.fmt(f),
        }
    }
}

/// A produced value
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new<T: Injectable>(value: T) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            value: Arc::new(value),
        }
    }

    pub fn from_arc<T: Injectable>(value: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            value,
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.value.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }
}
impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}
