//! # Message identity and envelopes.
//!
//! Any `'static + Send + Sync` value can travel on the bus. Its identity is a
//! [`TypeKey`]: the `TypeId` (used for comparison and hashing) plus the
//! fully-qualified type name (used in logs).

use std::{
    any::{Any, TypeId, type_name},
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

/// Stable, comparable identity of a message type.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of `M`.
    pub fn of<M: Any>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: type_name::<M>(),
        }
    }

    /// Fully-qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A published message together with its type identity.
///
/// Cloning is cheap: the payload is shared between all subscribers.
#[derive(Clone)]
pub struct Envelope {
    key: TypeKey,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Envelope {
    /// Wraps a message.
    pub fn new<M: Any + Send + Sync>(msg: M) -> Self {
        Self::from_arc(Arc::new(msg))
    }

    /// Wraps an already shared message.
    pub fn from_arc<M: Any + Send + Sync>(msg: Arc<M>) -> Self {
        Self {
            key: TypeKey::of::<M>(),
            payload: msg,
        }
    }

    /// Type identity of the payload.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// True if the payload is an `M`.
    pub fn is<M: Any>(&self) -> bool {
        self.key.id == TypeId::of::<M>()
    }

    /// Borrows the payload as `M`.
    pub fn downcast_ref<M: Any>(&self) -> Option<&M> {
        self.payload.downcast_ref::<M>()
    }

    /// Shares the payload as `Arc<M>`.
    pub fn downcast<M: Any + Send + Sync>(&self) -> Option<Arc<M>> {
        Arc::clone(&self.payload).downcast::<M>().ok()
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope").field("key", &self.key).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);
    struct Pong;

    #[test]
    fn keys_compare_by_type() {
        assert_eq!(TypeKey::of::<Ping>(), TypeKey::of::<Ping>());
        assert_ne!(TypeKey::of::<Ping>(), TypeKey::of::<Pong>());
        assert!(TypeKey::of::<Ping>().name().ends_with("Ping"));
    }

    #[test]
    fn envelope_downcasts_only_to_its_type() {
        let env = Envelope::new(Ping(7));
        assert!(env.is::<Ping>());
        assert_eq!(env.downcast_ref::<Ping>(), Some(&Ping(7)));
        assert!(env.downcast::<Pong>().is_none());
        assert_eq!(env.downcast::<Ping>().map(|p| p.0), Some(7));
    }
}
