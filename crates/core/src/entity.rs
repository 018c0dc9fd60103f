//! Persistent entities: identity, congruence and typed references.
//!
//! Every object the engine stores implements [`Persistent`]. Its identity is an
//! explicit [`Identity`] slot rather than a magic zero field, so asking an
//! unpersisted object for its handle is a typed failure (`NotActivated`).
//!
//! Two flavours of equality exist:
//!
//! - **Congruence** ([`congruent`]): both sides persisted and sharing a handle.
//!   This holds across sessions.
//! - **Reference identity** (`Arc::ptr_eq`): only meaningful inside one session,
//!   whose object cache hands out the same `Arc` for the same handle.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EngineResult;
use crate::id::{Handle, Identity};

/// An object that can be stored in, and activated from, an object store.
///
/// Payloads are serialized with serde; the identity slot itself is kept out of
/// the payload (`#[serde(skip)]`) and restored by the store on load.
pub trait Persistent: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable kind name; keys the activation policy table and kind-scoped queries.
    const KIND: &'static str;

    fn identity(&self) -> Identity;

    /// Called by the store when a handle is allocated or the object is loaded.
    fn set_identity(&mut self, identity: Identity);

    /// Outgoing graph edges followed when this object is activated.
    fn references(&self) -> Vec<Handle> {
        Vec::new()
    }
}

/// Handle of a persisted entity, or `NotActivated`.
pub fn identity_of<T: Persistent>(entity: &T) -> EngineResult<Handle> {
    entity.identity().handle()
}

/// True iff both entities are persisted and share the same handle.
pub fn congruent<A: Persistent, B: Persistent>(a: &A, b: &B) -> bool {
    match (a.identity(), b.identity()) {
        (Identity::Assigned(x), Identity::Assigned(y)) => x == y,
        _ => false,
    }
}

/// Like [`congruent`], with "no object" on the right-hand side never matching.
pub fn congruent_opt<A: Persistent, B: Persistent>(a: &A, b: Option<&B>) -> bool {
    b.is_some_and(|b| congruent(a, b))
}

/// Typed reference to a persisted object of kind `T`.
///
/// A `Ref` can only be built from an assigned handle, so holding one means the
/// target was staged or committed at some point. It serializes as the bare
/// handle.
pub struct Ref<T> {
    handle: Handle,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Persistent> Ref<T> {
    /// Reference to `entity`, or `NotActivated` if it was never persisted.
    pub fn to(entity: &T) -> EngineResult<Self> {
        Ok(Self::from_handle(identity_of(entity)?))
    }

    /// Whether `entity` is the object this reference points at.
    pub fn points_to(&self, entity: &T) -> bool {
        entity.identity() == Identity::Assigned(self.handle)
    }
}

impl<T> Ref<T> {
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            _kind: PhantomData,
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ref<T> {}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T> Eq for Ref<T> {}

impl<T> Hash for Ref<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({})", self.handle)
    }
}

impl<T> Serialize for Ref<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.handle.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Ref<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Handle::deserialize(deserializer).map(Self::from_handle)
    }
}

impl<T> From<Ref<T>> for Handle {
    fn from(value: Ref<T>) -> Self {
        value.handle
    }
}
