use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use tally_core::{EngineError, Handle, Persistent};
use std::sync::Arc;

/// Revision carried by records that are staged but not yet committed.
pub const PENDING_REVISION: u64 = 0;

/// One object as the store sees it: kind, outgoing edges and a JSON payload.
///
/// The store never interprets payloads. `references` are copied out of the
/// typed object at staging time so activation can walk the graph without
/// knowing concrete types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub handle: Handle,
    pub kind: String,

    /// Store-wide commit counter at the time this record was written.
    /// `PENDING_REVISION` while staged.
    pub revision: u64,

    pub references: Vec<Handle>,
    pub payload: JsonValue,
}

impl StoredObject {
    /// Snapshot a typed object for staging. The object must already hold a handle.
    pub fn from_typed<T: Persistent>(object: &T) -> Result<Self, StoreError> {
        let handle = object
            .identity()
            .handle()
            .map_err(|_| StoreError::Unassigned(T::KIND))?;
        let payload = serde_json::to_value(object)
            .map_err(|e| StoreError::Codec(format!("{} payload serialization failed: {e}", T::KIND)))?;

        Ok(Self {
            handle,
            kind: T::KIND.to_string(),
            revision: PENDING_REVISION,
            references: object.references(),
            payload,
        })
    }

    /// Rebuild the typed object and restore its identity.
    pub fn to_typed<T: Persistent>(&self) -> Result<T, StoreError> {
        if self.kind != T::KIND {
            return Err(StoreError::KindMismatch {
                handle: self.handle,
                expected: T::KIND,
                found: self.kind.clone(),
            });
        }
        let mut object: T = serde_json::from_value(self.payload.clone())
            .map_err(|e| StoreError::Codec(format!("{} payload deserialization failed: {e}", T::KIND)))?;
        object.set_identity(self.handle.into());
        Ok(object)
    }
}

/// An atomic set of writes handed to [`ObjectStore::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub puts: Vec<StoredObject>,
    pub deletes: Vec<Handle>,
    pub root: Option<Handle>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.deletes.is_empty() && self.root.is_none()
    }
}

/// What a successful [`ObjectStore::apply`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Handles written, each with its newly assigned revision.
    pub written: Vec<(Handle, u64)>,
    pub deleted: Vec<Handle>,
}

impl CommitReceipt {
    /// Every handle touched by the commit, in write order.
    pub fn handles(&self) -> Vec<Handle> {
        self.written
            .iter()
            .map(|(handle, _)| *handle)
            .chain(self.deleted.iter().copied())
            .collect()
    }
}

/// Object store operation error.
///
/// These are **infrastructure errors** (availability, codec, consistency) as
/// opposed to the engine's domain taxonomy; they surface to callers as
/// `EngineError::Storage`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store is closed")]
    Closed,

    #[error("object store unavailable: {0}")]
    Unavailable(String),

    #[error("payload codec: {0}")]
    Codec(String),

    #[error("cannot stage an unpersisted {0} without a handle")]
    Unassigned(&'static str),

    #[error("object {handle} is a '{found}', not a '{expected}'")]
    KindMismatch {
        handle: Handle,
        expected: &'static str,
        found: String,
    },
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unassigned(_) => EngineError::NotActivated,
            other => EngineError::Storage(other.to_string()),
        }
    }
}

/// Opaque object store shared by every session of an engine.
///
/// The store keeps committed records only. Staging, identity caching and
/// activation live in [`Session`](crate::Session); the store's job is to hand
/// out handles, serve records and apply write batches all-or-nothing.
///
/// ## Implementation Requirements
///
/// - `allocate` never returns the same handle twice, even across failed commits
/// - `apply` is atomic: either every put, delete and root change lands or none does
/// - every call after `close` fails with [`StoreError::Closed`]
pub trait ObjectStore: Send + Sync {
    fn allocate(&self) -> Result<Handle, StoreError>;

    fn load(&self, handle: Handle) -> Result<Option<StoredObject>, StoreError>;

    /// All committed records of one kind, in handle order.
    fn load_kind(&self, kind: &str) -> Result<Vec<StoredObject>, StoreError>;

    fn root(&self) -> Result<Option<Handle>, StoreError>;

    fn apply(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError>;

    fn close(&self) -> Result<(), StoreError>;
}

impl<S> ObjectStore for Arc<S>
where
    S: ObjectStore + ?Sized,
{
    fn allocate(&self) -> Result<Handle, StoreError> {
        (**self).allocate()
    }

    fn load(&self, handle: Handle) -> Result<Option<StoredObject>, StoreError> {
        (**self).load(handle)
    }

    fn load_kind(&self, kind: &str) -> Result<Vec<StoredObject>, StoreError> {
        (**self).load_kind(kind)
    }

    fn root(&self) -> Result<Option<Handle>, StoreError> {
        (**self).root()
    }

    fn apply(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        (**self).apply(batch)
    }

    fn close(&self) -> Result<(), StoreError> {
        (**self).close()
    }
}
