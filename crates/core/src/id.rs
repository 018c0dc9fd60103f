//! Identity handles and diagnostic identifiers.

use core::num::NonZeroU64;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Persistent identity of a stored object.
///
/// Handles are allocated by the object store when an object is first staged
/// and never change afterwards. Zero is reserved for "not yet persisted" and
/// cannot be represented.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(NonZeroU64);

impl Handle {
    /// Build a handle from its raw value; zero means "unpersisted" and is rejected.
    pub fn new(raw: u64) -> EngineResult<Self> {
        NonZeroU64::new(raw)
            .map(Self)
            .ok_or_else(|| EngineError::illegal_argument("handle 0 is reserved for unpersisted objects"))
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl core::fmt::Display for Handle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity slot carried by every persistent object.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Identity {
    #[default]
    Unassigned,
    Assigned(Handle),
}

impl Identity {
    /// The handle, or `NotActivated` if the object was never persisted.
    pub fn handle(self) -> EngineResult<Handle> {
        match self {
            Identity::Assigned(handle) => Ok(handle),
            Identity::Unassigned => Err(EngineError::NotActivated),
        }
    }

    pub fn is_assigned(self) -> bool {
        matches!(self, Identity::Assigned(_))
    }

    /// Raw value with `0` standing for unassigned.
    pub fn raw(self) -> u64 {
        match self {
            Identity::Assigned(handle) => handle.get(),
            Identity::Unassigned => 0,
        }
    }
}

impl From<Handle> for Identity {
    fn from(value: Handle) -> Self {
        Identity::Assigned(value)
    }
}

/// Identifier of a working session (client) against the store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

/// Identifier of a unit of work, for log correlation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitOfWorkId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier (UUIDv7, time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl FromStr for $t {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| EngineError::illegal_argument(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(SessionId, "SessionId");
impl_uuid_newtype!(UnitOfWorkId, "UnitOfWorkId");
