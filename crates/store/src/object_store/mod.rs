//! Object store boundary.
//!
//! This module defines the storage-facing abstraction for committed objects
//! without making any assumptions about the on-disk format.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryObjectStore;
pub use r#trait::{CommitReceipt, ObjectStore, PENDING_REVISION, StoreError, StoredObject, WriteBatch};
