//! `tally-store`: object store, sessions and units of work.
//!
//! ```text
//! Engine ──gain_client()──▶ Session ──UnitOfWork::begin()──▶ UnitOfWork
//!   │                          │                               │
//!   └── ObjectStore (shared) ◀─┴── staged writes ──commit()────┘
//! ```

pub mod config;
pub mod engine;
pub mod hooks;
pub mod object_store;
pub mod query;
pub mod session;
pub mod unit_of_work;

pub use config::EngineConfig;
pub use engine::Engine;
pub use hooks::{ChangeListener, ChangeListeners, HookRegistry};
pub use object_store::{InMemoryObjectStore, ObjectStore, StoreError, StoredObject, WriteBatch};
pub use session::{Savepoint, Session};
pub use unit_of_work::{UnitOfWork, UnitOfWorkState};
