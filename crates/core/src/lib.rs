//! `tally-core`: object identity layer for the bookkeeping engine.
//!
//! This crate contains **pure** primitives (no storage): identity handles,
//! typed references, congruence, activation policies and the error taxonomy.

pub mod activation;
pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use activation::{ActivationPolicies, ActivationPolicy, DEFAULT_ACTIVATION_DEPTH};
pub use aggregate::AggregateRoot;
pub use entity::{Persistent, Ref, congruent, congruent_opt, identity_of};
pub use error::{EngineError, EngineResult};
pub use id::{Handle, Identity, SessionId, UnitOfWorkId};
pub use value_object::ValueObject;
