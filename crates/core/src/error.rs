//! Engine error model.

use thiserror::Error;

/// Result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level error.
///
/// The first five variants are the failure taxonomy every layer speaks:
/// identity, command readiness, lookups, argument shape and call ordering.
/// `Storage` carries backend failures surfaced by an object store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// An identity was requested on an entity that has never been persisted.
    #[error("object not activated: it has not been persisted yet")]
    NotActivated,

    /// A command's preconditions failed; nothing was written.
    #[error("command not ready: {0}")]
    CommandNotReady(String),

    /// A lookup found zero matches, or more than one where exactly one was required.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input had an invalid shape (negative amount, malformed code, ...).
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// An operation was invoked before its required setup.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The object store failed (closed, poisoned lock, payload codec, ...).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::CommandNotReady(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn illegal_argument(msg: impl Into<String>) -> Self {
        Self::IllegalArgument(msg.into())
    }

    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether the caller can recover by cancelling and retrying with other input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CommandNotReady(_) | Self::NotFound(_))
    }
}
