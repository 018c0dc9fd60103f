//! Root aggregate marker.

use crate::entity::Persistent;

/// The single top-level object of a store.
///
/// A store holds at most one root; everything else is reached from it or by
/// kind-scoped queries. The root is what a fresh session activates first.
pub trait AggregateRoot: Persistent {}
