//! Activation policy: how far the store follows graph edges on load.
//!
//! Activating an object pulls every object reachable through
//! [`Persistent::references`](crate::Persistent::references) into the session,
//! up to a bounded number of hops, so that nearby objects can be dereferenced
//! without another round-trip. Kinds marked [`ActivationPolicy::Leaf`] are
//! loaded when reached but never traversed further.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default hop count for cascading kinds.
///
/// Covers Account -> Ledger -> Entry -> Transaction with one hop to spare.
pub const DEFAULT_ACTIVATION_DEPTH: u32 = 5;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ActivationPolicy {
    /// Follow outgoing edges up to `depth` hops.
    Cascade { depth: u32 },
    /// Treat as primitive data; do not traverse.
    Leaf,
}

impl ActivationPolicy {
    pub fn cascade(depth: u32) -> Self {
        Self::Cascade { depth }
    }

    /// Hops to follow from an object of this kind.
    pub fn depth(self) -> u32 {
        match self {
            Self::Cascade { depth } => depth,
            Self::Leaf => 0,
        }
    }

    pub fn is_leaf(self) -> bool {
        matches!(self, Self::Leaf)
    }
}

impl Default for ActivationPolicy {
    fn default() -> Self {
        Self::cascade(DEFAULT_ACTIVATION_DEPTH)
    }
}

/// Per-kind policy table with a fallback for unlisted kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationPolicies {
    #[serde(default)]
    fallback: ActivationPolicy,
    #[serde(default)]
    kinds: HashMap<String, ActivationPolicy>,
}

impl Default for ActivationPolicies {
    fn default() -> Self {
        Self::new(ActivationPolicy::default())
    }
}

impl ActivationPolicies {
    pub fn new(fallback: ActivationPolicy) -> Self {
        Self {
            fallback,
            kinds: HashMap::new(),
        }
    }

    pub fn set(&mut self, kind: impl Into<String>, policy: ActivationPolicy) -> &mut Self {
        self.kinds.insert(kind.into(), policy);
        self
    }

    pub fn with(mut self, kind: impl Into<String>, policy: ActivationPolicy) -> Self {
        self.set(kind, policy);
        self
    }

    /// Merge `other` on top of this table; its entries win.
    pub fn extend(&mut self, other: &ActivationPolicies) {
        for (kind, policy) in &other.kinds {
            self.kinds.insert(kind.clone(), *policy);
        }
    }

    pub fn policy_for(&self, kind: &str) -> ActivationPolicy {
        self.kinds.get(kind).copied().unwrap_or(self.fallback)
    }

    pub fn fallback(&self) -> ActivationPolicy {
        self.fallback
    }
}
