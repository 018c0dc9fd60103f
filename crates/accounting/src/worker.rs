use serde::{Deserialize, Serialize};

use tally_core::{EngineError, EngineResult, Handle, Identity, Persistent, Ref};

use crate::ledger::Ledger;

/// Someone the business pays or reimburses.
///
/// Each worker gets a ledger under the reimbursable-expenses-payable
/// account when added through [`AddWorker`](crate::commands::AddWorker).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    #[serde(skip)]
    identity: Identity,
    name: String,
    pub(crate) expenses_payable: Option<Ref<Ledger>>,
}

impl Worker {
    pub fn new(name: &str) -> EngineResult<Self> {
        if name.trim().is_empty() {
            return Err(EngineError::illegal_argument("worker name cannot be blank"));
        }
        Ok(Self {
            name: name.to_string(),
            ..Self::default()
        })
    }

    /// Query-by-example prototype matching on name only.
    pub fn example_with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expenses_payable(&self) -> Option<Ref<Ledger>> {
        self.expenses_payable
    }
}

impl Persistent for Worker {
    const KIND: &'static str = "worker";

    fn identity(&self) -> Identity {
        self.identity
    }

    fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    fn references(&self) -> Vec<Handle> {
        self.expenses_payable.iter().map(Ref::handle).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_is_rejected() {
        assert!(matches!(Worker::new("  "), Err(EngineError::IllegalArgument(_))));
    }

    #[test]
    fn example_carries_only_the_name() {
        let example = Worker::example_with_name("Joe Bloggs");
        assert_eq!(example.name(), "Joe Bloggs");
        assert!(example.expenses_payable().is_none());
        assert!(!example.identity().is_assigned());
    }
}
