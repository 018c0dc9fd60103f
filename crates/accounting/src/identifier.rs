use serde::{Deserialize, Serialize};

use tally_core::{EngineError, EngineResult, Handle, Identity, Persistent, Ref};

/// A named code from a fixed list, e.g. one PAYG withholding type.
///
/// `index` is the lookup key other objects use to refer to the identifier
/// without holding a reference to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(skip)]
    identity: Identity,
    name: String,
    index: u32,
}

impl Identifier {
    pub fn new(name: &str, index: u32) -> EngineResult<Self> {
        if name.trim().is_empty() {
            return Err(EngineError::illegal_argument("identifier name cannot be blank"));
        }
        Ok(Self {
            identity: Identity::Unassigned,
            name: name.to_string(),
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl Persistent for Identifier {
    const KIND: &'static str = "identifier";

    fn identity(&self) -> Identity {
        self.identity
    }

    fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }
}

/// A labelled list of identifiers, unique by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierGroup {
    #[serde(skip)]
    identity: Identity,
    label: String,
    #[serde(skip)]
    pub(crate) pending: Vec<Identifier>,
    pub(crate) identifiers: Vec<Ref<Identifier>>,
}

impl IdentifierGroup {
    pub fn new(label: &str) -> EngineResult<Self> {
        if label.trim().is_empty() {
            return Err(EngineError::illegal_argument("identifier group label cannot be blank"));
        }
        Ok(Self {
            label: label.to_string(),
            ..Self::default()
        })
    }

    /// Query-by-example prototype matching on label only.
    pub fn example_with_label(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Queue an identifier to be stored with the group. An index already
    /// queued is refused.
    pub fn add(&mut self, identifier: Identifier) -> EngineResult<()> {
        if self.pending.iter().any(|i| i.index() == identifier.index()) {
            return Err(EngineError::illegal_argument(format!(
                "identifier index {} is already in group '{}'",
                identifier.index(),
                self.label
            )));
        }
        self.pending.push(identifier);
        Ok(())
    }

    /// Identifiers queued by [`add`](Self::add) and not yet stored.
    pub fn pending(&self) -> &[Identifier] {
        &self.pending
    }

    pub fn identifiers(&self) -> &[Ref<Identifier>] {
        &self.identifiers
    }
}

impl Persistent for IdentifierGroup {
    const KIND: &'static str = "identifier_group";

    fn identity(&self) -> Identity {
        self.identity
    }

    fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    fn references(&self) -> Vec<Handle> {
        self.identifiers.iter().map(Ref::handle).collect()
    }
}
