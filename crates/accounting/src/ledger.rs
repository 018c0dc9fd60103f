use serde::{Deserialize, Serialize};

use tally_core::{EngineError, EngineResult, Handle, Identity, Persistent, Ref};
use tally_store::Session;

use crate::account::{Account, Polarity};
use crate::amount::Amount;
use crate::entry::Entry;

/// A named sub-account: the thing entries are actually posted against.
///
/// A ledger does not cache its balance; the balance is derived from its
/// entries every time it is asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(skip)]
    identity: Identity,
    name: String,
    polarity: Polarity,
    pub(crate) parent: Option<Ref<Account>>,
    pub(crate) entries: Vec<Ref<Entry>>,
}

impl Ledger {
    pub fn new(name: &str, polarity: Polarity) -> EngineResult<Self> {
        if name.trim().is_empty() {
            return Err(EngineError::illegal_argument("ledger name cannot be blank"));
        }
        Ok(Self {
            identity: Identity::Unassigned,
            name: name.to_string(),
            polarity,
            parent: None,
            entries: Vec::new(),
        })
    }

    /// A ledger with the normal balance side of `account`.
    pub fn for_account(name: &str, account: &Account) -> EngineResult<Self> {
        Self::new(name, account.polarity())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn parent(&self) -> Option<Ref<Account>> {
        self.parent
    }

    pub fn entries(&self) -> &[Ref<Entry>] {
        &self.entries
    }

    pub(crate) fn attach(&mut self, entry: Ref<Entry>) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    pub(crate) fn detach(&mut self, entry: Ref<Entry>) {
        self.entries.retain(|e| *e != entry);
    }

    /// Sum of the entries, signed by this ledger's polarity.
    pub fn balance(&self, session: &mut Session) -> EngineResult<Amount> {
        let mut total: i128 = 0;
        for entry in &self.entries {
            let entry = session.fetch(*entry)?;
            total += self.polarity.direction(entry.side()) * i128::from(entry.amount().cents());
        }
        Amount::from_total(total, "ledger balance")
    }
}

impl Persistent for Ledger {
    const KIND: &'static str = "ledger";

    fn identity(&self) -> Identity {
        self.identity
    }

    fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    fn references(&self) -> Vec<Handle> {
        self.parent
            .iter()
            .map(Ref::handle)
            .chain(self.entries.iter().map(Ref::handle))
            .collect()
    }
}
