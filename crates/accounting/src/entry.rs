use serde::{Deserialize, Serialize};

use tally_core::{EngineResult, Handle, Identity, Persistent, Ref};

use crate::amount::{Amount, ForeignAmount};
use crate::currency::validate_code;
use crate::ledger::Ledger;
use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySide {
    Debit,
    Credit,
}

/// One line of a transaction: an amount on one side of one ledger.
///
/// `currency` names the currency of `amount`; `None` is the home currency.
/// A foreign entry keeps its native amount in `foreign` and carries the
/// converted home value as `amount`, so it balances in the home currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(skip)]
    identity: Identity,
    side: EntrySide,
    amount: Amount,
    currency: Option<String>,
    foreign: Option<ForeignAmount>,
    pub(crate) ledger: Option<Ref<Ledger>>,
    pub(crate) transaction: Option<Ref<Transaction>>,
}

impl Entry {
    /// An entry against `ledger`. An unsaved ledger leaves the entry without
    /// one, which posting will refuse.
    pub fn new(side: EntrySide, amount: Amount, ledger: &Ledger) -> Self {
        Self {
            identity: Identity::Unassigned,
            side,
            amount,
            currency: None,
            foreign: None,
            ledger: Ref::to(ledger).ok(),
            transaction: None,
        }
    }

    pub fn debit(amount: Amount, ledger: &Ledger) -> Self {
        Self::new(EntrySide::Debit, amount, ledger)
    }

    pub fn credit(amount: Amount, ledger: &Ledger) -> Self {
        Self::new(EntrySide::Credit, amount, ledger)
    }

    /// Denominate `amount` in a currency other than the home currency.
    pub fn in_currency(mut self, code: &str) -> EngineResult<Self> {
        validate_code(code)?;
        self.currency = Some(code.to_string());
        Ok(self)
    }

    /// Record a foreign amount; the entry's amount becomes its home value.
    pub fn with_foreign(mut self, foreign: ForeignAmount) -> Self {
        self.amount = foreign.home();
        self.currency = None;
        self.foreign = Some(foreign);
        self
    }

    pub fn side(&self) -> EntrySide {
        self.side
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn set_amount(&mut self, amount: Amount) {
        self.amount = amount;
        self.foreign = None;
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn foreign(&self) -> Option<&ForeignAmount> {
        self.foreign.as_ref()
    }

    pub fn ledger(&self) -> Option<Ref<Ledger>> {
        self.ledger
    }

    pub fn transaction(&self) -> Option<Ref<Transaction>> {
        self.transaction
    }
}

impl Persistent for Entry {
    const KIND: &'static str = "entry";

    fn identity(&self) -> Identity {
        self.identity
    }

    fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    fn references(&self) -> Vec<Handle> {
        self.ledger
            .iter()
            .map(Ref::handle)
            .chain(self.transaction.iter().map(Ref::handle))
            .collect()
    }
}
