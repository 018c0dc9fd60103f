use serde::{Deserialize, Serialize};

use tally_core::{EngineError, EngineResult, Handle, Identity, Persistent, Ref};
use tally_store::Session;

use crate::amount::Amount;
use crate::entry::EntrySide;
use crate::ledger::Ledger;

/// High-level account class (determines the normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountClass {
    pub fn polarity(self) -> Polarity {
        match self {
            AccountClass::Asset | AccountClass::Expense => Polarity::DebitPositive,
            AccountClass::Liability | AccountClass::Equity | AccountClass::Revenue => {
                Polarity::CreditPositive
            }
        }
    }
}

/// Which side of an entry increases a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    DebitPositive,
    CreditPositive,
}

impl Polarity {
    /// `amount` as it moves a balance of this polarity.
    pub fn signed(self, side: EntrySide, amount: Amount) -> Amount {
        match (self, side) {
            (Polarity::DebitPositive, EntrySide::Debit) | (Polarity::CreditPositive, EntrySide::Credit) => amount,
            _ => -amount,
        }
    }

    /// `+1` or `-1`: how an entry on `side` moves a balance of this polarity.
    pub(crate) fn direction(self, side: EntrySide) -> i128 {
        match (self, side) {
            (Polarity::DebitPositive, EntrySide::Debit) | (Polarity::CreditPositive, EntrySide::Credit) => 1,
            _ => -1,
        }
    }
}

/// Accounts the system needs to locate without knowing their titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Bank,
    ReimbursableExpensesPayable,
    PayrollTaxPayable,
    PayrollExpense,
}

/// A named account holding one or more ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(skip)]
    identity: Identity,
    title: String,
    code: Option<String>,
    class: AccountClass,
    role: Option<AccountRole>,
    pub(crate) ledgers: Vec<Ref<Ledger>>,
}

impl Account {
    pub fn new(title: &str, class: AccountClass) -> EngineResult<Self> {
        if title.trim().is_empty() {
            return Err(EngineError::illegal_argument("account title cannot be blank"));
        }
        Ok(Self {
            identity: Identity::Unassigned,
            title: title.to_string(),
            code: None,
            class,
            role: None,
            ledgers: Vec::new(),
        })
    }

    pub fn with_code(mut self, code: &str) -> EngineResult<Self> {
        self.set_code(code)?;
        Ok(self)
    }

    pub fn with_role(mut self, role: AccountRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Codes are six characters with a dash second, e.g. `"1-1100"`.
    pub fn set_code(&mut self, code: &str) -> EngineResult<()> {
        if code.chars().count() != 6 || code.chars().nth(1) != Some('-') {
            return Err(EngineError::illegal_argument(format!(
                "account code '{code}' must be six characters with '-' second"
            )));
        }
        self.code = Some(code.to_string());
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn class(&self) -> AccountClass {
        self.class
    }

    pub fn polarity(&self) -> Polarity {
        self.class.polarity()
    }

    pub fn role(&self) -> Option<AccountRole> {
        self.role
    }

    pub fn ledgers(&self) -> &[Ref<Ledger>] {
        &self.ledgers
    }

    /// Sum of the ledger balances: ledgers sharing the account's polarity
    /// add, the others subtract.
    pub fn balance(&self, session: &mut Session) -> EngineResult<Amount> {
        let mut total: i128 = 0;
        for ledger in &self.ledgers {
            let ledger = session.fetch(*ledger)?;
            let balance = i128::from(ledger.balance(session)?.cents());
            if ledger.polarity() == self.polarity() {
                total += balance;
            } else {
                total -= balance;
            }
        }
        Amount::from_total(total, "account balance")
    }
}

impl Persistent for Account {
    const KIND: &'static str = "account";

    fn identity(&self) -> Identity {
        self.identity
    }

    fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    fn references(&self) -> Vec<Handle> {
        self.ledgers.iter().map(Ref::handle).collect()
    }
}
