use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tally_core::{AggregateRoot, EngineError, EngineResult, Handle, Identity, Persistent, Ref};

use crate::account::Account;
use crate::currency::Currency;
use crate::identifier::IdentifierGroup;
use crate::worker::Worker;

/// The root of a set of books.
///
/// Everything else in the store is reachable from here: the chart of
/// accounts, the currencies in use and the workforce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Books {
    #[serde(skip)]
    identity: Identity,
    date_of_inception: Option<NaiveDate>,
    home_currency: Option<Ref<Currency>>,
    currencies: Vec<Ref<Currency>>,
    accounts: Vec<Ref<Account>>,
    workers: Vec<Ref<Worker>>,
    identifier_groups: Vec<Ref<IdentifierGroup>>,
}

impl Books {
    pub fn new(date_of_inception: Option<NaiveDate>) -> Self {
        Self {
            date_of_inception,
            ..Self::default()
        }
    }

    pub fn date_of_inception(&self) -> Option<NaiveDate> {
        self.date_of_inception
    }

    pub fn home_currency(&self) -> EngineResult<Ref<Currency>> {
        self.home_currency
            .ok_or_else(|| EngineError::illegal_state("books have no home currency"))
    }

    /// The home currency can be set once only.
    pub fn set_home_currency(&mut self, currency: Ref<Currency>) -> EngineResult<()> {
        if self.home_currency.is_some() {
            return Err(EngineError::illegal_state("home currency is already set"));
        }
        self.home_currency = Some(currency);
        self.add_currency(currency);
        Ok(())
    }

    pub fn currencies(&self) -> &[Ref<Currency>] {
        &self.currencies
    }

    /// Returns false if the currency was already known.
    pub fn add_currency(&mut self, currency: Ref<Currency>) -> bool {
        if self.currencies.contains(&currency) {
            return false;
        }
        self.currencies.push(currency);
        true
    }

    pub fn accounts(&self) -> &[Ref<Account>] {
        &self.accounts
    }

    pub fn add_account(&mut self, account: Ref<Account>) -> EngineResult<()> {
        if self.accounts.contains(&account) {
            return Err(EngineError::illegal_state(format!(
                "account {} is already in the books",
                account.handle()
            )));
        }
        self.accounts.push(account);
        Ok(())
    }

    pub fn workers(&self) -> &[Ref<Worker>] {
        &self.workers
    }

    pub fn add_worker(&mut self, worker: Ref<Worker>) -> EngineResult<()> {
        if self.workers.contains(&worker) {
            return Err(EngineError::illegal_state(format!(
                "worker {} is already in the books",
                worker.handle()
            )));
        }
        self.workers.push(worker);
        Ok(())
    }

    pub fn identifier_groups(&self) -> &[Ref<IdentifierGroup>] {
        &self.identifier_groups
    }

    pub fn add_identifier_group(&mut self, group: Ref<IdentifierGroup>) {
        if !self.identifier_groups.contains(&group) {
            self.identifier_groups.push(group);
        }
    }
}

impl Persistent for Books {
    const KIND: &'static str = "books";

    fn identity(&self) -> Identity {
        self.identity
    }

    fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    fn references(&self) -> Vec<Handle> {
        self.currencies
            .iter()
            .map(Ref::handle)
            .chain(self.accounts.iter().map(Ref::handle))
            .chain(self.workers.iter().map(Ref::handle))
            .chain(self.identifier_groups.iter().map(Ref::handle))
            .collect()
    }
}

impl AggregateRoot for Books {}
