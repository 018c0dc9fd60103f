use std::collections::HashSet;
use std::sync::Arc;

use tally_commands::{Finder, exactly_one};
use tally_core::{EngineError, EngineResult, Handle, Persistent};
use tally_store::Session;

use crate::account::Account;
use crate::ledger::Ledger;

/// Finds the one ledger whose name and parent account title contain the
/// given fragments.
///
/// A blank fragment matches anything, but at least one must be given.
#[derive(Debug, Default)]
pub struct SpecificLedgerFinder {
    account_title: String,
    ledger_name: String,
    found: Option<Arc<Ledger>>,
}

impl SpecificLedgerFinder {
    pub fn new(account_title: &str, ledger_name: &str) -> Self {
        Self {
            account_title: account_title.to_string(),
            ledger_name: ledger_name.to_string(),
            found: None,
        }
    }

    pub fn set_account_title(&mut self, account_title: &str) {
        self.account_title = account_title.to_string();
        self.found = None;
    }

    pub fn set_ledger_name(&mut self, ledger_name: &str) {
        self.ledger_name = ledger_name.to_string();
        self.found = None;
    }

    /// The ledger found by the last successful query.
    pub fn ledger(&self) -> EngineResult<Arc<Ledger>> {
        self.found
            .clone()
            .ok_or_else(|| EngineError::illegal_state("ledger finder has not been queried"))
    }
}

impl Finder for SpecificLedgerFinder {
    type Output = Arc<Ledger>;

    fn query(&mut self, session: &mut Session) -> EngineResult<Arc<Ledger>> {
        if let Some(found) = &self.found {
            return Ok(found.clone());
        }
        if self.account_title.trim().is_empty() && self.ledger_name.trim().is_empty() {
            return Err(EngineError::illegal_state(
                "ledger finder needs an account title or a ledger name",
            ));
        }

        let title = self.account_title.as_str();
        let accounts: HashSet<Handle> = session
            .query(|a: &Account| a.title().contains(title))?
            .iter()
            .filter_map(|a| a.identity().handle().ok())
            .collect();

        let name = self.ledger_name.as_str();
        let ledgers = session.query(|l: &Ledger| {
            l.name().contains(name) && l.parent().is_some_and(|p| accounts.contains(&p.handle()))
        })?;

        let ledger = exactly_one(ledgers, &format!("ledger '{name}' under account '{title}'"))?;
        self.found = Some(ledger.clone());
        Ok(ledger)
    }
}
