use tracing::debug;

use tally_commands::{Command, Validation};
use tally_core::{EngineResult, Ref};
use tally_store::UnitOfWork;

use super::{books_exist, is_stored, load_books};
use crate::account::Account;
use crate::ledger::Ledger;

/// Add an account, together with its initial ledgers, to the books.
#[derive(Debug)]
pub struct AddAccount {
    account: Account,
    ledgers: Vec<Ledger>,
}

impl AddAccount {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            ledgers: Vec::new(),
        }
    }

    /// Add a ledger with the account's own polarity.
    pub fn with_ledger(mut self, name: &str) -> EngineResult<Self> {
        self.ledgers.push(Ledger::for_account(name, &self.account)?);
        Ok(self)
    }

    pub fn with_custom_ledger(mut self, ledger: Ledger) -> Self {
        self.ledgers.push(ledger);
        self
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// The ledgers, with identities assigned once executed.
    pub fn ledgers(&self) -> &[Ledger] {
        &self.ledgers
    }
}

impl Command for AddAccount {
    fn name(&self) -> &'static str {
        "Add Account"
    }

    fn validate(&self, uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
        books_exist(uow)?.and(|| {
            let stored = is_stored(uow, &self.account)?;
            Ok(Validation::check(!stored, || {
                format!("account '{}' is already in the books", self.account.title())
            }))
        })
    }

    fn persist(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
        let (mut account, mut ledgers) = (self.account.clone(), self.ledgers.clone());
        let account_ref = Ref::from_handle(uow.save(&mut account)?);
        for ledger in &mut ledgers {
            ledger.parent = Some(account_ref);
            let ledger_ref = Ref::from_handle(uow.save(ledger)?);
            if !account.ledgers.contains(&ledger_ref) {
                account.ledgers.push(ledger_ref);
            }
        }
        uow.save(&mut account)?;

        let mut books = load_books(uow)?;
        books.add_account(account_ref)?;
        uow.save(&mut books)?;
        debug!(title = account.title(), ledgers = ledgers.len(), "account staged");
        (self.account, self.ledgers) = (account, ledgers);
        Ok(())
    }
}

/// Add a ledger to an account that is already in the books.
#[derive(Debug)]
pub struct AddLedger {
    account: Ref<Account>,
    ledger: Ledger,
}

impl AddLedger {
    pub fn new(account: Ref<Account>, ledger: Ledger) -> Self {
        Self { account, ledger }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

impl Command for AddLedger {
    fn name(&self) -> &'static str {
        "Add Ledger"
    }

    fn validate(&self, uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
        let Some(account) = uow.try_fetch(self.account)? else {
            return Ok(Validation::not_ready(format!("account {} does not exist", self.account.handle())));
        };
        for existing in account.ledgers() {
            if uow.fetch(*existing)?.name() == self.ledger.name() {
                return Ok(Validation::not_ready(format!(
                    "account '{}' already has a ledger named '{}'",
                    account.title(),
                    self.ledger.name()
                )));
            }
        }
        Ok(Validation::Ready)
    }

    fn persist(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
        let mut account = (*uow.fetch(self.account)?).clone();
        let mut ledger = self.ledger.clone();
        ledger.parent = Some(self.account);
        let ledger_ref = Ref::from_handle(uow.save(&mut ledger)?);
        account.ledgers.push(ledger_ref);
        uow.save(&mut account)?;
        self.ledger = ledger;
        Ok(())
    }
}
