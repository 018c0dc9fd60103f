use tracing::debug;

use tally_commands::{Command, Validation};
use tally_core::{EngineResult, Ref};
use tally_store::UnitOfWork;

use super::{TouchedLedgers, is_stored};
use crate::entry::Entry;
use crate::transaction::{Transaction, balances};

/// Checks shared by posting and updating: the entries balance and every one
/// of them points at a ledger that exists.
fn validate_entries(transaction: &Transaction, uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
    if !transaction.holds_lines() {
        return Ok(Validation::not_ready(
            "transaction entries are not loaded; read it with Transaction::load first",
        ));
    }
    if transaction.lines().len() < 2 {
        return Ok(Validation::not_ready("a transaction needs at least two entries"));
    }
    for (n, entry) in transaction.lines().iter().enumerate() {
        let Some(ledger) = entry.ledger() else {
            return Ok(Validation::not_ready(format!("entry {n} has no ledger")));
        };
        if uow.try_fetch(ledger)?.is_none() {
            return Ok(Validation::not_ready(format!(
                "entry {n} refers to ledger {} which is not in the books",
                ledger.handle()
            )));
        }
    }
    Ok(Validation::check(balances(transaction.lines()), || {
        format!("transaction '{}' does not balance", transaction.description())
    }))
}

/// Stage every in-memory entry, owned by `owner`, and attach each to its
/// ledger. Returns the entry references in order.
fn stage_entries(
    transaction: &mut Transaction,
    owner: Ref<Transaction>,
    ledgers: &mut TouchedLedgers,
    uow: &mut UnitOfWork<'_>,
) -> EngineResult<Vec<Ref<Entry>>> {
    let mut refs = Vec::with_capacity(transaction.lines.len());
    for entry in &mut transaction.lines {
        entry.transaction = Some(owner);
        let entry_ref = Ref::from_handle(uow.save(entry)?);
        if let Some(ledger) = entry.ledger {
            ledgers.get(uow, ledger)?.attach(entry_ref);
        }
        refs.push(entry_ref);
    }
    Ok(refs)
}

/// Post a new transaction: its entries become part of their ledgers.
#[derive(Debug)]
pub struct PostTransaction {
    transaction: Transaction,
}

impl PostTransaction {
    pub fn new(transaction: Transaction) -> Self {
        Self { transaction }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn into_transaction(self) -> Transaction {
        self.transaction
    }
}

impl Command for PostTransaction {
    fn name(&self) -> &'static str {
        "Post Transaction"
    }

    fn validate(&self, uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
        if is_stored(uow, &self.transaction)? {
            return Ok(Validation::not_ready("transaction is already posted; update it instead"));
        }
        validate_entries(&self.transaction, uow)
    }

    fn persist(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
        let mut transaction = self.transaction.clone();
        let owner = Ref::from_handle(uow.save(&mut transaction)?);
        let mut ledgers = TouchedLedgers::default();
        transaction.entries = stage_entries(&mut transaction, owner, &mut ledgers, uow)?;
        uow.save(&mut transaction)?;
        ledgers.save_all(uow)?;
        debug!(
            transaction = %owner.handle(),
            entries = transaction.entries.len(),
            "transaction posted"
        );
        self.transaction = transaction;
        Ok(())
    }
}

/// Replace the entries of a posted transaction.
///
/// Entries dropped from the transaction are detached from their ledgers and
/// deleted; entries that moved to a different ledger are moved with them.
#[derive(Debug)]
pub struct UpdateTransaction {
    transaction: Transaction,
}

impl UpdateTransaction {
    /// `transaction` is usually obtained with [`Transaction::load`] and then edited.
    pub fn new(transaction: Transaction) -> Self {
        Self { transaction }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }
}

impl Command for UpdateTransaction {
    fn name(&self) -> &'static str {
        "Update Transaction"
    }

    fn validate(&self, uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
        let Ok(target) = Ref::to(&self.transaction) else {
            return Ok(Validation::not_ready("transaction has never been posted"));
        };
        if uow.try_fetch(target)?.is_none() {
            return Ok(Validation::not_ready(format!("transaction {} no longer exists", target.handle())));
        }
        validate_entries(&self.transaction, uow)
    }

    fn persist(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
        let mut transaction = self.transaction.clone();
        let owner = Ref::to(&transaction)?;
        let stored = uow.fetch(owner)?;
        let mut ledgers = TouchedLedgers::default();

        for old in &stored.entries {
            if let Some(entry) = uow.try_fetch(*old)? {
                if let Some(ledger) = entry.ledger() {
                    ledgers.get(uow, ledger)?.detach(*old);
                }
            }
        }

        let refs = stage_entries(&mut transaction, owner, &mut ledgers, uow)?;
        for old in stored.entries.iter().filter(|old| !refs.contains(old)) {
            uow.delete(*old)?;
        }

        transaction.entries = refs;
        uow.save(&mut transaction)?;
        ledgers.save_all(uow)?;
        debug!(transaction = %owner.handle(), "transaction updated");
        self.transaction = transaction;
        Ok(())
    }
}
