use std::sync::Arc;

use tracing::info;

use tally_commands::{Command, Validation};
use tally_core::{EngineError, EngineResult, Ref};
use tally_store::UnitOfWork;

use super::{books_exist, load_books};
use crate::account::{Account, AccountRole, Polarity};
use crate::ledger::Ledger;
use crate::worker::Worker;

/// Add a worker, opening their own ledger under the reimbursable expenses
/// payable account.
#[derive(Debug)]
pub struct AddWorker {
    worker: Worker,
}

impl AddWorker {
    pub fn new(worker: Worker) -> Self {
        Self { worker }
    }

    pub fn worker(&self) -> &Worker {
        &self.worker
    }
}

fn reimbursables(uow: &mut UnitOfWork<'_>) -> EngineResult<Vec<Arc<Account>>> {
    uow.query(|a: &Account| a.role() == Some(AccountRole::ReimbursableExpensesPayable))
}

impl Command for AddWorker {
    fn name(&self) -> &'static str {
        "Add Worker"
    }

    fn validate(&self, uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
        books_exist(uow)?
            .and(|| {
                let existing = uow.query_by_example(&Worker::example_with_name(self.worker.name()))?;
                Ok(Validation::check(existing.is_empty(), || {
                    format!("a worker named '{}' already exists", self.worker.name())
                }))
            })?
            .and(|| {
                let found = reimbursables(uow)?.len();
                Ok(Validation::check(found == 1, || {
                    format!("expected one reimbursable expenses payable account, found {found}")
                }))
            })
    }

    fn persist(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
        let mut account = reimbursables(uow)?
            .pop()
            .map(|a| (*a).clone())
            .ok_or_else(|| EngineError::not_found("reimbursable expenses payable account"))?;
        let account_ref = Ref::to(&account)?;

        let mut ledger = Ledger::new(self.worker.name(), Polarity::CreditPositive)?;
        ledger.parent = Some(account_ref);
        let ledger_ref = Ref::from_handle(uow.save(&mut ledger)?);
        account.ledgers.push(ledger_ref);
        uow.save(&mut account)?;

        let mut worker = self.worker.clone();
        worker.expenses_payable = Some(ledger_ref);
        let worker_ref = Ref::from_handle(uow.save(&mut worker)?);
        let mut books = load_books(uow)?;
        books.add_worker(worker_ref)?;
        uow.save(&mut books)?;
        info!(worker = worker.name(), "worker added");
        self.worker = worker;
        Ok(())
    }
}
