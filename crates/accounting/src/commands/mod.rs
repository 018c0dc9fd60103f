//! Commands that mutate the books.
//!
//! Each command validates against the unit of work it runs in, then stages
//! its writes there. Nothing is durable until the unit of work commits.

mod account;
mod books;
mod transaction;
mod worker;

pub use account::{AddAccount, AddLedger};
pub use books::{AddCurrency, InitBooks, StoreIdentifierGroup};
pub use transaction::{PostTransaction, UpdateTransaction};
pub use worker::AddWorker;

use std::collections::BTreeMap;
use std::collections::btree_map::Entry as Slot;

use tally_commands::Validation;
use tally_core::{EngineError, EngineResult, Handle, Persistent, Ref};
use tally_store::UnitOfWork;

use crate::books::Books;
use crate::ledger::Ledger;

/// `NotReady` unless the store has been initialized with a set of books.
pub(crate) fn books_exist(uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
    match uow.root::<Books>() {
        Ok(_) => Ok(Validation::Ready),
        Err(EngineError::NotFound(_)) => Ok(Validation::not_ready("books have not been initialized")),
        Err(e) => Err(e),
    }
}

/// Whether `object` is stored as this unit of work sees it. A handle left
/// on an object by a cancelled unit of work, or by a command whose writes
/// were rolled back, resolves to nothing and does not count.
pub(crate) fn is_stored<T: Persistent>(uow: &mut UnitOfWork<'_>, object: &T) -> EngineResult<bool> {
    match Ref::to(object) {
        Ok(target) => Ok(uow.try_fetch(target)?.is_some()),
        Err(_) => Ok(false),
    }
}

/// An editable copy of the books.
pub(crate) fn load_books(uow: &mut UnitOfWork<'_>) -> EngineResult<Books> {
    Ok((*uow.root::<Books>()?).clone())
}

/// Ledgers being edited by one command, keyed by handle, so that several
/// entries against the same ledger are applied to the same copy.
#[derive(Default)]
pub(crate) struct TouchedLedgers(BTreeMap<Handle, Ledger>);

impl TouchedLedgers {
    pub(crate) fn get(&mut self, uow: &mut UnitOfWork<'_>, target: Ref<Ledger>) -> EngineResult<&mut Ledger> {
        match self.0.entry(target.handle()) {
            Slot::Occupied(slot) => Ok(slot.into_mut()),
            Slot::Vacant(slot) => {
                let ledger = (*uow.fetch(target)?).clone();
                Ok(slot.insert(ledger))
            }
        }
    }

    pub(crate) fn save_all(self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
        for mut ledger in self.0.into_values() {
            uow.save(&mut ledger)?;
        }
        Ok(())
    }
}
