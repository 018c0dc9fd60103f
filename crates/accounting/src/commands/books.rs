use chrono::NaiveDate;
use tracing::info;

use tally_commands::{Command, Validation};
use tally_core::{EngineError, EngineResult, Ref};
use tally_store::UnitOfWork;

use super::{books_exist, load_books};
use crate::books::Books;
use crate::currency::Currency;
use crate::identifier::IdentifierGroup;

/// Create the books and make them the store's root.
#[derive(Debug)]
pub struct InitBooks {
    home_currency: Currency,
    date_of_inception: Option<NaiveDate>,
    books: Option<Books>,
}

impl InitBooks {
    pub fn new(home_currency: Currency, date_of_inception: Option<NaiveDate>) -> Self {
        Self {
            home_currency,
            date_of_inception,
            books: None,
        }
    }

    /// The books as staged, once executed.
    pub fn books(&self) -> Option<&Books> {
        self.books.as_ref()
    }
}

impl Command for InitBooks {
    fn name(&self) -> &'static str {
        "Initialize Books"
    }

    fn validate(&self, uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
        match uow.root::<Books>() {
            Ok(_) => Ok(Validation::not_ready("books are already initialized")),
            Err(EngineError::NotFound(_)) => Ok(Validation::Ready),
            Err(e) => Err(e),
        }
    }

    fn persist(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
        let mut home_currency = self.home_currency.clone();
        let home = Ref::from_handle(uow.save(&mut home_currency)?);
        let mut books = Books::new(self.date_of_inception);
        books.set_home_currency(home)?;
        uow.set_root(&mut books)?;
        info!(home_currency = home_currency.code(), "books initialized");
        self.home_currency = home_currency;
        self.books = Some(books);
        Ok(())
    }
}

/// Register another currency with the books.
#[derive(Debug)]
pub struct AddCurrency {
    currency: Currency,
}

impl AddCurrency {
    pub fn new(currency: Currency) -> Self {
        Self { currency }
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }
}

impl Command for AddCurrency {
    fn name(&self) -> &'static str {
        "Add Currency"
    }

    fn validate(&self, uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
        books_exist(uow)?.and(|| {
            let existing = uow.query_by_example(&Currency::example_with_code(self.currency.code()))?;
            Ok(Validation::check(existing.is_empty(), || {
                format!("currency {} already exists", self.currency.code())
            }))
        })
    }

    fn persist(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
        let mut currency = self.currency.clone();
        let currency_ref = Ref::from_handle(uow.save(&mut currency)?);
        let mut books = load_books(uow)?;
        books.add_currency(currency_ref);
        uow.save(&mut books)?;
        self.currency = currency;
        Ok(())
    }
}

/// Store an identifier group and the identifiers queued on it.
#[derive(Debug)]
pub struct StoreIdentifierGroup {
    group: IdentifierGroup,
}

impl StoreIdentifierGroup {
    pub fn new(group: IdentifierGroup) -> Self {
        Self { group }
    }

    pub fn group(&self) -> &IdentifierGroup {
        &self.group
    }
}

impl Command for StoreIdentifierGroup {
    fn name(&self) -> &'static str {
        "Store Identifier Group"
    }

    fn validate(&self, uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
        books_exist(uow)?.and(|| {
            let existing = uow.query_by_example(&IdentifierGroup::example_with_label(self.group.label()))?;
            Ok(Validation::check(existing.is_empty(), || {
                format!("identifier group '{}' already exists", self.group.label())
            }))
        })
    }

    fn persist(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
        let mut group = self.group.clone();
        for identifier in &mut group.pending {
            let stored = Ref::from_handle(uow.save(identifier)?);
            if !group.identifiers.contains(&stored) {
                group.identifiers.push(stored);
            }
        }
        let group_ref = Ref::from_handle(uow.save(&mut group)?);
        let mut books = load_books(uow)?;
        books.add_identifier_group(group_ref);
        uow.save(&mut books)?;
        self.group = group;
        Ok(())
    }
}
