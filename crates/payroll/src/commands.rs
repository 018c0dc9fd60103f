use tracing::{debug, info};

use tally_accounting::{Currency, InitBooks, StoreIdentifierGroup};
use tally_commands::{Command, Validation};
use tally_core::{EngineResult, Ref};
use tally_store::UnitOfWork;

use crate::identifier::PayrollTaxIdentifier;
use crate::schedule::tables_2005;
use crate::table::PayrollTaxTable;

/// Store withholding tables, each replacing any stored table for the same
/// scale and effective date.
#[derive(Debug)]
pub struct StorePayrollTaxTables {
    tables: Vec<PayrollTaxTable>,
}

impl StorePayrollTaxTables {
    pub fn new(tables: Vec<PayrollTaxTable>) -> Self {
        Self { tables }
    }

    /// The 2005-07-01 schedule.
    pub fn standard() -> EngineResult<Self> {
        Ok(Self::new(tables_2005()?))
    }

    pub fn tables(&self) -> &[PayrollTaxTable] {
        &self.tables
    }
}

impl Command for StorePayrollTaxTables {
    fn name(&self) -> &'static str {
        "Store Payroll Tax Tables"
    }

    fn validate(&self, _uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
        if self.tables.is_empty() {
            return Ok(Validation::not_ready("no tables to store"));
        }
        Ok(match self.tables.iter().find(|t| !t.is_complete()) {
            Some(t) => Validation::not_ready(format!(
                "{} table from {} does not end with an unbounded bracket",
                t.scale(),
                t.effective()
            )),
            None => Validation::Ready,
        })
    }

    fn persist(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
        let mut tables = self.tables.clone();
        for table in &mut tables {
            let (scale, effective) = (table.scale(), table.effective());
            let superseded = uow.query(|t: &PayrollTaxTable| t.scale() == scale && t.effective() == effective)?;
            for old in &superseded {
                let old = Ref::to(old.as_ref())?;
                if !old.points_to(table) {
                    uow.delete(old)?;
                }
            }
            uow.save(table)?;
            debug!(%scale, %effective, replaced = superseded.len(), "payroll tax table staged");
        }
        self.tables = tables;
        Ok(())
    }
}

/// Books set up for payroll: Australian dollar books, the withholding
/// identifiers and the standard tables.
#[derive(Debug)]
pub struct InitPayrollBooks {
    books: InitBooks,
    identifiers: StoreIdentifierGroup,
    tables: StorePayrollTaxTables,
}

impl InitPayrollBooks {
    pub fn new() -> EngineResult<Self> {
        Ok(Self {
            books: InitBooks::new(Currency::new("AUD", "Australian Dollar", "$")?, None),
            identifiers: StoreIdentifierGroup::new(PayrollTaxIdentifier::group()?),
            tables: StorePayrollTaxTables::standard()?,
        })
    }
}

impl Command for InitPayrollBooks {
    fn name(&self) -> &'static str {
        "Initialize Payroll Books"
    }

    fn validate(&self, uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
        self.books.validate(uow)?.and(|| self.tables.validate(uow))
    }

    fn persist(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
        self.books.persist(uow)?;
        self.identifiers.execute(uow)?;
        self.tables.persist(uow)?;
        info!(tables = self.tables.tables().len(), "payroll books initialized");
        Ok(())
    }
}
