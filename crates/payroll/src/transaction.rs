use chrono::NaiveDate;

use tally_accounting::{Entry, Ledger, Transaction};
use tally_core::EngineResult;

use crate::calculator::PaySplit;

/// Builds the transaction that pays one worker.
///
/// The gross salary is expensed, the withholding becomes a liability to the
/// tax office and the paycheck leaves the bank.
#[derive(Debug, Clone, Copy)]
pub struct PayrollTransaction<'a> {
    salary_expense: &'a Ledger,
    withholding_payable: &'a Ledger,
    bank: &'a Ledger,
}

impl<'a> PayrollTransaction<'a> {
    pub fn new(salary_expense: &'a Ledger, withholding_payable: &'a Ledger, bank: &'a Ledger) -> Self {
        Self {
            salary_expense,
            withholding_payable,
            bank,
        }
    }

    pub fn build(&self, payee: &str, date: NaiveDate, split: &PaySplit) -> EngineResult<Transaction> {
        let mut transaction = Transaction::new(&format!("Paycheck to {payee}"), date)?;
        transaction.add_entry(Entry::debit(split.salary, self.salary_expense))?;
        transaction.add_entry(Entry::credit(split.withhold, self.withholding_payable))?;
        transaction.add_entry(Entry::credit(split.paycheck, self.bank))?;
        Ok(transaction)
    }
}
