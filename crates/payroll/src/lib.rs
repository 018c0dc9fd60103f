//! PAYG payroll withholding.
//!
//! Tables of `(ceiling, a, b)` coefficients per withholding scale are stored
//! alongside the books. A [`PayrollTaxTableFinder`] resolves the table in
//! force on a date, and a [`PayrollTaxCalculator`] over it turns a salary
//! into withholding and paycheck, or a paycheck back into a salary.

pub mod calculator;
pub mod commands;
pub mod finder;
pub mod identifier;
pub mod schedule;
pub mod table;
pub mod transaction;

pub use calculator::{MAX_WEEKLY_DOLLARS, PaySplit, PayrollTaxCalculator};
pub use commands::{InitPayrollBooks, StorePayrollTaxTables};
pub use finder::PayrollTaxTableFinder;
pub use identifier::{PAYROLL_IDENTIFIER_GROUP, PayrollTaxIdentifier, Scale};
pub use table::{CoefficientRow, PayrollTaxTable, UNBOUNDED};
pub use transaction::PayrollTransaction;

use tally_core::{ActivationPolicies, ActivationPolicy, Persistent};

/// The ledger model's activation policies plus payroll tables as leaves.
pub fn activation_policies() -> ActivationPolicies {
    tally_accounting::activation_policies().with(PayrollTaxTable::KIND, ActivationPolicy::Leaf)
}
