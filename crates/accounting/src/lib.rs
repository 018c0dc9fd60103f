//! Double-entry ledger model.
//!
//! ```text
//! Books ─┬─ Currency*
//!        ├─ Account* ── Ledger* ── Entry* ── Transaction
//!        ├─ IdentifierGroup* ── Identifier*
//!        └─ Worker* ── (expenses payable) Ledger
//! ```
//!
//! Every entry belongs to exactly one transaction and one ledger. Balances
//! are never stored: ledgers and accounts derive them from their entries.

pub mod account;
pub mod amount;
pub mod books;
pub mod commands;
pub mod currency;
pub mod entry;
pub mod finder;
pub mod identifier;
pub mod ledger;
pub mod range;
pub mod transaction;
pub mod worker;

pub use account::{Account, AccountClass, AccountRole, Polarity};
pub use amount::{Amount, ForeignAmount, Rate};
pub use books::Books;
pub use commands::{
    AddAccount, AddCurrency, AddLedger, AddWorker, InitBooks, PostTransaction, StoreIdentifierGroup,
    UpdateTransaction,
};
pub use currency::Currency;
pub use entry::{Entry, EntrySide};
pub use finder::SpecificLedgerFinder;
pub use identifier::{Identifier, IdentifierGroup};
pub use ledger::Ledger;
pub use range::RangeCalculator;
pub use transaction::{Transaction, balances};
pub use worker::Worker;

use tally_core::{ActivationPolicies, ActivationPolicy, Persistent};

/// Activation depths for the ledger model.
///
/// Deep enough that fetching an account reaches the transactions behind its
/// entries. Ledgers and entries stay shallow so that walking one ledger does
/// not pull in every neighbouring ledger; currencies are leaves.
pub fn activation_policies() -> ActivationPolicies {
    ActivationPolicies::default()
        .with(Books::KIND, ActivationPolicy::cascade(5))
        .with(Account::KIND, ActivationPolicy::cascade(5))
        .with(Ledger::KIND, ActivationPolicy::cascade(2))
        .with(Entry::KIND, ActivationPolicy::cascade(2))
        .with(Transaction::KIND, ActivationPolicy::cascade(5))
        .with(Worker::KIND, ActivationPolicy::cascade(2))
        .with(IdentifierGroup::KIND, ActivationPolicy::cascade(5))
        .with(Currency::KIND, ActivationPolicy::Leaf)
}
