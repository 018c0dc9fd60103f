use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tally_core::{EngineError, EngineResult, Handle, Identity, Persistent, Ref};
use tally_store::Session;

use crate::entry::{Entry, EntrySide};

/// Whether `entries` balance: at least two of them and, within each
/// currency, debits equal credits. Foreign entries count at their converted
/// home value.
pub fn balances(entries: &[Entry]) -> bool {
    if entries.len() < 2 {
        return false;
    }
    let mut net: BTreeMap<Option<&str>, i128> = BTreeMap::new();
    for entry in entries {
        let cents = i128::from(entry.amount().cents());
        let slot = net.entry(entry.currency()).or_default();
        match entry.side() {
            EntrySide::Debit => *slot += cents,
            EntrySide::Credit => *slot -= cents,
        }
    }
    net.values().all(|v| *v == 0)
}

/// A dated, described group of entries.
///
/// Entries are persisted as objects of their own; the transaction stores
/// references to them. A transaction built with [`Transaction::new`] or read
/// with [`Transaction::load`] also holds the entries in memory as its lines.
/// One fetched straight from a session holds only the references, and
/// [`Transaction::entries`] and [`Transaction::is_balanced`] read through them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(skip)]
    identity: Identity,
    description: String,
    date: NaiveDate,
    reference: Option<String>,
    pub(crate) entries: Vec<Ref<Entry>>,
    #[serde(skip)]
    pub(crate) lines: Vec<Entry>,
    #[serde(skip)]
    holds_lines: bool,
}

impl Transaction {
    pub fn new(description: &str, date: NaiveDate) -> EngineResult<Self> {
        if description.trim().is_empty() {
            return Err(EngineError::illegal_argument("transaction description cannot be blank"));
        }
        Ok(Self {
            identity: Identity::Unassigned,
            description: description.to_string(),
            date,
            reference: None,
            entries: Vec::new(),
            lines: Vec::new(),
            holds_lines: true,
        })
    }

    /// A stored transaction with all of its entries loaded as lines.
    pub fn load(session: &mut Session, target: Ref<Transaction>) -> EngineResult<Self> {
        let mut transaction = (*session.fetch(target)?).clone();
        transaction.lines = transaction.fetch_entries(session)?;
        transaction.holds_lines = true;
        Ok(transaction)
    }

    fn fetch_entries(&self, session: &mut Session) -> EngineResult<Vec<Entry>> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            entries.push((*session.fetch(*entry)?).clone());
        }
        Ok(entries)
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.reference = Some(reference.to_string());
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) -> EngineResult<()> {
        if description.trim().is_empty() {
            return Err(EngineError::illegal_argument("transaction description cannot be blank"));
        }
        self.description = description.to_string();
        Ok(())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Whether the entries are held in memory, i.e. this transaction was
    /// built here or read with [`Transaction::load`].
    pub fn holds_lines(&self) -> bool {
        self.holds_lines
    }

    /// Add an entry. An entry that already belongs to a different
    /// transaction is refused; entries are never re-parented.
    pub fn add_entry(&mut self, entry: Entry) -> EngineResult<()> {
        self.ensure_lines()?;
        if let Some(owner) = entry.transaction {
            if !owner.points_to(self) {
                return Err(EngineError::illegal_argument(format!(
                    "entry already belongs to transaction {}",
                    owner.handle()
                )));
            }
        }
        self.lines.push(entry);
        Ok(())
    }

    pub fn remove_entry(&mut self, index: usize) -> Option<Entry> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    fn ensure_lines(&self) -> EngineResult<()> {
        if self.holds_lines {
            Ok(())
        } else {
            Err(EngineError::illegal_state(
                "transaction entries are not loaded; read it with Transaction::load to edit it",
            ))
        }
    }

    /// The entries held in memory. Empty for a transaction fetched without
    /// [`Transaction::load`].
    pub fn lines(&self) -> &[Entry] {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut [Entry] {
        &mut self.lines
    }

    /// The entries, from memory when held, otherwise read by reference.
    pub fn entries(&self, session: &mut Session) -> EngineResult<Vec<Entry>> {
        if self.holds_lines {
            Ok(self.lines.clone())
        } else {
            self.fetch_entries(session)
        }
    }

    /// References to the persisted entries, in posting order.
    pub fn entry_refs(&self) -> &[Ref<Entry>] {
        &self.entries
    }

    /// See [`balances`]. Reads the entries by reference when they are not
    /// held, so a stored transaction answers the same in every session.
    pub fn is_balanced(&self, session: &mut Session) -> EngineResult<bool> {
        if self.holds_lines {
            Ok(balances(&self.lines))
        } else {
            Ok(balances(&self.fetch_entries(session)?))
        }
    }
}

impl Persistent for Transaction {
    const KIND: &'static str = "transaction";

    fn identity(&self) -> Identity {
        self.identity
    }

    fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    fn references(&self) -> Vec<Handle> {
        self.entries.iter().map(Ref::handle).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Polarity;
    use crate::amount::{Amount, ForeignAmount};
    use crate::ledger::Ledger;
    use proptest::prelude::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2005, 7, 1).unwrap()
    }

    fn ledger() -> Ledger {
        Ledger::new("General", Polarity::DebitPositive).unwrap()
    }

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn equal_sides_balance() {
        let l = ledger();
        let mut txn = Transaction::new("Opening", date()).unwrap();
        txn.add_entry(Entry::debit(amount("1.00"), &l)).unwrap();
        txn.add_entry(Entry::credit(amount("1.00"), &l)).unwrap();
        assert!(balances(txn.lines()));
    }

    #[test]
    fn unequal_sides_do_not_balance() {
        let l = ledger();
        let mut txn = Transaction::new("Opening", date()).unwrap();
        txn.add_entry(Entry::debit(amount("1.00"), &l)).unwrap();
        txn.add_entry(Entry::credit(amount("1.01"), &l)).unwrap();
        assert!(!balances(txn.lines()));
    }

    #[test]
    fn fewer_than_two_entries_never_balance() {
        let l = ledger();
        let mut txn = Transaction::new("Nothing", date()).unwrap();
        assert!(!balances(txn.lines()));
        txn.add_entry(Entry::debit(Amount::ZERO, &l)).unwrap();
        assert!(!balances(txn.lines()));
    }

    #[test]
    fn each_currency_balances_on_its_own() {
        let l = ledger();
        let mut txn = Transaction::new("Mixed", date()).unwrap();
        txn.add_entry(Entry::debit(amount("10.00"), &l)).unwrap();
        txn.add_entry(Entry::credit(amount("10.00"), &l).in_currency("USD").unwrap())
            .unwrap();
        assert!(!balances(txn.lines()));

        txn.add_entry(Entry::credit(amount("10.00"), &l)).unwrap();
        txn.add_entry(Entry::debit(amount("10.00"), &l).in_currency("USD").unwrap())
            .unwrap();
        assert!(balances(txn.lines()));
    }

    #[test]
    fn foreign_entries_balance_at_their_home_value() {
        let l = ledger();
        let fx = ForeignAmount::new(amount("100.00"), "USD", "1.3").unwrap();
        let mut txn = Transaction::new("Import", date()).unwrap();
        txn.add_entry(Entry::debit(Amount::ZERO, &l).with_foreign(fx)).unwrap();
        txn.add_entry(Entry::credit(amount("130.00"), &l)).unwrap();
        assert!(balances(txn.lines()));
    }

    #[test]
    fn blank_description_is_rejected() {
        assert!(matches!(
            Transaction::new("", date()),
            Err(EngineError::IllegalArgument(_))
        ));
    }

    #[test]
    fn a_transaction_read_from_storage_holds_no_lines() {
        let json = serde_json::to_string(&Transaction::new("Stored", date()).unwrap()).unwrap();
        let mut stored: Transaction = serde_json::from_str(&json).unwrap();
        assert!(!stored.holds_lines());
        assert!(matches!(
            stored.add_entry(Entry::debit(amount("1.00"), &ledger())),
            Err(EngineError::IllegalState(_))
        ));
    }

    proptest! {
        #[test]
        fn balanced_iff_debits_equal_credits(
            debits in prop::collection::vec(0i64..10_000_000, 1..6),
            credits in prop::collection::vec(0i64..10_000_000, 1..6),
        ) {
            let l = ledger();
            let mut txn = Transaction::new("Generated", date()).unwrap();
            for d in &debits {
                txn.add_entry(Entry::debit(Amount::from_cents(*d), &l)).unwrap();
            }
            for c in &credits {
                txn.add_entry(Entry::credit(Amount::from_cents(*c), &l)).unwrap();
            }
            let expected = debits.iter().sum::<i64>() == credits.iter().sum::<i64>();
            prop_assert_eq!(balances(txn.lines()), expected);
        }
    }
}
