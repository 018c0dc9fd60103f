use chrono::NaiveDate;

use tally_accounting::{
    Account, AccountClass, AccountRole, AddAccount, Amount, Books, IdentifierGroup, Ledger, PostTransaction,
};
use tally_commands::{Command, Finder};
use tally_core::{EngineError, Ref};
use tally_payroll::{
    InitPayrollBooks, PAYROLL_IDENTIFIER_GROUP, PayrollTaxCalculator, PayrollTaxTable, PayrollTaxTableFinder,
    PayrollTransaction, Scale, StorePayrollTaxTables, UNBOUNDED, activation_policies,
};
use tally_store::{Engine, EngineConfig, Session, UnitOfWork};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn payroll_engine() -> anyhow::Result<(Engine, Session)> {
    tally_observability::init_for_tests();
    let engine = Engine::in_memory(EngineConfig::default().with_policies(&activation_policies()));
    let mut session = engine.gain_client()?;
    let mut uow = UnitOfWork::begin(&mut session, "payroll books")?;
    InitPayrollBooks::new()?.execute(&mut uow)?;
    uow.commit()?;
    Ok((engine, session))
}

#[test]
fn payroll_books_hold_identifiers_and_tables() -> anyhow::Result<()> {
    let (_engine, mut session) = payroll_engine()?;

    let books = session.root::<Books>()?;
    assert_eq!(session.fetch(books.home_currency()?)?.code(), "AUD");
    assert_eq!(books.identifier_groups().len(), 1);

    let group = session.fetch(books.identifier_groups()[0])?;
    assert_eq!(group.label(), PAYROLL_IDENTIFIER_GROUP);
    assert_eq!(group.identifiers().len(), 5);
    let by_label = session.query_by_example(&IdentifierGroup::example_with_label(PAYROLL_IDENTIFIER_GROUP))?;
    assert_eq!(by_label.len(), 1);

    assert_eq!(session.query::<PayrollTaxTable, _>(|_| true)?.len(), 4);
    Ok(())
}

#[test]
fn payroll_books_initialize_once() -> anyhow::Result<()> {
    let (_engine, mut session) = payroll_engine()?;
    let mut uow = UnitOfWork::begin(&mut session, "again")?;
    let err = InitPayrollBooks::new()?.execute(&mut uow).unwrap_err();
    assert!(matches!(err, EngineError::CommandNotReady(_)));
    Ok(())
}

#[test]
fn finder_resolves_the_table_in_force() -> anyhow::Result<()> {
    let (_engine, mut session) = payroll_engine()?;

    let mut finder = PayrollTaxTableFinder::new(Scale::TaxFreeThresholdWithLeaveLoading, date(2006, 1, 1));
    assert!(matches!(finder.coefficients(), Err(EngineError::NotFound(_))));
    let table = finder.query(&mut session)?;
    assert_eq!(table.effective(), date(2005, 7, 1));
    assert_eq!(finder.coefficients()?.len(), 7);
    assert_eq!(finder.coefficients()?[1].ceiling, 301.0);

    finder.set_as_of(date(1991, 1, 1));
    assert!(matches!(finder.query(&mut session), Err(EngineError::NotFound(_))));
    assert!(matches!(finder.coefficients(), Err(EngineError::NotFound(_))));

    let mut foreign = PayrollTaxTableFinder::new(Scale::ForeignResident, date(2006, 1, 1));
    assert!(matches!(foreign.query(&mut session), Err(EngineError::NotFound(_))));
    Ok(())
}

#[test]
fn later_tables_supersede_and_same_date_replaces() -> anyhow::Result<()> {
    let (_engine, mut session) = payroll_engine()?;

    let flat = |effective, rate| {
        PayrollTaxTable::new(Scale::NoTfnProvided, effective).with_row(UNBOUNDED, rate, 0.0)
    };

    let mut uow = UnitOfWork::begin(&mut session, "2006 tables")?;
    StorePayrollTaxTables::new(vec![flat(date(2006, 7, 1), 0.465)?]).execute(&mut uow)?;
    uow.commit()?;

    let mut finder = PayrollTaxTableFinder::new(Scale::NoTfnProvided, date(2007, 1, 1));
    assert_eq!(finder.query(&mut session)?.rows()[0].a, 0.465);
    finder.set_as_of(date(2006, 6, 30));
    assert_eq!(finder.query(&mut session)?.rows()[0].a, 0.485);

    let mut uow = UnitOfWork::begin(&mut session, "2006 correction")?;
    StorePayrollTaxTables::new(vec![flat(date(2006, 7, 1), 0.47)?]).execute(&mut uow)?;
    uow.commit()?;

    let no_tfn = session.query(|t: &PayrollTaxTable| t.scale() == Scale::NoTfnProvided)?;
    assert_eq!(no_tfn.len(), 2);
    finder.set_as_of(date(2007, 1, 1));
    assert_eq!(finder.query(&mut session)?.rows()[0].a, 0.47);
    Ok(())
}

#[test]
fn two_tables_for_the_same_date_are_ambiguous() -> anyhow::Result<()> {
    let (_engine, mut session) = payroll_engine()?;

    let mut uow = UnitOfWork::begin(&mut session, "duplicate tables")?;
    for rate in [0.465, 0.47] {
        let mut table = PayrollTaxTable::new(Scale::NoTfnProvided, date(2006, 7, 1)).with_row(UNBOUNDED, rate, 0.0)?;
        uow.save(&mut table)?;
    }
    uow.commit()?;

    let mut finder = PayrollTaxTableFinder::new(Scale::NoTfnProvided, date(2007, 1, 1));
    let err = finder.query(&mut session).unwrap_err();
    assert!(matches!(err, EngineError::NotFound(ref msg) if msg.contains("exactly one")));

    finder.set_as_of(date(2006, 6, 30));
    assert_eq!(finder.query(&mut session)?.rows()[0].a, 0.485);
    Ok(())
}

#[test]
fn incomplete_tables_are_not_stored() -> anyhow::Result<()> {
    let (_engine, mut session) = payroll_engine()?;
    let partial = PayrollTaxTable::new(Scale::NoTaxFreeThreshold, date(2006, 7, 1)).with_row(98.0, 0.165, 0.165)?;

    let mut uow = UnitOfWork::begin(&mut session, "partial")?;
    let err = StorePayrollTaxTables::new(vec![partial]).execute(&mut uow).unwrap_err();
    assert!(matches!(err, EngineError::CommandNotReady(ref msg) if msg.contains("unbounded")));
    Ok(())
}

#[test]
fn paying_a_worker_posts_a_balanced_paycheck() -> anyhow::Result<()> {
    let (engine, mut session) = payroll_engine()?;

    let mut uow = UnitOfWork::begin(&mut session, "payroll accounts")?;
    let mut wages = AddAccount::new(
        Account::new("Wages", AccountClass::Expense)?.with_role(AccountRole::PayrollExpense),
    )
    .with_ledger("Wages")?;
    let mut payable = AddAccount::new(
        Account::new("PAYG Withholding Payable", AccountClass::Liability)?.with_role(AccountRole::PayrollTaxPayable),
    )
    .with_ledger("PAYG")?;
    let mut bank = AddAccount::new(Account::new("Cheque Account", AccountClass::Asset)?.with_role(AccountRole::Bank))
        .with_ledger("Main")?;
    wages.execute(&mut uow)?;
    payable.execute(&mut uow)?;
    bank.execute(&mut uow)?;
    uow.commit()?;

    let mut calc = PayrollTaxCalculator::for_date(&mut session, Scale::TaxFreeThresholdWithLeaveLoading, date(2005, 7, 8))?;
    calc.set_amounts(Amount::ZERO, Amount::ZERO, Amount::ZERO)?;
    calc.set_salary(Amount::units(409))?;
    let split = calc.calculate_given_salary()?;

    let (wages, payable, bank) = (&wages.ledgers()[0], &payable.ledgers()[0], &bank.ledgers()[0]);
    let txn = PayrollTransaction::new(wages, payable, bank).build("Joe Bloggs", date(2005, 7, 8), &split)?;

    let mut uow = UnitOfWork::begin(&mut session, "pay Joe")?;
    PostTransaction::new(txn).execute(&mut uow)?;
    uow.commit()?;

    let mut reader = engine.gain_client()?;
    let balance = |session: &mut Session, ledger: &Ledger| -> anyhow::Result<Amount> {
        Ok(session.fetch(Ref::to(ledger)?)?.balance(session)?)
    };
    assert_eq!(balance(&mut reader, wages)?, Amount::units(409));
    assert_eq!(balance(&mut reader, payable)?, Amount::units(52));
    assert_eq!(balance(&mut reader, bank)?, -Amount::units(357));
    Ok(())
}
