//! PAYG withholding from a coefficient table.
//!
//! Salaries are normalised to a weekly figure, the weekly withholding is
//! taken from the table's formula, and the result is scaled back up by the
//! same number of weeks.
//!
//! ```text
//! weekly dollars d = trunc(round(salary / weeks, 3 places))
//! row              = first row with ceiling >= d
//! weekly withhold  = max(0, round(a * (d + 0.99) - b))
//! withhold         = round(weekly withhold * weeks, 2 places)
//! paycheck         = salary - withhold
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::trace;

use tally_accounting::Amount;
use tally_commands::Finder;
use tally_core::{EngineError, EngineResult};
use tally_store::Session;

use crate::finder::PayrollTaxTableFinder;
use crate::identifier::PayrollTaxIdentifier;
use crate::table::PayrollTaxTable;

/// How far above the paycheck's own weekly figure the inverse search goes.
const SEARCH_FACTOR: i64 = 10;
const SEARCH_SLACK: i64 = 100;

/// Largest weekly figure, in whole dollars, the calculator accepts.
pub const MAX_WEEKLY_DOLLARS: i64 = 1_000_000;

/// Cents above this lose precision once scaled for the weekly figure.
const MAX_EXACT_CENTS: i64 = (1 << 53) / 10;

/// The three figures of one pay period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaySplit {
    pub salary: Amount,
    pub withhold: Amount,
    pub paycheck: Amount,
}

impl PaySplit {
    pub const ZERO: PaySplit = PaySplit {
        salary: Amount::ZERO,
        withhold: Amount::ZERO,
        paycheck: Amount::ZERO,
    };
}

/// Whole dollars per week in `cents` spread over `weeks`.
fn weekly_dollars(cents: i64, weeks: f64) -> i64 {
    let mills = (cents as f64 * 10.0 / weeks).round() as i64;
    mills / 1000
}

fn non_negative(what: &str, amount: Amount) -> EngineResult<Amount> {
    if amount.is_negative() {
        return Err(EngineError::illegal_argument(format!("{what} cannot be negative: {amount}")));
    }
    Ok(amount)
}

#[derive(Debug, Clone)]
pub struct PayrollTaxCalculator {
    table: Arc<PayrollTaxTable>,
    weeks: f64,
    salary: Option<Amount>,
    withhold: Option<Amount>,
    paycheck: Option<Amount>,
}

impl PayrollTaxCalculator {
    pub fn new(table: Arc<PayrollTaxTable>) -> Self {
        Self {
            table,
            weeks: 1.0,
            salary: None,
            withhold: None,
            paycheck: None,
        }
    }

    /// A calculator over the table in force for `identifier` on `as_of`.
    pub fn for_date(
        session: &mut Session,
        identifier: impl Into<PayrollTaxIdentifier>,
        as_of: NaiveDate,
    ) -> EngineResult<Self> {
        let mut finder = PayrollTaxTableFinder::new(identifier, as_of);
        Ok(Self::new(finder.query(session)?))
    }

    pub fn table(&self) -> &PayrollTaxTable {
        &self.table
    }

    pub fn weeks(&self) -> f64 {
        self.weeks
    }

    /// Length of the pay period in weeks; must be positive.
    pub fn set_weeks(&mut self, weeks: f64) -> EngineResult<()> {
        if !weeks.is_finite() || weeks <= 0.0 {
            return Err(EngineError::illegal_argument(format!("weeks must be positive, got {weeks}")));
        }
        self.weeks = weeks;
        Ok(())
    }

    pub fn salary(&self) -> Option<Amount> {
        self.salary
    }

    pub fn withhold(&self) -> Option<Amount> {
        self.withhold
    }

    pub fn paycheck(&self) -> Option<Amount> {
        self.paycheck
    }

    pub fn set_salary(&mut self, salary: Amount) -> EngineResult<()> {
        self.salary = Some(non_negative("salary", salary)?);
        Ok(())
    }

    pub fn set_withhold(&mut self, withhold: Amount) {
        self.withhold = Some(withhold);
    }

    pub fn set_paycheck(&mut self, paycheck: Amount) -> EngineResult<()> {
        self.paycheck = Some(non_negative("paycheck", paycheck)?);
        Ok(())
    }

    /// Fill all three slots at once. Nothing is changed if salary or
    /// paycheck is negative.
    pub fn set_amounts(&mut self, salary: Amount, withhold: Amount, paycheck: Amount) -> EngineResult<()> {
        let salary = non_negative("salary", salary)?;
        let paycheck = non_negative("paycheck", paycheck)?;
        (self.salary, self.withhold, self.paycheck) = (Some(salary), Some(withhold), Some(paycheck));
        Ok(())
    }

    fn slots(&self) -> EngineResult<PaySplit> {
        match (self.salary, self.withhold, self.paycheck) {
            (Some(salary), Some(withhold), Some(paycheck)) => Ok(PaySplit {
                salary,
                withhold,
                paycheck,
            }),
            _ => Err(EngineError::illegal_state(
                "salary, withhold and paycheck must all be set before calculating",
            )),
        }
    }

    fn store(&mut self, split: PaySplit) -> PaySplit {
        (self.salary, self.withhold, self.paycheck) = (Some(split.salary), Some(split.withhold), Some(split.paycheck));
        split
    }

    /// Weekly figure of `amount`, refused when past [`MAX_WEEKLY_DOLLARS`].
    fn bounded_weekly(&self, what: &str, amount: Amount) -> EngineResult<i64> {
        let weekly = weekly_dollars(amount.cents(), self.weeks);
        if amount.cents() > MAX_EXACT_CENTS || weekly > MAX_WEEKLY_DOLLARS {
            return Err(EngineError::illegal_argument(format!(
                "{what} of {amount} over {} weeks is above the supported {MAX_WEEKLY_DOLLARS} dollars a week",
                self.weeks
            )));
        }
        Ok(weekly)
    }

    /// Withholding in cents for a pay period earning `weekly` whole dollars a week.
    fn withhold_for_weekly(&self, weekly: i64) -> EngineResult<i64> {
        let row = self.table.row_for(weekly)?;
        let weekly_withhold = (row.a * (weekly as f64 + 0.99) - row.b).round().max(0.0);
        Ok((weekly_withhold * 100.0 * self.weeks).round() as i64)
    }

    /// Fill withhold and paycheck from the salary slot.
    pub fn calculate_given_salary(&mut self) -> EngineResult<PaySplit> {
        let salary = self.slots()?.salary;
        if salary.is_zero() {
            return Ok(self.store(PaySplit::ZERO));
        }

        let weekly = self.bounded_weekly("salary", salary)?;
        let withhold = Amount::from_cents(self.withhold_for_weekly(weekly)?);
        trace!(%salary, weekly, %withhold, "withholding from salary");
        Ok(self.store(PaySplit {
            salary,
            withhold,
            paycheck: salary - withhold,
        }))
    }

    /// Fill salary and withhold from the paycheck slot.
    ///
    /// Searches weekly figures upward from the paycheck's own and takes the
    /// first one whose salary, less its withholding, is exactly the paycheck.
    /// When two salaries leave the same paycheck, the lower weekly figure wins.
    pub fn calculate_given_paycheck(&mut self) -> EngineResult<PaySplit> {
        let paycheck = self.slots()?.paycheck;
        if paycheck.is_zero() {
            return Ok(self.store(PaySplit::ZERO));
        }

        let start = self.bounded_weekly("paycheck", paycheck)?;
        let limit = start * SEARCH_FACTOR + SEARCH_SLACK;
        for weekly in start..=limit {
            let withhold = self.withhold_for_weekly(weekly)?;
            let Some(salary) = paycheck.cents().checked_add(withhold) else {
                break;
            };
            if weekly_dollars(salary, self.weeks) == weekly {
                let (salary, withhold) = (Amount::from_cents(salary), Amount::from_cents(withhold));
                trace!(%paycheck, weekly, %salary, %withhold, "salary from paycheck");
                return Ok(self.store(PaySplit {
                    salary,
                    withhold,
                    paycheck,
                }));
            }
        }
        Err(EngineError::illegal_state(format!(
            "no salary in the {} table yields a paycheck of {paycheck}",
            self.table.scale()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Scale;
    use crate::schedule::tables_2005;
    use proptest::prelude::*;

    fn calculator(scale: Scale) -> PayrollTaxCalculator {
        let table = tables_2005()
            .unwrap()
            .into_iter()
            .find(|t| t.scale() == scale)
            .unwrap();
        let mut calc = PayrollTaxCalculator::new(Arc::new(table));
        calc.set_amounts(Amount::ZERO, Amount::ZERO, Amount::ZERO).unwrap();
        calc
    }

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn withhold_on(scale: Scale, salary: &str) -> Amount {
        let mut calc = calculator(scale);
        calc.set_salary(amount(salary)).unwrap();
        calc.calculate_given_salary().unwrap().withhold
    }

    #[test]
    fn weekly_withholding_samples() {
        assert_eq!(withhold_on(Scale::TaxFreeThresholdWithLeaveLoading, "409"), amount("52"));
        assert_eq!(withhold_on(Scale::TaxFreeThresholdNoLeaveLoading, "111"), amount("0"));
        assert_eq!(withhold_on(Scale::TaxFreeThresholdNoLeaveLoading, "300"), amount("28"));
        assert_eq!(withhold_on(Scale::TaxFreeThresholdNoLeaveLoading, "1587"), amount("466"));
        assert_eq!(withhold_on(Scale::TaxFreeThresholdNoLeaveLoading, "1828"), amount("571"));
    }

    #[test]
    fn no_tfn_samples() {
        for (salary, withhold) in [("50", "24"), ("100", "48"), ("1000", "485"), ("10000", "4850")] {
            assert_eq!(withhold_on(Scale::NoTfnProvided, salary), amount(withhold), "{salary}");
        }
    }

    #[test]
    fn salary_on_a_ceiling_uses_that_bracket() {
        // The next bracket would give 266.
        assert_eq!(withhold_on(Scale::NoTaxFreeThreshold, "894"), amount("267"));
    }

    #[test]
    fn multi_week_periods_scale_both_ways() {
        let mut calc = calculator(Scale::TaxFreeThresholdWithLeaveLoading);
        calc.set_weeks(26.0).unwrap();
        calc.set_salary(amount("6572")).unwrap();
        let split = calc.calculate_given_salary().unwrap();
        assert_eq!(split.withhold, amount("572"));
        assert_eq!(split.paycheck, amount("6000"));
        assert_eq!(calc.paycheck(), Some(amount("6000")));
    }

    #[test]
    fn monthly_period() {
        let mut calc = calculator(Scale::TaxFreeThresholdWithLeaveLoading);
        calc.set_weeks(52.0 / 12.0).unwrap();
        calc.set_salary(amount("1096.33")).unwrap();
        let split = calc.calculate_given_salary().unwrap();
        assert_eq!(split.withhold, amount("95.33"));
        assert_eq!(split.paycheck, amount("1001.00"));
    }

    #[test]
    fn paycheck_to_salary_samples() {
        let mut calc = calculator(Scale::TaxFreeThresholdWithLeaveLoading);
        calc.set_paycheck(amount("231")).unwrap();
        let split = calc.calculate_given_paycheck().unwrap();
        assert_eq!(split.withhold, amount("22"));
        assert_eq!(split.salary, amount("253"));
        assert_eq!(calc.salary(), Some(amount("253")));
    }

    #[test]
    fn salary_round_trips_through_paycheck() {
        let mut calc = calculator(Scale::TaxFreeThresholdWithLeaveLoading);
        calc.set_salary(amount("409")).unwrap();
        let forward = calc.calculate_given_salary().unwrap();
        assert_eq!(forward.paycheck, amount("357"));

        calc.set_salary(Amount::ZERO).unwrap();
        let back = calc.calculate_given_paycheck().unwrap();
        assert_eq!(back, forward);
    }

    #[test]
    fn zero_is_zero_both_ways() {
        let mut calc = calculator(Scale::NoTaxFreeThreshold);
        assert_eq!(calc.calculate_given_salary().unwrap(), PaySplit::ZERO);
        assert_eq!(calc.calculate_given_paycheck().unwrap(), PaySplit::ZERO);
    }

    #[test]
    fn negative_amounts_are_illegal_arguments() {
        let mut calc = calculator(Scale::NoTaxFreeThreshold);
        assert!(matches!(calc.set_salary(amount("-1")), Err(EngineError::IllegalArgument(_))));
        assert!(matches!(calc.set_paycheck(amount("-0.01")), Err(EngineError::IllegalArgument(_))));
        assert!(matches!(
            calc.set_amounts(amount("10"), Amount::ZERO, amount("-10")),
            Err(EngineError::IllegalArgument(_))
        ));
        assert_eq!(calc.salary(), Some(Amount::ZERO));
        assert_eq!(calc.paycheck(), Some(Amount::ZERO));
    }

    #[test]
    fn amounts_past_the_weekly_ceiling_are_refused() {
        let mut calc = calculator(Scale::TaxFreeThresholdWithLeaveLoading);
        calc.set_paycheck(Amount::from_cents(i64::MAX / 2)).unwrap();
        assert!(matches!(calc.calculate_given_paycheck(), Err(EngineError::IllegalArgument(_))));
        calc.set_salary(Amount::units(MAX_WEEKLY_DOLLARS + 1)).unwrap();
        assert!(matches!(calc.calculate_given_salary(), Err(EngineError::IllegalArgument(_))));

        calc.set_weeks(2.0).unwrap();
        let split = calc.calculate_given_salary().unwrap();
        assert_eq!(split.salary - split.withhold, split.paycheck);
    }

    #[test]
    fn unset_slots_are_an_illegal_state() {
        let table = tables_2005().unwrap().remove(0);
        let mut calc = PayrollTaxCalculator::new(Arc::new(table));
        calc.set_salary(amount("100")).unwrap();
        assert!(matches!(calc.calculate_given_salary(), Err(EngineError::IllegalState(_))));
    }

    #[test]
    fn weeks_must_be_positive() {
        let mut calc = calculator(Scale::NoTaxFreeThreshold);
        assert!(calc.set_weeks(0.0).is_err());
        assert!(calc.set_weeks(-2.0).is_err());
        assert!(calc.set_weeks(f64::NAN).is_err());
        assert_eq!(calc.weeks(), 1.0);
    }

    proptest! {
        #[test]
        fn paycheck_inverse_is_consistent(
            cents in 0i64..2_000_000,
            scale in prop::sample::select(vec![
                Scale::NoTaxFreeThreshold,
                Scale::TaxFreeThresholdWithLeaveLoading,
                Scale::NoTfnProvided,
                Scale::TaxFreeThresholdNoLeaveLoading,
            ]),
            weeks in prop::sample::select(vec![1.0, 2.0, 52.0 / 12.0, 26.0]),
        ) {
            let mut calc = calculator(scale);
            calc.set_weeks(weeks).unwrap();
            calc.set_salary(Amount::from_cents(cents)).unwrap();
            let forward = calc.calculate_given_salary().unwrap();
            prop_assert_eq!(forward.salary - forward.withhold, forward.paycheck);
            prop_assert!(!forward.withhold.is_negative());

            let back = calc.calculate_given_paycheck().unwrap();
            prop_assert_eq!(back.paycheck, forward.paycheck);
            prop_assert_eq!(back.salary - back.withhold, back.paycheck);

            calc.set_salary(back.salary).unwrap();
            let again = calc.calculate_given_salary().unwrap();
            prop_assert_eq!(again.withhold, back.withhold);
        }
    }
}
