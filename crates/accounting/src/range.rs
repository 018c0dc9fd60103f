use chrono::NaiveDate;

use tally_core::{EngineError, EngineResult};

const DAYS_PER_YEAR: f64 = 365.0;

/// Length of an inclusive date range in days, weeks and months.
///
/// Weeks and months are fractional: a year is exactly 52 weeks or 12 months
/// of 365 days, so pay periods can be prorated from any range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeCalculator {
    start: NaiveDate,
    end: NaiveDate,
}

impl RangeCalculator {
    pub fn new(start: NaiveDate, end: NaiveDate) -> EngineResult<Self> {
        if start > end {
            return Err(EngineError::illegal_argument(format!(
                "range starts ({start}) after it ends ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Both ends count.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn weeks(&self) -> f64 {
        self.days() as f64 / (DAYS_PER_YEAR / 52.0)
    }

    pub fn months(&self) -> f64 {
        self.days() as f64 / (DAYS_PER_YEAR / 12.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn counts_both_ends() {
        let one_day = RangeCalculator::new(date(2005, 7, 1), date(2005, 7, 1)).unwrap();
        assert_eq!(one_day.days(), 1);

        let fortnight = RangeCalculator::new(date(2005, 7, 1), date(2005, 7, 14)).unwrap();
        assert_eq!(fortnight.days(), 14);
        assert!((fortnight.weeks() - 14.0 / (365.0 / 52.0)).abs() < 1e-9);
    }

    #[test]
    fn a_year_is_fifty_two_weeks_and_twelve_months() {
        let year = RangeCalculator::new(date(2005, 7, 1), date(2006, 6, 30)).unwrap();
        assert_eq!(year.days(), 365);
        assert!((year.weeks() - 52.0).abs() < 1e-9);
        assert!((year.months() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert!(matches!(
            RangeCalculator::new(date(2005, 7, 2), date(2005, 7, 1)),
            Err(EngineError::IllegalArgument(_))
        ));
    }
}
