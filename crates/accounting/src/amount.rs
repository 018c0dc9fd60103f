//! Money: fixed-point amounts in cents, and foreign amounts with a rate.
//!
//! All arithmetic is integer arithmetic on minor units. Where a decimal
//! string or a multiplier has more precision than cents, the result is
//! rounded half-up (away from zero on an exact half).

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tally_core::{EngineError, EngineResult, ValueObject};

/// Decimal places carried by exchange rates.
pub const RATE_DECIMAL_PLACES: u32 = 5;

/// Parse a plain decimal string into an integer scaled by `10^places`.
///
/// Accepts an optional sign, `,` grouping in the integer part, and any number
/// of fraction digits. An empty string is zero.
fn parse_scaled(input: &str, places: u32) -> EngineResult<i128> {
    let bad = || EngineError::illegal_argument(format!("'{input}' is not a decimal number"));
    let s = input.trim();
    if s.is_empty() {
        return Ok(0);
    }

    let (negative, digits) = match s.as_bytes()[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let whole: String = whole.chars().filter(|c| *c != ',').collect();
    if whole.is_empty() && fraction.is_empty() {
        return Err(bad());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }

    let scale = 10i128.pow(places);
    let whole: i128 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| bad())? };

    let kept: String = fraction.chars().take(places as usize).collect();
    let kept = format!("{kept:0<width$}", width = places as usize);
    let kept: i128 = if kept.is_empty() { 0 } else { kept.parse().map_err(|_| bad())? };
    let round_up = fraction
        .as_bytes()
        .get(places as usize)
        .is_some_and(|d| *d >= b'5');

    let magnitude = whole
        .checked_mul(scale)
        .and_then(|v| v.checked_add(kept + i128::from(round_up)))
        .ok_or_else(bad)?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// `numerator / denominator`, rounded half away from zero.
pub(crate) fn div_half_up(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        if (numerator < 0) == (denominator < 0) {
            quotient + 1
        } else {
            quotient - 1
        }
    } else {
        quotient
    }
}

fn to_i64(value: i128, what: &str) -> EngineResult<i64> {
    i64::try_from(value).map_err(|_| EngineError::illegal_argument(format!("{what} out of range")))
}

/// A monetary amount in cents.
///
/// Amounts are scalar: whether money is going in or out is carried by the
/// side of the entry, not the sign of the amount.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl ValueObject for Amount {}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Whole currency units, e.g. `Amount::units(409)` is 409.00.
    pub const fn units(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// Narrow a sum accumulated in `i128` cents back to an amount.
    pub(crate) fn from_total(cents: i128, what: &str) -> EngineResult<Amount> {
        i64::try_from(cents)
            .map(Amount)
            .map_err(|_| EngineError::illegal_state(format!("{what} is beyond the range of an amount")))
    }

    /// Two decimal places, no grouping: `"1234.56"`, `"-0.05"`, `"0.00"`.
    pub fn value(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", magnitude / 100, magnitude % 100)
    }

    /// `p` percent of this amount, `p` in `0..=100`.
    pub fn percent(self, p: u8) -> EngineResult<Amount> {
        if p > 100 {
            return Err(EngineError::illegal_argument("percentage must be between 0 and 100"));
        }
        let cents = div_half_up(i128::from(self.0) * i128::from(p), 100);
        Ok(Amount(to_i64(cents, "percentage")?))
    }
}

impl FromStr for Amount {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Amount(to_i64(parse_scaled(s, 2)?, "amount")?))
    }
}

/// Grouped with commas: `"1,234.56"`.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = self.value();
        let (sign, digits) = plain.strip_prefix('-').map_or(("", plain.as_str()), |d| ("-", d));
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, c) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        write!(f, "{sign}{grouped}.{fraction}")
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        self.0 -= rhs.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

/// Exchange rate with five decimal places: home units per foreign unit.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(i64);

impl Rate {
    pub fn scaled(self) -> i64 {
        self.0
    }
}

impl FromStr for Rate {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let scaled = to_i64(parse_scaled(s, RATE_DECIMAL_PLACES)?, "rate")?;
        if scaled < 0 {
            return Err(EngineError::illegal_argument("exchange rate cannot be negative"));
        }
        Ok(Rate(scaled))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10i64.pow(RATE_DECIMAL_PLACES);
        write!(
            f,
            "{}.{:0width$}",
            self.0 / scale,
            self.0 % scale,
            width = RATE_DECIMAL_PLACES as usize
        )
    }
}

/// An amount in a foreign currency together with its converted home value.
///
/// Setting the foreign value or the rate recomputes the home value; setting
/// the home value directly recomputes the rate. The home value is what takes
/// part in balancing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignAmount {
    foreign: Amount,
    currency: String,
    rate: Rate,
    home: Amount,
}

impl ValueObject for ForeignAmount {}

impl ForeignAmount {
    pub fn new(foreign: Amount, currency: impl Into<String>, rate: &str) -> EngineResult<Self> {
        let mut amount = Self {
            foreign,
            currency: currency.into(),
            rate: Rate::default(),
            home: Amount::ZERO,
        };
        amount.set_rate(rate)?;
        Ok(amount)
    }

    pub fn foreign(&self) -> Amount {
        self.foreign
    }

    /// ISO code of the foreign currency.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    pub fn home(&self) -> Amount {
        self.home
    }

    pub fn set_foreign(&mut self, foreign: Amount) -> EngineResult<()> {
        self.foreign = foreign;
        self.recalculate_home()
    }

    pub fn set_rate(&mut self, rate: &str) -> EngineResult<()> {
        self.rate = rate.parse()?;
        self.recalculate_home()
    }

    /// Fix the home value and derive the rate from it. A zero foreign value
    /// leaves the rate untouched.
    pub fn set_home(&mut self, home: Amount) -> EngineResult<()> {
        self.home = home;
        if self.foreign.is_zero() {
            return Ok(());
        }
        let scale = 10i128.pow(RATE_DECIMAL_PLACES);
        let rate = div_half_up(i128::from(home.cents()) * scale, i128::from(self.foreign.cents()));
        self.rate = Rate(to_i64(rate, "rate")?);
        Ok(())
    }

    fn recalculate_home(&mut self) -> EngineResult<()> {
        let scale = 10i128.pow(RATE_DECIMAL_PLACES);
        let home = div_half_up(i128::from(self.foreign.cents()) * i128::from(self.rate.0), scale);
        self.home = Amount(to_i64(home, "converted amount")?);
        Ok(())
    }
}
