use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use tally_core::{EngineError, EngineResult, Identity, Persistent};

use crate::identifier::{PayrollTaxIdentifier, Scale};

/// Ceiling of the last row of every complete table.
pub const UNBOUNDED: f64 = f64::MAX;

/// One withholding bracket: weekly earnings up to `ceiling` whole dollars
/// are taxed at `a * x - b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRow {
    #[serde(with = "ceiling_repr")]
    pub ceiling: f64,
    pub a: f64,
    pub b: f64,
}

impl CoefficientRow {
    pub fn covers(&self, weekly_dollars: i64) -> bool {
        self.ceiling >= weekly_dollars as f64
    }

    pub fn is_unbounded(&self) -> bool {
        self.ceiling == UNBOUNDED
    }
}

/// The unbounded ceiling is stored as `null` rather than as `f64::MAX`.
mod ceiling_repr {
    use super::*;

    pub fn serialize<S: Serializer>(ceiling: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if *ceiling == UNBOUNDED {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(ceiling)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(UNBOUNDED))
    }
}

/// The coefficients for one scale from one effective date on.
///
/// A later table for the same scale supersedes this one; tables are never
/// merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollTaxTable {
    #[serde(skip)]
    identity: Identity,
    scale: Scale,
    effective: NaiveDate,
    rows: Vec<CoefficientRow>,
}

impl PayrollTaxTable {
    pub fn new(identifier: impl Into<PayrollTaxIdentifier>, effective: NaiveDate) -> Self {
        Self {
            identity: Identity::Unassigned,
            scale: identifier.into().scale(),
            effective,
            rows: Vec::new(),
        }
    }

    /// Append a bracket. Ceilings must not decrease.
    pub fn add_row(&mut self, ceiling: f64, a: f64, b: f64) -> EngineResult<()> {
        if ceiling.is_nan() || a.is_nan() || b.is_nan() {
            return Err(EngineError::illegal_argument("coefficients must be numbers"));
        }
        if let Some(last) = self.rows.last() {
            if ceiling < last.ceiling {
                return Err(EngineError::illegal_argument(format!(
                    "ceiling {ceiling} is below the previous ceiling {}",
                    last.ceiling
                )));
            }
        }
        self.rows.push(CoefficientRow { ceiling, a, b });
        Ok(())
    }

    pub fn with_row(mut self, ceiling: f64, a: f64, b: f64) -> EngineResult<Self> {
        self.add_row(ceiling, a, b)?;
        Ok(self)
    }

    pub fn identifier(&self) -> PayrollTaxIdentifier {
        PayrollTaxIdentifier::new(self.scale)
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn effective(&self) -> NaiveDate {
        self.effective
    }

    pub fn rows(&self) -> &[CoefficientRow] {
        &self.rows
    }

    /// True once the last row is unbounded, so every salary has a bracket.
    pub fn is_complete(&self) -> bool {
        self.rows.last().is_some_and(CoefficientRow::is_unbounded)
    }

    /// The first row whose ceiling is at or above `weekly_dollars`.
    pub fn row_for(&self, weekly_dollars: i64) -> EngineResult<&CoefficientRow> {
        self.rows.iter().find(|row| row.covers(weekly_dollars)).ok_or_else(|| {
            EngineError::illegal_state(format!(
                "{} table from {} has no bracket for ${weekly_dollars} a week",
                self.scale, self.effective
            ))
        })
    }
}

impl Persistent for PayrollTaxTable {
    const KIND: &'static str = "payroll_tax_table";

    fn identity(&self) -> Identity {
        self.identity
    }

    fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PayrollTaxTable {
        PayrollTaxTable::new(Scale::TaxFreeThresholdWithLeaveLoading, NaiveDate::from_ymd_opt(2005, 7, 1).unwrap())
            .with_row(109.0, 0.0, 0.0)
            .unwrap()
            .with_row(301.0, 0.1522, 16.7186)
            .unwrap()
            .with_row(UNBOUNDED, 0.485, 312.7899)
            .unwrap()
    }

    #[test]
    fn row_for_uses_the_row_whose_ceiling_equals_the_salary() {
        let table = table();
        assert_eq!(table.row_for(301).unwrap().ceiling, 301.0);
        assert_eq!(table.row_for(302).unwrap().ceiling, UNBOUNDED);
        assert_eq!(table.row_for(0).unwrap().ceiling, 109.0);
    }

    #[test]
    fn decreasing_ceiling_is_rejected() {
        let mut table = table();
        assert!(matches!(table.add_row(200.0, 0.1, 0.1), Err(EngineError::IllegalArgument(_))));
    }

    #[test]
    fn incomplete_table_has_gaps() {
        let table = PayrollTaxTable::new(Scale::NoTaxFreeThreshold, NaiveDate::from_ymd_opt(2005, 7, 1).unwrap())
            .with_row(98.0, 0.165, 0.165)
            .unwrap();
        assert!(!table.is_complete());
        assert!(matches!(table.row_for(99), Err(EngineError::IllegalState(_))));
        assert!(self::table().is_complete());
    }

    #[test]
    fn unbounded_ceiling_survives_json() {
        let json = serde_json::to_string(&table()).unwrap();
        let back: PayrollTaxTable = serde_json::from_str(&json).unwrap();
        assert!(back.is_complete());
        assert_eq!(back.rows(), table().rows());
    }
}
