use std::sync::Arc;

use chrono::NaiveDate;

use tally_commands::{Finder, exactly_one};
use tally_core::{EngineError, EngineResult};
use tally_store::Session;

use crate::identifier::PayrollTaxIdentifier;
use crate::table::{CoefficientRow, PayrollTaxTable};

/// Finds the table in force for one identifier on one date: the stored
/// table with the latest effective date not after it. Two tables sharing
/// that date are ambiguous and resolve to nothing.
#[derive(Debug)]
pub struct PayrollTaxTableFinder {
    identifier: PayrollTaxIdentifier,
    as_of: NaiveDate,
    found: Option<Arc<PayrollTaxTable>>,
}

impl PayrollTaxTableFinder {
    pub fn new(identifier: impl Into<PayrollTaxIdentifier>, as_of: NaiveDate) -> Self {
        Self {
            identifier: identifier.into(),
            as_of,
            found: None,
        }
    }

    pub fn identifier(&self) -> PayrollTaxIdentifier {
        self.identifier
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn set_identifier(&mut self, identifier: impl Into<PayrollTaxIdentifier>) {
        self.identifier = identifier.into();
        self.found = None;
    }

    pub fn set_as_of(&mut self, as_of: NaiveDate) {
        self.as_of = as_of;
        self.found = None;
    }

    /// Rows of the table found by the last query.
    pub fn coefficients(&self) -> EngineResult<&[CoefficientRow]> {
        self.found.as_deref().map(PayrollTaxTable::rows).ok_or_else(|| {
            EngineError::not_found(format!(
                "no {} table resolved for {}",
                self.identifier.scale(),
                self.as_of
            ))
        })
    }
}

impl Finder for PayrollTaxTableFinder {
    type Output = Arc<PayrollTaxTable>;

    fn query(&mut self, session: &mut Session) -> EngineResult<Arc<PayrollTaxTable>> {
        if let Some(found) = &self.found {
            return Ok(found.clone());
        }
        let (scale, as_of) = (self.identifier.scale(), self.as_of);
        let candidates = session.query(|t: &PayrollTaxTable| t.scale() == scale && t.effective() <= as_of)?;
        let latest = candidates
            .iter()
            .map(|t| t.effective())
            .max()
            .ok_or_else(|| EngineError::not_found(format!("no {scale} table in force on {as_of}")))?;
        let in_force: Vec<_> = candidates.into_iter().filter(|t| t.effective() == latest).collect();
        let table = exactly_one(in_force, &format!("{scale} table effective {latest}"))?;
        self.found = Some(table.clone());
        Ok(table)
    }
}
