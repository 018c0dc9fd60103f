//! Published PAYG withholding coefficients.

use chrono::NaiveDate;

use tally_core::{EngineError, EngineResult};

use crate::identifier::Scale;
use crate::table::{PayrollTaxTable, UNBOUNDED};

type Rows = &'static [(f64, f64, f64)];

const NO_TAX_FREE_THRESHOLD: Rows = &[
    (98.0, 0.1650, 0.1650),
    (894.0, 0.3150, 14.8765),
    (1509.0, 0.4340, 122.1842),
    (UNBOUNDED, 0.4850, 197.6650),
];

const TAX_FREE_THRESHOLD_WITH_LEAVE_LOADING: Rows = &[
    (109.0, 0.0, 0.0),
    (301.0, 0.1522, 16.7186),
    (325.0, 0.3553, 77.8907),
    (409.0, 0.1675, 16.7438),
    (1205.0, 0.3150, 77.1053),
    (1820.0, 0.4350, 221.7515),
    (UNBOUNDED, 0.4850, 312.7899),
];

const NO_TFN_PROVIDED: Rows = &[(UNBOUNDED, 0.4850, 0.5)];

const TAX_FREE_THRESHOLD_NO_LEAVE_LOADING: Rows = &[
    (111.0, 0.0, 0.0),
    (305.0, 0.1500, 16.7308),
    (330.0, 0.3500, 77.8923),
    (415.0, 0.1650, 16.7320),
    (1211.0, 0.3150, 79.0397),
    (1826.0, 0.4350, 224.4243),
    (UNBOUNDED, 0.4850, 315.7705),
];

/// Date the 2005 schedule took effect.
pub fn effective_2005() -> EngineResult<NaiveDate> {
    NaiveDate::from_ymd_opt(2005, 7, 1).ok_or_else(|| EngineError::illegal_state("invalid schedule date"))
}

/// The 2005-07-01 tables. Foreign residents have no table in this schedule.
pub fn tables_2005() -> EngineResult<Vec<PayrollTaxTable>> {
    let effective = effective_2005()?;
    [
        (Scale::NoTaxFreeThreshold, NO_TAX_FREE_THRESHOLD),
        (Scale::TaxFreeThresholdWithLeaveLoading, TAX_FREE_THRESHOLD_WITH_LEAVE_LOADING),
        (Scale::NoTfnProvided, NO_TFN_PROVIDED),
        (Scale::TaxFreeThresholdNoLeaveLoading, TAX_FREE_THRESHOLD_NO_LEAVE_LOADING),
    ]
    .into_iter()
    .map(|(scale, rows)| {
        let mut table = PayrollTaxTable::new(scale, effective);
        for (ceiling, a, b) in rows {
            table.add_row(*ceiling, *a, *b)?;
        }
        Ok(table)
    })
    .collect()
}
