use core::fmt;

use serde::{Deserialize, Serialize};

use tally_accounting::{Identifier, IdentifierGroup};
use tally_core::{EngineError, EngineResult};

/// Label of the stored group holding the payroll identifiers.
pub const PAYROLL_IDENTIFIER_GROUP: &str = "PAYG witholding types";

/// PAYG withholding scale, numbered as the tax office numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    NoTaxFreeThreshold,
    TaxFreeThresholdWithLeaveLoading,
    ForeignResident,
    NoTfnProvided,
    TaxFreeThresholdNoLeaveLoading,
}

impl Scale {
    pub const ALL: [Scale; 5] = [
        Scale::NoTaxFreeThreshold,
        Scale::TaxFreeThresholdWithLeaveLoading,
        Scale::ForeignResident,
        Scale::NoTfnProvided,
        Scale::TaxFreeThresholdNoLeaveLoading,
    ];

    pub fn index(self) -> u32 {
        match self {
            Scale::NoTaxFreeThreshold => 1,
            Scale::TaxFreeThresholdWithLeaveLoading => 2,
            Scale::ForeignResident => 3,
            Scale::NoTfnProvided => 4,
            Scale::TaxFreeThresholdNoLeaveLoading => 7,
        }
    }

    pub fn from_index(index: u32) -> EngineResult<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.index() == index)
            .ok_or_else(|| EngineError::not_found(format!("no withholding scale {index}")))
    }

    pub fn description(self) -> &'static str {
        match self {
            Scale::NoTaxFreeThreshold => "No tax-free threshold",
            Scale::TaxFreeThresholdNoLeaveLoading => "Tax-free threshold claimed but without leave loading",
            Scale::TaxFreeThresholdWithLeaveLoading => "Tax-free threshold and leave loading claimed",
            Scale::NoTfnProvided => "No TFN (or ABN) quoted",
            Scale::ForeignResident => "Foreign resident",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (scale {})", self.description(), self.index())
    }
}

/// Identifies which withholding table applies to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayrollTaxIdentifier(Scale);

impl PayrollTaxIdentifier {
    pub const fn new(scale: Scale) -> Self {
        Self(scale)
    }

    pub fn scale(self) -> Scale {
        self.0
    }

    pub fn description(self) -> &'static str {
        self.0.description()
    }

    pub fn index(self) -> u32 {
        self.0.index()
    }

    /// The storable form.
    pub fn to_identifier(self) -> EngineResult<Identifier> {
        Identifier::new(self.description(), self.index())
    }

    pub fn from_identifier(identifier: &Identifier) -> EngineResult<Self> {
        Scale::from_index(identifier.index()).map(Self)
    }

    /// Every payroll identifier, ready to be stored as one group.
    pub fn group() -> EngineResult<IdentifierGroup> {
        let mut group = IdentifierGroup::new(PAYROLL_IDENTIFIER_GROUP)?;
        for scale in Scale::ALL {
            group.add(Self(scale).to_identifier()?)?;
        }
        Ok(group)
    }
}

impl From<Scale> for PayrollTaxIdentifier {
    fn from(scale: Scale) -> Self {
        Self(scale)
    }
}
