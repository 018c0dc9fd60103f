use serde::{Deserialize, Serialize};

use tally_core::{EngineError, EngineResult, Identity, Persistent};

/// A currency the books can hold amounts in.
///
/// Stored as a leaf: activating an object that points at a currency loads
/// the currency but never follows anything beyond it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    #[serde(skip)]
    identity: Identity,
    code: String,
    name: String,
    symbol: String,
}

impl Currency {
    /// `code` is a three-letter uppercase ISO code, e.g. `"AUD"`.
    pub fn new(code: &str, name: &str, symbol: &str) -> EngineResult<Self> {
        validate_code(code)?;
        if name.trim().is_empty() {
            return Err(EngineError::illegal_argument("currency name cannot be blank"));
        }
        Ok(Self {
            identity: Identity::Unassigned,
            code: code.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
        })
    }

    /// Query-by-example prototype matching on code only.
    pub fn example_with_code(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Self::default()
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

pub fn validate_code(code: &str) -> EngineResult<()> {
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(EngineError::illegal_argument(format!(
            "currency code must be three uppercase letters, got '{code}'"
        )));
    }
    Ok(())
}

impl Persistent for Currency {
    const KIND: &'static str = "currency";

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

    #[test]
    fn code_must_be_three_uppercase_letters() {
        assert!(Currency::new("AUD", "Australian Dollar", "$").is_ok());
        for bad in ["aud", "AU", "AUDD", "A1D", ""] {
            assert!(matches!(
                Currency::new(bad, "Dollar", "$"),
                Err(EngineError::IllegalArgument(_))
            ));
        }
    }

    #[test]
    fn name_is_required() {
        assert!(Currency::new("USD", "  ", "$").is_err());
    }
}
