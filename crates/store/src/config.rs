//! Engine configuration.

use serde::{Deserialize, Serialize};
use tally_core::{ActivationPolicies, ActivationPolicy, EngineError, EngineResult};

/// Settings for an [`Engine`](crate::Engine).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```json
/// { "pool_size": 2, "activation": { "kinds": { "currency": { "mode": "leaf" } } } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-kind activation policies consulted by every session.
    pub activation: ActivationPolicies,

    /// Idle sessions kept for reuse by `gain_client`.
    pub pool_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            activation: ActivationPolicies::default(),
            pool_size: 4,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::illegal_argument(format!("engine config: {e}")))
    }

    /// Layer domain-supplied policies on top of the current table.
    pub fn with_policies(mut self, policies: &ActivationPolicies) -> Self {
        self.activation.extend(policies);
        self
    }

    pub fn with_policy(mut self, kind: &str, policy: ActivationPolicy) -> Self {
        self.activation.set(kind, policy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "pool_size": 1 }"#).unwrap();
        assert_eq!(config.pool_size, 1);
        assert_eq!(config.activation, ActivationPolicies::default());
    }

    #[test]
    fn malformed_json_is_an_illegal_argument() {
        assert!(matches!(
            EngineConfig::from_json("{ pool_size: }"),
            Err(EngineError::IllegalArgument(_))
        ));
    }

    #[test]
    fn later_policies_override_earlier_ones() {
        let domain = ActivationPolicies::default().with("ledger", ActivationPolicy::cascade(2));
        let config = EngineConfig::default()
            .with_policy("ledger", ActivationPolicy::Leaf)
            .with_policies(&domain);
        assert_eq!(config.activation.policy_for("ledger"), ActivationPolicy::cascade(2));
    }
}
