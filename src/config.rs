//! Engine configuration.

use crate::error::RuleError;
use serde::{Deserialize, Serialize};

/// Tunables for the resolver and the qualities convergence loop.
///
/// # Examples
///
/// ```rust
/// use ruleforge::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{"max_convergence_passes": 32}"#).unwrap();
/// assert_eq!(config.max_convergence_passes, Some(32));
/// assert!(config.cycle_detection);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fail with `RuleError::Cycle` when a derived value re-enters an attribute.
    /// When off, that re-entry sees the attribute's in-progress record, as
    /// requirement checks always do.
    pub cycle_detection: bool,
    /// Pass limit for the qualities convergence loop. `None` never gives up.
    pub max_convergence_passes: Option<u32>,
    /// Record discovered attribute dependencies in a graph.
    pub track_dependencies: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_detection: true,
            max_convergence_passes: None,
            track_dependencies: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        Ok(serde_json::from_str(json)?)
    }
}
