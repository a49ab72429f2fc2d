//! Error types for attribute resolution.
//!
//! All errors that can occur while building modifiers, evaluating
//! conditionals or resolving attributes are represented by the
//! `RuleError` enum.

use crate::ids::{AttributeId, ModifierTypeId};
use thiserror::Error;

/// Format a cycle path as a readable string.
fn format_cycle_path(path: &[AttributeId]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors that can occur during rule resolution.
///
/// Invariant and usage errors abort the triggering operation. A modifier
/// whose gating condition is unmet, or that is beaten by a larger
/// non-stacking modifier, is not an error and never shows up here.
///
/// # Examples
///
/// ```rust
/// use ruleforge::{AttributeId, RuleError};
///
/// let err = RuleError::AttributeState(AttributeId::from_str("Strength"));
/// assert_eq!(err.to_string(), "Attribute already registered: Strength");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuleError {
    /// An attribute identity was registered in a store that already holds it.
    #[error("Attribute already registered: {0}")]
    AttributeState(AttributeId),

    /// A modifier was built without any target attribute.
    #[error("Modifier must target at least one attribute")]
    EmptyTargets,

    /// A group conditional tried to combine through an `Unset` operator.
    #[error("Conditional operator is unset before the last element of a group")]
    UnsetOperator,

    /// An operator value outside the closed enumeration was decoded.
    #[error("Invalid operator value: {0}")]
    InvalidOperator(i32),

    /// Resolution re-entered an attribute that is still being resolved.
    ///
    /// If A reads B, B reads C and C reads A, the path is `[A, B, C, A]`.
    #[error("Cycle detected: {}", format_cycle_path(.path))]
    Cycle { path: Vec<AttributeId> },

    /// The data source does not know the requested modifier type.
    #[error("Unknown modifier type: {0}")]
    UnknownModifierType(ModifierTypeId),

    /// The qualities convergence loop hit its configured pass limit.
    #[error("Special qualities did not converge after {passes} passes")]
    NotConverged { passes: u32 },

    /// An attribute's modifiers sum outside the `i32` range.
    #[error("Attribute value out of range: {0}")]
    Overflow(AttributeId),

    /// A catalog or configuration document could not be decoded.
    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl From<serde_json::Error> for RuleError {
    fn from(err: serde_json::Error) -> Self {
        RuleError::Catalog(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuleError::UnknownModifierType(ModifierTypeId::from_str("Luck"));
        assert!(err.to_string().contains("Luck"));
    }

    #[test]
    fn test_cycle_error_display() {
        let a = AttributeId::from_str("A");
        let b = AttributeId::from_str("B");
        let err = RuleError::Cycle {
            path: vec![a.clone(), b.clone(), a.clone()],
        };
        assert_eq!(err.to_string(), "Cycle detected: A -> B -> A");
    }

    #[test]
    fn test_empty_cycle_display() {
        let err = RuleError::Cycle { path: Vec::new() };
        assert!(err.to_string().contains("(empty cycle)"));
    }

    #[test]
    fn test_json_error_converts_to_catalog() {
        let err: RuleError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, RuleError::Catalog(_)));
    }
}
