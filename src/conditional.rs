//! Conditionals gating definitions and modifiers.
//!
//! A conditional is either a single comparison of an attribute's
//! ability-modifier against a threshold, or an ordered group of child
//! conditionals folded left to right. Evaluation goes through the
//! [`AttributeLookup`] trait, which both a settled character and an
//! in-flight calculation implement, so there is one evaluator for both
//! contexts.

use crate::attribute::AttributeDefinition;
use crate::error::RuleError;
use serde::{Deserialize, Serialize};

/// Something that can resolve an attribute to its ability-modifier.
pub trait AttributeLookup {
    fn ability_modifier(&mut self, attribute: &AttributeDefinition) -> Result<i32, RuleError>;
}

/// Operator joining a group element to the element after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[default]
    Unset,
    And,
    Or,
}

impl TryFrom<i32> for LogicalOperator {
    type Error = RuleError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LogicalOperator::Unset),
            1 => Ok(LogicalOperator::And),
            2 => Ok(LogicalOperator::Or),
            other => Err(RuleError::InvalidOperator(other)),
        }
    }
}

/// Relational operator applied as `ability_modifier <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    Equals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    NotEqual,
}

impl Relation {
    pub fn compare(self, lhs: i32, rhs: i32) -> bool {
        match self {
            Relation::Equals => lhs == rhs,
            Relation::LessThan => lhs < rhs,
            Relation::LessThanOrEqual => lhs <= rhs,
            Relation::GreaterThan => lhs > rhs,
            Relation::GreaterThanOrEqual => lhs >= rhs,
            Relation::NotEqual => lhs != rhs,
        }
    }
}

impl TryFrom<i32> for Relation {
    type Error = RuleError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Relation::Equals),
            1 => Ok(Relation::LessThan),
            2 => Ok(Relation::LessThanOrEqual),
            3 => Ok(Relation::GreaterThan),
            4 => Ok(Relation::GreaterThanOrEqual),
            5 => Ok(Relation::NotEqual),
            other => Err(RuleError::InvalidOperator(other)),
        }
    }
}

/// The shape of a conditional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Comparison {
        attribute: AttributeDefinition,
        relation: Relation,
        threshold: i32,
    },
    Group(Vec<Conditional>),
}

/// A requirement evaluated against a character's attributes.
///
/// `operator` only matters when this conditional is an element of a
/// group: it says how this element's result combines with the next one.
///
/// # Examples
///
/// ```rust
/// use ruleforge::conditional::{AttributeLookup, Conditional, Relation};
/// use ruleforge::{AttributeDefinition, ModifierKind, RuleError};
///
/// struct Fixed(i32);
///
/// impl AttributeLookup for Fixed {
///     fn ability_modifier(&mut self, attribute: &AttributeDefinition) -> Result<i32, RuleError> {
///         Ok(attribute.calculate_modifier(self.0))
///     }
/// }
///
/// let strength = AttributeDefinition::new("Strength", "Ability", ModifierKind::AbilityScore);
/// let requirement = Conditional::compare(strength, Relation::GreaterThanOrEqual, 2);
///
/// assert!(requirement.evaluate(&mut Fixed(14)).unwrap());
/// assert!(!requirement.evaluate(&mut Fixed(12)).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    #[serde(default)]
    pub operator: LogicalOperator,
    pub condition: Condition,
}

impl Conditional {
    pub fn compare(attribute: AttributeDefinition, relation: Relation, threshold: i32) -> Self {
        Self {
            operator: LogicalOperator::Unset,
            condition: Condition::Comparison {
                attribute,
                relation,
                threshold,
            },
        }
    }

    /// Combine children left to right, each with its own operator joining it to the next.
    ///
    /// An empty group is always met.
    pub fn group(children: Vec<Conditional>) -> Self {
        Self {
            operator: LogicalOperator::Unset,
            condition: Condition::Group(children),
        }
    }

    /// Combine this element with the next one in its group using AND.
    pub fn and(mut self) -> Self {
        self.operator = LogicalOperator::And;
        self
    }

    /// Combine this element with the next one in its group using OR.
    pub fn or(mut self) -> Self {
        self.operator = LogicalOperator::Or;
        self
    }

    /// Evaluate against any attribute lookup.
    ///
    /// # Returns
    ///
    /// * `Ok(bool)` - Whether the condition is met
    /// * `Err(RuleError::UnsetOperator)` - If a group element other than the last has no operator
    /// * `Err(RuleError)` - Any error raised while resolving a compared attribute
    pub fn evaluate(&self, lookup: &mut dyn AttributeLookup) -> Result<bool, RuleError> {
        match &self.condition {
            Condition::Comparison {
                attribute,
                relation,
                threshold,
            } => {
                let modifier = lookup.ability_modifier(attribute)?;
                Ok(relation.compare(modifier, *threshold))
            }
            Condition::Group(children) => evaluate_group(children, lookup),
        }
    }
}

fn evaluate_group(children: &[Conditional], lookup: &mut dyn AttributeLookup) -> Result<bool, RuleError> {
    let Some((first, rest)) = children.split_first() else {
        return Ok(true);
    };

    let mut result = first.evaluate(lookup)?;
    let mut operator = first.operator;
    for child in rest {
        let next = child.evaluate(lookup)?;
        result = match operator {
            LogicalOperator::And => result && next,
            LogicalOperator::Or => result || next,
            LogicalOperator::Unset => return Err(RuleError::UnsetOperator),
        };
        operator = child.operator;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::ModifierKind;
    use std::collections::HashMap;

    struct Scores {
        values: HashMap<String, i32>,
        lookups: usize,
    }

    impl Scores {
        fn new(pairs: &[(&str, i32)]) -> Self {
            Self {
                values: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                lookups: 0,
            }
        }
    }

    impl AttributeLookup for Scores {
        fn ability_modifier(&mut self, attribute: &AttributeDefinition) -> Result<i32, RuleError> {
            self.lookups += 1;
            let value = self.values.get(attribute.name.as_str()).copied().unwrap_or(0);
            Ok(attribute.calculate_modifier(value))
        }
    }

    fn ability(name: &str) -> AttributeDefinition {
        AttributeDefinition::new(name, "Ability", ModifierKind::AbilityScore)
    }

    #[test]
    fn test_relations() {
        assert!(Relation::Equals.compare(2, 2));
        assert!(Relation::LessThan.compare(1, 2));
        assert!(Relation::LessThanOrEqual.compare(2, 2));
        assert!(Relation::GreaterThan.compare(3, 2));
        assert!(Relation::GreaterThanOrEqual.compare(2, 2));
        assert!(Relation::NotEqual.compare(1, 2));
        assert!(!Relation::NotEqual.compare(2, 2));
    }

    #[test]
    fn test_comparison_uses_ability_modifier() {
        let mut scores = Scores::new(&[("Strength", 13)]);
        let cond = Conditional::compare(ability("Strength"), Relation::Equals, 1);
        assert!(cond.evaluate(&mut scores).unwrap());
    }

    #[test]
    fn test_empty_group_is_true() {
        let mut scores = Scores::new(&[]);
        assert!(Conditional::group(Vec::new()).evaluate(&mut scores).unwrap());
    }

    #[test]
    fn test_group_folds_left_to_right() {
        let mut scores = Scores::new(&[("Strength", 14), ("Dexterity", 8), ("Wisdom", 12)]);
        // (STR >= 2 AND DEX >= 1) OR WIS == 1  =>  (true AND false) OR true
        let cond = Conditional::group(vec![
            Conditional::compare(ability("Strength"), Relation::GreaterThanOrEqual, 2).and(),
            Conditional::compare(ability("Dexterity"), Relation::GreaterThanOrEqual, 1).or(),
            Conditional::compare(ability("Wisdom"), Relation::Equals, 1),
        ]);
        assert!(cond.evaluate(&mut scores).unwrap());
        assert_eq!(scores.lookups, 3);
    }

    #[test]
    fn test_group_and_false() {
        let mut scores = Scores::new(&[("Strength", 14), ("Dexterity", 8)]);
        let cond = Conditional::group(vec![
            Conditional::compare(ability("Strength"), Relation::GreaterThanOrEqual, 2).and(),
            Conditional::compare(ability("Dexterity"), Relation::GreaterThanOrEqual, 1),
        ]);
        assert!(!cond.evaluate(&mut scores).unwrap());
    }

    #[test]
    fn test_unset_operator_before_last_is_error() {
        let mut scores = Scores::new(&[]);
        let cond = Conditional::group(vec![
            Conditional::compare(ability("Strength"), Relation::Equals, -5),
            Conditional::compare(ability("Dexterity"), Relation::Equals, -5),
        ]);
        assert_eq!(cond.evaluate(&mut scores), Err(RuleError::UnsetOperator));
    }

    #[test]
    fn test_single_element_group_ignores_operator() {
        let mut scores = Scores::new(&[]);
        let cond = Conditional::group(vec![Conditional::compare(ability("Strength"), Relation::Equals, -5)]);
        assert!(cond.evaluate(&mut scores).unwrap());
    }

    #[test]
    fn test_operator_decoding() {
        assert_eq!(Relation::try_from(3), Ok(Relation::GreaterThan));
        assert_eq!(Relation::try_from(9), Err(RuleError::InvalidOperator(9)));
        assert_eq!(LogicalOperator::try_from(2), Ok(LogicalOperator::Or));
        assert_eq!(LogicalOperator::try_from(-1), Err(RuleError::InvalidOperator(-1)));
    }

    #[test]
    fn test_conditional_json() {
        let cond = Conditional::group(vec![
            Conditional::compare(ability("Strength"), Relation::GreaterThan, 0).or(),
            Conditional::compare(ability("Dexterity"), Relation::GreaterThan, 0),
        ]);
        let json = serde_json::to_string(&cond).unwrap();
        let back: Conditional = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cond);
    }
}
