//! Calculation results.
//!
//! `CalculatedAttribute` is the cached result for one attribute of one
//! character; `CalculatedModifier` records what each candidate modifier
//! contributed and why. State setters return the [`StateChange`] they
//! performed so the caller decides what to do with it, instead of firing
//! hidden callbacks.

use crate::attribute::AttributeDefinition;
use crate::ids::{AttributeId, ModifierId};
use crate::modifier::Modifier;
use crate::modifier_type::{ModifierType, StackingOverride};
use serde::{Deserialize, Serialize};

/// Lifecycle of a calculated attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CalculationState {
    #[default]
    Unknown,
    Calculating,
    Calculated,
    Recalculate,
}

impl CalculationState {
    /// Whether an attribute in this state has to be computed before use.
    pub fn needs_calculation(self) -> bool {
        matches!(self, CalculationState::Unknown | CalculationState::Recalculate)
    }
}

/// A state transition that actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub old: CalculationState,
    pub new: CalculationState,
}

/// Outcome of a single modifier in a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierState {
    /// Counted in the total.
    Used,
    /// Beaten by a larger non-stacking modifier of the same type.
    Overridden,
    /// The source's apply requirement is not met.
    NotMet,
}

/// One modifier's contribution to an attribute.
#[derive(Debug, Clone)]
pub struct CalculatedModifier {
    pub modifier: Modifier,
    pub modifier_type: ModifierType,
    pub value: i32,
    pub state: ModifierState,
    /// The modifier that beat this one, when `state` is `Overridden`.
    pub overridden_by: Option<ModifierId>,
}

impl CalculatedModifier {
    pub fn new(modifier: Modifier, modifier_type: ModifierType, value: i32) -> Self {
        Self {
            modifier,
            modifier_type,
            value,
            state: ModifierState::Used,
            overridden_by: None,
        }
    }

    /// Whether this modifier adds to others of its type instead of competing.
    ///
    /// Penalties always stack.
    pub fn stacks(&self) -> bool {
        self.value < 0
            || match self.modifier.stacking {
                StackingOverride::Stacking => true,
                StackingOverride::NonStacking => false,
                StackingOverride::Default => self.modifier_type.stacks_by_default(),
            }
    }

    pub fn is_used(&self) -> bool {
        self.state == ModifierState::Used
    }
}

/// The resolved value of one attribute.
///
/// `value` and `modifiers` are only ever replaced together, through
/// [`CalculatedAttribute::update`], which also moves the state to
/// `Calculated`.
#[derive(Debug, Clone)]
pub struct CalculatedAttribute {
    definition: AttributeDefinition,
    value: i32,
    state: CalculationState,
    modifiers: Vec<CalculatedModifier>,
}

impl CalculatedAttribute {
    pub fn new(definition: AttributeDefinition) -> Self {
        Self {
            definition,
            value: 0,
            state: CalculationState::Unknown,
            modifiers: Vec::new(),
        }
    }

    pub fn definition(&self) -> &AttributeDefinition {
        &self.definition
    }

    pub fn id(&self) -> &AttributeId {
        &self.definition.name
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn state(&self) -> CalculationState {
        self.state
    }

    pub fn modifiers(&self) -> &[CalculatedModifier] {
        &self.modifiers
    }

    /// The ability-modifier derived from the current value.
    pub fn modifier(&self) -> i32 {
        self.definition.calculate_modifier(self.value)
    }

    /// Move to `state`, returning the transition if the state changed.
    pub fn set_state(&mut self, state: CalculationState) -> Option<StateChange> {
        if self.state == state {
            return None;
        }
        let change = StateChange {
            old: self.state,
            new: state,
        };
        self.state = state;
        Some(change)
    }

    /// Replace value and modifiers and mark the attribute calculated.
    pub fn update(&mut self, value: i32, modifiers: Vec<CalculatedModifier>) -> Option<StateChange> {
        self.value = value;
        self.modifiers = modifiers;
        self.set_state(CalculationState::Calculated)
    }

    /// Flag the attribute as stale without touching its value.
    pub fn needs_recalculating(&mut self) -> Option<StateChange> {
        self.set_state(CalculationState::Recalculate)
    }

    /// Human-readable list of every modifier and what happened to it.
    pub fn breakdown(&self) -> Vec<String> {
        self.modifiers
            .iter()
            .map(|m| {
                let origin = m
                    .modifier
                    .source
                    .as_ref()
                    .map(|s| s.name.as_str())
                    .unwrap_or("-");
                format!("{:+} {} ({}) [{:?}]", m.value, m.modifier_type.name, origin, m.state)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::ModifierKind;
    use crate::modifier_type::StackingPolicy;

    fn strength() -> AttributeDefinition {
        AttributeDefinition::new("Strength", "Ability", ModifierKind::AbilityScore)
    }

    fn calculated(value: i32, ty: StackingPolicy, stacking: StackingOverride) -> CalculatedModifier {
        let modifier = Modifier::builder("Enhancement")
            .static_value(value)
            .target("Strength")
            .stacking(stacking)
            .build()
            .unwrap();
        CalculatedModifier::new(modifier, ModifierType::new("Enhancement", ty), value)
    }

    #[test]
    fn test_new_attribute_is_unknown() {
        let attr = CalculatedAttribute::new(strength());
        assert_eq!(attr.state(), CalculationState::Unknown);
        assert_eq!(attr.value(), 0);
        assert!(attr.modifiers().is_empty());
    }

    #[test]
    fn test_update_sets_calculated() {
        let mut attr = CalculatedAttribute::new(strength());
        let change = attr.update(16, Vec::new()).unwrap();
        assert_eq!(change.old, CalculationState::Unknown);
        assert_eq!(change.new, CalculationState::Calculated);
        assert_eq!(attr.value(), 16);
        assert_eq!(attr.modifier(), 3);
    }

    #[test]
    fn test_needs_recalculating_keeps_value() {
        let mut attr = CalculatedAttribute::new(strength());
        attr.update(12, Vec::new());
        let change = attr.needs_recalculating().unwrap();
        assert_eq!(change.new, CalculationState::Recalculate);
        assert_eq!(attr.value(), 12);
        assert!(attr.needs_recalculating().is_none());
    }

    #[test]
    fn test_stacks_rules() {
        assert!(!calculated(2, StackingPolicy::NonStacking, StackingOverride::Default).stacks());
        assert!(calculated(2, StackingPolicy::Stacking, StackingOverride::Default).stacks());
        assert!(calculated(2, StackingPolicy::NonStacking, StackingOverride::Stacking).stacks());
        assert!(!calculated(2, StackingPolicy::Stacking, StackingOverride::NonStacking).stacks());
        assert!(calculated(-2, StackingPolicy::NonStacking, StackingOverride::NonStacking).stacks());
    }

    #[test]
    fn test_breakdown_lists_modifiers() {
        let mut attr = CalculatedAttribute::new(strength());
        attr.update(4, vec![calculated(4, StackingPolicy::NonStacking, StackingOverride::Default)]);
        let lines = attr.breakdown();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("+4"));
        assert!(lines[0].contains("Used"));
    }
}
