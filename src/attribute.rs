//! Attribute definitions.
//!
//! An `AttributeDefinition` names a numeric character statistic and says
//! how its raw value turns into an ability-modifier. The engine ships a
//! handful of built-in system attributes (one per hit-die type, plus total
//! class level and total hit dice) which exist once per process.

use crate::ids::AttributeId;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// How an attribute's value becomes its ability-modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModifierKind {
    /// The modifier is the value itself.
    #[default]
    Direct,
    /// Ability-score style: `value / 2 - 5`.
    AbilityScore,
}

/// Immutable description of a named attribute.
///
/// Equality and hashing only look at the name, so two definitions built
/// independently with the same name are the same attribute.
///
/// # Examples
///
/// ```rust
/// use ruleforge::{AttributeDefinition, ModifierKind};
///
/// let strength = AttributeDefinition::new("Strength", "Ability", ModifierKind::AbilityScore);
/// assert_eq!(strength.calculate_modifier(18), 4);
///
/// let speed = AttributeDefinition::new("Speed", "Movement", ModifierKind::Direct);
/// assert_eq!(speed.calculate_modifier(30), 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: AttributeId,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub kind: ModifierKind,
    /// Built-in attributes cannot be edited or removed.
    #[serde(default)]
    pub system: bool,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<AttributeId>, category: impl Into<String>, kind: ModifierKind) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            kind,
            system: false,
        }
    }

    fn system(name: &str, category: &str) -> Self {
        Self {
            system: true,
            ..Self::new(name, category, ModifierKind::Direct)
        }
    }

    pub fn id(&self) -> &AttributeId {
        &self.name
    }

    /// Turn a raw value into this attribute's ability-modifier.
    ///
    /// Ability-score division truncates toward zero, so a value of `-1`
    /// yields `-5` rather than `-6`.
    pub fn calculate_modifier(&self, value: i32) -> i32 {
        match self.kind {
            ModifierKind::Direct => value,
            ModifierKind::AbilityScore => value / 2 - 5,
        }
    }
}

impl PartialEq for AttributeDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for AttributeDefinition {}

impl Hash for AttributeDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Hit-die sizes a class can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
}

impl DieType {
    pub const ALL: [DieType; 5] = [DieType::D4, DieType::D6, DieType::D8, DieType::D10, DieType::D12];

    pub fn sides(self) -> u32 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
        }
    }

    fn index(self) -> usize {
        match self {
            DieType::D4 => 0,
            DieType::D6 => 1,
            DieType::D8 => 2,
            DieType::D10 => 3,
            DieType::D12 => 4,
        }
    }
}

pub const HIT_DICE_CATEGORY: &str = "Hit Dice";
pub const LEVEL_CATEGORY: &str = "Level";

static HIT_DICE: Lazy<[AttributeDefinition; 5]> = Lazy::new(|| {
    DieType::ALL.map(|die| AttributeDefinition::system(&format!("Hit Dice (d{})", die.sides()), HIT_DICE_CATEGORY))
});

static TOTAL_CLASS_LEVEL: Lazy<AttributeDefinition> =
    Lazy::new(|| AttributeDefinition::system("Total Class Level", LEVEL_CATEGORY));

static TOTAL_HIT_DICE: Lazy<AttributeDefinition> =
    Lazy::new(|| AttributeDefinition::system("Total Hit Dice", HIT_DICE_CATEGORY));

/// The built-in hit-die attribute for a die type.
pub fn hit_die(die: DieType) -> &'static AttributeDefinition {
    &HIT_DICE[die.index()]
}

/// The built-in attribute counting every class level taken.
pub fn total_class_level() -> &'static AttributeDefinition {
    &TOTAL_CLASS_LEVEL
}

/// The built-in attribute counting every hit die gained.
pub fn total_hit_dice() -> &'static AttributeDefinition {
    &TOTAL_HIT_DICE
}

/// All built-in system attributes.
pub fn builtin_attributes() -> Vec<&'static AttributeDefinition> {
    HIT_DICE
        .iter()
        .chain([total_class_level(), total_hit_dice()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ability() -> AttributeDefinition {
        AttributeDefinition::new("Strength", "Ability", ModifierKind::AbilityScore)
    }

    #[test]
    fn test_direct_modifier_is_identity() {
        let def = AttributeDefinition::new("Speed", "", ModifierKind::Direct);
        for value in [-7, 0, 1, 30] {
            assert_eq!(def.calculate_modifier(value), value);
        }
    }

    #[test]
    fn test_ability_score_boundaries() {
        let def = ability();
        assert_eq!(def.calculate_modifier(10), 0);
        assert_eq!(def.calculate_modifier(11), 0);
        assert_eq!(def.calculate_modifier(8), -1);
        assert_eq!(def.calculate_modifier(20), 5);
        assert_eq!(def.calculate_modifier(1), -5);
    }

    #[test]
    fn test_ability_score_truncates_negative_values() {
        let def = ability();
        assert_eq!(def.calculate_modifier(-1), -5);
        assert_eq!(def.calculate_modifier(-2), -6);
    }

    #[test]
    fn test_equality_by_name_only() {
        let a = AttributeDefinition::new("Strength", "Ability", ModifierKind::AbilityScore);
        let b = AttributeDefinition::new("Strength", "Other", ModifierKind::Direct);
        assert_eq!(a, b);
    }

    #[test]
    fn test_builtins_are_referentially_stable() {
        assert!(std::ptr::eq(total_class_level(), total_class_level()));
        assert!(std::ptr::eq(hit_die(DieType::D8), hit_die(DieType::D8)));
        assert!(total_hit_dice().system);
        assert_eq!(hit_die(DieType::D12).name.as_str(), "Hit Dice (d12)");
    }

    #[test]
    fn test_builtin_names_are_unique() {
        let builtins = builtin_attributes();
        assert_eq!(builtins.len(), 7);
        let names: std::collections::HashSet<_> = builtins.iter().map(|d| d.name.clone()).collect();
        assert_eq!(names.len(), 7);
    }
}
