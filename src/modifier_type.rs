//! Modifier types and stacking policies.

use crate::ids::ModifierTypeId;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Default stacking rule carried by a modifier type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackingPolicy {
    /// Only the largest modifier of the type counts.
    NonStacking,
    /// Every modifier of the type counts.
    Stacking,
}

/// Per-modifier stacking override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StackingOverride {
    /// Defer to the modifier type's policy.
    #[default]
    Default,
    NonStacking,
    Stacking,
}

/// A category of modifiers, such as "Racial" or "Enhancement".
///
/// Equality is by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierType {
    pub name: ModifierTypeId,
    pub stacking: StackingPolicy,
    #[serde(default)]
    pub system: bool,
}

impl ModifierType {
    pub fn new(name: impl Into<ModifierTypeId>, stacking: StackingPolicy) -> Self {
        Self {
            name: name.into(),
            stacking,
            system: false,
        }
    }

    pub fn id(&self) -> &ModifierTypeId {
        &self.name
    }

    pub fn stacks_by_default(&self) -> bool {
        self.stacking == StackingPolicy::Stacking
    }
}

impl PartialEq for ModifierType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ModifierType {}

impl Hash for ModifierType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

static CLASS_LEVEL: Lazy<ModifierType> = Lazy::new(|| ModifierType {
    system: true,
    ..ModifierType::new("Class Level", StackingPolicy::Stacking)
});

static RACIAL: Lazy<ModifierType> = Lazy::new(|| ModifierType {
    system: true,
    ..ModifierType::new("Racial", StackingPolicy::Stacking)
});

/// The system modifier type used for per-level contributions.
pub fn class_level_type() -> &'static ModifierType {
    &CLASS_LEVEL
}

/// The system modifier type used for racial traits.
pub fn racial_type() -> &'static ModifierType {
    &RACIAL
}

pub fn builtin_modifier_types() -> Vec<&'static ModifierType> {
    vec![class_level_type(), racial_type()]
}
