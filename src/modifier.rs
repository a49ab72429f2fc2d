//! Modifiers and the modifier builder.
//!
//! A modifier contributes a value to one or more target attributes. Its
//! value is either a fixed number or the ability-modifier of another
//! attribute, which the resolver computes by recursing into that
//! attribute. The builder API keeps construction declarative and checks
//! the non-empty target invariant once, at `build()`.

use crate::attribute::AttributeDefinition;
use crate::conditional::Conditional;
use crate::error::RuleError;
use crate::ids::{AttributeId, DefinitionId, ModifierId, ModifierTypeId};
use crate::modifier_type::StackingOverride;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How a modifier's value is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModifierValue {
    /// A fixed value.
    Static(i32),
    /// The ability-modifier of another attribute.
    FromAttribute(AttributeDefinition),
}

/// The definition a modifier came from, with the requirement that gates it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRef {
    pub id: DefinitionId,
    pub name: String,
    pub apply_requirement: Option<Arc<Conditional>>,
}

/// A contribution to one or more attributes.
///
/// # Examples
///
/// ```rust
/// use ruleforge::{AttributeDefinition, Modifier, ModifierKind, StackingOverride};
///
/// let strength = AttributeDefinition::new("Strength", "Ability", ModifierKind::AbilityScore);
/// let belt = Modifier::builder("Enhancement")
///     .static_value(4)
///     .target(strength.name.clone())
///     .stacking(StackingOverride::NonStacking)
///     .build()
///     .unwrap();
///
/// assert_eq!(belt.targets().len(), 1);
/// assert!(belt.applies_to(&strength.name));
///
/// // A modifier with no targets is rejected.
/// assert!(Modifier::builder("Enhancement").static_value(2).build().is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ModifierRecord")]
pub struct Modifier {
    pub id: ModifierId,
    pub modifier_type: ModifierTypeId,
    targets: Vec<AttributeId>,
    pub stacking: StackingOverride,
    pub value: ModifierValue,
    #[serde(skip)]
    pub source: Option<SourceRef>,
    pub system: bool,
}

#[derive(Deserialize)]
struct ModifierRecord {
    #[serde(default)]
    id: ModifierId,
    modifier_type: ModifierTypeId,
    targets: Vec<AttributeId>,
    #[serde(default)]
    stacking: StackingOverride,
    value: ModifierValue,
    #[serde(default)]
    system: bool,
}

impl TryFrom<ModifierRecord> for Modifier {
    type Error = RuleError;

    fn try_from(record: ModifierRecord) -> Result<Self, Self::Error> {
        if record.targets.is_empty() {
            return Err(RuleError::EmptyTargets);
        }
        Ok(Self {
            id: record.id,
            modifier_type: record.modifier_type,
            targets: record.targets,
            stacking: record.stacking,
            value: record.value,
            source: None,
            system: record.system,
        })
    }
}

impl Modifier {
    /// Start building a modifier of the given type.
    pub fn builder(modifier_type: impl Into<ModifierTypeId>) -> ModifierBuilder {
        ModifierBuilder {
            modifier_type: modifier_type.into(),
            value: ModifierValue::Static(0),
            targets: Vec::new(),
            stacking: StackingOverride::Default,
            source: None,
            system: false,
        }
    }

    /// Shorthand for a static modifier with default stacking.
    pub fn new_static(
        modifier_type: impl Into<ModifierTypeId>,
        value: i32,
        targets: impl IntoIterator<Item = AttributeId>,
    ) -> Result<Self, RuleError> {
        Self::builder(modifier_type).static_value(value).targets(targets).build()
    }

    /// Shorthand for a modifier derived from another attribute.
    pub fn new_from_attribute(
        modifier_type: impl Into<ModifierTypeId>,
        attribute: AttributeDefinition,
        targets: impl IntoIterator<Item = AttributeId>,
    ) -> Result<Self, RuleError> {
        Self::builder(modifier_type).from_attribute(attribute).targets(targets).build()
    }

    /// Target attributes, never empty.
    pub fn targets(&self) -> &[AttributeId] {
        &self.targets
    }

    /// Whether `attribute` is one of the targets.
    pub fn applies_to(&self, attribute: &AttributeId) -> bool {
        self.targets.contains(attribute)
    }

    /// A copy of this modifier gated by `source`.
    pub fn with_source(&self, source: SourceRef) -> Self {
        Self {
            source: Some(source),
            ..self.clone()
        }
    }
}

/// Builder for [`Modifier`].
pub struct ModifierBuilder {
    modifier_type: ModifierTypeId,
    value: ModifierValue,
    targets: Vec<AttributeId>,
    stacking: StackingOverride,
    source: Option<SourceRef>,
    system: bool,
}

impl ModifierBuilder {
    /// Set a fixed value. This is the default, with value 0.
    pub fn static_value(mut self, value: i32) -> Self {
        self.value = ModifierValue::Static(value);
        self
    }

    /// Take the value from another attribute's ability-modifier.
    ///
    /// The attribute is resolved every time the modifier is calculated.
    pub fn from_attribute(mut self, attribute: AttributeDefinition) -> Self {
        self.value = ModifierValue::FromAttribute(attribute);
        self
    }

    /// Add a target attribute. Duplicates are dropped at `build()`.
    pub fn target(mut self, attribute: impl Into<AttributeId>) -> Self {
        self.targets.push(attribute.into());
        self
    }

    /// Add several target attributes, in order.
    pub fn targets(mut self, attributes: impl IntoIterator<Item = AttributeId>) -> Self {
        self.targets.extend(attributes);
        self
    }

    /// Override the modifier type's stacking policy for this modifier only.
    pub fn stacking(mut self, stacking: StackingOverride) -> Self {
        self.stacking = stacking;
        self
    }

    /// Gate the modifier by the apply requirement of the definition it came from.
    ///
    /// Definitions stamp their own modifiers through
    /// [`crate::definition::Definition::inherent_modifiers`]; this is for
    /// modifiers assembled by hand.
    pub fn source(mut self, source: SourceRef) -> Self {
        self.source = Some(source);
        self
    }

    /// Mark the modifier as built-in.
    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }

    /// Finish the modifier.
    ///
    /// # Returns
    ///
    /// * `Ok(Modifier)` - With a fresh id and targets in first-seen order
    /// * `Err(RuleError::EmptyTargets)` - If no target was added
    pub fn build(self) -> Result<Modifier, RuleError> {
        if self.targets.is_empty() {
            return Err(RuleError::EmptyTargets);
        }
        let mut targets = self.targets;
        dedup_in_order(&mut targets);
        Ok(Modifier {
            id: ModifierId::new(),
            modifier_type: self.modifier_type,
            targets,
            stacking: self.stacking,
            value: self.value,
            source: self.source,
            system: self.system,
        })
    }
}

fn dedup_in_order(targets: &mut Vec<AttributeId>) {
    let mut seen = std::collections::HashSet::new();
    targets.retain(|t| seen.insert(t.clone()));
}
