//! Modifier sources.
//!
//! Everything that can hand modifiers to a character is one variant of
//! [`ModifierSource`]: the character's own modifiers (and campaign-wide
//! ones), its race, each class level, and each special quality record.
//! Sources are gathered into a flat list and filtered per attribute.

use crate::attribute::{hit_die, total_class_level, total_hit_dice};
use crate::definition::Definition;
use crate::error::RuleError;
use crate::ids::AttributeId;
use crate::modifier::Modifier;
use crate::modifier_type::class_level_type;
use std::sync::Arc;

/// One level taken in a class.
///
/// `level` is the class-specific level reached, so the third Fighter level
/// taken is `ClassLevel { level: 3, .. }` regardless of other classes.
#[derive(Debug, Clone)]
pub struct ClassLevel {
    pub class: Arc<Definition>,
    pub level: u32,
    level_modifier: Option<Modifier>,
}

impl ClassLevel {
    pub fn new(class: Arc<Definition>, level: u32) -> Result<Self, RuleError> {
        let level_modifier = match class.hit_die() {
            Some(die) => Some(
                Modifier::builder(class_level_type().name.clone())
                    .static_value(1)
                    .target(total_class_level().name.clone())
                    .target(total_hit_dice().name.clone())
                    .target(hit_die(die).name.clone())
                    .system()
                    .build()?,
            ),
            None => None,
        };
        Ok(Self {
            class,
            level,
            level_modifier,
        })
    }

    fn is_first(&self) -> bool {
        self.level == 1
    }

    /// The level's `+1` class-level modifier, the class's own modifiers on
    /// the first level, and the level-table entry for this level.
    pub fn modifiers(&self) -> Vec<Modifier> {
        let mut modifiers: Vec<Modifier> = self.level_modifier.iter().cloned().collect();
        if self.is_first() {
            modifiers.extend(self.class.inherent_modifiers());
        }
        if let Some(level) = self.class.level_definition(self.level) {
            modifiers.extend(level.inherent_modifiers());
        }
        modifiers
    }

    pub fn special_qualities(&self) -> Vec<Arc<Definition>> {
        let mut qualities = Vec::new();
        if self.is_first() {
            qualities.extend(self.class.special_qualities.iter().cloned());
        }
        if let Some(level) = self.class.level_definition(self.level) {
            qualities.extend(level.special_qualities.iter().cloned());
        }
        qualities
    }
}

/// A selectable special quality and whether it currently applies.
#[derive(Debug, Clone)]
pub struct SpecialQualityRecord {
    pub definition: Arc<Definition>,
    pub applied: bool,
}

impl SpecialQualityRecord {
    /// Wrap a quality. Ungated qualities always apply; gated ones start unapplied.
    pub fn new(definition: Arc<Definition>) -> Self {
        let applied = definition.apply_requirement.is_none();
        Self { definition, applied }
    }

    /// The quality's modifiers, or none while it is not applied.
    pub fn modifiers(&self) -> Vec<Modifier> {
        if self.applied {
            self.definition.inherent_modifiers()
        } else {
            Vec::new()
        }
    }
}

/// A container of modifiers attached to a character.
#[derive(Debug, Clone)]
pub enum ModifierSource {
    /// Loose modifiers: the character's own, or campaign-wide ones.
    Inherent { label: String, modifiers: Vec<Modifier> },
    Race(Arc<Definition>),
    ClassLevel(ClassLevel),
    Quality(SpecialQualityRecord),
}

impl ModifierSource {
    pub fn label(&self) -> &str {
        match self {
            ModifierSource::Inherent { label, .. } => label,
            ModifierSource::Race(race) => &race.name,
            ModifierSource::ClassLevel(level) => &level.class.name,
            ModifierSource::Quality(record) => &record.definition.name,
        }
    }

    pub fn modifiers(&self) -> Vec<Modifier> {
        match self {
            ModifierSource::Inherent { modifiers, .. } => modifiers.clone(),
            ModifierSource::Race(race) => race.inherent_modifiers(),
            ModifierSource::ClassLevel(level) => level.modifiers(),
            ModifierSource::Quality(record) => record.modifiers(),
        }
    }

    /// Special qualities this source makes selectable.
    pub fn special_qualities(&self) -> Vec<Arc<Definition>> {
        match self {
            ModifierSource::Inherent { .. } => Vec::new(),
            ModifierSource::Race(race) => race.special_qualities.clone(),
            ModifierSource::ClassLevel(level) => level.special_qualities(),
            ModifierSource::Quality(record) => record.definition.special_qualities.clone(),
        }
    }
}

/// Every modifier from `sources` that targets `attribute`, in source order.
pub fn modifiers_for(sources: &[ModifierSource], attribute: &AttributeId) -> Vec<Modifier> {
    sources
        .iter()
        .flat_map(|source| source.modifiers())
        .filter(|m| m.applies_to(attribute))
        .collect()
}
