//! Race, class, feat, special quality and level definitions.
//!
//! A `Definition` is an authored catalog entry: a name, the modifiers it
//! grants, the special qualities nested under it, and optional
//! requirements to take and to apply it. Modifiers handed out by a
//! definition carry a [`SourceRef`] back to it, so the resolver can check
//! the apply requirement while a calculation is in flight.

use crate::attribute::DieType;
use crate::conditional::Conditional;
use crate::ids::DefinitionId;
use crate::modifier::{Modifier, SourceRef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// What a definition describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DefinitionKind {
    Race,
    Class {
        hit_die: DieType,
        #[serde(default)]
        levels: Vec<Definition>,
    },
    Feat,
    SpecialQuality,
    /// Bonuses granted on reaching `level` in a class.
    Level { level: u32 },
}

/// An authored, immutable catalog entry.
///
/// # Examples
///
/// ```rust
/// use ruleforge::{AttributeId, Definition, DieType, Modifier};
///
/// let fighter = Definition::class("Fighter", DieType::D10).with_level(
///     Definition::level(1).with_modifier(
///         Modifier::new_static("Base Attack", 1, [AttributeId::from_str("Base Attack Bonus")]).unwrap(),
///     ),
/// );
///
/// assert_eq!(fighter.hit_die(), Some(DieType::D10));
/// assert!(fighter.level_definition(1).is_some());
/// assert!(fighter.level_definition(2).is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub id: DefinitionId,
    pub name: String,
    pub kind: DefinitionKind,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub special_qualities: Vec<Arc<Definition>>,
    #[serde(default)]
    pub take_requirement: Option<Arc<Conditional>>,
    #[serde(default)]
    pub apply_requirement: Option<Arc<Conditional>>,
}

impl Definition {
    pub fn new(name: impl Into<String>, kind: DefinitionKind) -> Self {
        Self {
            id: DefinitionId::new(),
            name: name.into(),
            kind,
            modifiers: Vec::new(),
            special_qualities: Vec::new(),
            take_requirement: None,
            apply_requirement: None,
        }
    }

    pub fn race(name: impl Into<String>) -> Self {
        Self::new(name, DefinitionKind::Race)
    }

    /// A class with its hit die and an empty level table.
    pub fn class(name: impl Into<String>, hit_die: DieType) -> Self {
        Self::new(
            name,
            DefinitionKind::Class {
                hit_die,
                levels: Vec::new(),
            },
        )
    }

    pub fn feat(name: impl Into<String>) -> Self {
        Self::new(name, DefinitionKind::Feat)
    }

    pub fn special_quality(name: impl Into<String>) -> Self {
        Self::new(name, DefinitionKind::SpecialQuality)
    }

    /// A level-table entry, attached to a class with [`Definition::with_level`].
    pub fn level(level: u32) -> Self {
        Self::new(format!("Level {level}"), DefinitionKind::Level { level })
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_special_quality(mut self, quality: Definition) -> Self {
        self.special_qualities.push(Arc::new(quality));
        self
    }

    pub fn with_take_requirement(mut self, requirement: Conditional) -> Self {
        self.take_requirement = Some(Arc::new(requirement));
        self
    }

    pub fn with_apply_requirement(mut self, requirement: Conditional) -> Self {
        self.apply_requirement = Some(Arc::new(requirement));
        self
    }

    /// Use one conditional as both the take and the apply requirement.
    pub fn with_requirement(mut self, requirement: Conditional) -> Self {
        let shared = Arc::new(requirement);
        self.take_requirement = Some(shared.clone());
        self.apply_requirement = Some(shared);
        self
    }

    /// Attach a level table entry to a class. Ignored for other kinds.
    pub fn with_level(mut self, level: Definition) -> Self {
        match &mut self.kind {
            DefinitionKind::Class { levels, .. } => levels.push(level),
            _ => warn!(definition = %self.name, "level attached to a non-class definition"),
        }
        self
    }

    pub fn hit_die(&self) -> Option<DieType> {
        match self.kind {
            DefinitionKind::Class { hit_die, .. } => Some(hit_die),
            _ => None,
        }
    }

    /// The level-table entry for reaching `level` in this class.
    pub fn level_definition(&self, level: u32) -> Option<&Definition> {
        match &self.kind {
            DefinitionKind::Class { levels, .. } => levels
                .iter()
                .find(|d| matches!(d.kind, DefinitionKind::Level { level: l } if l == level)),
            _ => None,
        }
    }

    /// The gating snapshot stamped on this definition's modifiers.
    pub fn source_ref(&self) -> SourceRef {
        SourceRef {
            id: self.id,
            name: self.name.clone(),
            apply_requirement: self.apply_requirement.clone(),
        }
    }

    /// The modifiers this definition grants, each tagged with this definition as source.
    ///
    /// A class's level table is not included; see [`crate::sources::ClassLevel`].
    pub fn inherent_modifiers(&self) -> Vec<Modifier> {
        let source = self.source_ref();
        self.modifiers.iter().map(|m| m.with_source(source.clone())).collect()
    }
}
