//! # ruleforge - Character Attribute Rule Engine
//!
//! Computes the final value of every attribute of a tabletop RPG character
//! (ability scores, hit dice, derived statistics) from modifiers contributed
//! by many independent sources:
//! - **Stacking rules** per modifier type, with per-modifier overrides
//! - **Derived modifiers** that read another attribute's ability-modifier
//! - **Conditional gating** of definitions by attribute thresholds
//! - **Convergence** of special qualities whose requirements depend on each other
//!
//! ## Pipeline
//!
//! ```text
//! [Character] → [ModifierSource]s → [AttributeResolver] → [stacking] → [CalculatedAttribute]
//!                                          ↑                  │
//!                                          └── FromAttribute ─┘
//! ```
//!
//! 1. The **character** settles which special qualities apply and gathers
//!    its modifier sources (own modifiers, campaign, race, class levels, qualities)
//! 2. The **resolver** returns a cached attribute or calculates it
//! 3. **Stacking** computes each modifier, gates it, and keeps the best
//!    non-stacking modifier per type
//! 4. Marking any cached attribute for recalculation clears the whole cache
//!
//! ## Example
//!
//! ```rust
//! use ruleforge::*;
//! use std::sync::Arc;
//!
//! let strength = AttributeDefinition::new("Strength", "Ability", ModifierKind::AbilityScore);
//! let catalog = Catalog::new()
//!     .with_attribute(strength.clone())
//!     .with_modifier_type(ModifierType::new("Enhancement", StackingPolicy::NonStacking));
//!
//! let mut hero = Character::new("Hero", Arc::new(catalog));
//! hero.add_modifier(Modifier::new_static("Racial", 14, [strength.name.clone()]).unwrap());
//! hero.add_modifier(Modifier::new_static("Enhancement", 2, [strength.name.clone()]).unwrap());
//! hero.add_modifier(Modifier::new_static("Enhancement", 4, [strength.name.clone()]).unwrap());
//!
//! let resolved = hero.attribute(&strength).unwrap();
//! assert_eq!(resolved.value(), 18); // 14 + best enhancement (4)
//! assert_eq!(resolved.modifier(), 4);
//! ```
//!
//! ## Modules
//!
//! - [`attribute`] - Attribute definitions and built-in system attributes
//! - [`modifier_type`] - Modifier types and stacking policies
//! - [`modifier`] - Modifiers and the modifier builder
//! - [`conditional`] - Requirements over attribute values
//! - [`definition`] - Races, classes, feats, qualities and levels
//! - [`sources`] - Modifier sources attached to a character
//! - [`store`] - Lock-guarded attribute cache
//! - [`stacking`] - Modifier resolution and stacking
//! - [`resolver`] - Get-or-calculate orchestration and invalidation
//! - [`specials`] - Special qualities convergence loop
//! - [`character`] - Composition root
//! - [`data_source`] - Catalog interface and in-memory catalog
//! - [`graph`] - Discovered dependency graph
//! - [`error`] - Error types

pub mod attribute;
pub mod calculated;
pub mod character;
pub mod conditional;
pub mod config;
pub mod context;
pub mod data_source;
pub mod definition;
pub mod error;
pub mod graph;
pub mod ids;
pub mod modifier;
pub mod modifier_type;
pub mod resolver;
pub mod sources;
pub mod specials;
pub mod stacking;
pub mod store;

// Re-export main types for convenience
pub use attribute::{
    builtin_attributes, hit_die, total_class_level, total_hit_dice, AttributeDefinition, DieType,
    ModifierKind,
};
pub use calculated::{CalculatedAttribute, CalculatedModifier, CalculationState, ModifierState, StateChange};
pub use character::Character;
pub use conditional::{AttributeLookup, Conditional, LogicalOperator, Relation};
pub use config::EngineConfig;
pub use context::CalculationData;
pub use data_source::{Catalog, DataSource};
pub use definition::{Definition, DefinitionKind};
pub use error::RuleError;
pub use ids::{AttributeId, DefinitionId, ModifierId, ModifierTypeId};
pub use modifier::{Modifier, ModifierBuilder, ModifierValue, SourceRef};
pub use modifier_type::{
    class_level_type, racial_type, ModifierType, StackingOverride, StackingPolicy,
};
pub use resolver::AttributeResolver;
pub use sources::{ClassLevel, ModifierSource, SpecialQualityRecord};
pub use specials::{QualityHost, SpecialsManager};
pub use store::AttributeStore;
