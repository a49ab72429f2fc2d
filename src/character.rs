//! The character: composition root for attribute queries.
//!
//! A character gathers every modifier source it has (its own modifiers,
//! campaign modifiers, race, class levels and special qualities), settles
//! which gated qualities apply, and only then asks the resolver for an
//! attribute. Composition changes invalidate the whole cache.

use crate::attribute::AttributeDefinition;
use crate::calculated::CalculatedAttribute;
use crate::conditional::{AttributeLookup, Conditional};
use crate::config::EngineConfig;
use crate::context::CalculationData;
use crate::data_source::DataSource;
use crate::definition::Definition;
use crate::error::RuleError;
use crate::ids::DefinitionId;
use crate::modifier::Modifier;
use crate::resolver::AttributeResolver;
use crate::sources::{ClassLevel, ModifierSource, SpecialQualityRecord};
use crate::specials::{QualityHost, SpecialsManager};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A player or non-player character.
///
/// Queries run synchronously on the resolver's blocking store forms; see
/// [`AttributeResolver`] for calling them from async code.
///
/// # Examples
///
/// ```rust
/// use ruleforge::*;
/// use std::sync::Arc;
///
/// let fighter = Arc::new(Definition::class("Fighter", DieType::D10));
/// let mut hero = Character::new("Hero", Arc::new(Catalog::new()));
///
/// hero.add_level(fighter.clone());
/// hero.add_level(fighter);
///
/// assert_eq!(hero.value(total_class_level()).unwrap(), 2);
/// assert_eq!(hero.value(hit_die(DieType::D10)).unwrap(), 2);
///
/// hero.remove_level();
/// assert_eq!(hero.value(total_hit_dice()).unwrap(), 1);
/// ```
pub struct Character {
    pub name: String,
    race: Option<Arc<Definition>>,
    levels: Vec<Arc<Definition>>,
    feats: Vec<Arc<Definition>>,
    modifiers: Vec<Modifier>,
    qualities: Vec<SpecialQualityRecord>,
    resolver: AttributeResolver,
    specials: SpecialsManager,
}

impl Character {
    pub fn new(name: impl Into<String>, data_source: Arc<dyn DataSource>) -> Self {
        Self::with_config(name, data_source, EngineConfig::default())
    }

    /// Create a character with custom resolver and convergence settings.
    pub fn with_config(name: impl Into<String>, data_source: Arc<dyn DataSource>, config: EngineConfig) -> Self {
        let specials = SpecialsManager::new(config.max_convergence_passes);
        Self {
            name: name.into(),
            race: None,
            levels: Vec::new(),
            feats: Vec::new(),
            modifiers: Vec::new(),
            qualities: Vec::new(),
            resolver: AttributeResolver::with_config(data_source, config),
            specials,
        }
    }

    /// The resolver holding this character's cached attributes.
    pub fn resolver(&self) -> &AttributeResolver {
        &self.resolver
    }

    /// Mutable access, e.g. to register state listeners.
    pub fn resolver_mut(&mut self) -> &mut AttributeResolver {
        &mut self.resolver
    }

    pub fn race(&self) -> Option<&Arc<Definition>> {
        self.race.as_ref()
    }

    /// Replace the race, or clear it with `None`. Invalidates every cached attribute.
    pub fn set_race(&mut self, race: Option<Arc<Definition>>) {
        self.race = race;
        self.composition_changed();
    }

    /// Classes in the order levels were taken.
    pub fn levels(&self) -> &[Arc<Definition>] {
        &self.levels
    }

    /// Take one more level in `class`. Invalidates every cached attribute.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ruleforge::*;
    /// use std::sync::Arc;
    ///
    /// let rogue = Arc::new(Definition::class("Rogue", DieType::D6));
    /// let mut hero = Character::new("Hero", Arc::new(Catalog::new()));
    /// hero.add_level(rogue);
    /// assert_eq!(hero.value(hit_die(DieType::D6)).unwrap(), 1);
    /// ```
    pub fn add_level(&mut self, class: Arc<Definition>) {
        self.levels.push(class);
        self.composition_changed();
    }

    /// Remove the most recently added level.
    pub fn remove_level(&mut self) -> Option<Arc<Definition>> {
        let removed = self.levels.pop();
        if removed.is_some() {
            self.composition_changed();
        }
        removed
    }

    pub fn feats(&self) -> &[Arc<Definition>] {
        &self.feats
    }

    /// Select a feat. It is settled with the other special qualities.
    pub fn add_feat(&mut self, feat: Arc<Definition>) {
        self.feats.push(feat);
        self.composition_changed();
    }

    /// Drop a selected feat by id. Returns `false` if it was not selected.
    pub fn remove_feat(&mut self, id: &DefinitionId) -> bool {
        let before = self.feats.len();
        self.feats.retain(|f| &f.id != id);
        let removed = self.feats.len() != before;
        if removed {
            self.composition_changed();
        }
        removed
    }

    /// Add one of the character's own modifiers, such as a rolled ability score.
    pub fn add_modifier(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
        self.composition_changed();
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// Quality records as of the last query.
    pub fn qualities(&self) -> &[SpecialQualityRecord] {
        &self.qualities
    }

    /// Each level taken, numbered within its class.
    pub fn class_levels(&self) -> Result<Vec<ClassLevel>, RuleError> {
        let mut reached: HashMap<DefinitionId, u32> = HashMap::new();
        self.levels
            .iter()
            .map(|class| {
                let level = reached.entry(class.id).or_insert(0);
                *level += 1;
                ClassLevel::new(class.clone(), *level)
            })
            .collect()
    }

    /// Settle the special qualities and return the full modifier source list.
    pub fn prepare(&mut self) -> Result<Vec<ModifierSource>, RuleError> {
        let levels = self.class_levels()?;
        let previous: HashMap<DefinitionId, bool> = self
            .qualities
            .iter()
            .map(|r| (r.definition.id, r.applied))
            .collect();

        let mut records: Vec<SpecialQualityRecord> = self
            .reachable_qualities(&levels)
            .into_iter()
            .map(|definition| {
                let mut record = SpecialQualityRecord::new(definition);
                if record.definition.apply_requirement.is_some() {
                    if let Some(&applied) = previous.get(&record.definition.id) {
                        record.applied = applied;
                    }
                }
                record
            })
            .collect();

        let host = Host {
            character: &*self,
            levels: &levels,
        };
        let passes = self.specials.reexamine_qualities(&mut records, &host)?;
        debug!(character = %self.name, passes, qualities = records.len(), "prepared character");

        let sources = self.assemble(&levels, &records);
        self.qualities = records;
        Ok(sources)
    }

    /// Get or calculate one attribute.
    pub fn attribute(&mut self, attribute: &AttributeDefinition) -> Result<CalculatedAttribute, RuleError> {
        let sources = self.prepare()?;
        self.resolver.get_or_calculate(attribute, &sources)
    }

    /// Shorthand for `attribute(..)?.value()`.
    pub fn value(&mut self, attribute: &AttributeDefinition) -> Result<i32, RuleError> {
        Ok(self.attribute(attribute)?.value())
    }

    /// Calculate every attribute the data source knows.
    pub fn calculate_all(&mut self) -> Result<(), RuleError> {
        let sources = self.prepare()?;
        self.resolver.calculate_all(&sources)
    }

    /// Whether the character meets `definition`'s requirement to take it.
    pub fn can_take(&mut self, definition: &Definition) -> Result<bool, RuleError> {
        match definition.take_requirement.clone() {
            Some(requirement) => requirement.evaluate(self),
            None => Ok(true),
        }
    }

    fn composition_changed(&mut self) {
        self.resolver.invalidate_all();
    }

    /// Qualities reachable from race, class levels and feats, nested ones included.
    fn reachable_qualities(&self, levels: &[ClassLevel]) -> Vec<Arc<Definition>> {
        let mut pending: Vec<Arc<Definition>> = Vec::new();
        if let Some(race) = &self.race {
            pending.extend(race.special_qualities.iter().cloned());
        }
        for level in levels {
            pending.extend(level.special_qualities());
        }
        pending.extend(self.feats.iter().cloned());

        let mut seen = HashSet::new();
        let mut reachable = Vec::new();
        let mut idx = 0;
        while idx < pending.len() {
            let quality = pending[idx].clone();
            idx += 1;
            if seen.insert(quality.id) {
                pending.extend(quality.special_qualities.iter().cloned());
                reachable.push(quality);
            }
        }
        reachable
    }

    fn assemble(&self, levels: &[ClassLevel], qualities: &[SpecialQualityRecord]) -> Vec<ModifierSource> {
        let mut sources = vec![ModifierSource::Inherent {
            label: self.name.clone(),
            modifiers: self.modifiers.clone(),
        }];
        let campaign = self.resolver.data_source().campaign_modifiers();
        if !campaign.is_empty() {
            sources.push(ModifierSource::Inherent {
                label: "Campaign".to_string(),
                modifiers: campaign,
            });
        }
        if let Some(race) = &self.race {
            sources.push(ModifierSource::Race(race.clone()));
        }
        sources.extend(levels.iter().cloned().map(ModifierSource::ClassLevel));
        sources.extend(qualities.iter().cloned().map(ModifierSource::Quality));
        sources
    }
}

impl AttributeLookup for Character {
    fn ability_modifier(&mut self, attribute: &AttributeDefinition) -> Result<i32, RuleError> {
        Ok(self.attribute(attribute)?.modifier())
    }
}

struct Host<'a> {
    character: &'a Character,
    levels: &'a [ClassLevel],
}

impl QualityHost for Host<'_> {
    fn requirement_met(&self, requirement: &Conditional, qualities: &[SpecialQualityRecord]) -> Result<bool, RuleError> {
        let sources = self.character.assemble(self.levels, qualities);
        let mut data = CalculationData::new(&self.character.resolver, &sources);
        requirement.evaluate(&mut data)
    }

    fn qualities_changed(&self) {
        self.character.resolver.invalidate_all();
    }
}
