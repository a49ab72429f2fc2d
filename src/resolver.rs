//! Attribute resolver module.
//!
//! Provides the `AttributeResolver` type, the get-or-calculate entry
//! point for a character's attributes. It owns the attribute store (the
//! cache), the discovered dependency graph and the state listeners.
//!
//! Invalidation is deliberately coarse: as soon as any cached attribute
//! moves to `Recalculate`, the whole store is cleared, because attributes
//! may depend on each other transitively.

use crate::attribute::AttributeDefinition;
use crate::calculated::{CalculatedAttribute, CalculationState, StateChange};
use crate::config::EngineConfig;
use crate::context::{CalculationData, Lookup};
use crate::data_source::DataSource;
use crate::error::RuleError;
use crate::graph::DependencyGraph;
use crate::ids::AttributeId;
use crate::sources::ModifierSource;
use crate::stacking;
use crate::store::AttributeStore;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Callback receiving every state change of a cached attribute.
pub type StateListener = Arc<dyn Fn(&AttributeId, StateChange) + Send + Sync>;

/// Resolves and caches one character's attributes.
///
/// The store lock is taken once per store operation, not for a whole
/// get-or-calculate sequence. Two threads resolving the same attribute
/// may both calculate it; the second registration is tolerated and both
/// results are written into the same record.
///
/// # Blocking
///
/// Resolution is synchronous and takes the store lock with
/// `blocking_lock`, so `get_or_calculate`, `calculate_all`, `cached`,
/// `mark_for_recalculation` and `invalidate_all` panic when called on an
/// async runtime thread. From async code, run them inside
/// `tokio::task::spawn_blocking`, and use [`AttributeResolver::cached_async`]
/// and [`AttributeResolver::invalidate_all_async`] for reads and resets
/// that must not block.
///
/// # Examples
///
/// ```rust
/// use ruleforge::*;
/// use std::sync::Arc;
///
/// let strength = AttributeDefinition::new("Strength", "Ability", ModifierKind::AbilityScore);
/// let catalog = Catalog::new().with_attribute(strength.clone());
/// let resolver = AttributeResolver::new(Arc::new(catalog));
///
/// let sources = vec![ModifierSource::Inherent {
///     label: "Base".to_string(),
///     modifiers: vec![Modifier::new_static("Racial", 15, [strength.name.clone()]).unwrap()],
/// }];
///
/// let resolved = resolver.get_or_calculate(&strength, &sources).unwrap();
/// assert_eq!(resolved.value(), 15);
/// assert_eq!(resolved.modifier(), 2);
/// ```
pub struct AttributeResolver {
    data_source: Arc<dyn DataSource>,
    config: EngineConfig,
    store: AttributeStore,
    graph: Mutex<DependencyGraph>,
    listeners: Vec<StateListener>,
}

impl AttributeResolver {
    pub fn new(data_source: Arc<dyn DataSource>) -> Self {
        Self::with_config(data_source, EngineConfig::default())
    }

    /// Create a resolver with custom settings.
    ///
    /// # Arguments
    ///
    /// * `data_source` - Supplies attribute definitions, modifier types and campaign modifiers
    /// * `config` - Cycle detection and dependency tracking switches
    pub fn with_config(data_source: Arc<dyn DataSource>, config: EngineConfig) -> Self {
        Self {
            data_source,
            config,
            store: AttributeStore::new(),
            graph: Mutex::new(DependencyGraph::new()),
            listeners: Vec::new(),
        }
    }

    pub fn data_source(&self) -> &dyn DataSource {
        self.data_source.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    /// Register a callback for attribute state changes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ruleforge::*;
    /// use std::sync::{Arc, Mutex};
    ///
    /// let seen = Arc::new(Mutex::new(Vec::new()));
    /// let sink = seen.clone();
    ///
    /// let mut resolver = AttributeResolver::new(Arc::new(Catalog::new()));
    /// resolver.add_state_listener(move |_, change| sink.lock().unwrap().push(change.new));
    ///
    /// resolver.get_or_calculate(total_class_level(), &[]).unwrap();
    /// assert_eq!(
    ///     *seen.lock().unwrap(),
    ///     vec![CalculationState::Calculating, CalculationState::Calculated]
    /// );
    /// ```
    pub fn add_state_listener(&mut self, listener: impl Fn(&AttributeId, StateChange) + Send + Sync + 'static) {
        self.listeners.push(Arc::new(listener));
    }

    /// Return the cached attribute, calculating it first if needed.
    pub fn get_or_calculate(
        &self,
        attribute: &AttributeDefinition,
        sources: &[ModifierSource],
    ) -> Result<CalculatedAttribute, RuleError> {
        let mut data = CalculationData::new(self, sources);
        data.resolve(attribute)
    }

    /// Calculate every attribute the data source knows, in its order.
    pub fn calculate_all(&self, sources: &[ModifierSource]) -> Result<(), RuleError> {
        for attribute in self.data_source.attribute_definitions() {
            self.get_or_calculate(&attribute, sources)?;
        }
        Ok(())
    }

    /// The cached record for `id`, without calculating anything.
    pub fn cached(&self, id: &AttributeId) -> Option<CalculatedAttribute> {
        self.store.get(id)
    }

    /// The cached record for `id`, waiting for the store lock instead of blocking.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ruleforge::*;
    /// use std::sync::Arc;
    ///
    /// let resolver = AttributeResolver::new(Arc::new(Catalog::new()));
    /// resolver.get_or_calculate(total_class_level(), &[]).unwrap();
    ///
    /// let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    /// let cached = runtime.block_on(resolver.cached_async(&total_class_level().name));
    /// assert_eq!(cached.unwrap().value(), 0);
    /// ```
    pub async fn cached_async(&self, id: &AttributeId) -> Option<CalculatedAttribute> {
        self.store.get_async(id).await
    }

    /// Flag a cached attribute as stale. This invalidates every cached attribute.
    ///
    /// Returns `false` if the attribute was not cached.
    pub fn mark_for_recalculation(&self, id: &AttributeId) -> bool {
        match self.store.update(id, |record| record.needs_recalculating()) {
            Some(change) => {
                self.on_state_change(id, change);
                true
            }
            None => false,
        }
    }

    /// Drop every cached attribute and the dependency graph.
    pub fn invalidate_all(&self) {
        debug!("invalidating all attributes");
        self.store.clear();
        self.graph().clear();
    }

    /// Drop every cached attribute and the dependency graph, waiting for the
    /// store lock instead of blocking.
    pub async fn invalidate_all_async(&self) {
        debug!("invalidating all attributes");
        self.store.clear_async().await;
        self.graph().clear();
    }

    /// Attributes `id` read directly the last time it was calculated.
    pub fn dependencies_of(&self, id: &AttributeId) -> Vec<AttributeId> {
        self.graph().dependencies_of(id)
    }

    /// Attributes that transitively read `id`.
    pub fn dependents_of(&self, id: &AttributeId) -> Vec<AttributeId> {
        self.graph().dependents_of(id)
    }

    /// Attributes `id` read, directly or through other attributes.
    pub fn transitive_dependencies_of(&self, id: &AttributeId) -> Vec<AttributeId> {
        self.graph().transitive_dependencies_of(id)
    }

    /// The discovered attributes in an order where every attribute comes
    /// after the attributes it read.
    ///
    /// # Returns
    ///
    /// * `Ok(order)` - Dependencies first
    /// * `Err(RuleError::Cycle)` - If the discovered edges contain a cycle
    pub fn resolution_order(&self) -> Result<Vec<AttributeId>, RuleError> {
        self.graph().resolution_order()
    }

    /// A cycle among the discovered dependencies, as a closed path.
    pub fn find_cycle(&self) -> Option<Vec<AttributeId>> {
        self.graph().find_cycle()
    }

    /// A snapshot of the discovered dependency graph.
    pub fn dependency_graph(&self) -> DependencyGraph {
        self.graph().clone()
    }

    fn graph(&self) -> MutexGuard<'_, DependencyGraph> {
        self.graph.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get-or-calculate within an in-flight calculation.
    ///
    /// A record already in `Calculating` is returned as it stands; only a
    /// derived-value re-entry is treated as a cycle.
    pub(crate) fn resolve_in(
        &self,
        attribute: &AttributeDefinition,
        data: &mut CalculationData<'_>,
        lookup: Lookup,
    ) -> Result<CalculatedAttribute, RuleError> {
        let id = attribute.name.clone();
        let reentry = data.is_resolving(&id);

        if self.config.track_dependencies && !(reentry && lookup == Lookup::Condition) {
            if let Some(parent) = data.current() {
                self.graph().add_dependency(parent.clone(), id.clone());
            }
        }
        if reentry && lookup == Lookup::Derived && self.config.cycle_detection {
            return Err(RuleError::Cycle {
                path: data.cycle_path(&id),
            });
        }

        let record = self.register(attribute)?;
        if !record.state().needs_calculation() {
            return Ok(record);
        }

        self.transition(&id, CalculationState::Calculating);
        data.enter(id.clone());
        let result = stacking::calculate(attribute, data);
        data.leave();

        let (value, modifiers) = match result {
            Ok(calculated) => calculated,
            Err(err) => {
                self.transition(&id, CalculationState::Unknown);
                return Err(err);
            }
        };
        debug!(attribute = %id, value, modifiers = modifiers.len(), "calculated attribute");

        let stored = self.store.update(&id, |record| {
            let change = record.update(value, modifiers.clone());
            (change, record.clone())
        });
        match stored {
            Some((change, record)) => {
                self.notify(&id, change);
                Ok(record)
            }
            None => {
                // Cleared while calculating; keep the fresh result.
                let mut record = CalculatedAttribute::new(attribute.clone());
                let change = record.update(value, modifiers);
                if self.store.set(record.clone()).is_err() {
                    warn!(attribute = %id, "attribute re-registered while calculating");
                }
                self.notify(&id, change);
                Ok(record)
            }
        }
    }

    /// Fetch the record for `attribute`, registering a fresh one if absent.
    fn register(&self, attribute: &AttributeDefinition) -> Result<CalculatedAttribute, RuleError> {
        if let Some(record) = self.store.get(&attribute.name) {
            return Ok(record);
        }
        let fresh = CalculatedAttribute::new(attribute.clone());
        match self.store.set(fresh.clone()) {
            Ok(()) => Ok(fresh),
            Err(RuleError::AttributeState(id)) => {
                warn!(attribute = %id, "attribute registered concurrently");
                Ok(self.store.get(&id).unwrap_or(fresh))
            }
            Err(err) => Err(err),
        }
    }

    fn transition(&self, id: &AttributeId, state: CalculationState) {
        if let Some(change) = self.store.update(id, |record| record.set_state(state)) {
            self.on_state_change(id, change);
        }
    }

    fn on_state_change(&self, id: &AttributeId, change: Option<StateChange>) {
        self.notify(id, change);
        if let Some(StateChange {
            new: CalculationState::Recalculate,
            ..
        }) = change
        {
            self.invalidate_all();
        }
    }

    fn notify(&self, id: &AttributeId, change: Option<StateChange>) {
        if let Some(change) = change {
            for listener in &self.listeners {
                listener(id, change);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{total_class_level, ModifierKind};
    use crate::calculated::ModifierState;
    use crate::conditional::{Conditional, Relation};
    use crate::data_source::Catalog;
    use crate::definition::Definition;
    use crate::modifier::Modifier;
    use crate::sources::SpecialQualityRecord;

    fn ability(name: &str) -> AttributeDefinition {
        AttributeDefinition::new(name, "Ability", ModifierKind::AbilityScore)
    }

    fn base(modifiers: Vec<Modifier>) -> Vec<ModifierSource> {
        vec![ModifierSource::Inherent {
            label: "Base".to_string(),
            modifiers,
        }]
    }

    fn resolver() -> AttributeResolver {
        AttributeResolver::new(Arc::new(Catalog::new()))
    }

    #[test]
    fn test_resolve_static_sum() {
        let resolver = resolver();
        let sources = base(vec![
            Modifier::new_static("Racial", 10, [AttributeId::from_str("Strength")]).unwrap(),
            Modifier::new_static("Racial", 2, [AttributeId::from_str("Strength")]).unwrap(),
        ]);
        let resolved = resolver.get_or_calculate(&ability("Strength"), &sources).unwrap();
        assert_eq!(resolved.value(), 12);
        assert_eq!(resolved.state(), CalculationState::Calculated);
        assert_eq!(resolved.modifiers().len(), 2);
    }

    #[test]
    fn test_resolve_without_modifiers_is_zero() {
        let resolver = resolver();
        let resolved = resolver.get_or_calculate(total_class_level(), &[]).unwrap();
        assert_eq!(resolved.value(), 0);
    }

    #[test]
    fn test_cached_result_is_reused() {
        let resolver = resolver();
        let strength = ability("Strength");
        let first = base(vec![Modifier::new_static("Racial", 10, [strength.name.clone()]).unwrap()]);
        let second = base(vec![Modifier::new_static("Racial", 18, [strength.name.clone()]).unwrap()]);

        assert_eq!(resolver.get_or_calculate(&strength, &first).unwrap().value(), 10);
        // Different sources, same cache: nothing invalidated it yet.
        assert_eq!(resolver.get_or_calculate(&strength, &second).unwrap().value(), 10);

        resolver.invalidate_all();
        assert_eq!(resolver.get_or_calculate(&strength, &second).unwrap().value(), 18);
    }

    #[test]
    fn test_from_attribute_records_dependency() {
        let resolver = resolver();
        let dex = ability("Dexterity");
        let ac = AttributeDefinition::new("Armor Class", "Defense", ModifierKind::Direct);
        let sources = base(vec![
            Modifier::new_static("Racial", 10, [ac.name.clone()]).unwrap(),
            Modifier::new_static("Racial", 16, [dex.name.clone()]).unwrap(),
            Modifier::new_from_attribute("Racial", dex.clone(), [ac.name.clone()]).unwrap(),
        ]);

        assert_eq!(resolver.get_or_calculate(&ac, &sources).unwrap().value(), 13);
        assert_eq!(resolver.dependencies_of(&ac.name), vec![dex.name.clone()]);
        assert_eq!(resolver.dependents_of(&dex.name), vec![ac.name.clone()]);
        assert!(resolver.cached(&dex.name).is_some());
    }

    #[test]
    fn test_cycle_is_reported() {
        let resolver = resolver();
        let a = AttributeDefinition::new("A", "", ModifierKind::Direct);
        let b = AttributeDefinition::new("B", "", ModifierKind::Direct);
        let sources = base(vec![
            Modifier::new_from_attribute("Racial", b.clone(), [a.name.clone()]).unwrap(),
            Modifier::new_from_attribute("Racial", a.clone(), [b.name.clone()]).unwrap(),
        ]);

        let err = resolver.get_or_calculate(&a, &sources).unwrap_err();
        assert_eq!(
            err,
            RuleError::Cycle {
                path: vec![a.name.clone(), b.name.clone(), a.name.clone()]
            }
        );
        // A failed calculation leaves nothing half-done behind.
        assert_eq!(resolver.cached(&a.name).unwrap().state(), CalculationState::Unknown);
    }

    #[test]
    fn test_unknown_modifier_type_propagates() {
        let resolver = resolver();
        let sources = base(vec![Modifier::new_static("Luck", 1, [AttributeId::from_str("Strength")]).unwrap()]);
        let err = resolver.get_or_calculate(&ability("Strength"), &sources).unwrap_err();
        assert!(matches!(err, RuleError::UnknownModifierType(_)));
    }

    #[test]
    fn test_mark_for_recalculation_clears_everything() {
        let resolver = resolver();
        let sources = base(vec![
            Modifier::new_static("Racial", 10, [AttributeId::from_str("Strength")]).unwrap(),
            Modifier::new_static("Racial", 12, [AttributeId::from_str("Dexterity")]).unwrap(),
        ]);
        resolver.get_or_calculate(&ability("Strength"), &sources).unwrap();
        resolver.get_or_calculate(&ability("Dexterity"), &sources).unwrap();
        assert_eq!(resolver.store().len(), 2);

        assert!(resolver.mark_for_recalculation(&AttributeId::from_str("Strength")));
        assert!(resolver.store().is_empty());
        assert!(resolver.dependency_graph().is_empty());
        assert!(!resolver.mark_for_recalculation(&AttributeId::from_str("Strength")));
    }

    #[test]
    fn test_calculate_all_uses_data_source() {
        let strength = ability("Strength");
        let catalog = Catalog::new().with_attribute(strength.clone());
        let resolver = AttributeResolver::new(Arc::new(catalog));
        resolver.calculate_all(&[]).unwrap();
        assert_eq!(resolver.store().len(), 8);
        assert!(resolver.cached(&strength.name).is_some());
    }

    #[test]
    fn test_cycle_detection_disabled_sees_in_progress_record() {
        let config = EngineConfig {
            cycle_detection: false,
            ..EngineConfig::default()
        };
        let resolver = AttributeResolver::with_config(Arc::new(Catalog::new()), config);
        let a = AttributeDefinition::new("A", "", ModifierKind::Direct);
        let sources = base(vec![
            Modifier::new_static("Racial", 3, [a.name.clone()]).unwrap(),
            Modifier::new_from_attribute("Racial", a.clone(), [a.name.clone()]).unwrap(),
        ]);
        assert_eq!(resolver.get_or_calculate(&a, &sources).unwrap().value(), 3);
    }

    #[test]
    fn test_self_gated_modifier_sees_in_progress_record() {
        let resolver = resolver();
        let strength = ability("Strength");
        let feat = Definition::feat("Mighty")
            .with_apply_requirement(Conditional::compare(strength.clone(), Relation::GreaterThanOrEqual, 1))
            .with_modifier(Modifier::new_static("Racial", 2, [strength.name.clone()]).unwrap());
        let mut sources = base(vec![Modifier::new_static("Racial", 12, [strength.name.clone()]).unwrap()]);
        sources.push(ModifierSource::Quality(SpecialQualityRecord {
            definition: Arc::new(feat),
            applied: true,
        }));

        // The gate reads Strength while it is still Calculating (value 0).
        let resolved = resolver.get_or_calculate(&strength, &sources).unwrap();
        assert_eq!(resolved.value(), 12);
        assert_eq!(resolved.modifiers()[1].state, ModifierState::NotMet);
        assert!(resolver.find_cycle().is_none());
    }

    #[test]
    fn test_dependency_queries() {
        let resolver = resolver();
        let strength = ability("Strength");
        let dex = ability("Dexterity");
        let ac = AttributeDefinition::new("Armor Class", "Defense", ModifierKind::Direct);
        let sources = base(vec![
            Modifier::new_static("Racial", 14, [strength.name.clone()]).unwrap(),
            Modifier::new_from_attribute("Racial", strength.clone(), [dex.name.clone()]).unwrap(),
            Modifier::new_from_attribute("Racial", dex.clone(), [ac.name.clone()]).unwrap(),
        ]);
        resolver.get_or_calculate(&ac, &sources).unwrap();

        assert_eq!(
            resolver.transitive_dependencies_of(&ac.name),
            vec![dex.name.clone(), strength.name.clone()]
        );
        assert_eq!(
            resolver.resolution_order().unwrap(),
            vec![strength.name.clone(), dex.name.clone(), ac.name.clone()]
        );
        assert!(resolver.find_cycle().is_none());
    }

    #[tokio::test]
    async fn test_async_reads_do_not_block() {
        let resolver = Arc::new(resolver());
        let worker = resolver.clone();
        tokio::task::spawn_blocking(move || worker.get_or_calculate(total_class_level(), &[]).map(|r| r.value()))
            .await
            .unwrap()
            .unwrap();

        let id = &total_class_level().name;
        assert_eq!(resolver.cached_async(id).await.unwrap().value(), 0);
        resolver.invalidate_all_async().await;
        assert!(resolver.cached_async(id).await.is_none());
    }
}
