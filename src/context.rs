//! In-flight calculation data.
//!
//! A `CalculationData` bundles what a resolution pass needs while it is
//! still running: the resolver, the character's modifier sources and the
//! chain of attributes currently being resolved. Conditionals evaluated
//! mid-calculation resolve attributes through it instead of going back
//! through the character's top-level entry point.

use crate::attribute::AttributeDefinition;
use crate::calculated::CalculatedAttribute;
use crate::conditional::AttributeLookup;
use crate::error::RuleError;
use crate::ids::AttributeId;
use crate::resolver::AttributeResolver;
use crate::sources::ModifierSource;

/// Why an attribute is being looked up mid-calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    /// A derived modifier needs the attribute's value. Re-entry is a cycle.
    Derived,
    /// A conditional reads the attribute. Re-entry sees the in-progress record.
    Condition,
}

pub struct CalculationData<'a> {
    resolver: &'a AttributeResolver,
    sources: &'a [ModifierSource],
    resolving: Vec<AttributeId>,
}

impl<'a> CalculationData<'a> {
    pub fn new(resolver: &'a AttributeResolver, sources: &'a [ModifierSource]) -> Self {
        Self {
            resolver,
            sources,
            resolving: Vec::new(),
        }
    }

    pub fn resolver(&self) -> &'a AttributeResolver {
        self.resolver
    }

    pub fn sources(&self) -> &'a [ModifierSource] {
        self.sources
    }

    /// Get or calculate an attribute within this pass.
    ///
    /// Re-entering an attribute that is still being calculated is reported
    /// as a cycle when cycle detection is on.
    pub fn resolve(&mut self, attribute: &AttributeDefinition) -> Result<CalculatedAttribute, RuleError> {
        let resolver = self.resolver;
        resolver.resolve_in(attribute, self, Lookup::Derived)
    }

    /// Get or calculate an attribute for a conditional.
    ///
    /// An attribute that is still being calculated is returned as it
    /// stands, in state `Calculating`, instead of being entered again.
    pub fn resolve_for_condition(&mut self, attribute: &AttributeDefinition) -> Result<CalculatedAttribute, RuleError> {
        let resolver = self.resolver;
        resolver.resolve_in(attribute, self, Lookup::Condition)
    }

    /// The attribute whose calculation is running right now.
    pub fn current(&self) -> Option<&AttributeId> {
        self.resolving.last()
    }

    pub fn is_resolving(&self, id: &AttributeId) -> bool {
        self.resolving.contains(id)
    }

    /// The resolution chain closed by `id`, for cycle reports.
    pub(crate) fn cycle_path(&self, id: &AttributeId) -> Vec<AttributeId> {
        let start = self.resolving.iter().position(|r| r == id).unwrap_or(0);
        let mut path = self.resolving[start..].to_vec();
        path.push(id.clone());
        path
    }

    pub(crate) fn enter(&mut self, id: AttributeId) {
        self.resolving.push(id);
    }

    pub(crate) fn leave(&mut self) {
        self.resolving.pop();
    }
}

impl AttributeLookup for CalculationData<'_> {
    fn ability_modifier(&mut self, attribute: &AttributeDefinition) -> Result<i32, RuleError> {
        Ok(self.resolve_for_condition(attribute)?.modifier())
    }
}
