//! Data source interface and the in-memory catalog.
//!
//! The engine reads attribute definitions, modifier types and
//! campaign-wide modifiers from a [`DataSource`]. [`Catalog`] is the
//! in-memory implementation; it can be decoded from JSON and always holds
//! the built-in system attributes and modifier types exactly once.

use crate::attribute::{builtin_attributes, AttributeDefinition};
use crate::error::RuleError;
use crate::ids::ModifierTypeId;
use crate::modifier::Modifier;
use crate::modifier_type::{builtin_modifier_types, ModifierType};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Supplier of the rule catalog.
pub trait DataSource: Send + Sync {
    /// Every attribute the engine should calculate, in calculation order.
    fn attribute_definitions(&self) -> Vec<AttributeDefinition>;

    /// Look up a modifier type by name.
    ///
    /// # Returns
    ///
    /// * `Ok(ModifierType)` - The type's stacking policy
    /// * `Err(RuleError::UnknownModifierType)` - If the name is not in the catalog
    fn modifier_type(&self, id: &ModifierTypeId) -> Result<ModifierType, RuleError>;

    /// Every modifier type, built-ins included.
    fn modifier_types(&self) -> Vec<ModifierType>;

    /// Modifiers that apply to every character in the campaign.
    fn campaign_modifiers(&self) -> Vec<Modifier>;
}

/// An in-memory [`DataSource`].
///
/// # Examples
///
/// ```rust
/// use ruleforge::{Catalog, DataSource, ModifierTypeId};
///
/// let catalog = Catalog::from_json(r#"{
///     "attributes": [
///         {"name": "Strength", "category": "Ability", "kind": "AbilityScore"}
///     ],
///     "modifier_types": [
///         {"name": "Enhancement", "stacking": "NonStacking"}
///     ]
/// }"#).unwrap();
///
/// assert!(catalog.modifier_type(&ModifierTypeId::from_str("Enhancement")).is_ok());
/// assert!(catalog.modifier_type(&ModifierTypeId::from_str("Racial")).is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    attributes: Vec<AttributeDefinition>,
    #[serde(default)]
    modifier_types: Vec<ModifierType>,
    #[serde(default)]
    campaign_modifiers: Vec<Modifier>,
}

impl Catalog {
    /// A catalog holding only the built-ins.
    pub fn new() -> Self {
        Self {
            attributes: builtin_attributes().into_iter().cloned().collect(),
            modifier_types: builtin_modifier_types().into_iter().cloned().collect(),
            campaign_modifiers: Vec::new(),
        }
    }

    /// Decode a catalog document and merge it over the built-ins.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let raw: Catalog = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for attribute in raw.attributes {
            catalog.add_attribute(attribute);
        }
        for modifier_type in raw.modifier_types {
            catalog.add_modifier_type(modifier_type);
        }
        catalog.campaign_modifiers.extend(raw.campaign_modifiers);
        Ok(catalog)
    }

    /// Encode the catalog, built-ins included, as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, RuleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Add an attribute. A name already present is kept and the new one dropped.
    ///
    /// Returns `true` if the attribute was added.
    pub fn add_attribute(&mut self, attribute: AttributeDefinition) -> bool {
        if self.attributes.contains(&attribute) {
            warn!(attribute = %attribute.name, "duplicate attribute definition ignored");
            return false;
        }
        self.attributes.push(attribute);
        true
    }

    /// Add a modifier type. A name already present is kept and the new one dropped.
    ///
    /// Returns `true` if the type was added.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ruleforge::{Catalog, ModifierType, StackingPolicy};
    ///
    /// let mut catalog = Catalog::new();
    /// assert!(catalog.add_modifier_type(ModifierType::new("Luck", StackingPolicy::NonStacking)));
    /// // "Racial" is built in.
    /// assert!(!catalog.add_modifier_type(ModifierType::new("Racial", StackingPolicy::NonStacking)));
    /// ```
    pub fn add_modifier_type(&mut self, modifier_type: ModifierType) -> bool {
        if self.modifier_types.contains(&modifier_type) {
            warn!(modifier_type = %modifier_type.name, "duplicate modifier type ignored");
            return false;
        }
        self.modifier_types.push(modifier_type);
        true
    }

    /// Add a modifier every character built from this catalog receives.
    pub fn add_campaign_modifier(&mut self, modifier: Modifier) {
        self.campaign_modifiers.push(modifier);
    }

    /// Builder form of [`Catalog::add_attribute`].
    pub fn with_attribute(mut self, attribute: AttributeDefinition) -> Self {
        self.add_attribute(attribute);
        self
    }

    /// Builder form of [`Catalog::add_modifier_type`].
    pub fn with_modifier_type(mut self, modifier_type: ModifierType) -> Self {
        self.add_modifier_type(modifier_type);
        self
    }

    /// Builder form of [`Catalog::add_campaign_modifier`].
    pub fn with_campaign_modifier(mut self, modifier: Modifier) -> Self {
        self.add_campaign_modifier(modifier);
        self
    }

    /// Remove a non-system attribute. Built-ins are kept.
    pub fn remove_attribute(&mut self, attribute: &AttributeDefinition) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| a.system || a != attribute);
        self.attributes.len() != before
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for Catalog {
    fn attribute_definitions(&self) -> Vec<AttributeDefinition> {
        self.attributes.clone()
    }

    fn modifier_type(&self, id: &ModifierTypeId) -> Result<ModifierType, RuleError> {
        self.modifier_types
            .iter()
            .find(|t| &t.name == id)
            .cloned()
            .ok_or_else(|| RuleError::UnknownModifierType(id.clone()))
    }

    fn modifier_types(&self) -> Vec<ModifierType> {
        self.modifier_types.clone()
    }

    fn campaign_modifiers(&self) -> Vec<Modifier> {
        self.campaign_modifiers.clone()
    }
}
