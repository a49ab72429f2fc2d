//! Identifier types.
//!
//! Attributes and modifier types are identified by their display name,
//! interned as `Arc<str>` so that two independently constructed
//! definitions with the same name compare equal and hash the same.
//! Definitions and modifiers get a `Uuid` generated once at construction.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;
use uuid::Uuid;

macro_rules! name_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create a new identifier from a string slice.
            pub fn from_str(s: &str) -> Self {
                Self(Arc::from(s))
            }

            /// Get the string representation of this identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_str(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                self.0.as_ref().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from(s))
            }
        }
    };
}

name_id!(
    /// Identity of an attribute: its case-sensitive display name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ruleforge::AttributeId;
    ///
    /// let str_a = AttributeId::from_str("Strength");
    /// let str_b: AttributeId = "Strength".into();
    /// assert_eq!(str_a, str_b);
    /// assert_ne!(str_a, AttributeId::from_str("strength"));
    /// ```
    AttributeId
);

name_id!(
    /// Identity of a modifier type: its display name.
    ModifierTypeId
);

/// Identity of a race, class, feat, quality or level definition.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefinitionId(pub Uuid);

impl DefinitionId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DefinitionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a single modifier.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModifierId(pub Uuid);

impl ModifierId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ModifierId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ModifierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_id_equality_is_by_name() {
        let a = AttributeId::from_str("Dexterity");
        let b = AttributeId::from(String::from("Dexterity"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "Dexterity");
    }

    #[test]
    fn test_attribute_id_is_case_sensitive() {
        assert_ne!(AttributeId::from_str("Wisdom"), AttributeId::from_str("wisdom"));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(DefinitionId::new(), DefinitionId::new());
        assert_ne!(ModifierId::new(), ModifierId::new());
    }

    #[test]
    fn test_name_id_serializes_as_string() {
        let id = ModifierTypeId::from_str("Racial");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Racial\"");
        let back: ModifierTypeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
