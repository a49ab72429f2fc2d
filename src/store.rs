//! Attribute store.
//!
//! Holds one character's calculated attributes behind a single
//! `tokio::sync::Mutex`. Every operation takes the lock for exactly its
//! own duration and comes in a blocking form (for synchronous callers)
//! and a suspending `_async` form. The blocking forms must not be called
//! from inside an async runtime thread.
//!
//! The store is pure storage: it never triggers recomputation.

use crate::calculated::CalculatedAttribute;
use crate::error::RuleError;
use crate::ids::AttributeId;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::trace;

#[derive(Debug, Default)]
pub struct AttributeStore {
    attributes: Mutex<HashMap<AttributeId, CalculatedAttribute>>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the stored record.
    pub fn get(&self, id: &AttributeId) -> Option<CalculatedAttribute> {
        self.attributes.blocking_lock().get(id).cloned()
    }

    /// Suspending form of [`AttributeStore::get`].
    pub async fn get_async(&self, id: &AttributeId) -> Option<CalculatedAttribute> {
        self.attributes.lock().await.get(id).cloned()
    }

    /// Register a record. Attributes are add-once.
    pub fn set(&self, attribute: CalculatedAttribute) -> Result<(), RuleError> {
        insert_once(&mut self.attributes.blocking_lock(), attribute)
    }

    /// Suspending form of [`AttributeStore::set`].
    pub async fn set_async(&self, attribute: CalculatedAttribute) -> Result<(), RuleError> {
        insert_once(&mut *self.attributes.lock().await, attribute)
    }

    /// Mutate an existing record in place. Returns `None` if it is absent.
    pub fn update<R>(&self, id: &AttributeId, f: impl FnOnce(&mut CalculatedAttribute) -> R) -> Option<R> {
        self.attributes.blocking_lock().get_mut(id).map(f)
    }

    /// Suspending form of [`AttributeStore::update`].
    pub async fn update_async<R>(
        &self,
        id: &AttributeId,
        f: impl FnOnce(&mut CalculatedAttribute) -> R,
    ) -> Option<R> {
        self.attributes.lock().await.get_mut(id).map(f)
    }

    /// Remove every record.
    pub fn clear(&self) {
        let mut attributes = self.attributes.blocking_lock();
        trace!(count = attributes.len(), "clearing attribute store");
        attributes.clear();
    }

    /// Suspending form of [`AttributeStore::clear`].
    pub async fn clear_async(&self) {
        let mut attributes = self.attributes.lock().await;
        trace!(count = attributes.len(), "clearing attribute store");
        attributes.clear();
    }

    pub fn len(&self) -> usize {
        self.attributes.blocking_lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn insert_once(
    attributes: &mut HashMap<AttributeId, CalculatedAttribute>,
    attribute: CalculatedAttribute,
) -> Result<(), RuleError> {
    let id = attribute.id().clone();
    if attributes.contains_key(&id) {
        return Err(RuleError::AttributeState(id));
    }
    trace!(attribute = %id, "registering attribute");
    attributes.insert(id, attribute);
    Ok(())
}
