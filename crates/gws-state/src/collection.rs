use std::collections::BTreeMap;

use gws_schemas::{Entity, NaturalKey};

use crate::error::StateError;

/// All entities of one kind, indexed by id and by natural key.
///
/// Iteration is in id order so that every consumer (differ, plan output,
/// tests) sees a deterministic sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Collection<T: Entity> {
    by_id: BTreeMap<String, T>,
    by_key: BTreeMap<NaturalKey, String>,
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self {
            by_id: BTreeMap::new(),
            by_key: BTreeMap::new(),
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entity. Fails if it has no id, or if its id or natural
    /// key is already taken.
    pub fn insert(&mut self, entity: T) -> Result<(), StateError> {
        let id = entity
            .id()
            .ok_or_else(|| StateError::MissingId {
                kind: T::KIND,
                name: entity.display_name(),
            })?
            .to_string();

        if self.by_id.contains_key(&id) {
            return Err(StateError::DuplicateId { kind: T::KIND, id });
        }

        if let Some(key) = entity.natural_key() {
            if let Some(existing) = self.by_key.get(&key) {
                return Err(StateError::DuplicateKey {
                    kind: T::KIND,
                    key: key.to_string(),
                    first: existing.clone(),
                    second: id,
                });
            }
            self.by_key.insert(key, id.clone());
        }

        self.by_id.insert(id, entity);
        Ok(())
    }

    /// Insert or replace by id, re-indexing the natural key.
    pub fn upsert(&mut self, entity: T) -> Result<(), StateError> {
        if let Some(id) = entity.id() {
            let id = id.to_string();
            self.remove(&id);
        }
        self.insert(entity)
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let removed = self.by_id.remove(id)?;
        if let Some(key) = removed.natural_key() {
            if self.by_key.get(&key).map(String::as_str) == Some(id) {
                self.by_key.remove(&key);
            }
        }
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.by_id.get(id)
    }

    pub fn get_by_key(&self, key: &NaturalKey) -> Option<&T> {
        self.by_key.get(key).and_then(|id| self.by_id.get(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.by_id.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.by_id.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All entities matching `pred`, in id order.
    pub fn find<F>(&self, pred: F) -> Vec<&T>
    where
        F: Fn(&T) -> bool,
    {
        self.by_id.values().filter(|e| pred(e)).collect()
    }

    /// A new collection holding only the entities matching `pred`.
    pub fn filtered<F>(&self, pred: F) -> Self
    where
        F: Fn(&T) -> bool,
    {
        let mut out = Self::new();
        for e in self.by_id.values().filter(|e| pred(e)) {
            // Entities already satisfied the index invariants here.
            if let Some(id) = e.id() {
                if let Some(key) = e.natural_key() {
                    out.by_key.insert(key, id.to_string());
                }
                out.by_id.insert(id.to_string(), e.clone());
            }
        }
        out
    }
}

impl<T: Entity> FromIterator<T> for Collection<T> {
    /// Lenient collection: entities without ids are dropped, later
    /// duplicates replace earlier ones. Use [`Collection::insert`] when
    /// duplicates must be reported.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut c = Self::new();
        for e in iter {
            let _ = c.upsert(e);
        }
        c
    }
}
