//! Relation storage keyed by `(owner, program, relation)`.
//!
//! The executor only reaches stored relations through [`RelationStore`], so a
//! persistent backend can replace [`MemoryStore`] without touching the plan
//! or evaluation code.

use std::collections::HashMap;

use crate::error::{MyrialError, Result};
use crate::query::logical::RelationKey;
use crate::relation::{Bag, Schema};

/// Schema and contents of one stored relation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredRelation {
    /// Schema fixed when the relation was first written.
    pub schema: Schema,
    /// Current contents.
    pub bag: Bag,
}

/// Storage backend consulted by the analyzer and executor.
pub trait RelationStore {
    /// Schema of the relation at `key`.
    fn schema(&self, key: &RelationKey) -> Result<Schema>;
    /// Snapshot of the relation's contents at call time.
    fn scan(&self, key: &RelationKey) -> Result<Bag>;
    /// Multiset-adds `bag` to the relation, creating it with `schema` when absent.
    ///
    /// An existing relation keeps its schema; `schema` must be compatible with it.
    fn insert(&mut self, key: &RelationKey, schema: &Schema, bag: Bag) -> Result<()>;
    /// Overwrites both schema and contents of the relation at `key`.
    fn replace(&mut self, key: &RelationKey, schema: Schema, bag: Bag) -> Result<()>;
    /// Drops the relation at `key`, returning whether it existed.
    fn remove(&mut self, key: &RelationKey) -> bool;
    /// Whether a relation exists at `key`.
    fn contains(&self, key: &RelationKey) -> bool;
    /// Every stored key, sorted.
    fn keys(&self) -> Vec<RelationKey>;
}

/// In-memory store used by the driver and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    relations: HashMap<RelationKey, StoredRelation>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a relation.
    pub fn with_relation(mut self, key: RelationKey, schema: Schema, bag: Bag) -> Self {
        self.relations.insert(key, StoredRelation { schema, bag });
        self
    }

    /// Number of stored relations.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Whether no relation is stored.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    fn get(&self, key: &RelationKey) -> Result<&StoredRelation> {
        self.relations
            .get(key)
            .ok_or_else(|| MyrialError::UnknownRelation {
                key: key.to_string(),
            })
    }
}

impl RelationStore for MemoryStore {
    fn schema(&self, key: &RelationKey) -> Result<Schema> {
        self.get(key).map(|rel| rel.schema.clone())
    }

    fn scan(&self, key: &RelationKey) -> Result<Bag> {
        self.get(key).map(|rel| rel.bag.clone())
    }

    fn insert(&mut self, key: &RelationKey, schema: &Schema, bag: Bag) -> Result<()> {
        match self.relations.get_mut(key) {
            Some(existing) => {
                existing.schema.check_compatible(schema)?;
                existing.bag.merge(bag);
            }
            None => {
                self.relations.insert(
                    key.clone(),
                    StoredRelation {
                        schema: schema.clone(),
                        bag,
                    },
                );
            }
        }
        Ok(())
    }

    fn replace(&mut self, key: &RelationKey, schema: Schema, bag: Bag) -> Result<()> {
        self.relations
            .insert(key.clone(), StoredRelation { schema, bag });
        Ok(())
    }

    fn remove(&mut self, key: &RelationKey) -> bool {
        self.relations.remove(key).is_some()
    }

    fn contains(&self, key: &RelationKey) -> bool {
        self.relations.contains_key(key)
    }

    fn keys(&self) -> Vec<RelationKey> {
        let mut keys: Vec<_> = self.relations.keys().cloned().collect();
        keys.sort();
        keys
    }
}
