//! The persisted schema: dimensions and their permitted values.
//!
//! The schema is kept in the store as one ordered set of dimension names
//! ([`Namespace::order_key`]) and, for every dimension, one ordered set of
//! permitted values ([`Namespace::value_set`]). Ordinals are the ranks within
//! those sets, so they follow registration order and have no gaps.

use serde::Serialize;
use tracing::debug;

use crate::config::Namespace;
use crate::error::{KeyschemaError, Result};
use crate::store::{Inserted, Store};
use crate::walker::DocumentHandler;

// ------------- Dimension -------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub name: String,
    pub ordinal: usize,
    pub values: Vec<String>,
}

// ------------- Schema store -------------
pub struct SchemaStore<'a, S: ?Sized> {
    store: &'a mut S,
    namespace: &'a Namespace,
}

impl<'a, S: Store + ?Sized> SchemaStore<'a, S> {
    pub fn new(store: &'a mut S, namespace: &'a Namespace) -> Self {
        Self { store, namespace }
    }
    pub fn namespace(&self) -> &Namespace {
        self.namespace
    }
    pub fn insert_dimension(&mut self, name: &str, ordinal: usize) -> Result<Inserted> {
        self.store
            .insert_member(&self.namespace.order_key, name, ordinal as i64)
    }
    pub fn insert_value(&mut self, dimension: &str, value: &str, ordinal: usize) -> Result<Inserted> {
        self.store
            .insert_member(&self.namespace.value_set(dimension), value, ordinal as i64)
    }
    pub fn dimension_ordinal(&self, name: &str) -> Result<Option<usize>> {
        self.store.rank_of(&self.namespace.order_key, name)
    }
    pub fn value_ordinal(&self, dimension: &str, value: &str) -> Result<Option<usize>> {
        self.store.rank_of(&self.namespace.value_set(dimension), value)
    }
    pub fn dimension_count(&self) -> Result<usize> {
        self.store.member_count(&self.namespace.order_key)
    }
    pub fn dimension_at(&self, ordinal: usize) -> Result<Option<String>> {
        self.store.member_at(&self.namespace.order_key, ordinal)
    }
    pub fn value_count(&self, dimension: &str) -> Result<usize> {
        self.store.member_count(&self.namespace.value_set(dimension))
    }
    pub fn values(&self, dimension: &str) -> Result<Vec<String>> {
        let set = self.namespace.value_set(dimension);
        let count = self.store.member_count(&set)?;
        let mut values = Vec::with_capacity(count);
        for ordinal in 0..count {
            match self.store.member_at(&set, ordinal)? {
                Some(value) => values.push(value),
                None => return Err(torn(&set)),
            }
        }
        Ok(values)
    }
    pub fn dimensions(&self) -> Result<Vec<Dimension>> {
        let count = self.dimension_count()?;
        let mut dimensions = Vec::with_capacity(count);
        for ordinal in 0..count {
            let name = self
                .dimension_at(ordinal)?
                .ok_or_else(|| torn(&self.namespace.order_key))?;
            let values = self.values(&name)?;
            dimensions.push(Dimension { name, ordinal, values });
        }
        Ok(dimensions)
    }
    /// Remove every value set and then the dimension set, returning the
    /// number of dimensions that were removed.
    pub fn clear(&mut self) -> Result<usize> {
        let mut ordinal = 0;
        while let Some(dimension) = self.dimension_at(ordinal)? {
            self.store.delete_set(&self.namespace.value_set(&dimension))?;
            ordinal += 1;
        }
        self.store.delete_set(&self.namespace.order_key)?;
        debug!(dimensions = ordinal, "schema cleared");
        Ok(ordinal)
    }
}

fn torn(set: &str) -> KeyschemaError {
    KeyschemaError::Store(format!("schema changed while reading '{set}'"))
}

// ------------- Loading -------------
/// Populates the schema from a walked document.
pub struct SchemaLoader<'s, 'a, S: ?Sized> {
    schema: &'s mut SchemaStore<'a, S>,
    inserted: usize,
    already_present: usize,
}

impl<'s, 'a, S: Store + ?Sized> SchemaLoader<'s, 'a, S> {
    pub fn new(schema: &'s mut SchemaStore<'a, S>) -> Self {
        Self {
            schema,
            inserted: 0,
            already_present: 0,
        }
    }
    /// Members written and members that were already there.
    pub fn counts(&self) -> (usize, usize) {
        (self.inserted, self.already_present)
    }
    fn tally(&mut self, outcome: Inserted) {
        match outcome {
            Inserted::Inserted => self.inserted += 1,
            Inserted::AlreadyPresent => self.already_present += 1,
        }
    }
}

impl<'s, 'a, S: Store + ?Sized> DocumentHandler for SchemaLoader<'s, 'a, S> {
    fn on_dimension(&mut self, key: &str, ordinal: usize) -> Result<()> {
        let outcome = self.schema.insert_dimension(key, ordinal)?;
        if outcome == Inserted::AlreadyPresent {
            debug!(dimension = key, ordinal, "dimension already registered");
        }
        self.tally(outcome);
        Ok(())
    }
    fn on_value(&mut self, key: &str, value: &str, ordinal: usize, _single: bool) -> Result<()> {
        let outcome = self.schema.insert_value(key, value, ordinal)?;
        self.tally(outcome);
        Ok(())
    }
}
