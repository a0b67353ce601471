//! Per-request queries and the handlers that build them.
//!
//! A [`Query`] holds one [`Selection`] per schema dimension, in ordinal order.
//! In filter mode selections start out empty and are filled with the values
//! named by the request; an empty selection is a wildcard. In full mode every
//! selection is pre-filled with all permitted values, which is what bulk
//! assignments are validated against.

use tracing::debug;

use crate::config::Namespace;
use crate::error::{KeyschemaError, Result};
use crate::matcher::{KeyMatcher, MatchMode};
use crate::schema::SchemaStore;
use crate::store::Store;
use crate::walker::DocumentHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Filter,
    Full,
}

// ------------- Selection -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    dimension: String,
    capacity: usize,
    values: Vec<String>,
}

impl Selection {
    /// `capacity` is the number of values the dimension declared when the
    /// query was allocated.
    pub fn new(dimension: impl Into<String>, capacity: usize) -> Self {
        Self {
            dimension: dimension.into(),
            capacity,
            values: Vec::with_capacity(capacity),
        }
    }
    pub fn dimension(&self) -> &str {
        &self.dimension
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn values(&self) -> &[String] {
        &self.values
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn contains(&self, segment: &str) -> bool {
        self.values.iter().any(|v| v == segment)
    }
    pub fn push(&mut self, value: impl Into<String>) {
        self.values.push(value.into());
    }
    /// Put `value` in slot `ordinal`, overwriting what a repeated key left there.
    fn place(&mut self, ordinal: usize, value: &str) -> Result<()> {
        if ordinal >= self.capacity {
            return Err(KeyschemaError::TooManyValues {
                dimension: self.dimension.clone(),
            });
        }
        match self.values.get_mut(ordinal) {
            Some(slot) => *slot = value.to_owned(),
            None => self.values.push(value.to_owned()),
        }
        Ok(())
    }
}

// ------------- Query -------------
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    selections: Vec<Selection>,
}

impl Query {
    pub fn allocate<S: Store + ?Sized>(schema: &SchemaStore<'_, S>, mode: QueryMode) -> Result<Self> {
        let dimensions = schema.dimension_count()?;
        let mut selections = Vec::with_capacity(dimensions);
        for ordinal in 0..dimensions {
            let Some(name) = schema.dimension_at(ordinal)? else {
                return Err(KeyschemaError::Store(format!(
                    "schema changed while allocating dimension {ordinal}"
                )));
            };
            let selection = match mode {
                QueryMode::Filter => {
                    let capacity = schema.value_count(&name)?;
                    Selection::new(name, capacity)
                }
                QueryMode::Full => {
                    let values = schema.values(&name)?;
                    Selection {
                        dimension: name,
                        capacity: values.len(),
                        values,
                    }
                }
            };
            selections.push(selection);
        }
        Ok(Self { selections })
    }
    pub fn from_selections(selections: Vec<Selection>) -> Self {
        Self { selections }
    }
    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }
    pub fn selection(&self, ordinal: usize) -> Option<&Selection> {
        self.selections.get(ordinal)
    }
    pub fn len(&self) -> usize {
        self.selections.len()
    }
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
    /// True when no dimension constrains anything.
    pub fn is_unconstrained(&self) -> bool {
        self.selections.iter().all(Selection::is_empty)
    }
}

// ------------- Filter building -------------
/// Validates a filter document against the schema and fills a filter-mode query.
pub struct FilterBuilder<'q, 'a, S: ?Sized> {
    schema: &'q SchemaStore<'a, S>,
    query: &'q mut Query,
    current: Option<usize>,
}

impl<'q, 'a, S: Store + ?Sized> FilterBuilder<'q, 'a, S> {
    pub fn new(schema: &'q SchemaStore<'a, S>, query: &'q mut Query) -> Self {
        Self {
            schema,
            query,
            current: None,
        }
    }
}

impl<'q, 'a, S: Store + ?Sized> DocumentHandler for FilterBuilder<'q, 'a, S> {
    fn on_dimension(&mut self, key: &str, _ordinal: usize) -> Result<()> {
        let ordinal = self
            .schema
            .dimension_ordinal(key)?
            .ok_or_else(|| KeyschemaError::MemberNotFound { member: key.to_owned() })?;
        self.current = Some(ordinal);
        Ok(())
    }
    fn on_value(&mut self, key: &str, value: &str, ordinal: usize, _single: bool) -> Result<()> {
        let Some(dimension) = self.current else {
            return Err(KeyschemaError::InvalidInput(format!("value '{value}' outside of a dimension")));
        };
        if self.schema.value_ordinal(key, value)?.is_none() {
            return Err(KeyschemaError::MemberNotFound {
                member: format!("{key} = {value}"),
            });
        }
        // the schema grew after the query was allocated
        let selection = self
            .query
            .selections
            .get_mut(dimension)
            .ok_or_else(|| KeyschemaError::TooManyValues { dimension: key.to_owned() })?;
        selection.place(ordinal, value)
    }
}

// ------------- Assignment -------------
/// Validates literal keys against a full-mode query and writes their values.
/// Keys that hold the schema itself are never written.
pub struct AssignmentBuilder<'q, S: ?Sized> {
    store: &'q mut S,
    namespace: &'q Namespace,
    query: &'q Query,
    matcher: &'q KeyMatcher,
    assigned: usize,
}

impl<'q, S: Store + ?Sized> AssignmentBuilder<'q, S> {
    pub fn new(store: &'q mut S, namespace: &'q Namespace, query: &'q Query, matcher: &'q KeyMatcher) -> Self {
        Self {
            store,
            namespace,
            query,
            matcher,
            assigned: 0,
        }
    }
    pub fn assigned(&self) -> usize {
        self.assigned
    }
}

impl<'q, S: Store + ?Sized> DocumentHandler for AssignmentBuilder<'q, S> {
    fn on_dimension(&mut self, key: &str, _ordinal: usize) -> Result<()> {
        if !self.namespace.owns(key) && self.matcher.matches(key, self.query, MatchMode::Exact) {
            Ok(())
        } else {
            Err(KeyschemaError::KeyRejected { key: key.to_owned() })
        }
    }
    fn on_value(&mut self, key: &str, value: &str, _ordinal: usize, single: bool) -> Result<()> {
        if !single {
            return Err(KeyschemaError::SingleValueExpected { key: key.to_owned() });
        }
        self.store.set(key, value)?;
        self.assigned += 1;
        debug!(key, value, "assigned");
        Ok(())
    }
}
