//! The key-value primitives the engine is built on, and an in-process store.
//!
//! A store holds two kinds of keys in one keyspace: scalars (string values
//! that may be read, written, incremented and deleted) and ordered sets
//! (members ranked by an integer ordinal). This mirrors what the engine
//! expects from a Redis-like backend, and is all the engine ever asks for.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::BuildHasherDefault;

use seahash::SeaHasher;

use crate::error::{KeyschemaError, Result};

pub type MemberHasher = BuildHasherDefault<SeaHasher>;

/// Outcome of an insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    Inserted,
    AlreadyPresent,
}

pub trait Store {
    /// Insert `member` into the ordered set `set` at `ordinal`, unless it is already a member.
    fn insert_member(&mut self, set: &str, member: &str, ordinal: i64) -> Result<Inserted>;
    /// 0-based position of `member` in `set`, ordered by (ordinal, member).
    fn rank_of(&self, set: &str, member: &str) -> Result<Option<usize>>;
    fn member_count(&self, set: &str) -> Result<usize>;
    fn member_at(&self, set: &str, index: usize) -> Result<Option<String>>;
    fn delete_set(&mut self, set: &str) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Add one to an integer scalar, counting a missing key as zero.
    fn increment(&mut self, key: &str) -> Result<i64>;
    /// Delete a key of either kind, reporting whether it existed.
    fn delete(&mut self, key: &str) -> Result<bool>;
    /// Snapshot of every key, scalars and ordered sets alike.
    fn keys(&self) -> Result<Vec<String>>;
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn insert_member(&mut self, set: &str, member: &str, ordinal: i64) -> Result<Inserted> {
        (**self).insert_member(set, member, ordinal)
    }
    fn rank_of(&self, set: &str, member: &str) -> Result<Option<usize>> {
        (**self).rank_of(set, member)
    }
    fn member_count(&self, set: &str) -> Result<usize> {
        (**self).member_count(set)
    }
    fn member_at(&self, set: &str, index: usize) -> Result<Option<String>> {
        (**self).member_at(set, index)
    }
    fn delete_set(&mut self, set: &str) -> Result<()> {
        (**self).delete_set(set)
    }
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
    fn increment(&mut self, key: &str) -> Result<i64> {
        (**self).increment(key)
    }
    fn delete(&mut self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }
    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }
}

// ------------- Ordered set -------------
#[derive(Debug, Default)]
pub struct OrderedSet {
    ordinals: HashMap<String, i64, MemberHasher>,
    ordered: BTreeSet<(i64, String)>,
}

impl OrderedSet {
    pub fn insert(&mut self, member: &str, ordinal: i64) -> Inserted {
        if self.ordinals.contains_key(member) {
            return Inserted::AlreadyPresent;
        }
        self.ordinals.insert(member.to_owned(), ordinal);
        self.ordered.insert((ordinal, member.to_owned()));
        Inserted::Inserted
    }
    pub fn rank(&self, member: &str) -> Option<usize> {
        let ordinal = *self.ordinals.get(member)?;
        Some(self.ordered.range(..(ordinal, member.to_owned())).count())
    }
    pub fn at(&self, index: usize) -> Option<&str> {
        self.ordered.iter().nth(index).map(|(_, member)| member.as_str())
    }
    pub fn len(&self) -> usize {
        self.ordered.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[derive(Debug)]
enum Entry {
    Scalar(String),
    Ordered(OrderedSet),
}

fn wrong_type(key: &str) -> KeyschemaError {
    KeyschemaError::Store(format!("operation against a key holding the wrong kind of value: {key}"))
}

/// A store kept entirely in memory, enumerating keys in ascending order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    fn ordered(&self, set: &str) -> Result<Option<&OrderedSet>> {
        match self.entries.get(set) {
            None => Ok(None),
            Some(Entry::Ordered(ordered)) => Ok(Some(ordered)),
            Some(Entry::Scalar(_)) => Err(wrong_type(set)),
        }
    }
}

impl Store for MemoryStore {
    fn insert_member(&mut self, set: &str, member: &str, ordinal: i64) -> Result<Inserted> {
        let entry = self
            .entries
            .entry(set.to_owned())
            .or_insert_with(|| Entry::Ordered(OrderedSet::default()));
        match entry {
            Entry::Ordered(ordered) => Ok(ordered.insert(member, ordinal)),
            Entry::Scalar(_) => Err(wrong_type(set)),
        }
    }
    fn rank_of(&self, set: &str, member: &str) -> Result<Option<usize>> {
        Ok(self.ordered(set)?.and_then(|ordered| ordered.rank(member)))
    }
    fn member_count(&self, set: &str) -> Result<usize> {
        Ok(self.ordered(set)?.map_or(0, OrderedSet::len))
    }
    fn member_at(&self, set: &str, index: usize) -> Result<Option<String>> {
        Ok(self
            .ordered(set)?
            .and_then(|ordered| ordered.at(index))
            .map(str::to_owned))
    }
    fn delete_set(&mut self, set: &str) -> Result<()> {
        // deleting something that isn't there is fine, deleting a scalar is not
        self.ordered(set)?;
        self.entries.remove(set);
        Ok(())
    }
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Scalar(value)) => Ok(Some(value.clone())),
            Some(Entry::Ordered(_)) => Err(wrong_type(key)),
        }
    }
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), Entry::Scalar(value.to_owned()));
        Ok(())
    }
    fn increment(&mut self, key: &str) -> Result<i64> {
        let current = match self.get(key)? {
            None => 0,
            Some(value) => value.trim().parse::<i64>().map_err(|_| {
                KeyschemaError::Store(format!("value of '{key}' is not an integer"))
            })?,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| KeyschemaError::Store(format!("increment of '{key}' would overflow")))?;
        self.set(key, &next.to_string())?;
        Ok(next)
    }
    fn delete(&mut self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }
    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_ordinals_not_insertion() {
        let mut store = MemoryStore::new();
        assert_eq!(store.insert_member("s", "b", 1).unwrap(), Inserted::Inserted);
        assert_eq!(store.insert_member("s", "a", 0).unwrap(), Inserted::Inserted);
        assert_eq!(store.insert_member("s", "c", 2).unwrap(), Inserted::Inserted);
        assert_eq!(store.rank_of("s", "a").unwrap(), Some(0));
        assert_eq!(store.rank_of("s", "c").unwrap(), Some(2));
        assert_eq!(store.rank_of("s", "z").unwrap(), None);
        assert_eq!(store.member_at("s", 1).unwrap().as_deref(), Some("b"));
        assert_eq!(store.member_at("s", 3).unwrap(), None);
        assert_eq!(store.member_count("s").unwrap(), 3);
    }

    #[test]
    fn reinsertion_is_a_no_op() {
        let mut store = MemoryStore::new();
        store.insert_member("s", "a", 0).unwrap();
        assert_eq!(store.insert_member("s", "a", 5).unwrap(), Inserted::AlreadyPresent);
        assert_eq!(store.rank_of("s", "a").unwrap(), Some(0));
        assert_eq!(store.member_count("s").unwrap(), 1);
    }

    #[test]
    fn missing_sets_are_empty() {
        let mut store = MemoryStore::new();
        assert_eq!(store.member_count("nothing").unwrap(), 0);
        assert_eq!(store.member_at("nothing", 0).unwrap(), None);
        store.delete_set("nothing").unwrap();
    }

    #[test]
    fn kinds_do_not_mix() {
        let mut store = MemoryStore::new();
        store.set("k", "1").unwrap();
        assert!(store.insert_member("k", "a", 0).is_err());
        store.insert_member("s", "a", 0).unwrap();
        assert!(store.get("s").is_err());
        assert!(store.increment("s").is_err());
    }

    #[test]
    fn increment_counts_from_zero() {
        let mut store = MemoryStore::new();
        assert_eq!(store.increment("c").unwrap(), 1);
        assert_eq!(store.increment("c").unwrap(), 2);
        store.set("f", "1.5").unwrap();
        assert!(store.increment("f").is_err());
        assert_eq!(store.get("f").unwrap().as_deref(), Some("1.5"));
    }

    #[test]
    fn keys_are_enumerated_in_order() {
        let mut store = MemoryStore::new();
        store.set("b", "2").unwrap();
        store.set("a", "1").unwrap();
        store.insert_member("c", "x", 0).unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "b", "c"]);
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert_eq!(store.len(), 2);
    }
}
