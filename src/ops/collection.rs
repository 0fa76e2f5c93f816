//! Tracked Collection Module
//!
//! Ordered, key-unique collection whose entries remember whether an
//! in-flight operation still has to confirm them.

use std::fmt::Debug;
use std::hash::Hash;

use serde::Serialize;

// == Identified ==
/// Elements with a stable identity key.
pub trait Identified {
    type Key: Eq + Hash + Clone + Debug;

    fn key(&self) -> Self::Key;
}

// == Entry State ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EntryState {
    /// Backed by a completed operation or the initial load
    Confirmed,
    /// Inserted optimistically; removed if `operation_id` fails
    Provisional { operation_id: String },
    /// Scheduled for removal; restored if `operation_id` fails
    Removing { operation_id: String },
}

impl EntryState {
    pub fn operation_id(&self) -> Option<&str> {
        match self {
            EntryState::Confirmed => None,
            EntryState::Provisional { operation_id } | EntryState::Removing { operation_id } => {
                Some(operation_id)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedEntry<T> {
    pub item: T,
    #[serde(flatten)]
    pub state: EntryState,
}

impl<T> TrackedEntry<T> {
    pub fn confirmed(item: T) -> Self {
        Self {
            item,
            state: EntryState::Confirmed,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == EntryState::Confirmed
    }
}

// == Tracked Collection ==
/// No two entries share a key.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedCollection<T> {
    entries: Vec<TrackedEntry<T>>,
}

impl<T> Default for TrackedCollection<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Identified> TrackedCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection of confirmed items. A later item replaces an
    /// earlier one with the same key.
    pub fn from_confirmed(items: impl IntoIterator<Item = T>) -> Self {
        let mut collection = Self::new();
        for item in items {
            collection.upsert(item);
        }
        collection
    }

    pub(crate) fn position(&self, key: &T::Key) -> Option<usize> {
        self.entries.iter().position(|e| &e.item.key() == key)
    }

    pub fn get(&self, key: &T::Key) -> Option<&TrackedEntry<T>> {
        self.position(key).map(|i| &self.entries[i])
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.position(key).is_some()
    }

    // == Upsert ==
    /// Stores `item` as confirmed, in place if its key is already present.
    pub fn upsert(&mut self, item: T) {
        match self.position(&item.key()) {
            Some(index) => self.entries[index] = TrackedEntry::confirmed(item),
            None => self.entries.push(TrackedEntry::confirmed(item)),
        }
    }

    /// Inserts `item` as confirmed at `index` (clamped), replacing any entry
    /// with the same key.
    pub(crate) fn insert_confirmed_at(&mut self, index: usize, item: T) {
        if let Some(existing) = self.position(&item.key()) {
            self.entries.remove(existing);
        }
        let index = index.min(self.entries.len());
        self.entries.insert(index, TrackedEntry::confirmed(item));
    }

    // == Optimistic Insert ==
    /// Appends `item` as provisional for `operation_id`. Returns false and
    /// leaves the collection unchanged if the key is taken.
    pub fn insert_provisional(&mut self, item: T, operation_id: impl Into<String>) -> bool {
        if self.contains(&item.key()) {
            return false;
        }
        self.entries.push(TrackedEntry {
            item,
            state: EntryState::Provisional {
                operation_id: operation_id.into(),
            },
        });
        true
    }

    // == Optimistic Removal ==
    /// Flags a confirmed entry for removal by `operation_id`.
    pub fn mark_removing(&mut self, key: &T::Key, operation_id: impl Into<String>) -> bool {
        match self.position(key) {
            Some(index) if self.entries[index].is_confirmed() => {
                self.entries[index].state = EntryState::Removing {
                    operation_id: operation_id.into(),
                };
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, key: &T::Key) -> Option<T> {
        self.position(key).map(|i| self.entries.remove(i).item)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&TrackedEntry<T>) -> bool) {
        self.entries.retain(|e| keep(e));
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut TrackedEntry<T>> {
        self.entries.iter_mut()
    }

    /// Replaces the collection with `f(collection)`.
    pub fn apply(&mut self, f: impl FnOnce(Self) -> Self) {
        let current = std::mem::take(self);
        *self = f(current);
    }

    // == Views ==
    pub fn entries(&self) -> &[TrackedEntry<T>] {
        &self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.item)
    }

    pub fn confirmed(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().filter(|e| e.is_confirmed()).map(|e| &e.item)
    }

    /// Entries still waiting on `operation_id`.
    pub fn owned_by<'a>(&'a self, operation_id: &'a str) -> impl Iterator<Item = &'a TrackedEntry<T>> {
        self.entries
            .iter()
            .filter(move |e| e.state.operation_id() == Some(operation_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Item {
        pub id: u32,
        pub name: &'static str,
    }

    impl Identified for Item {
        type Key = u32;

        fn key(&self) -> u32 {
            self.id
        }
    }

    pub(crate) fn item(id: u32, name: &'static str) -> Item {
        Item { id, name }
    }

    #[test]
    fn test_from_confirmed_dedupes() {
        let c = TrackedCollection::from_confirmed(vec![item(1, "a"), item(2, "b"), item(1, "c")]);
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(&1).unwrap().item.name, "c");
        assert_eq!(c.confirmed().count(), 2);
    }

    #[test]
    fn test_insert_provisional_rejects_taken_key() {
        let mut c = TrackedCollection::from_confirmed(vec![item(1, "a")]);
        assert!(!c.insert_provisional(item(1, "dup"), "op"));
        assert!(c.insert_provisional(item(2, "b"), "op"));

        assert_eq!(c.len(), 2);
        assert_eq!(
            c.get(&2).unwrap().state,
            EntryState::Provisional { operation_id: "op".to_string() }
        );
        assert_eq!(c.confirmed().count(), 1);
        assert_eq!(c.owned_by("op").count(), 1);
    }

    #[test]
    fn test_mark_removing_only_confirmed() {
        let mut c = TrackedCollection::from_confirmed(vec![item(1, "a")]);
        c.insert_provisional(item(2, "b"), "create");

        assert!(c.mark_removing(&1, "delete"));
        assert!(!c.mark_removing(&1, "again"));
        assert!(!c.mark_removing(&2, "delete"));
        assert!(!c.mark_removing(&9, "delete"));
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut c = TrackedCollection::from_confirmed(vec![item(1, "a"), item(2, "b")]);
        c.upsert(item(1, "renamed"));

        let names: Vec<_> = c.items().map(|i| i.name).collect();
        assert_eq!(names, vec!["renamed", "b"]);
    }

    #[test]
    fn test_insert_confirmed_at_keeps_keys_unique() {
        let mut c = TrackedCollection::from_confirmed(vec![item(1, "a"), item(2, "b")]);
        c.insert_confirmed_at(0, item(2, "moved"));

        let names: Vec<_> = c.items().map(|i| i.name).collect();
        assert_eq!(names, vec!["moved", "a"]);
    }

    #[test]
    fn test_remove_and_apply() {
        let mut c = TrackedCollection::from_confirmed(vec![item(1, "a"), item(2, "b")]);
        assert_eq!(c.remove(&1), Some(item(1, "a")));
        assert_eq!(c.remove(&1), None);

        c.apply(|mut inner| {
            inner.upsert(item(3, "c"));
            inner
        });
        assert_eq!(c.len(), 2);
    }
}
