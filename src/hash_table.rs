//! A small open-addressing hash table keyed by string, backing the open-file
//! table. Not resizable: capacity is fixed at creation, matching the backing
//! arena's block count, since the number of simultaneously open files can
//! never exceed the number of blocks.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

enum Slot<V> {
    Empty,
    Tombstone,
    Occupied(String, V),
}

pub(crate) struct HashTable<V> {
    slots: Vec<Slot<V>>,
    len: usize,
}

impl<V> HashTable<V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot::Empty);
        HashTable { slots, len: 0 }
    }

    fn index_of(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.slots.len()
    }

    fn probe(&self, key: &str) -> Option<usize> {
        let cap = self.slots.len();
        let start = self.index_of(key);
        for step in 0..cap {
            let i = (start + step) % cap;
            match &self.slots[i] {
                Slot::Empty => return None,
                Slot::Occupied(k, _) if k == key => return Some(i),
                Slot::Occupied(_, _) | Slot::Tombstone => continue,
            }
        }
        None
    }

    pub(crate) fn get(&self, key: &str) -> Option<&V> {
        let i = self.probe(key)?;
        match &self.slots[i] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let i = self.probe(key)?;
        match &mut self.slots[i] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    /// Inserts `value` under `key`, returning the previous value if the key
    /// was already present. Panics if the table is full and `key` is new —
    /// an invariant violation, since capacity is always sized to exceed the
    /// maximum number of simultaneously live entries.
    pub(crate) fn insert(&mut self, key: &str, value: V) -> Option<V> {
        if let Some(i) = self.probe(key) {
            let prev = std::mem::replace(&mut self.slots[i], Slot::Occupied(key.to_owned(), value));
            return match prev {
                Slot::Occupied(_, v) => Some(v),
                _ => unreachable!(),
            };
        }

        let cap = self.slots.len();
        let start = self.index_of(key);
        for step in 0..cap {
            let i = (start + step) % cap;
            if matches!(self.slots[i], Slot::Empty | Slot::Tombstone) {
                self.slots[i] = Slot::Occupied(key.to_owned(), value);
                self.len += 1;
                return None;
            }
        }
        panic!("hash table exhausted: capacity {cap} has no free slot for insert");
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<V> {
        let i = self.probe(key)?;
        let prev = std::mem::replace(&mut self.slots[i], Slot::Tombstone);
        self.len -= 1;
        match prev {
            Slot::Occupied(_, v) => Some(v),
            _ => unreachable!(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.slots.iter().filter_map(|s| match s {
            Slot::Occupied(k, v) => Some((k.as_str(), v)),
            _ => None,
        })
    }
}
