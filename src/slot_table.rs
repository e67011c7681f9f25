//! SlotTable: structural keyed storage with stable generational handles.
//!
//! Entries live in a `SlotMap`; a `hashbrown::HashTable` indexes them by a
//! hash computed once at insertion and stored with the entry. Rebuilding or
//! cloning the index reuses the stored hashes, so `K: Hash` only runs for
//! lookups and first insertion.

use crate::error::InsertError;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_table;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Stable position of an entry. Stays unique across removal and reuse of
/// the underlying slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub fn key<'a, K, V, S>(&self, table: &'a SlotTable<K, V, S>) -> Option<&'a K> {
        table.slots.get(self.0).map(|e| &e.key)
    }

    pub fn value<'a, K, V, S>(&self, table: &'a SlotTable<K, V, S>) -> Option<&'a V> {
        table.slots.get(self.0).map(|e| &e.value)
    }

    pub fn value_mut<'a, K, V, S>(&self, table: &'a mut SlotTable<K, V, S>) -> Option<&'a mut V> {
        table.slots.get_mut(self.0).map(|e| &mut e.value)
    }
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
}

pub struct SlotTable<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
}

impl<K, V> SlotTable<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<K, V, S> SlotTable<K, V, S> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Remove every entry, returning them so the caller controls drop order.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        self.index.clear();
        self.slots.drain().map(|(_, e)| (e.key, e.value)).collect()
    }

    pub fn remove(&mut self, handle: Handle) -> Option<(K, V)> {
        let k = handle.0;
        let entry = self.slots.remove(k)?;
        match self.index.find_entry(entry.hash, |&kk| kk == k) {
            Ok(occupied) => {
                occupied.remove();
            }
            Err(_) => debug_assert!(false, "slot {k:?} missing from index"),
        }
        Some((entry.key, entry.value))
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.slots.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.slots.iter_mut(),
        }
    }
}

impl<K, V, S> SlotTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::new(),
            slots: SlotMap::with_key(),
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .is_some_and(|e| e.key.borrow() == q)
            })
            .map(|&k| Handle(k))
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    pub fn insert(&mut self, key: K, value: V) -> Result<Handle, InsertError> {
        match self.find_or_insert_with(key, || value) {
            (h, true) => Ok(h),
            (_, false) => Err(InsertError::DuplicateKey),
        }
    }

    /// Handle of `key`'s entry, inserting `make()` if absent. The flag is
    /// true when a new entry was created; `make` runs only in that case.
    pub fn find_or_insert_with<F>(&mut self, key: K, make: F) -> (Handle, bool)
    where
        F: FnOnce() -> V,
    {
        let hash = self.make_hash(&key);
        match self.index.entry(
            hash,
            |&kk| self.slots.get(kk).is_some_and(|e| e.key == key),
            |&kk| self.slots.get(kk).map_or(0, |e| e.hash),
        ) {
            hash_table::Entry::Occupied(o) => (Handle(*o.get()), false),
            hash_table::Entry::Vacant(v) => {
                let value = make();
                let k = self.slots.insert(Entry { key, value, hash });
                let _ = v.insert(k);
                (Handle(k), true)
            }
        }
    }

    pub fn remove_key<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let h = self.find(q)?;
        self.remove(h)
    }

    /// Copy of the table with every value mapped through `f`. Stored hashes
    /// are reused; `K: Hash` is not called.
    pub fn clone_with<F>(&self, mut f: F) -> Self
    where
        K: Clone,
        S: Clone,
        F: FnMut(&V) -> V,
    {
        let mut out = Self::with_hasher(self.hasher.clone());
        for (_, e) in self.slots.iter() {
            let hash = e.hash;
            let k = out.slots.insert(Entry {
                key: e.key.clone(),
                value: f(&e.value),
                hash,
            });
            let slots = &out.slots;
            out.index
                .insert_unique(hash, k, |&kk| slots.get(kk).map_or(0, |e| e.hash));
        }
        out
    }
}

impl<K, V> Default for SlotTable<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(Handle, &K, &V)`.
pub struct Iter<'a, K, V> {
    it: slotmap::basic::Iter<'a, DefaultKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(k, e)| (Handle(k), &e.key, &e.value))
    }
}

/// Iterator over `(Handle, &K, &mut V)`.
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, DefaultKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (Handle, &'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(k, e)| (Handle(k), &e.key, &mut e.value))
    }
}
