//! Owning keyed table of heap objects.
//!
//! Every key maps to a slot that is either null (present but empty) or the
//! sole owner of one boxed object. The per-key state machine is
//! absent → null → owned → (null | absent): [`set`](OwningKeyedTable::set)
//! and the `emplace*` family fill slots, [`release`](OwningKeyedTable::release)
//! empties a slot but keeps its key, [`erase`](OwningKeyedTable::erase)
//! removes the key and deletes its object.
//!
//! Storage is a [`SlotTable`], so a [`Cursor`] obtained from
//! [`find`](OwningKeyedTable::find) is a stable generational position: once
//! its entry is erased it never resolves again, even if the slot is reused.

use crate::error::{fatal, HandleError};
use crate::owned::{Cloneable, IntoOwned};
use crate::slot_table::{Handle, SlotTable};
use crate::unique::UniqueHandle;
use core::any::type_name;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::Index;
use std::collections::hash_map::RandomState;

/// Three-way result of a key lookup.
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<'a, T: ?Sized> {
    Absent,
    Null,
    Present(&'a T),
}

impl<'a, T: ?Sized> Lookup<'a, T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Lookup::Null)
    }

    pub fn value(self) -> Option<&'a T> {
        match self {
            Lookup::Present(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: ?Sized> Clone for Lookup<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Lookup<'_, T> {}

/// Position of an entry returned by [`OwningKeyedTable::find`].
///
/// A miss produces the end cursor, for which `good()` is false.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    handle: Option<Handle>,
}

impl Cursor {
    pub const fn end() -> Self {
        Self { handle: None }
    }

    /// True if the lookup that produced this cursor found its key.
    #[inline]
    pub fn good(&self) -> bool {
        self.handle.is_some()
    }

    /// True if the entry still exists in `table`.
    pub fn is_live<K, T: ?Sized, S>(&self, table: &OwningKeyedTable<K, T, S>) -> bool {
        self.key(table).is_some()
    }

    pub fn key<'t, K, T: ?Sized, S>(&self, table: &'t OwningKeyedTable<K, T, S>) -> Option<&'t K> {
        self.handle.and_then(|h| h.key(&table.table))
    }

    /// The object at this position; `None` for a null slot or a dead cursor.
    pub fn value<'t, K, T: ?Sized, S>(
        &self,
        table: &'t OwningKeyedTable<K, T, S>,
    ) -> Option<&'t T> {
        self.handle
            .and_then(|h| h.value(&table.table))
            .and_then(Option::as_deref)
    }

    pub fn value_mut<'t, K, T: ?Sized, S>(
        &self,
        table: &'t mut OwningKeyedTable<K, T, S>,
    ) -> Option<&'t mut T> {
        match self.handle {
            Some(h) => h.value_mut(&mut table.table).and_then(Option::as_deref_mut),
            None => None,
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::end()
    }
}

pub struct OwningKeyedTable<K, T: ?Sized, S = RandomState> {
    table: SlotTable<K, Option<Box<T>>, S>,
}

/// Integer-keyed table.
pub type LabelPtrMap<T> = OwningKeyedTable<i64, T>;

impl<K, T: ?Sized> OwningKeyedTable<K, T>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            table: SlotTable::new(),
        }
    }
}

impl<K, T: ?Sized, S> OwningKeyedTable<K, T, S> {
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }

    pub fn count_non_null(&self) -> usize {
        self.table.iter().filter(|(_, _, v)| v.is_some()).count()
    }

    /// Remove every key and delete every object.
    pub fn clear(&mut self) {
        tracing::debug!(type_name = type_name::<T>(), len = self.len(), "clearing owning table");
        drop(self.table.drain());
    }

    /// Delete the current contents and adopt `other`'s, leaving `other` empty.
    pub fn transfer(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
        other.clear();
    }

    /// Erase the entry at `cursor`. A dead or end cursor is a no-op.
    pub fn erase_at(&mut self, cursor: Cursor) -> bool {
        match cursor.handle {
            Some(h) => self.table.remove(h).is_some(),
            None => false,
        }
    }

    /// `(key, slot)` pairs in unspecified order; null slots are yielded.
    pub fn iter(&self) -> impl Iterator<Item = (&K, Option<&T>)> + '_ {
        self.table.iter().map(|(_, k, v)| (k, v.as_deref()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, Option<&mut T>)> + '_ {
        self.table.iter_mut().map(|(_, k, v)| (k, v.as_deref_mut()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.table.iter().map(|(_, k, _)| k)
    }

    /// Keys in ascending order.
    pub fn sorted_keys(&self) -> Vec<&K>
    where
        K: Ord,
    {
        let mut keys: Vec<&K> = self.keys().collect();
        keys.sort_unstable();
        keys
    }

    /// Keep only the entries for which `keep` returns true; the others are
    /// erased and their objects deleted. Returns the number erased.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&K, Option<&T>) -> bool,
    {
        let doomed: Vec<Handle> = self
            .table
            .iter()
            .filter(|(_, k, v)| !keep(k, v.as_deref()))
            .map(|(h, _, _)| h)
            .collect();
        for &h in &doomed {
            drop(self.table.remove(h));
        }
        doomed.len()
    }
}

impl<K, T: ?Sized, S> OwningKeyedTable<K, T, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            table: SlotTable::with_hasher(hasher),
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.contains_key(key)
    }

    /// Object stored at `key`; `None` when absent or null.
    pub fn get<Q>(&self, key: &Q) -> Option<&T>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.lookup(key).value()
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut T>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let h = self.table.find(key)?;
        h.value_mut(&mut self.table).and_then(Option::as_deref_mut)
    }

    pub fn lookup<Q>(&self, key: &Q) -> Lookup<'_, T>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.table.find(key).and_then(|h| h.value(&self.table)) {
            None => Lookup::Absent,
            Some(None) => Lookup::Null,
            Some(Some(b)) => Lookup::Present(&**b),
        }
    }

    pub fn find<Q>(&self, key: &Q) -> Cursor
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        Cursor {
            handle: self.table.find(key),
        }
    }

    /// Insert or overwrite. An overwritten object is deleted. Returns true if
    /// `key` was not present before.
    pub fn set(&mut self, key: K, ptr: impl IntoOwned<T>) -> bool {
        let (h, inserted) = self.table.find_or_insert_with(key, || None);
        if let Some(slot) = h.value_mut(&mut self.table) {
            // The previous occupant is deleted after the new one is stored.
            let _old = core::mem::replace(slot, ptr.into_owned());
        }
        inserted
    }

    /// Insert only if `key` is absent. When it is present nothing changes and
    /// `ptr` is handed back unconsumed.
    pub fn insert<H>(&mut self, key: K, ptr: H) -> Result<(), H>
    where
        H: IntoOwned<T>,
    {
        let (h, inserted) = self.table.find_or_insert_with(key, || None);
        if !inserted {
            return Err(ptr);
        }
        if let Some(slot) = h.value_mut(&mut self.table) {
            *slot = ptr.into_owned();
        }
        Ok(())
    }

    /// Erase `key` and delete its object. Returns false if `key` was absent.
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.remove_key(key).is_some()
    }

    /// Take the object at `key` without deleting it. The key stays, now
    /// mapped to null. Absent or null keys yield an empty handle.
    pub fn release<Q>(&mut self, key: &Q) -> UniqueHandle<T>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = match self.table.find(key) {
            Some(h) => h.value_mut(&mut self.table),
            None => None,
        };
        UniqueHandle::from(slot.and_then(Option::take))
    }

    /// Erase `key`, handing out both the key and its (possibly empty) object.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, UniqueHandle<T>)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table
            .remove_key(key)
            .map(|(k, v)| (k, UniqueHandle::from(v)))
    }
}

impl<K, T, S> OwningKeyedTable<K, T, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Delete any object at `key` and construct `value` in its place.
    pub fn emplace_set(&mut self, key: K, value: T) -> &mut T {
        self.emplace_set_with(key, || value)
    }

    pub fn emplace_set_with<F>(&mut self, key: K, make: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        let (h, _) = self.table.find_or_insert_with(key, || None);
        let slot = match h.value_mut(&mut self.table) {
            Some(slot) => slot,
            None => unreachable!("handle returned by find_or_insert_with is live"),
        };
        // Delete the old occupant before constructing its replacement.
        drop(slot.take());
        slot.insert(Box::new(make()))
    }

    /// The object at `key` if there is one. Otherwise (key absent or mapped
    /// to null) construct one with `make` and store it.
    pub fn try_emplace<F>(&mut self, key: K, make: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        let (h, _) = self.table.find_or_insert_with(key, || None);
        let slot = match h.value_mut(&mut self.table) {
            Some(slot) => slot,
            None => unreachable!("handle returned by find_or_insert_with is live"),
        };
        &mut **slot.get_or_insert_with(|| Box::new(make()))
    }
}

impl<K, T: ?Sized, S> Default for OwningKeyedTable<K, T, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

/// Deep copy: every object is cloned, null slots stay null.
impl<K, T, S> Clone for OwningKeyedTable<K, T, S>
where
    K: Eq + Hash + Clone,
    T: ?Sized + Cloneable,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        tracing::debug!(type_name = type_name::<T>(), len = self.len(), "deep-cloning owning table");
        Self {
            table: self
                .table
                .clone_with(|v| v.as_deref().map(T::clone_boxed)),
        }
    }
}

impl<K, Q, T, S> Index<&Q> for OwningKeyedTable<K, T, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    T: ?Sized,
    S: BuildHasher,
{
    type Output = T;

    /// Fatal when `key` is absent or mapped to null.
    #[track_caller]
    fn index(&self, key: &Q) -> &T {
        match self.get(key) {
            Some(v) => v,
            None => fatal(HandleError::null::<Self>()),
        }
    }
}

impl<K, T: ?Sized, S> Extend<(K, Box<T>)> for OwningKeyedTable<K, T, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, Box<T>)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<K, T: ?Sized, S> FromIterator<(K, Box<T>)> for OwningKeyedTable<K, T, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, Box<T>)>>(iter: I) -> Self {
        let mut table = Self::default();
        table.extend(iter);
        table
    }
}

impl<K: fmt::Debug, T: ?Sized + fmt::Debug, S> fmt::Debug for OwningKeyedTable<K, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", type_name::<Self>())?;
        f.debug_map().entries(self.iter()).finish()
    }
}
