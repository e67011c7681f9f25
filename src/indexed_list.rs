//! Owning indexed list of heap objects.
//!
//! Each slot is either null or the sole owner of one boxed object. Objects
//! enter through anything that implements [`IntoOwned`] (a `Box`, one of the
//! crate's handles, or `None` for a null slot) and leave through
//! [`release`](OwningIndexedList::release), [`set`](OwningIndexedList::set)
//! (which hands back the previous occupant) or deletion.
//!
//! Storage is a plain `Vec<Option<Box<T>>>`, not a [`RefList`]: a list of
//! borrowed references cannot also own what it points to. [`RefList`] is the
//! non-owning counterpart, and
//! [`to_ref_list`](OwningIndexedList::to_ref_list) lends the current slots
//! out as one.

use crate::error::{fatal, HandleError, Result};
use crate::owned::{Cloneable, IntoOwned};
use crate::ref_list::RefList;
use crate::unique::UniqueHandle;
use core::any::type_name;
use core::fmt;
use core::ops::{Index, IndexMut};
use core::ptr::NonNull;

pub struct OwningIndexedList<T: ?Sized> {
    slots: Vec<Option<Box<T>>>,
}

impl<T: ?Sized> OwningIndexedList<T> {
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// A list of `len` null slots.
    pub fn with_len(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Self { slots }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Object at `i`; `None` for a null slot or an index out of range.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&T> {
        self.slots.get(i).and_then(Option::as_deref)
    }

    #[inline]
    pub fn get_mut(&mut self, i: usize) -> Option<&mut T> {
        self.slots.get_mut(i).and_then(Option::as_deref_mut)
    }

    /// True if slot `i` exists and holds an object.
    pub fn is_set(&self, i: usize) -> bool {
        self.get(i).is_some()
    }

    pub fn try_index(&self, i: usize) -> Result<&T> {
        match self.slots.get(i) {
            Some(Some(b)) => Ok(&**b),
            Some(None) => Err(HandleError::null_slot::<Self>(i)),
            None => Err(HandleError::index_out_of_range::<Self>(i, self.len())),
        }
    }

    pub fn try_index_mut(&mut self, i: usize) -> Result<&mut T> {
        let len = self.len();
        match self.slots.get_mut(i) {
            Some(Some(b)) => Ok(&mut **b),
            Some(None) => Err(HandleError::null_slot::<Self>(i)),
            None => Err(HandleError::index_out_of_range::<Self>(i, len)),
        }
    }

    pub fn count_non_null(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Delete every object and empty the list.
    pub fn clear(&mut self) {
        tracing::debug!(type_name = type_name::<T>(), len = self.len(), "clearing owning list");
        self.slots.clear();
    }

    /// Delete every object, keeping the length: all slots become null.
    pub fn free(&mut self) {
        for slot in &mut self.slots {
            drop(slot.take());
        }
    }

    /// Grow with null slots, or truncate and delete the dropped objects.
    pub fn resize(&mut self, len: usize) {
        self.slots.resize_with(len, || None);
    }

    /// Delete everything, then resize to `len` null slots.
    pub fn resize_null(&mut self, len: usize) {
        self.free();
        self.resize(len);
    }

    /// Append, taking ownership. `None` (or an empty handle) appends a null slot.
    pub fn push_back(&mut self, ptr: impl IntoOwned<T>) {
        self.slots.push(ptr.into_owned());
    }

    /// Relocate every slot of `other` to the end of this list and leave
    /// `other` empty. No object is cloned.
    pub fn append(&mut self, other: &mut Self) {
        self.slots.append(&mut other.slots);
    }

    /// Store `ptr` at `i` and hand back the previous occupant. Fatal out of range.
    #[track_caller]
    pub fn set(&mut self, i: usize, ptr: impl IntoOwned<T>) -> UniqueHandle<T> {
        let slot = self.slot_mut(i);
        UniqueHandle::from(core::mem::replace(slot, ptr.into_owned()))
    }

    /// Raw-pointer form of [`set`](Self::set). Storing the pointer that
    /// already occupies slot `i` is a no-op returning an empty handle.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must either be the current occupant of slot `i` or
    /// come from `Box::into_raw` with no other owner.
    #[track_caller]
    pub unsafe fn set_raw(&mut self, i: usize, ptr: *mut T) -> UniqueHandle<T> {
        let slot = self.slot_mut(i);
        if let Some(cur) = slot.as_deref_mut() {
            if core::ptr::addr_eq(cur as *mut T, ptr) {
                return UniqueHandle::empty();
            }
        }
        let next = if ptr.is_null() {
            None
        } else {
            Some(Box::from_raw(ptr))
        };
        UniqueHandle::from(core::mem::replace(slot, next))
    }

    /// Address of the object in slot `i`, without giving up ownership.
    pub fn slot_ptr(&mut self, i: usize) -> Option<NonNull<T>> {
        self.get_mut(i).map(NonNull::from)
    }

    /// Take the object out of slot `i` without deleting it; the slot becomes
    /// null. Out of range yields an empty handle.
    pub fn release(&mut self, i: usize) -> UniqueHandle<T> {
        match self.slots.get_mut(i) {
            Some(slot) => UniqueHandle::from(slot.take()),
            None => UniqueHandle::empty(),
        }
    }

    /// Delete the current contents and adopt `other`'s, leaving `other` empty.
    pub fn transfer(&mut self, other: &mut Self) {
        self.slots = core::mem::take(&mut other.slots);
    }

    /// Drop null slots, keeping object order. Returns the new length.
    pub fn squeeze_null(&mut self) -> usize {
        self.slots.retain(Option::is_some);
        self.slots.len()
    }

    /// `(index, slot)` pairs; null slots are yielded, not skipped.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<&T>)> + '_ {
        self.slots.iter().map(Option::as_deref).enumerate()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, Option<&mut T>)> + '_ {
        self.slots.iter_mut().map(Option::as_deref_mut).enumerate()
    }

    /// Non-owning view of the current slots.
    pub fn to_ref_list(&self) -> RefList<'_, T> {
        let mut view = RefList::new();
        for (_, slot) in self.iter() {
            view.push(slot);
        }
        view
    }

    #[track_caller]
    fn slot_mut(&mut self, i: usize) -> &mut Option<Box<T>> {
        let len = self.len();
        match self.slots.get_mut(i) {
            Some(slot) => slot,
            None => fatal(HandleError::index_out_of_range::<Self>(i, len)),
        }
    }
}

impl<T> OwningIndexedList<T> {
    /// Append a new object and return a reference to it.
    pub fn emplace_back(&mut self, value: T) -> &mut T {
        self.slots.push(None);
        let last = self.slots.len() - 1;
        self.slots[last].insert(Box::new(value))
    }

    /// Delete the occupant of slot `i` and construct `value` there.
    #[track_caller]
    pub fn emplace_set(&mut self, i: usize, value: T) -> &mut T {
        self.emplace_set_with(i, || value)
    }

    #[track_caller]
    pub fn emplace(&mut self, i: usize, value: T) -> &mut T {
        self.emplace_set(i, value)
    }

    #[track_caller]
    pub fn emplace_set_with<F>(&mut self, i: usize, make: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        let slot = self.slot_mut(i);
        // Delete the old occupant before constructing its replacement.
        drop(slot.take());
        slot.insert(Box::new(make()))
    }

    /// The occupant of slot `i` if there is one, otherwise a new object from
    /// `make`. `make` runs only when the slot is null. Fatal out of range.
    #[track_caller]
    pub fn try_emplace<F>(&mut self, i: usize, make: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        &mut **self.slot_mut(i).get_or_insert_with(|| Box::new(make()))
    }
}

impl<T: ?Sized> Default for OwningIndexedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep copy: every object is cloned, null slots stay null.
impl<T: ?Sized + Cloneable> Clone for OwningIndexedList<T> {
    fn clone(&self) -> Self {
        tracing::debug!(type_name = type_name::<T>(), len = self.len(), "deep-cloning owning list");
        Self {
            slots: self
                .slots
                .iter()
                .map(|s| s.as_deref().map(T::clone_boxed))
                .collect(),
        }
    }
}

impl<T: ?Sized> Index<usize> for OwningIndexedList<T> {
    type Output = T;

    #[track_caller]
    fn index(&self, i: usize) -> &T {
        match self.try_index(i) {
            Ok(v) => v,
            Err(e) => fatal(e),
        }
    }
}

impl<T: ?Sized> IndexMut<usize> for OwningIndexedList<T> {
    #[track_caller]
    fn index_mut(&mut self, i: usize) -> &mut T {
        match self.try_index_mut(i) {
            Ok(v) => v,
            Err(e) => fatal(e),
        }
    }
}

impl<T: ?Sized> FromIterator<Box<T>> for OwningIndexedList<T> {
    fn from_iter<I: IntoIterator<Item = Box<T>>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().map(Some).collect(),
        }
    }
}

impl<T: ?Sized> Extend<Box<T>> for OwningIndexedList<T> {
    fn extend<I: IntoIterator<Item = Box<T>>>(&mut self, iter: I) {
        self.slots.extend(iter.into_iter().map(Some));
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for OwningIndexedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("slots", &self.slots)
            .finish()
    }
}
