//! Non-owning indexed list of optional references.

use crate::error::{fatal, HandleError, Result};
use core::any::type_name;
use core::fmt;
use core::ops::Index;

/// Dense sequence of `Option<&T>` slots. Never deletes anything; a `None`
/// slot is a legal "nothing stored here".
pub struct RefList<'a, T: ?Sized> {
    ptrs: Vec<Option<&'a T>>,
}

impl<'a, T: ?Sized> RefList<'a, T> {
    pub const fn new() -> Self {
        Self { ptrs: Vec::new() }
    }

    /// A list of `len` null slots.
    pub fn with_len(len: usize) -> Self {
        Self {
            ptrs: vec![None; len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ptrs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ptrs.is_empty()
    }

    /// Grow with null slots or truncate.
    pub fn resize(&mut self, len: usize) {
        self.ptrs.resize(len, None);
    }

    pub fn clear(&mut self) {
        self.ptrs.clear();
    }

    /// Reference at `i`; `None` for a null slot or an index out of range.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&'a T> {
        self.ptrs.get(i).copied().flatten()
    }

    pub fn try_index(&self, i: usize) -> Result<&'a T> {
        match self.ptrs.get(i) {
            Some(Some(r)) => Ok(*r),
            Some(None) => Err(HandleError::null_slot::<Self>(i)),
            None => Err(HandleError::index_out_of_range::<Self>(i, self.len())),
        }
    }

    /// Store `r` at `i`, returning the previous reference. Fatal out of range.
    #[track_caller]
    pub fn set(&mut self, i: usize, r: Option<&'a T>) -> Option<&'a T> {
        let len = self.len();
        match self.ptrs.get_mut(i) {
            Some(slot) => core::mem::replace(slot, r),
            None => fatal(HandleError::index_out_of_range::<Self>(i, len)),
        }
    }

    pub fn push(&mut self, r: Option<&'a T>) {
        self.ptrs.push(r);
    }

    pub fn count_non_null(&self) -> usize {
        self.ptrs.iter().filter(|p| p.is_some()).count()
    }

    /// Move non-null entries to the front (keeping their order), truncate the
    /// nulls and return the new length.
    pub fn squeeze_null(&mut self) -> usize {
        self.ptrs.retain(Option::is_some);
        self.ptrs.len()
    }

    /// `(index, slot)` pairs; null slots are yielded, not skipped.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<&'a T>)> + '_ {
        self.ptrs.iter().copied().enumerate()
    }
}

impl<T: ?Sized> Default for RefList<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for RefList<'_, T> {
    fn clone(&self) -> Self {
        Self {
            ptrs: self.ptrs.clone(),
        }
    }
}

impl<'a, T: ?Sized> Index<usize> for RefList<'a, T> {
    type Output = T;

    #[track_caller]
    fn index(&self, i: usize) -> &T {
        match self.try_index(i) {
            Ok(r) => r,
            Err(e) => fatal(e),
        }
    }
}

impl<'a, T: ?Sized> FromIterator<&'a T> for RefList<'a, T> {
    fn from_iter<I: IntoIterator<Item = &'a T>>(iter: I) -> Self {
        Self {
            ptrs: iter.into_iter().map(Some).collect(),
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for RefList<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("ptrs", &self.ptrs)
            .finish()
    }
}
