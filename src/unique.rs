//! Sole-ownership handle.

use crate::error::{fatal, HandleError, Result};
use crate::owned::{Cloneable, IntoOwned};
use core::any::type_name;
use core::fmt;
use core::ops::{Deref, DerefMut};

/// Exclusive owner of at most one heap object.
///
/// Move-only. Dereferencing an empty handle is fatal; use [`get`](Self::get)
/// or [`try_get`](Self::try_get) where emptiness is expected.
pub struct UniqueHandle<T: ?Sized> {
    ptr: Option<Box<T>>,
}

impl<T: ?Sized> UniqueHandle<T> {
    pub const fn empty() -> Self {
        Self { ptr: None }
    }

    pub fn new(boxed: Box<T>) -> Self {
        Self { ptr: Some(boxed) }
    }

    /// True if an object is held.
    #[inline]
    pub fn good(&self) -> bool {
        self.ptr.is_some()
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.ptr.as_deref()
    }

    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.ptr.as_deref_mut()
    }

    pub fn try_get(&self) -> Result<&T> {
        self.ptr.as_deref().ok_or_else(HandleError::null::<Self>)
    }

    pub fn try_get_mut(&mut self) -> Result<&mut T> {
        self.ptr
            .as_deref_mut()
            .ok_or_else(HandleError::null::<Self>)
    }

    /// Const access; fatal when empty.
    #[track_caller]
    pub fn cref(&self) -> &T {
        match self.ptr.as_deref() {
            Some(v) => v,
            None => fatal(HandleError::null::<Self>()),
        }
    }

    /// Mutable access; fatal when empty.
    #[track_caller]
    pub fn ref_mut(&mut self) -> &mut T {
        match self.ptr.as_deref_mut() {
            Some(v) => v,
            None => fatal(HandleError::null::<Self>()),
        }
    }

    /// Give up ownership without deleting. The handle is left empty.
    #[inline]
    pub fn release(&mut self) -> Option<Box<T>> {
        self.ptr.take()
    }

    /// Delete the current object (if any) and adopt `ptr`.
    pub fn reset(&mut self, ptr: Option<Box<T>>) {
        // The old object is dropped after the new one is in place.
        let _old = core::mem::replace(&mut self.ptr, ptr);
    }

    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(&mut self.ptr, &mut other.ptr);
    }

    pub fn into_box(self) -> Option<Box<T>> {
        self.ptr
    }

    /// Deep copy of the held object, or an empty handle.
    pub fn clone_value(&self) -> Self
    where
        T: Cloneable,
    {
        Self {
            ptr: self.ptr.as_deref().map(T::clone_boxed),
        }
    }
}

impl<T> UniqueHandle<T> {
    pub fn from_value(value: T) -> Self {
        Self::new(Box::new(value))
    }

    /// Replace the held object with `value` and return a reference to it.
    pub fn emplace(&mut self, value: T) -> &mut T {
        self.ptr.insert(Box::new(value))
    }
}

impl<T: ?Sized> Default for UniqueHandle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> From<Box<T>> for UniqueHandle<T> {
    fn from(boxed: Box<T>) -> Self {
        Self::new(boxed)
    }
}

impl<T: ?Sized> From<Option<Box<T>>> for UniqueHandle<T> {
    fn from(ptr: Option<Box<T>>) -> Self {
        Self { ptr }
    }
}

impl<T: ?Sized> IntoOwned<T> for UniqueHandle<T> {
    #[inline]
    fn into_owned(self) -> Option<Box<T>> {
        self.ptr
    }
}

impl<T: ?Sized> Deref for UniqueHandle<T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        self.cref()
    }
}

impl<T: ?Sized> DerefMut for UniqueHandle<T> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        self.ref_mut()
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for UniqueHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("ptr", &self.ptr)
            .finish()
    }
}
