//! Reference-or-pointer handle.
//!
//! A [`RefOrPointer`] either owns one heap object outright or refers to an
//! object owned elsewhere (typically a long-lived, named field). It carries no
//! reference count: call sites pick it when they want "a reference, or a
//! fresh result I now own" without bookkeeping overhead.

use crate::error::{fatal, HandleError, Result};
use crate::owned::{Cloneable, IntoOwned};
use crate::unique::UniqueHandle;
use core::any::type_name;
use core::fmt;
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;

/// Storage mode of a [`RefOrPointer`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RefKind {
    /// The handle owns the object (or nothing).
    Owned,
    /// Read-only reference to an object owned elsewhere.
    ConstRef,
    /// Mutable reference to an object owned elsewhere.
    MutRef,
}

/// A [`RefOrPointer`] decomposed into an explicit sum type.
#[derive(Debug)]
pub enum Target<'a, T: ?Sized> {
    Owned(Option<Box<T>>),
    Const(&'a T),
    Mut(&'a mut T),
}

pub struct RefOrPointer<'a, T: ?Sized> {
    ptr: Option<NonNull<T>>,
    kind: RefKind,
    _marker: PhantomData<(Box<T>, &'a mut T)>,
}

impl<'a, T: ?Sized> RefOrPointer<'a, T> {
    pub const fn empty() -> Self {
        Self {
            ptr: None,
            kind: RefKind::Owned,
            _marker: PhantomData,
        }
    }

    pub fn new(boxed: Box<T>) -> Self {
        Self {
            ptr: Some(NonNull::from(Box::leak(boxed))),
            kind: RefKind::Owned,
            _marker: PhantomData,
        }
    }

    pub fn borrowed(r: &'a T) -> Self {
        Self {
            ptr: Some(NonNull::from(r)),
            kind: RefKind::ConstRef,
            _marker: PhantomData,
        }
    }

    pub fn borrowed_mut(r: &'a mut T) -> Self {
        Self {
            ptr: Some(NonNull::from(r)),
            kind: RefKind::MutRef,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn kind(&self) -> RefKind {
        self.kind
    }

    #[inline]
    pub fn is_pointer(&self) -> bool {
        self.kind == RefKind::Owned
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        self.kind != RefKind::Owned
    }

    /// True if an object is owned or referenced.
    #[inline]
    pub fn good(&self) -> bool {
        self.ptr.is_some()
    }

    /// True if the object is owned here and may be stolen without a copy.
    #[inline]
    pub fn movable(&self) -> bool {
        self.kind == RefKind::Owned && self.ptr.is_some()
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: the pointer is either owned by us or borrowed for 'a.
        self.ptr.map(|p| unsafe { &*p.as_ptr() })
    }

    pub fn try_get(&self) -> Result<&T> {
        self.get().ok_or_else(HandleError::null::<Self>)
    }

    #[track_caller]
    pub fn cref(&self) -> &T {
        match self.get() {
            Some(v) => v,
            None => fatal(HandleError::null::<Self>()),
        }
    }

    /// Mutable access. Refused for const references and empty handles.
    pub fn try_ref_mut(&mut self) -> Result<&mut T> {
        match (self.kind, self.ptr) {
            (RefKind::ConstRef, _) => Err(HandleError::const_access::<Self>()),
            (_, None) => Err(HandleError::null::<Self>()),
            // SAFETY: owned, or borrowed mutably for 'a; `&mut self` excludes other access.
            (_, Some(p)) => Ok(unsafe { &mut *p.as_ptr() }),
        }
    }

    #[track_caller]
    pub fn ref_mut(&mut self) -> &mut T {
        match self.try_ref_mut() {
            Ok(v) => v,
            Err(e) => fatal(e),
        }
    }

    /// Peek without transfer: a const reference to the current object that
    /// borrows this handle.
    pub fn share(&self) -> RefOrPointer<'_, T> {
        match self.get() {
            Some(r) => RefOrPointer::borrowed(r),
            None => RefOrPointer::empty(),
        }
    }

    /// Move everything out, leaving this handle empty (pointer mode, null).
    pub fn take(&mut self) -> Self {
        core::mem::replace(self, Self::empty())
    }

    /// Shallow copy that moves ownership to the copy and degrades this handle
    /// to a const reference to the same object.
    ///
    /// References are copied; a mutable reference is handed to the copy and
    /// this handle keeps a const view.
    ///
    /// # Safety
    ///
    /// When this handle owned its object, the returned handle now does. The
    /// caller must keep the returned handle alive, and must not mutate through
    /// it, for as long as this handle is used afterwards.
    #[track_caller]
    pub unsafe fn shallow_copy(&mut self) -> Self {
        match (self.kind, self.ptr) {
            (RefKind::Owned, None) => {
                if cfg!(feature = "relaxed-null-copy") {
                    Self::empty()
                } else {
                    fatal(HandleError::deallocated_copy::<Self>())
                }
            }
            (RefKind::ConstRef, ptr) => Self {
                ptr,
                kind: RefKind::ConstRef,
                _marker: PhantomData,
            },
            (kind, ptr) => {
                self.kind = RefKind::ConstRef;
                Self {
                    ptr,
                    kind,
                    _marker: PhantomData,
                }
            }
        }
    }

    /// Give up ownership without deleting. References are left untouched and
    /// yield `None`.
    pub fn release(&mut self) -> Option<Box<T>> {
        if self.kind != RefKind::Owned {
            return None;
        }
        // SAFETY: in owned mode the pointer came from `Box::leak`.
        self.ptr.take().map(|p| unsafe { Box::from_raw(p.as_ptr()) })
    }

    /// An allocation the caller owns: the held object when owned, otherwise
    /// a clone of the referenced one. Fatal when empty.
    #[track_caller]
    pub fn ptr(&mut self) -> Box<T>
    where
        T: Cloneable,
    {
        if let Some(owned) = self.release() {
            tracing::trace!(type_name = type_name::<T>(), "stealing owned object");
            return owned;
        }
        match self.get() {
            Some(r) => {
                tracing::debug!(type_name = type_name::<T>(), "cloning referenced object");
                r.clone_boxed()
            }
            None => fatal(HandleError::null::<Self>()),
        }
    }

    /// Delete any owned object and take ownership of `ptr`.
    pub fn reset(&mut self, ptr: Option<Box<T>>) {
        let _old = core::mem::replace(self, Self::from(ptr));
    }

    /// Delete any owned object and refer to `r`.
    pub fn set_ref(&mut self, r: &'a T) {
        let _old = core::mem::replace(self, Self::borrowed(r));
    }

    /// Delete any owned object and refer mutably to `r`.
    pub fn set_mut(&mut self, r: &'a mut T) {
        let _old = core::mem::replace(self, Self::borrowed_mut(r));
    }

    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    pub fn into_target(self) -> Target<'a, T> {
        let this = core::mem::ManuallyDrop::new(self);
        match (this.kind, this.ptr) {
            // SAFETY: owned pointer came from `Box::leak`; `this` will not drop it.
            (RefKind::Owned, ptr) => {
                Target::Owned(ptr.map(|p| unsafe { Box::from_raw(p.as_ptr()) }))
            }
            // SAFETY: reference modes always hold a pointer borrowed for 'a.
            (RefKind::ConstRef, Some(p)) => Target::Const(unsafe { &*p.as_ptr() }),
            (RefKind::MutRef, Some(p)) => Target::Mut(unsafe { &mut *p.as_ptr() }),
            (_, None) => Target::Owned(None),
        }
    }
}

impl<T> RefOrPointer<'_, T> {
    pub fn from_value(value: T) -> Self {
        Self::new(Box::new(value))
    }
}

impl<T: ?Sized> Drop for RefOrPointer<'_, T> {
    fn drop(&mut self) {
        drop(self.release());
    }
}

impl<T: ?Sized> Default for RefOrPointer<'_, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> From<Box<T>> for RefOrPointer<'_, T> {
    fn from(boxed: Box<T>) -> Self {
        Self::new(boxed)
    }
}

impl<T: ?Sized> From<Option<Box<T>>> for RefOrPointer<'_, T> {
    fn from(ptr: Option<Box<T>>) -> Self {
        match ptr {
            Some(b) => Self::new(b),
            None => Self::empty(),
        }
    }
}

impl<T: ?Sized> From<UniqueHandle<T>> for RefOrPointer<'_, T> {
    fn from(handle: UniqueHandle<T>) -> Self {
        Self::from(handle.into_box())
    }
}

impl<'a, T: ?Sized> From<&'a T> for RefOrPointer<'a, T> {
    fn from(r: &'a T) -> Self {
        Self::borrowed(r)
    }
}

impl<'a, T: ?Sized> From<&'a mut T> for RefOrPointer<'a, T> {
    fn from(r: &'a mut T) -> Self {
        Self::borrowed_mut(r)
    }
}

impl<T: ?Sized + Cloneable> IntoOwned<T> for RefOrPointer<'_, T> {
    fn into_owned(mut self) -> Option<Box<T>> {
        if self.good() {
            Some(self.ptr())
        } else {
            None
        }
    }
}

impl<T: ?Sized> Deref for RefOrPointer<'_, T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        self.cref()
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for RefOrPointer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("kind", &self.kind)
            .field("value", &self.get())
            .finish()
    }
}
