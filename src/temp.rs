//! Shared-or-reference temporary handle.
//!
//! [`TempHandle`] is what expression code returns: either a heap object
//! shared through the object's embedded [`RefCount`](crate::RefCount), or a
//! reference to an object owned elsewhere. Consumers read through it without
//! caring which, and use [`TempHandle::movable`] / [`TempHandle::ptr`] to
//! reuse a sole-owned allocation in place of copying it.
//!
//! Count discipline: every live pointer-mode handle accounts for exactly one
//! unit of the object's count. The handle that takes the count from one to
//! zero deletes the object.

use crate::error::{fatal, HandleError, Result};
use crate::owned::{Cloneable, IntoOwned};
use crate::ref_count::RefCounted;
use crate::ref_or_ptr::{RefOrPointer, Target};
use crate::unique::UniqueHandle;
use core::any::type_name;
use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

/// Storage mode of a [`TempHandle`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TempKind {
    /// Counted allocation (or nothing); may be stolen when sole-owned.
    Shared,
    /// Counted allocation pinned by a cache; never stolen.
    Pinned,
    /// Read-only reference to an object owned elsewhere.
    ConstRef,
    /// Mutable reference to an object owned elsewhere.
    MutRef,
}

impl TempKind {
    #[inline]
    fn is_pointer(self) -> bool {
        matches!(self, TempKind::Shared | TempKind::Pinned)
    }
}

pub struct TempHandle<'a, T: ?Sized + RefCounted> {
    ptr: Option<NonNull<T>>,
    // Copying a mutable reference demotes the source through `&self`.
    kind: Cell<TempKind>,
    _marker: PhantomData<(Box<T>, &'a mut T)>,
}

impl<'a, T: ?Sized + RefCounted> TempHandle<'a, T> {
    pub const fn empty() -> Self {
        Self {
            ptr: None,
            kind: Cell::new(TempKind::Shared),
            _marker: PhantomData,
        }
    }

    /// Take shared ownership of a fresh allocation. Fatal if its counter
    /// shows the object is already held by other handles.
    #[track_caller]
    pub fn new(boxed: Box<T>) -> Self {
        let count = boxed.ref_count().count();
        if count != 0 {
            // Leak rather than free: whoever holds the other counts still owns it.
            let _ = Box::leak(boxed);
            fatal(HandleError::already_shared::<Self>(count, 0));
        }
        boxed.ref_count().increment();
        Self {
            ptr: Some(NonNull::from(Box::leak(boxed))),
            kind: Cell::new(TempKind::Shared),
            _marker: PhantomData,
        }
    }

    pub fn borrowed(r: &'a T) -> Self {
        Self {
            ptr: Some(NonNull::from(r)),
            kind: Cell::new(TempKind::ConstRef),
            _marker: PhantomData,
        }
    }

    pub fn borrowed_mut(r: &'a mut T) -> Self {
        Self {
            ptr: Some(NonNull::from(r)),
            kind: Cell::new(TempKind::MutRef),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn kind(&self) -> TempKind {
        self.kind.get()
    }

    #[inline]
    pub fn is_pointer(&self) -> bool {
        self.kind.get().is_pointer()
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        !self.is_pointer()
    }

    #[inline]
    pub fn is_const(&self) -> bool {
        self.kind.get() == TempKind::ConstRef
    }

    #[inline]
    pub fn good(&self) -> bool {
        self.ptr.is_some()
    }

    /// Number of pointer-mode handles sharing the object; zero for references
    /// and empty handles.
    pub fn use_count(&self) -> i32 {
        match self.get() {
            Some(v) if self.is_pointer() => v.ref_count().count(),
            _ => 0,
        }
    }

    /// True if the object may be stolen or mutated in place: an unpinned,
    /// non-null allocation that no other handle aliases.
    pub fn movable(&self) -> bool {
        self.kind.get() == TempKind::Shared
            && self.get().is_some_and(|v| v.ref_count().unique())
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: the pointer is either counted by this handle or borrowed for 'a.
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

    /// Mutable access. Refused for const references, empty handles and
    /// allocations other handles still alias; check [`movable`](Self::movable)
    /// first or take a copy with [`ptr`](Self::ptr).
    ///
    /// The object may be overwritten whole through the guard; its count is
    /// put back when the guard drops.
    pub fn try_ref_mut(&mut self) -> Result<TempMut<'_, T>> {
        let Some(p) = self.ptr else {
            return Err(HandleError::null::<Self>());
        };
        match self.kind.get() {
            TempKind::ConstRef => Err(HandleError::const_access::<Self>()),
            // SAFETY: borrowed mutably for 'a and reborrowed through `&mut self`.
            TempKind::MutRef => Ok(TempMut::new(unsafe { &mut *p.as_ptr() })),
            TempKind::Shared | TempKind::Pinned => {
                // SAFETY: counted by this handle; `&mut self` and a count of one
                // exclude every other reader.
                let v = unsafe { &mut *p.as_ptr() };
                let count = v.ref_count().count();
                if count > 1 {
                    Err(HandleError::shared_access::<Self>(count))
                } else {
                    Ok(TempMut::new(v))
                }
            }
        }
    }

    #[track_caller]
    pub fn ref_mut(&mut self) -> TempMut<'_, T> {
        match self.try_ref_mut() {
            Ok(v) => v,
            Err(e) => fatal(e),
        }
    }

    /// Unchecked mutable access regardless of mode and aliasing.
    ///
    /// # Safety
    ///
    /// No other reference to the object (through this or any other handle, or
    /// through the original owner of a referenced object) may be live while
    /// the returned reference is used. The embedded counter must not be
    /// overwritten through it.
    #[track_caller]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn const_cast(&self) -> &mut T {
        match self.ptr {
            Some(p) => &mut *p.as_ptr(),
            None => fatal(HandleError::null::<Self>()),
        }
    }

    /// Pin (`true`) or unpin (`false`) a counted allocation. A pinned
    /// allocation is never stolen by [`ptr`](Self::ptr). No effect on references.
    pub fn protect(&mut self, on: bool) {
        if self.is_pointer() {
            self.kind
                .set(if on { TempKind::Pinned } else { TempKind::Shared });
        }
    }

    /// An allocation the caller owns exclusively: the object itself when this
    /// handle is its sole, unpinned owner, otherwise a clone. Fatal when empty.
    #[track_caller]
    pub fn ptr(&mut self) -> Box<T>
    where
        T: Cloneable,
    {
        let Some(p) = self.ptr else {
            fatal(HandleError::null::<Self>());
        };
        if self.movable() {
            self.ptr = None;
            // SAFETY: sole counted owner; the pointer came from `Box::leak`.
            let owned = unsafe { Box::from_raw(p.as_ptr()) };
            owned.ref_count().reset();
            tracing::trace!(type_name = type_name::<T>(), "stealing sole-owned temporary");
            return owned;
        }
        tracing::debug!(
            type_name = type_name::<T>(),
            kind = ?self.kind.get(),
            use_count = self.use_count(),
            "cloning temporary for exclusive ownership"
        );
        let copy = self.cref().clone_boxed();
        copy.ref_count().reset();
        copy
    }

    /// Exclusive ownership of the object (or a clone); empty for an empty handle.
    pub fn into_unique(mut self) -> UniqueHandle<T>
    where
        T: Cloneable,
    {
        if self.good() {
            UniqueHandle::new(self.ptr())
        } else {
            UniqueHandle::empty()
        }
    }

    /// Release this handle's share (or reference) and become empty.
    pub fn clear(&mut self) {
        let _old = core::mem::replace(self, Self::empty());
    }

    /// Release the current share and take shared ownership of `ptr`.
    #[track_caller]
    pub fn reset(&mut self, ptr: Option<Box<T>>) {
        let next = match ptr {
            Some(b) => Self::new(b),
            None => Self::empty(),
        };
        let _old = core::mem::replace(self, next);
    }

    pub fn set_ref(&mut self, r: &'a T) {
        let _old = core::mem::replace(self, Self::borrowed(r));
    }

    pub fn set_mut(&mut self, r: &'a mut T) {
        let _old = core::mem::replace(self, Self::borrowed_mut(r));
    }

    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Move out without touching the count; this handle is left empty.
    pub fn take(&mut self) -> Self {
        core::mem::replace(self, Self::empty())
    }
}

/// Mutable borrow of the object behind a [`TempHandle`].
///
/// Holds the count seen when the borrow began and writes it back on drop,
/// so assigning or swapping the whole object leaves the handle's share intact.
pub struct TempMut<'h, T: ?Sized + RefCounted> {
    value: &'h mut T,
    count: i32,
}

impl<'h, T: ?Sized + RefCounted> TempMut<'h, T> {
    fn new(value: &'h mut T) -> Self {
        let count = value.ref_count().count();
        Self { value, count }
    }
}

impl<T: ?Sized + RefCounted> Deref for TempMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.value
    }
}

impl<T: ?Sized + RefCounted> DerefMut for TempMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.value
    }
}

impl<T: ?Sized + RefCounted> Drop for TempMut<'_, T> {
    fn drop(&mut self) {
        let counter = self.value.ref_count();
        if counter.count() != self.count {
            tracing::trace!(
                type_name = type_name::<T>(),
                seen = counter.count(),
                restored = self.count,
                "restoring count after whole-object write"
            );
            counter.set(self.count);
        }
    }
}

impl<T: ?Sized + RefCounted + fmt::Debug> fmt::Debug for TempMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value, f)
    }
}

impl<T: RefCounted> TempHandle<'_, T> {
    #[track_caller]
    pub fn from_value(value: T) -> Self {
        Self::new(Box::new(value))
    }
}

impl<T: ?Sized + RefCounted> Clone for TempHandle<'_, T> {
    #[track_caller]
    fn clone(&self) -> Self {
        let kind = match self.kind.get() {
            TempKind::Shared | TempKind::Pinned => {
                let Some(v) = self.get() else {
                    if cfg!(feature = "relaxed-null-copy") {
                        return Self::empty();
                    }
                    fatal(HandleError::deallocated_copy::<Self>());
                };
                let count = v.ref_count().count();
                if count < 1 {
                    fatal(HandleError::already_shared::<Self>(count, 1));
                }
                v.ref_count().increment();
                self.kind.get()
            }
            TempKind::ConstRef => TempKind::ConstRef,
            TempKind::MutRef => {
                // Never two live mutable aliases: both ends become const.
                self.kind.set(TempKind::ConstRef);
                TempKind::ConstRef
            }
        };
        Self {
            ptr: self.ptr,
            kind: Cell::new(kind),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized + RefCounted> Drop for TempHandle<'_, T> {
    fn drop(&mut self) {
        if !self.is_pointer() {
            return;
        }
        let Some(p) = self.ptr.take() else {
            return;
        };
        // SAFETY: this handle holds one unit of the count, so the object is alive.
        let last = unsafe { p.as_ref() }.ref_count().decrement();
        if last {
            tracing::trace!(type_name = type_name::<T>(), "deleting object released by last temporary");
            // SAFETY: count reached zero; the pointer came from `Box::leak`.
            drop(unsafe { Box::from_raw(p.as_ptr()) });
        }
    }
}

impl<T: ?Sized + RefCounted> Default for TempHandle<'_, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized + RefCounted> From<Box<T>> for TempHandle<'_, T> {
    #[track_caller]
    fn from(boxed: Box<T>) -> Self {
        Self::new(boxed)
    }
}

impl<T: ?Sized + RefCounted> From<UniqueHandle<T>> for TempHandle<'_, T> {
    #[track_caller]
    fn from(handle: UniqueHandle<T>) -> Self {
        match handle.into_box() {
            Some(b) => Self::new(b),
            None => Self::empty(),
        }
    }
}

impl<'a, T: ?Sized + RefCounted> From<RefOrPointer<'a, T>> for TempHandle<'a, T> {
    #[track_caller]
    fn from(handle: RefOrPointer<'a, T>) -> Self {
        match handle.into_target() {
            Target::Owned(Some(b)) => Self::new(b),
            Target::Owned(None) => Self::empty(),
            Target::Const(r) => Self::borrowed(r),
            Target::Mut(r) => Self::borrowed_mut(r),
        }
    }
}

impl<'a, T: ?Sized + RefCounted> From<&'a T> for TempHandle<'a, T> {
    fn from(r: &'a T) -> Self {
        Self::borrowed(r)
    }
}

impl<'a, T: ?Sized + RefCounted> From<&'a mut T> for TempHandle<'a, T> {
    fn from(r: &'a mut T) -> Self {
        Self::borrowed_mut(r)
    }
}

impl<T: ?Sized + RefCounted + Cloneable> IntoOwned<T> for TempHandle<'_, T> {
    fn into_owned(mut self) -> Option<Box<T>> {
        if self.good() {
            Some(self.ptr())
        } else {
            None
        }
    }
}

impl<T: ?Sized + RefCounted> Deref for TempHandle<'_, T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        self.cref()
    }
}

impl<T: ?Sized + RefCounted + fmt::Debug> fmt::Debug for TempHandle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("kind", &self.kind.get())
            .field("use_count", &self.use_count())
            .field("value", &self.get())
            .finish()
    }
}
