//! Intrusive, non-atomic reference counter.
//!
//! Objects that want to be shared by several pointer-mode
//! [`TempHandle`](crate::TempHandle)s embed a [`RefCount`] and expose it
//! through [`RefCounted`]. The counter lives inside the managed object, so
//! sharing needs no side allocation.

use core::cell::Cell;
use core::ops::{Deref, DerefMut};

/// Single-threaded counter of the handles aliasing one heap object.
///
/// Starts at zero. Cloning a counter yields a fresh zero counter: a deep copy
/// of an object is never born shared.
///
/// Only the handles in this crate move the count. Outside code can read it
/// but not change it:
///
/// ```compile_fail
/// use field_handles::RefCount;
///
/// let rc = RefCount::new();
/// rc.decrement();
/// ```
#[derive(Debug, Default)]
pub struct RefCount {
    count: Cell<i32>,
}

impl RefCount {
    pub const fn new() -> Self {
        Self {
            count: Cell::new(0),
        }
    }

    /// Current number of counted handles.
    #[inline]
    pub fn count(&self) -> i32 {
        self.count.get()
    }

    /// True when at most one handle aliases the object.
    #[inline]
    pub fn unique(&self) -> bool {
        self.count.get() <= 1
    }

    #[inline]
    pub(crate) fn reset(&self) {
        self.count.set(0);
    }

    #[inline]
    pub(crate) fn set(&self, n: i32) {
        self.count.set(n);
    }

    /// Add one alias and return the new count.
    #[inline]
    pub(crate) fn increment(&self) -> i32 {
        match self.count.get().checked_add(1) {
            Some(n) => {
                self.count.set(n);
                n
            }
            // Same policy as `Rc`: abort rather than continue with a wrapped count.
            None => std::process::abort(),
        }
    }

    /// Drop one alias. Returns true if the count is now zero.
    #[inline]
    pub(crate) fn decrement(&self) -> bool {
        let c = self.count.get();
        assert!(c > 0, "RefCount underflow");
        self.count.set(c - 1);
        c == 1
    }
}

impl Clone for RefCount {
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// Access to the counter embedded in a managed object.
///
/// # Safety
///
/// `ref_count` must return a counter stored inside `self`, the same one on
/// every call. It must not be shared with any other object, and nothing but
/// the handles of this crate may change it. [`TempHandle`](crate::TempHandle)
/// frees the object when that counter reaches zero.
///
/// ```compile_fail
/// use field_handles::{RefCount, RefCounted};
///
/// struct Plain(RefCount);
///
/// impl RefCounted for Plain {
///     fn ref_count(&self) -> &RefCount {
///         &self.0
///     }
/// }
/// ```
pub unsafe trait RefCounted {
    fn ref_count(&self) -> &RefCount;
}

// SAFETY: the counter is `self`.
unsafe impl RefCounted for RefCount {
    fn ref_count(&self) -> &RefCount {
        self
    }
}

/// Attach a [`RefCount`] to a value that does not embed one.
#[derive(Debug, Default, Clone)]
pub struct Counted<T> {
    refcount: RefCount,
    value: T,
}

impl<T> Counted<T> {
    pub fn new(value: T) -> Self {
        Self {
            refcount: RefCount::new(),
            value,
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

// SAFETY: returns the embedded `refcount` field.
unsafe impl<T> RefCounted for Counted<T> {
    fn ref_count(&self) -> &RefCount {
        &self.refcount
    }
}

impl<T> Deref for Counted<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Counted<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: PartialEq> PartialEq for Counted<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> From<T> for Counted<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
