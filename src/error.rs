//! Error taxonomy for handle and container misuse.
//!
//! Programmer errors (null dereference, const violation, copying a
//! deallocated handle, ...) are described by [`HandleError`]. The fallible
//! `try_*` accessors return them; the panicking accessors route them through
//! [`fatal`], which logs and aborts the current thread with a message that
//! names the offending type.

use core::any::type_name;
use thiserror::Error;

/// Invariant violations detected by handles and owning containers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandleError {
    /// The handle (or slot) does not hold an object.
    #[error("{type_name}: dereferenced an unallocated handle")]
    Null { type_name: &'static str },

    /// Mutable access was requested through a const reference.
    #[error("{type_name}: attempted mutable access to a const reference")]
    ConstAccess { type_name: &'static str },

    /// Mutable access was requested to an allocation other handles still alias.
    #[error("{type_name}: attempted mutable access to an object shared by {count} handles")]
    SharedAccess { type_name: &'static str, count: i32 },

    /// A pointer-mode handle without an object was copied.
    #[error("{type_name}: attempted copy of a deallocated handle")]
    DeallocatedCopy { type_name: &'static str },

    /// An object was wrapped (or copied) while its counter disagreed with
    /// the number of handles that should alias it.
    #[error("{type_name}: object reference count is {count}, expected {expected}")]
    AlreadyShared {
        type_name: &'static str,
        count: i32,
        expected: i32,
    },

    /// An index outside `[0, len)` was used for a slot operation.
    #[error("{type_name}: index {index} out of range [0,{len})")]
    IndexOutOfRange {
        type_name: &'static str,
        index: usize,
        len: usize,
    },

    /// A present-but-null slot was dereferenced.
    #[error("{type_name}: cannot dereference null slot at index {index}")]
    NullSlot { type_name: &'static str, index: usize },
}

impl HandleError {
    pub(crate) fn null<H: ?Sized>() -> Self {
        Self::Null {
            type_name: type_name::<H>(),
        }
    }

    pub(crate) fn const_access<H: ?Sized>() -> Self {
        Self::ConstAccess {
            type_name: type_name::<H>(),
        }
    }

    pub(crate) fn shared_access<H: ?Sized>(count: i32) -> Self {
        Self::SharedAccess {
            type_name: type_name::<H>(),
            count,
        }
    }

    pub(crate) fn deallocated_copy<H: ?Sized>() -> Self {
        Self::DeallocatedCopy {
            type_name: type_name::<H>(),
        }
    }

    pub(crate) fn already_shared<H: ?Sized>(count: i32, expected: i32) -> Self {
        Self::AlreadyShared {
            type_name: type_name::<H>(),
            count,
            expected,
        }
    }

    pub(crate) fn index_out_of_range<H: ?Sized>(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            type_name: type_name::<H>(),
            index,
            len,
        }
    }

    pub(crate) fn null_slot<H: ?Sized>(index: usize) -> Self {
        Self::NullSlot {
            type_name: type_name::<H>(),
            index,
        }
    }
}

/// Structural insert failure of the keyed slot layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    #[error("key is already present")]
    DuplicateKey,
}

/// A specialized `Result` type for handle operations.
pub type Result<T> = core::result::Result<T, HandleError>;

/// Report an invariant violation and abort the current thread.
#[cold]
#[track_caller]
pub(crate) fn fatal(error: HandleError) -> ! {
    tracing::error!(%error, "fatal ownership violation");
    panic!("{error}");
}
