//! field-handles: single-threaded ownership handles and owning containers
//! for heap objects that are passed between expression temporaries.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: every heap object has exactly one owner, or a precisely counted
//!   set of sharers, and every borrowed object is tagged as such so that
//!   no handle ever deletes what it does not own.
//! - Handles:
//!   - UniqueHandle<T>: sole owner of at most one object.
//!   - RefOrPointer<'a, T>: either owns an object or borrows one (const or
//!     mutable). Conversion to an owned pointer steals when it owns and
//!     clones when it borrows.
//!   - TempHandle<'a, T>: like RefOrPointer, but owned objects are shared
//!     through an intrusive counter embedded in `T` (`RefCounted`, an
//!     unsafe trait). Mutable access goes through `TempMut`, which puts the
//!     count back if the whole object is overwritten.
//! - Containers:
//!   - RefList<'a, T>: non-owning dense list of optional references.
//!   - OwningIndexedList<T>: dense list of optional owned objects.
//!   - OwningKeyedTable<K, T, S>: hash table of optional owned objects,
//!     stored in a `SlotTable` with stable generational handles.
//!
//! Constraints
//! - Single-threaded: handles are `!Send`/`!Sync`; the counter is a
//!   `Cell<i32>`, not an atomic.
//! - `T: ?Sized` throughout, so containers hold trait objects. Deep copies
//!   go through `Cloneable`, which `dyn` types implement by hand.
//! - Anything that can surrender an allocation implements `IntoOwned`; a
//!   `None` becomes a present-but-null slot.
//!
//! Failure boundaries
//! - Programmer errors (dereferencing an empty handle, mutable access to a
//!   const reference, copying a deallocated handle, out-of-range slot
//!   writes) are fatal: logged through `tracing` and then panicked with a
//!   message naming the offending type. `try_*` accessors return the same
//!   conditions as `HandleError`.
//! - Benign absence (lookup miss, release of a null or missing slot,
//!   erase of an absent key, insert of a present key) returns `Option`,
//!   `bool`, an empty handle, or the unconsumed argument.
//!
//! Copying a pointer-mode handle
//! - The borrow checker cannot see an owned handle degrading into a
//!   reference to the object its copy now owns, so that operation is
//!   `unsafe fn shallow_copy`. `take` (move out, source empty) and `share`
//!   (const reference that borrows the source) are the safe forms.
//!
//! Hasher and rehashing invariants
//! - Each table entry stores a precomputed `u64` hash; `K: Hash` is never
//!   invoked after insertion, including when the table is cloned.
//!
//! Configuration
//! - Feature `relaxed-null-copy`: copying a null pointer-mode handle yields
//!   another empty handle instead of a fatal error.

mod error;
mod indexed_list;
mod keyed_table;
mod owned;
mod ref_count;
mod ref_list;
mod ref_or_ptr;
pub mod slot_table;
mod temp;
mod unique;

// Public surface
pub use error::{HandleError, InsertError, Result};
pub use indexed_list::OwningIndexedList;
pub use keyed_table::{Cursor, LabelPtrMap, Lookup, OwningKeyedTable};
pub use owned::{Cloneable, IntoOwned};
pub use ref_count::{Counted, RefCount, RefCounted};
pub use ref_list::RefList;
pub use ref_or_ptr::{RefKind, RefOrPointer, Target};
pub use temp::{TempHandle, TempKind, TempMut};
pub use unique::UniqueHandle;
