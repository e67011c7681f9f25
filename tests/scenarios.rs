// Ownership scenarios (consolidated).
//
// Each test documents what behavior is being verified and which
// invariants are assumed or asserted. The core invariants exercised:
// - Single deletion: every heap object is dropped exactly once, by its
//   last owner, and never by a handle that only references it.
// - Hand-back: operations that displace an object (set, release, a
//   rejected insert) return it to the caller instead of deleting it.
// - Steal-or-clone: converting a handle into an owned allocation reuses
//   the allocation only when the handle is its sole owner.
// - Fatal edges: null dereference, const violation and copying a
//   deallocated handle abort with a message naming the handle type.
use field_handles::{
    HandleError, Lookup, OwningIndexedList, OwningKeyedTable, RefCount, RefCounted, RefKind,
    RefOrPointer, TempHandle, TempKind, UniqueHandle,
};
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// A field-like payload with an embedded counter and a drop tally.
#[derive(Clone, Debug)]
struct Field {
    refs: RefCount,
    value: i32,
    drops: Rc<Cell<usize>>,
}

impl Field {
    fn boxed(value: i32, drops: &Rc<Cell<usize>>) -> Box<Field> {
        Box::new(Field {
            refs: RefCount::new(),
            value,
            drops: drops.clone(),
        })
    }
}

// SAFETY: returns the embedded `refs` field and nothing else touches it.
unsafe impl RefCounted for Field {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

impl Drop for Field {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_default()
}

// Test: release hands the object back without deleting it.
// Assumes: set on an in-range slot stores the pointer; None stores null.
// Verifies: slot 0 becomes null, no drop until the released handle dies.
#[test]
fn scenario_a_list_release() {
    let drops = Rc::new(Cell::new(0));
    let mut list: OwningIndexedList<Field> = OwningIndexedList::with_len(2);
    list.set(0, Field::boxed(42, &drops));
    list.set(1, None::<Box<Field>>);

    let h = list.release(0);
    assert_eq!(h.cref().value, 42);
    assert!(!list.is_set(0));
    assert_eq!(list.len(), 2);
    assert_eq!(drops.get(), 0);

    drop(h);
    assert_eq!(drops.get(), 1);
}

// Test: overwriting a key.
// Assumes: set always stores, replacing the previous occupant.
// Verifies: A is deleted immediately; the key now yields B.
#[test]
fn scenario_b_table_overwrite() {
    let drops_a = Rc::new(Cell::new(0));
    let drops_b = Rc::new(Cell::new(0));
    let mut table: OwningKeyedTable<String, Field> = OwningKeyedTable::new();
    table.set("x".to_string(), Field::boxed(1, &drops_a));
    table.set("x".to_string(), Field::boxed(2, &drops_b));
    assert_eq!(drops_a.get(), 1);
    assert_eq!(drops_b.get(), 0);
    assert_eq!(table["x"].value, 2);
    drop(table);
    assert_eq!(drops_b.get(), 1);
}

// Test: shared lifetime of a counted temporary.
// Assumes: a fresh allocation starts at count 0 and new() takes it to 1.
// Verifies: count 2 after clone; the object dies with the last handle.
#[test]
fn scenario_c_temp_sharing() {
    let drops = Rc::new(Cell::new(0));
    let h1 = TempHandle::new(Field::boxed(7, &drops));
    let h2 = h1.clone();
    assert_eq!(h1.use_count(), 2);
    assert!(!h2.movable());

    drop(h1);
    assert_eq!(drops.get(), 0);
    assert_eq!(h2.use_count(), 1);
    assert!(h2.movable());

    drop(h2);
    assert_eq!(drops.get(), 1);
}

// Test: insert never overwrites.
// Assumes: insert only succeeds for an absent key.
// Verifies: the second handle comes back unconsumed and the table keeps X.
#[test]
fn scenario_d_table_insert_keeps_first() {
    let drops = Rc::new(Cell::new(0));
    let mut table: OwningKeyedTable<String, Field> = OwningKeyedTable::new();
    let x = UniqueHandle::new(Field::boxed(1, &drops));
    let y = UniqueHandle::new(Field::boxed(2, &drops));
    assert!(table.insert("k".to_string(), x).is_ok());
    let back = match table.insert("k".to_string(), y) {
        Ok(()) => panic!("insert over an existing key must be rejected"),
        Err(back) => back,
    };
    assert_eq!(back.cref().value, 2);
    assert_eq!(table["k"].value, 1);
    assert_eq!(drops.get(), 0);
}

// Test: list-by-move append.
// Assumes: append relocates boxes rather than cloning them.
// Verifies: b holds the original allocation, a is empty, nothing dropped.
#[test]
fn scenario_e_list_append_moves() {
    let drops = Rc::new(Cell::new(0));
    let mut a: OwningIndexedList<Field> = OwningIndexedList::new();
    a.push_back(Field::boxed(1, &drops));
    let addr = a.slot_ptr(0).expect("set").as_ptr();

    let mut b: OwningIndexedList<Field> = OwningIndexedList::new();
    b.append(&mut a);
    assert_eq!(b.len(), 1);
    assert!(a.is_empty());
    assert_eq!(b.slot_ptr(0).expect("moved").as_ptr(), addr);
    assert_eq!(drops.get(), 0);
}

// Test: copy-degrade and reuse copy of an owning RefOrPointer.
// Assumes: the copy is kept alive while the degraded source is read.
// Verifies: shallow_copy leaves a const reference to a live object; take
// leaves the source empty in pointer mode.
#[test]
fn degrade_on_copy() {
    let drops = Rc::new(Cell::new(0));
    let mut src: RefOrPointer<'_, Field> = RefOrPointer::new(Field::boxed(3, &drops));
    let copy = unsafe { src.shallow_copy() };
    assert_eq!(src.kind(), RefKind::ConstRef);
    assert_eq!(copy.kind(), RefKind::Owned);
    assert_eq!(src.cref().value, 3);
    assert!(matches!(src.try_ref_mut(), Err(HandleError::ConstAccess { .. })));
    drop(src);
    assert_eq!(drops.get(), 0, "a degraded reference never deletes");
    drop(copy);
    assert_eq!(drops.get(), 1);

    let mut src: RefOrPointer<'_, Field> = RefOrPointer::new(Field::boxed(4, &drops));
    let moved = src.take();
    assert!(src.is_pointer());
    assert!(!src.good());
    assert_eq!(moved.cref().value, 4);
}

// Test: ptr() steals or clones.
// Assumes: address identity distinguishes a steal from a clone.
// Verifies: references are cloned; a sole owner hands over its allocation
// and is left empty.
#[test]
fn ptr_clones_references_and_steals_sole_owners() {
    let drops = Rc::new(Cell::new(0));
    let named = Field::boxed(5, &drops);

    let mut by_ref: RefOrPointer<'_, Field> = RefOrPointer::borrowed(&named);
    let copy = by_ref.ptr();
    assert!(!std::ptr::eq(&*copy, &*named));
    assert_eq!(copy.value, named.value);
    assert!(by_ref.good());

    let mut owned: RefOrPointer<'_, Field> = RefOrPointer::new(Field::boxed(6, &drops));
    let addr = owned.get().map(|f| f as *const Field).expect("owned");
    let stolen = owned.ptr();
    assert!(std::ptr::eq(&*stolen, addr));
    assert!(!owned.good());

    let mut temp_ref = TempHandle::borrowed(&*named);
    let temp_copy = temp_ref.ptr();
    assert!(!std::ptr::eq(&*temp_copy, &*named));
    assert_eq!(temp_copy.ref_count().count(), 0);

    let mut sole = TempHandle::new(Field::boxed(8, &drops));
    let addr = sole.get().map(|f| f as *const Field).expect("shared");
    let stolen = sole.ptr();
    assert!(std::ptr::eq(&*stolen, addr));
    assert!(!sole.good());
    assert_eq!(stolen.ref_count().count(), 0);
}

// Test: ptr() on a shared or pinned temporary.
// Assumes: other handles still alias the allocation.
// Verifies: a clone is returned and the shared object is untouched.
#[test]
fn ptr_on_shared_or_pinned_temp_clones() {
    let drops = Rc::new(Cell::new(0));
    let mut a = TempHandle::new(Field::boxed(9, &drops));
    let b = a.clone();
    let copy = a.ptr();
    assert_eq!(copy.value, 9);
    assert_eq!(b.use_count(), 2);

    drop(b);
    a.protect(true);
    assert_eq!(a.kind(), TempKind::Pinned);
    assert!(!a.movable());
    let pinned_copy = a.ptr();
    assert!(a.good());
    assert!(!std::ptr::eq(&*pinned_copy, a.cref()));
}

// Test: storing the pointer a slot already holds.
// Assumes: set_raw compares addresses before replacing.
// Verifies: nothing is deleted and an empty handle comes back.
#[test]
fn set_same_pointer_is_noop() {
    let drops = Rc::new(Cell::new(0));
    let mut list: OwningIndexedList<Field> = OwningIndexedList::new();
    list.push_back(Field::boxed(1, &drops));
    let raw = list.slot_ptr(0).expect("set").as_ptr();
    let back = unsafe { list.set_raw(0, raw) };
    assert!(!back.good());
    assert_eq!(drops.get(), 0);
    assert_eq!(list[0].value, 1);
}

// Test: try_emplace is idempotent per key.
// Assumes: the constructor closure only runs for absent or null keys.
// Verifies: the second call returns the first value without constructing.
#[test]
fn table_try_emplace_idempotent() {
    let mut table: OwningKeyedTable<&'static str, Vec<i32>> = OwningKeyedTable::new();
    let built = Cell::new(0);
    let first = table
        .try_emplace("k", || {
            built.set(built.get() + 1);
            vec![1]
        })
        .clone();
    let second = table
        .try_emplace("k", || {
            built.set(built.get() + 1);
            vec![2]
        })
        .clone();
    assert_eq!(first, second);
    assert_eq!(built.get(), 1);
    assert_eq!(table.lookup("k"), Lookup::Present(&vec![1]));
}

// Test: deep copies outlive their originals.
// Assumes: Clone on the containers clones every object.
// Verifies: dropping the original keeps the copy intact; mutating the copy
// does not reach back.
#[test]
fn container_clone_round_trip() {
    let drops = Rc::new(Cell::new(0));
    let mut list: OwningIndexedList<Field> = OwningIndexedList::new();
    list.push_back(Field::boxed(1, &drops));
    list.push_back(None::<Box<Field>>);
    let mut list_copy = list.clone();
    list_copy[0].value = 10;
    assert_eq!(list[0].value, 1);
    drop(list);
    assert_eq!(drops.get(), 1);
    assert_eq!(list_copy[0].value, 10);
    assert!(!list_copy.is_set(1));

    let mut table: OwningKeyedTable<i32, Field> = OwningKeyedTable::new();
    table.set(1, Field::boxed(100, &drops));
    let mut table_copy = table.clone();
    drop(table);
    assert_eq!(drops.get(), 2);
    table_copy.get_mut(&1).expect("cloned").value += 1;
    assert_eq!(table_copy[&1].value, 101);
}

// Test: fatal edges name the offending handle type.
// Assumes: fatal errors panic after logging.
// Verifies: message text for null dereference and const violation.
#[test]
fn fatal_errors_name_the_handle() {
    let empty: UniqueHandle<Field> = UniqueHandle::empty();
    let msg = panic_message(catch_unwind(AssertUnwindSafe(|| empty.cref().value)).unwrap_err());
    assert!(msg.contains("UniqueHandle"), "{msg}");
    assert!(msg.contains("unallocated"), "{msg}");

    let value = 1.0_f64;
    let mut by_ref = RefOrPointer::borrowed(&value);
    let msg = panic_message(catch_unwind(AssertUnwindSafe(|| *by_ref.ref_mut() = 2.0)).unwrap_err());
    assert!(msg.contains("RefOrPointer"), "{msg}");
    assert!(msg.contains("const reference"), "{msg}");
    assert_eq!(value, 1.0);
}

// Test: copying a deallocated pointer-mode handle.
// Assumes: default build (relaxed-null-copy off).
// Verifies: the copy is fatal for both handle kinds.
#[cfg(not(feature = "relaxed-null-copy"))]
#[test]
fn copying_deallocated_handle_is_fatal() {
    let mut empty: RefOrPointer<'_, Field> = RefOrPointer::empty();
    let msg = panic_message(
        catch_unwind(AssertUnwindSafe(|| unsafe {
            drop(empty.shallow_copy());
        }))
        .unwrap_err(),
    );
    assert!(msg.contains("deallocated"), "{msg}");

    let temp: TempHandle<'_, Field> = TempHandle::empty();
    let res = catch_unwind(AssertUnwindSafe(|| drop(temp.clone())));
    assert!(res.is_err());
}

// Test: relaxed null copies.
// Assumes: relaxed-null-copy is enabled.
// Verifies: copying a null pointer-mode handle yields another empty handle.
#[cfg(feature = "relaxed-null-copy")]
#[test]
fn copying_deallocated_handle_is_empty_when_relaxed() {
    let mut empty: RefOrPointer<'_, Field> = RefOrPointer::empty();
    let copy = unsafe { empty.shallow_copy() };
    assert!(!copy.good());
    let temp: TempHandle<'_, Field> = TempHandle::empty();
    assert!(!temp.clone().good());
}

// Test: replacing the whole object behind a sole shared handle.
// Assumes: ref_mut is the normal way to update a sole-owned temporary.
// Verifies: the count survives the assignment; later copies and drops
// delete each object exactly once.
#[test]
fn whole_object_assignment_keeps_handle_count() {
    let drops = Rc::new(Cell::new(0));
    let mut a = TempHandle::new(Field::boxed(1, &drops));
    *a.ref_mut() = *Field::boxed(2, &drops);
    assert_eq!(drops.get(), 1, "the overwritten object is dropped in place");
    assert_eq!(a.use_count(), 1);
    assert_eq!(a.cref().ref_count().count(), 1);

    let b = a.clone();
    assert_eq!(b.use_count(), 2);
    drop(a);
    assert_eq!(drops.get(), 1);
    assert_eq!(b.cref().value, 2);
    drop(b);
    assert_eq!(drops.get(), 2);
}

// Test: mutable references through TempHandle copies.
// Assumes: two live mutable aliases are never produced.
// Verifies: cloning a mutable reference demotes both ends to const.
#[test]
fn cloning_mutable_reference_demotes_both_ends() {
    let drops = Rc::new(Cell::new(0));
    let mut named = *Field::boxed(1, &drops);
    {
        let mut a = TempHandle::borrowed_mut(&mut named);
        a.ref_mut().value = 2;
        let b = a.clone();
        assert!(a.is_const());
        assert!(b.is_const());
        assert!(matches!(a.try_ref_mut(), Err(HandleError::ConstAccess { .. })));
        assert_eq!(b.cref().value, 2);
    }
    assert_eq!(named.value, 2);
    assert_eq!(named.ref_count().count(), 0, "references are never counted");
}

// Test: mutation of a shared allocation.
// Assumes: safe &mut access requires exclusive ownership.
// Verifies: refused while shared, allowed once sole owner.
#[test]
fn shared_allocation_refuses_mutation_until_unique() {
    let drops = Rc::new(Cell::new(0));
    let mut a = TempHandle::new(Field::boxed(1, &drops));
    let b = a.clone();
    assert!(matches!(
        a.try_ref_mut(),
        Err(HandleError::SharedAccess { count: 2, .. })
    ));
    drop(b);
    a.ref_mut().value = 5;
    assert_eq!(a.cref().value, 5);
}
