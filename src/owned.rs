//! The two seams every owning type is written against: deep cloning of a
//! (possibly unsized) value, and conversion of any handle into a uniquely
//! owned allocation.

/// Deep copy into a fresh heap allocation.
///
/// Blanket-implemented for every `T: Clone`. Trait objects opt in by hand:
///
/// ```
/// use field_handles::Cloneable;
///
/// trait Shape {
///     fn area(&self) -> f64;
///     fn boxed_clone(&self) -> Box<dyn Shape>;
/// }
///
/// impl Cloneable for dyn Shape {
///     fn clone_boxed(&self) -> Box<Self> {
///         self.boxed_clone()
///     }
/// }
/// ```
pub trait Cloneable {
    fn clone_boxed(&self) -> Box<Self>;
}

impl<T: Clone> Cloneable for T {
    #[inline]
    fn clone_boxed(&self) -> Box<Self> {
        Box::new(self.clone())
    }
}

/// Anything that can surrender a uniquely owned allocation of `T`.
///
/// `None` is the null pointer: storing it yields a present-but-null slot.
/// Handles that only reference their object (or share it) hand out a clone.
pub trait IntoOwned<T: ?Sized> {
    fn into_owned(self) -> Option<Box<T>>;
}

impl<T: ?Sized> IntoOwned<T> for Box<T> {
    #[inline]
    fn into_owned(self) -> Option<Box<T>> {
        Some(self)
    }
}

impl<T: ?Sized> IntoOwned<T> for Option<Box<T>> {
    #[inline]
    fn into_owned(self) -> Option<Box<T>> {
        self
    }
}
