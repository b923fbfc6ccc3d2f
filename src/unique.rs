use crate::{Destroy, DropArray, DropBox};
use alloc::{boxed::Box, vec::Vec};
use core::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    mem::ManuallyDrop,
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
};

/// [`Unique<T, D>`] owns a resource handle exclusively and releases it with
/// the destruction strategy `D` when dropped.
///
/// There is no way to duplicate a [`Unique<T, D>`]: it implements neither
/// `Clone` nor any transfer operation, so ownership can only change hands
/// through an ordinary move, which the compiler tracks.
///
/// ```compile_fail
/// use ownlite::Unique;
///
/// let first = Unique::new(1);
/// let second = Unique::clone(&first);
/// ```
///
/// ```
/// use ownlite::Unique;
///
/// let mut counter = Unique::new(0);
/// *counter += 1;
/// let moved = counter;
/// assert_eq!(*moved, 1);
/// ```
pub struct Unique<T: ?Sized, D: Destroy<T> = DropBox> {
    ptr: NonNull<T>,
    strategy: D,
    phantom: PhantomData<T>,
}

// SAFETY: the handle is never aliased, so moving or sharing a Unique across
// threads is the same as moving or sharing the value and its strategy.
unsafe impl<T: ?Sized + Send, D: Destroy<T> + Send> Send for Unique<T, D> {}
unsafe impl<T: ?Sized + Sync, D: Destroy<T> + Sync> Sync for Unique<T, D> {}

impl<T> Unique<T> {
    /// Constructs a new [`Unique<T>`] owning a boxed `data`.
    #[inline]
    pub fn new(data: T) -> Unique<T> {
        Unique::from_box(Box::new(data))
    }
}

impl<T: ?Sized> Unique<T> {
    /// Takes ownership of a boxed value.
    #[inline]
    pub fn from_box(data: Box<T>) -> Unique<T> {
        // SAFETY: the handle comes straight out of a box and DropBox returns it
        // to one
        unsafe { Unique::from_raw_in(NonNull::from(Box::leak(data)), DropBox) }
    }

    /// Gives the value back as a [`Box`] without releasing it.
    ///
    /// ```
    /// use ownlite::Unique;
    ///
    /// let unique = Unique::new(String::from("boxed"));
    /// let boxed: Box<String> = Unique::into_box(unique);
    /// assert_eq!(*boxed, "boxed");
    /// ```
    #[inline]
    pub fn into_box(this: Self) -> Box<T> {
        let (ptr, _) = Unique::into_raw(this);
        // SAFETY: DropBox handles always come from a box
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }
}

impl<T> Unique<[T], DropArray> {
    /// Takes ownership of the elements of `data` as an array handle released
    /// with [`DropArray`].
    ///
    /// ```
    /// use ownlite::{DropArray, Unique};
    ///
    /// let mut array: Unique<[u8], DropArray> = Unique::from_vec(vec![1, 2]);
    /// array[0] = 3;
    /// assert_eq!(&*array, &[3, 2]);
    /// ```
    #[inline]
    pub fn from_vec(data: Vec<T>) -> Unique<[T], DropArray> {
        // SAFETY: DropArray releases exactly what a boxed slice allocated
        unsafe {
            Unique::from_raw_in(
                NonNull::from(Box::leak(data.into_boxed_slice())),
                DropArray,
            )
        }
    }
}

impl<T: ?Sized, D: Destroy<T>> Unique<T, D> {
    /// Takes exclusive ownership of the handle `ptr`, which will be released by
    /// calling `strategy` when the [`Unique<T, D>`] is dropped.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live value that nothing else owns or references,
    /// and it must have been produced by the allocation method `strategy`
    /// pairs with.
    #[inline]
    pub unsafe fn from_raw_in(ptr: NonNull<T>, strategy: D) -> Unique<T, D> {
        Unique {
            ptr,
            strategy,
            phantom: PhantomData,
        }
    }

    /// Gives up ownership without releasing anything. The caller becomes
    /// responsible for calling the returned strategy on the returned handle.
    #[inline]
    pub fn into_raw(this: Self) -> (NonNull<T>, D) {
        let this = ManuallyDrop::new(this);
        // SAFETY: the strategy is read exactly once and `this` is never dropped
        (this.ptr, unsafe { ptr::read(&this.strategy) })
    }

    /// Gives you the raw handle without giving up ownership.
    #[inline]
    #[must_use]
    pub fn as_ptr(this: &Self) -> *const T {
        this.ptr.as_ptr() as *const T
    }

    /// Returns the destruction strategy that will release the handle.
    #[inline]
    pub fn strategy(this: &Self) -> &D {
        &this.strategy
    }
}

impl<T: ?Sized, D: Destroy<T>> Deref for Unique<T, D> {
    type Target = T;
    #[inline(always)]
    fn deref(&self) -> &T {
        // SAFETY: the handle is live for as long as self owns it
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: ?Sized, D: Destroy<T>> DerefMut for Unique<T, D> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the handle is owned exclusively by self
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: ?Sized, D: Destroy<T>> Drop for Unique<T, D> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: self is the only owner and is dropped exactly once
        unsafe { self.strategy.destroy(self.ptr) };
    }
}

impl<T: Default> Default for Unique<T> {
    #[inline]
    fn default() -> Unique<T> {
        Unique::new(Default::default())
    }
}

impl<T> From<T> for Unique<T> {
    #[inline(always)]
    fn from(value: T) -> Self {
        Unique::new(value)
    }
}

impl<T: ?Sized> From<Box<T>> for Unique<T> {
    #[inline(always)]
    fn from(value: Box<T>) -> Self {
        Unique::from_box(value)
    }
}

impl<T: ?Sized + Hash, D: Destroy<T>> Hash for Unique<T, D> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        (**self).hash(state);
    }
}

impl<T: ?Sized + fmt::Display, D: Destroy<T>> fmt::Display for Unique<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl<T: ?Sized + fmt::Debug, D: Destroy<T>> fmt::Debug for Unique<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized, D: Destroy<T>> fmt::Pointer for Unique<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&(&**self as *const T), f)
    }
}

impl<T: ?Sized + PartialEq, D: Destroy<T>> PartialEq for Unique<T, D> {
    #[inline]
    fn eq(&self, other: &Unique<T, D>) -> bool {
        **self == **other
    }
}

impl<T: ?Sized + Eq, D: Destroy<T>> Eq for Unique<T, D> {}

impl<T: ?Sized, D: Destroy<T>> AsRef<T> for Unique<T, D> {
    #[inline(always)]
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: ?Sized, D: Destroy<T>> AsMut<T> for Unique<T, D> {
    #[inline(always)]
    fn as_mut(&mut self) -> &mut T {
        self
    }
}

impl<T: ?Sized, D: Destroy<T>> Unpin for Unique<T, D> {}
