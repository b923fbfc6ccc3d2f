use alloc::boxed::Box;
use core::{
    fmt,
    marker::PhantomData,
    mem,
    ops::{Deref, DerefMut},
    ptr::NonNull,
};
use log::trace;

/// [`Transfer<T>`] owns a boxed value exclusively, like [`Box<T>`], and can
/// hand it over to a new owner at runtime.
///
/// Handing over is always explicit: [`Transfer::transfer`] moves the value
/// into a new [`Transfer<T>`] and [`Transfer::transfer_from`] moves it into an
/// existing one. Both leave the source empty. [`Transfer<T>`] deliberately
/// does not implement `Clone`, so a plain copy can never empty anything
/// behind the caller's back.
///
/// ```
/// use ownlite::Transfer;
///
/// let mut first = Transfer::new(vec![1, 2, 3]);
/// let second = first.transfer();
///
/// assert!(first.is_empty());
/// assert_eq!(*second, [1, 2, 3]);
/// ```
///
/// # Panics
///
/// Dereferencing an empty [`Transfer<T>`] panics. Use [`Transfer::get`] when
/// the pointer may have been emptied.
pub struct Transfer<T: ?Sized> {
    ptr: Option<NonNull<T>>,
    phantom: PhantomData<Box<T>>,
}

impl<T> Transfer<T> {
    /// Constructs a new [`Transfer<T>`] owning a boxed `data`.
    #[inline]
    pub fn new(data: T) -> Transfer<T> {
        Transfer::from_box(Box::new(data))
    }
}

impl<T: ?Sized> Transfer<T> {
    /// Constructs a [`Transfer<T>`] that holds nothing.
    #[inline]
    #[must_use]
    pub fn empty() -> Transfer<T> {
        Transfer {
            ptr: None,
            phantom: PhantomData,
        }
    }

    /// Takes ownership of a boxed value.
    #[inline]
    pub fn from_box(data: Box<T>) -> Transfer<T> {
        Transfer {
            ptr: Some(NonNull::from(Box::leak(data))),
            phantom: PhantomData,
        }
    }

    /// Takes ownership of a raw pointer obtained from [`Box::into_raw`]. A null
    /// pointer gives an empty [`Transfer<T>`].
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from [`Box::into_raw`] and must not be owned
    /// by anything else.
    #[inline]
    pub unsafe fn from_raw(ptr: *mut T) -> Transfer<T> {
        Transfer {
            ptr: NonNull::new(ptr),
            phantom: PhantomData,
        }
    }

    /// Moves the owned value into a new [`Transfer<T>`] and leaves `self`
    /// empty. Transferring from an empty pointer gives another empty pointer.
    ///
    /// ```
    /// use ownlite::Transfer;
    ///
    /// let mut source = Transfer::new(7);
    /// let target = source.transfer();
    /// assert_eq!(source.get(), None);
    /// assert_eq!(target.get(), Some(&7));
    /// ```
    #[inline]
    #[must_use = "the transferred value is released if the result is dropped"]
    pub fn transfer(&mut self) -> Transfer<T> {
        let ptr = self.ptr.take();
        if let Some(ptr) = ptr {
            trace!("transferring handle {:p}", ptr.cast::<()>());
        }
        Transfer {
            ptr,
            phantom: PhantomData,
        }
    }

    /// Releases the value currently held by `self`, if any, and moves the value
    /// of `source` into `self`, leaving `source` empty.
    ///
    /// ```
    /// use ownlite::Transfer;
    ///
    /// let mut target = Transfer::new(String::from("old"));
    /// let mut source = Transfer::new(String::from("new"));
    /// target.transfer_from(&mut source);
    ///
    /// assert!(source.is_empty());
    /// assert_eq!(*target, "new");
    /// ```
    #[inline]
    pub fn transfer_from(&mut self, source: &mut Transfer<T>) {
        // the old value is dropped only after self holds the new one
        drop(mem::replace(self, source.transfer()));
    }

    /// Returns `true` if the value has been transferred away or was never
    /// there.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// Returns a reference to the held value, or `None` if empty.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: a held handle is owned by self and live
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Returns a mutable reference to the held value, or `None` if empty.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        // SAFETY: a held handle is owned exclusively by self and live
        self.ptr.map(|ptr| unsafe { &mut *ptr.as_ptr() })
    }

    /// Gives the held value back as a [`Box`], or `None` if empty.
    #[inline]
    pub fn into_box(mut this: Self) -> Option<Box<T>> {
        // SAFETY: held handles always come from a box
        this.ptr.take().map(|ptr| unsafe { Box::from_raw(ptr.as_ptr()) })
    }
}

#[cold]
#[inline(never)]
fn empty_transfer() -> ! {
    panic!("dereferenced an empty Transfer pointer");
}

impl<T: ?Sized> Deref for Transfer<T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => empty_transfer(),
        }
    }
}

impl<T: ?Sized> DerefMut for Transfer<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(value) => value,
            None => empty_transfer(),
        }
    }
}

impl<T: ?Sized> Drop for Transfer<T> {
    #[inline]
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: held handles always come from a box and are owned by self
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        }
    }
}

impl<T: ?Sized> Default for Transfer<T> {
    #[inline]
    fn default() -> Transfer<T> {
        Transfer::empty()
    }
}

impl<T> From<T> for Transfer<T> {
    #[inline(always)]
    fn from(value: T) -> Self {
        Transfer::new(value)
    }
}

impl<T: ?Sized> From<Box<T>> for Transfer<T> {
    #[inline(always)]
    fn from(value: Box<T>) -> Self {
        Transfer::from_box(value)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Transfer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => fmt::Debug::fmt(value, f),
            None => f.write_str("(empty)"),
        }
    }
}
