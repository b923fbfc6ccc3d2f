use crate::{ucount, Destroy, DropArray, DropBox, Weak};
use alloc::{boxed::Box, vec::Vec};
use branches::{assume, unlikely};
use core::{
    cell::Cell,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    mem::ManuallyDrop,
    ops::Deref,
    ptr::NonNull,
};
use log::trace;

// The control block is allocated once per handle, next to it rather than
// around it, so any handle can be adopted no matter how it was allocated.
//
// All strong references together hold one implicit weak reference. It is
// given up only after the strategy has returned, which keeps the block alive
// while the value's destructor drops weak references pointing back at it.
pub(crate) struct Control<D> {
    pub(crate) strong: Cell<ucount>,
    pub(crate) weak: Cell<ucount>,
    pub(crate) strategy: D,
}

impl<D> Control<D> {
    #[inline]
    fn allocate(strategy: D) -> NonNull<Control<D>> {
        NonNull::from(Box::leak(Box::new(Control {
            strong: Cell::new(1),
            weak: Cell::new(1),
            strategy,
        })))
    }

    #[inline]
    pub(crate) fn inc_strong(&self) {
        increment(&self.strong);
    }

    #[inline]
    pub(crate) fn inc_weak(&self) {
        increment(&self.weak);
    }

    /// Gives up one weak reference and frees the block if it was the last one.
    ///
    /// # Safety
    ///
    /// `this` must point to a live block and the caller must own one of its
    /// weak references, which is consumed by this call.
    #[inline]
    pub(crate) unsafe fn release_weak(this: NonNull<Control<D>>) {
        let counter = &this.as_ref().weak;
        let value = counter.get();
        assume(value != 0);
        if value != 1 {
            counter.set(value - 1);
        } else {
            drop(Box::from_raw(this.as_ptr()));
        }
    }
}

// Gives up the implicit weak reference of the strong owners when dropped.
struct ReleaseWeak<D>(NonNull<Control<D>>);

impl<D> Drop for ReleaseWeak<D> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: constructed only by the last strong owner, once
        unsafe { Control::release_weak(self.0) };
    }
}

#[inline]
fn increment(counter: &Cell<ucount>) {
    let value = counter.get();
    unsafe { assume(value != 0) };
    let value = value.wrapping_add(1);
    if unlikely(value == 0) {
        counter_overflow();
    }
    counter.set(value);
}

// Kept out of line so the increment stays small enough to inline in user
// code. The counter is left untouched, so every existing owner stays valid
// while the panic unwinds.
#[cold]
#[inline(never)]
fn counter_overflow() -> ! {
    panic!("reference counter overflow");
}

/// [`Shared<T, D>`] is a reference-counting pointer for single-threaded use.
/// It provides shared ownership of a resource handle of type `T`. Cloning a
/// [`Shared<T, D>`] produces a new pointer to the same handle and increments
/// the strong counter; dropping one decrements it. When the last strong
/// pointer goes away, the handle is released through the destruction strategy
/// `D` exactly once.
///
/// The strategy defaults to [`DropBox`], which pairs with [`Shared::new`] and
/// [`Shared::from_box`]. Other strategies are chosen by constructing the
/// pointer with [`Shared::from_raw_in`] or [`Shared::from_vec`].
///
/// Use [`Shared::downgrade`] to obtain a [`Weak<T, D>`] that observes the
/// resource without keeping it alive.
///
/// # Cloning references
///
/// ```
/// use ownlite::Shared;
/// let foo = Shared::new(vec![1.0, 2.0, 3.0]);
/// // The two syntaxes below are equivalent.
/// let a = foo.clone();
/// let b = Shared::clone(&foo);
/// assert_eq!(foo.strong_count(), 3);
/// ```
pub struct Shared<T: ?Sized, D: Destroy<T> = DropBox> {
    pub(crate) ptr: NonNull<T>,
    pub(crate) ctrl: NonNull<Control<D>>,
    phantom: PhantomData<(Box<T>, D)>,
}

impl<T> Shared<T> {
    /// Constructs a new [`Shared<T>`] owning a boxed `data`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let tada = Shared::new("Tada!");
    /// ```
    #[inline]
    pub fn new(data: T) -> Shared<T> {
        Shared::from_box(Box::new(data))
    }

    /// If there's only one strong reference, returns the inner value. If not,
    /// returns an error with the [`Shared<T>`] passed in.
    ///
    /// Outstanding weak references fail to upgrade afterwards.
    ///
    /// # Examples
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let x = Shared::new(3);
    /// assert_eq!(Shared::try_unwrap(x).unwrap(), 3);
    ///
    /// let x = Shared::new(4);
    /// let _y = Shared::clone(&x);
    /// assert_eq!(*Shared::try_unwrap(x).unwrap_err(), 4);
    /// ```
    #[inline]
    pub fn try_unwrap(this: Self) -> Result<T, Self> {
        if this.strong_count() != 1 {
            return Err(this);
        }
        let this = ManuallyDrop::new(this);
        // SAFETY: this is the only strong reference, the value can be moved out
        // of its box instead of going through the strategy
        unsafe {
            this.control().strong.set(0);
            let data = *Box::from_raw(this.ptr.as_ptr());
            Control::release_weak(this.ctrl);
            Ok(data)
        }
    }

    /// Extracts and returns the inner value if this is the only strong
    /// reference, otherwise drops this reference and returns `None`.
    ///
    /// Calling `into_inner` on every clone guarantees that exactly one of the
    /// calls returns the value.
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let value = Shared::new(42);
    /// let cloned = Shared::clone(&value);
    /// assert!(Shared::into_inner(value).is_none());
    /// assert_eq!(Shared::into_inner(cloned), Some(42));
    /// ```
    #[inline]
    pub fn into_inner(this: Self) -> Option<T> {
        Shared::try_unwrap(this).ok()
    }
}

impl<T: ?Sized> Shared<T> {
    /// Takes ownership of a boxed value. The box is released with [`DropBox`]
    /// once the last strong reference is gone.
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let text: Shared<str> = Shared::from_box("hello".into());
    /// assert_eq!(&*text, "hello");
    /// ```
    #[inline]
    pub fn from_box(data: Box<T>) -> Shared<T> {
        // SAFETY: the handle comes straight out of a box and DropBox returns it
        // to one
        unsafe { Shared::from_raw_in(NonNull::from(Box::leak(data)), DropBox) }
    }
}

impl<T> Shared<[T], DropArray> {
    /// Takes ownership of the elements of `data` as an array handle released
    /// with [`DropArray`].
    ///
    /// ```
    /// use ownlite::{DropArray, Shared};
    ///
    /// let array: Shared<[i32], DropArray> = Shared::from_vec(vec![1, 2, 3]);
    /// assert_eq!(array[1], 2);
    /// ```
    #[inline]
    pub fn from_vec(data: Vec<T>) -> Shared<[T], DropArray> {
        Shared::from_boxed_slice(data.into_boxed_slice())
    }

    /// Takes ownership of a boxed slice as an array handle released with
    /// [`DropArray`].
    #[inline]
    pub fn from_boxed_slice(data: Box<[T]>) -> Shared<[T], DropArray> {
        // SAFETY: DropArray releases exactly what a boxed slice allocated
        unsafe { Shared::from_raw_in(NonNull::from(Box::leak(data)), DropArray) }
    }
}

impl<T: ?Sized, D: Destroy<T>> Shared<T, D> {
    /// Takes ownership of the handle `ptr`, which will be released by calling
    /// `strategy` once the last strong reference is gone. A fresh control
    /// block is allocated with a strong count of one.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live value that no other owner is responsible for
    /// releasing, and it must have been produced by the allocation method
    /// `strategy` pairs with. Wrapping the same handle twice releases it twice.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::ptr::NonNull;
    /// use ownlite::{DropBox, Shared};
    ///
    /// let handle = NonNull::from(Box::leak(Box::new(5)));
    /// let five = unsafe { Shared::from_raw_in(handle, DropBox) };
    /// assert_eq!(Shared::as_ptr(&five), handle.as_ptr() as *const i32);
    /// ```
    #[inline]
    pub unsafe fn from_raw_in(ptr: NonNull<T>, strategy: D) -> Shared<T, D> {
        Shared {
            ptr,
            ctrl: Control::allocate(strategy),
            phantom: PhantomData,
        }
    }

    // SAFETY: the caller must own one strong count of `ctrl` for `ptr`.
    #[inline(always)]
    pub(crate) unsafe fn from_parts(ptr: NonNull<T>, ctrl: NonNull<Control<D>>) -> Shared<T, D> {
        Shared {
            ptr,
            ctrl,
            phantom: PhantomData,
        }
    }

    #[inline(always)]
    fn control(&self) -> &Control<D> {
        // SAFETY: the block is kept alive by the implicit weak reference of the
        // strong owners, and self is one of them
        unsafe { self.ctrl.as_ref() }
    }

    /// Gives you the raw handle. The reference count stays the same and the
    /// [`Shared<T, D>`] isn't used up. The pointer stays valid as long as there
    /// are strong references to the handle.
    ///
    /// # Examples
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let x = Shared::new("hello".to_owned());
    /// let y = Shared::clone(&x);
    /// let x_ptr = Shared::as_ptr(&x);
    /// assert_eq!(x_ptr, Shared::as_ptr(&y));
    /// assert_eq!(unsafe { &*x_ptr }, "hello");
    /// ```
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr() as *const T
    }

    /// Gets the number of strong pointers sharing the handle.
    ///
    /// Meant for tests and diagnostics.
    ///
    /// # Examples
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let five = Shared::new(5);
    /// let _also_five = Shared::clone(&five);
    /// assert_eq!(2, five.strong_count());
    /// ```
    #[inline]
    #[must_use]
    pub fn strong_count(&self) -> usize {
        self.control().strong.get() as usize
    }

    /// Gets the number of [`Weak<T, D>`] pointers observing the handle.
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let five = Shared::new(5);
    /// let _weak_five = Shared::downgrade(&five);
    /// assert_eq!(1, five.weak_count());
    /// ```
    #[inline]
    #[must_use]
    pub fn weak_count(&self) -> usize {
        (self.control().weak.get() - 1) as usize
    }

    /// Creates a new [`Weak<T, D>`] pointer to this handle. Only the weak
    /// counter is incremented.
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let five = Shared::new(5);
    /// let weak_five = Shared::downgrade(&five);
    /// assert_eq!(five.strong_count(), 1);
    /// assert_eq!(*weak_five.upgrade().unwrap(), 5);
    /// ```
    #[inline]
    pub fn downgrade(this: &Self) -> Weak<T, D> {
        this.control().inc_weak();
        // SAFETY: the weak count for the new pointer was just taken
        unsafe { Weak::from_parts(this.ptr, this.ctrl) }
    }

    /// Returns the destruction strategy that will release the handle.
    #[inline]
    pub fn strategy(this: &Self) -> &D {
        &this.control().strategy
    }

    /// Compares if two [`Shared<T, D>`]s share the same handle. Two pointers
    /// built separately never compare equal, even when their handles have the
    /// same address, as boxes of zero-sized values do.
    ///
    /// # Examples
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let five = Shared::new(5);
    /// let same_five = Shared::clone(&five);
    /// let other_five = Shared::new(5);
    ///
    /// assert!(Shared::ptr_eq(&five, &same_five));
    /// assert!(!Shared::ptr_eq(&five, &other_five));
    /// ```
    #[inline]
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.ctrl == other.ctrl
    }

    // No other strong pointer and no weak pointer that could upgrade.
    #[inline]
    fn is_unique(&self) -> bool {
        let control = self.control();
        control.strong.get() == 1 && control.weak.get() == 1
    }

    /// Returns a mutable reference to the inner value, but only if there are
    /// no other strong or weak references to it. Returns None otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let mut x = Shared::new(3);
    /// *Shared::get_mut(&mut x).unwrap() = 4;
    /// assert_eq!(*x, 4);
    ///
    /// let _y = Shared::downgrade(&x);
    /// assert!(Shared::get_mut(&mut x).is_none());
    /// ```
    #[inline]
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        if this.is_unique() {
            // SAFETY: no other pointer can reach the value
            Some(unsafe { Self::get_mut_unchecked(this) })
        } else {
            None
        }
    }

    /// Returns a mutable reference into the given [`Shared<T, D>`] without
    /// checking if it is safe to do so.
    ///
    /// # Safety
    ///
    /// No other [`Shared`] or upgraded [`Weak`] pointer to the same handle may
    /// be dereferenced or hold a borrow for the duration of the returned
    /// mutable borrow.
    #[inline]
    pub unsafe fn get_mut_unchecked(this: &mut Self) -> &mut T {
        &mut *this.ptr.as_ptr()
    }

    // The non-inlined portion of `drop`, run once the strong count is already
    // zero. The implicit weak reference is given up even if the strategy
    // panics.
    unsafe fn drop_slow(&mut self) {
        trace!("last shared reference to {:p} dropped", self.ptr.cast::<()>());
        let ctrl = ReleaseWeak(self.ctrl);
        ctrl.0.as_ref().strategy.destroy(self.ptr);
    }
}

impl<T: Clone> Shared<T> {
    /// Returns a mutable reference to the inner value, cloning it into a new
    /// handle first if other strong or weak references exist
    /// ("clone-on-write").
    ///
    /// Outstanding [`Weak`] pointers are disassociated from `this`: if other
    /// strong references exist they keep observing the old handle, otherwise
    /// the old handle is released and they fail to upgrade.
    ///
    /// # Examples
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let mut data = Shared::new(5);
    ///
    /// *Shared::make_mut(&mut data) += 1;          // Won't clone anything
    /// let mut other_data = Shared::clone(&data);  // Won't clone inner data
    /// *Shared::make_mut(&mut data) += 1;          // Clones inner data
    /// *Shared::make_mut(&mut data) += 1;          // Won't clone anything
    /// *Shared::make_mut(&mut other_data) *= 2;    // Won't clone anything
    ///
    /// assert_eq!(*data, 8);
    /// assert_eq!(*other_data, 12);
    /// ```
    #[inline]
    pub fn make_mut(this: &mut Shared<T>) -> &mut T {
        if !this.is_unique() {
            *this = Shared::new(T::clone(&**this));
        }
        // SAFETY: this is now the only pointer to its handle
        unsafe { Self::get_mut_unchecked(this) }
    }

    /// Returns the inner value if this is the only strong reference, otherwise
    /// a clone of it.
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let shared = Shared::new(String::from("test"));
    /// let other = shared.clone();
    /// assert_eq!(Shared::unwrap_or_clone(shared), "test");
    /// assert_eq!(Shared::unwrap_or_clone(other), "test");
    /// ```
    #[inline]
    pub fn unwrap_or_clone(this: Self) -> T {
        Shared::try_unwrap(this).unwrap_or_else(|shared| (*shared).clone())
    }
}

impl<T: ?Sized, D: Destroy<T>> Deref for Shared<T, D> {
    type Target = T;
    #[inline(always)]
    fn deref(&self) -> &T {
        // SAFETY: the handle is released only when the last strong reference,
        // at the earliest self, is dropped
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: ?Sized, D: Destroy<T>> Clone for Shared<T, D> {
    #[inline]
    fn clone(&self) -> Self {
        self.control().inc_strong();
        Self {
            ptr: self.ptr,
            ctrl: self.ctrl,
            phantom: PhantomData,
        }
    }

    /// Makes `self` share the handle of `source`. The previously shared handle
    /// is released if `self` was its last strong reference. Assigning from a
    /// pointer that already shares the same handle changes nothing.
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let a = Shared::new(1);
    /// let mut b = a.clone();
    /// b.clone_from(&a);
    /// assert_eq!(a.strong_count(), 2);
    ///
    /// let mut c = Shared::new(2);
    /// c.clone_from(&a);
    /// assert_eq!(*c, 1);
    /// assert_eq!(a.strong_count(), 3);
    /// ```
    #[inline]
    fn clone_from(&mut self, source: &Self) {
        if Shared::ptr_eq(self, source) {
            return;
        }
        *self = source.clone();
    }
}

impl<T: ?Sized, D: Destroy<T>> Drop for Shared<T, D> {
    #[inline]
    fn drop(&mut self) {
        let counter = &self.control().strong;
        let value = counter.get();
        unsafe { assume(value != 0) };
        // zero before releasing, so weak pointers can no longer upgrade while
        // the strategy runs
        counter.set(value - 1);
        if value == 1 {
            unsafe { self.drop_slow() };
        }
    }
}

impl<T: Default> Default for Shared<T> {
    #[inline]
    fn default() -> Shared<T> {
        Shared::new(Default::default())
    }
}

impl<T> From<T> for Shared<T> {
    #[inline(always)]
    fn from(value: T) -> Self {
        Shared::new(value)
    }
}

impl<T: ?Sized> From<Box<T>> for Shared<T> {
    #[inline(always)]
    fn from(value: Box<T>) -> Self {
        Shared::from_box(value)
    }
}

impl<T> From<Vec<T>> for Shared<[T], DropArray> {
    #[inline(always)]
    fn from(value: Vec<T>) -> Self {
        Shared::from_vec(value)
    }
}

impl<T: ?Sized + Hash, D: Destroy<T>> Hash for Shared<T, D> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        (**self).hash(state);
    }
}

impl<T: ?Sized + fmt::Display, D: Destroy<T>> fmt::Display for Shared<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl<T: ?Sized + fmt::Debug, D: Destroy<T>> fmt::Debug for Shared<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized, D: Destroy<T>> fmt::Pointer for Shared<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&(&**self as *const T), f)
    }
}

impl<T: ?Sized + PartialEq, D: Destroy<T>> PartialEq for Shared<T, D> {
    #[inline]
    fn eq(&self, other: &Shared<T, D>) -> bool {
        **self == **other
    }
}

impl<T: ?Sized + Eq, D: Destroy<T>> Eq for Shared<T, D> {}

impl<T: ?Sized + PartialOrd, D: Destroy<T>> PartialOrd for Shared<T, D> {
    #[inline]
    fn partial_cmp(&self, other: &Shared<T, D>) -> Option<core::cmp::Ordering> {
        (**self).partial_cmp(&**other)
    }

    #[inline]
    fn lt(&self, other: &Shared<T, D>) -> bool {
        **self < **other
    }

    #[inline]
    fn le(&self, other: &Shared<T, D>) -> bool {
        **self <= **other
    }

    #[inline]
    fn gt(&self, other: &Shared<T, D>) -> bool {
        **self > **other
    }

    #[inline]
    fn ge(&self, other: &Shared<T, D>) -> bool {
        **self >= **other
    }
}

impl<T: ?Sized + Ord, D: Destroy<T>> Ord for Shared<T, D> {
    #[inline]
    fn cmp(&self, other: &Shared<T, D>) -> core::cmp::Ordering {
        (**self).cmp(&**other)
    }
}

impl<T: ?Sized, D: Destroy<T>> core::borrow::Borrow<T> for Shared<T, D> {
    #[inline(always)]
    fn borrow(&self) -> &T {
        self
    }
}

/// Allows a [`Shared<T, D>`] to be treated as a reference to `T`.
///
/// ```
/// use ownlite::Shared;
///
/// let data = Shared::new(42);
/// let reference: &i32 = data.as_ref();
/// assert_eq!(*reference, 42);
/// ```
impl<T: ?Sized, D: Destroy<T>> AsRef<T> for Shared<T, D> {
    #[inline(always)]
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: ?Sized, D: Destroy<T>> Unpin for Shared<T, D> {}
