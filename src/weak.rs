use crate::{shared::Control, Destroy, DropBox, Shared};
use core::{fmt, ptr::NonNull};

/// [`Weak<T, D>`] is a non-owning reference to a handle managed by
/// [`Shared<T, D>`]. It is created with [`Shared::downgrade`] and does not
/// take part in the strong count, so it never keeps the resource alive and
/// never releases it.
///
/// Since the resource may already be gone, a [`Weak<T, D>`] cannot be
/// dereferenced directly. [`Weak::upgrade`] promotes it to a [`Shared<T, D>`]
/// while the resource is alive and returns `None` afterwards. Only the small
/// control block is kept allocated while weak references exist.
///
/// The typical use is breaking reference cycles: a child holds a
/// [`Weak<T, D>`] to its parent while the parent holds [`Shared<T, D>`]
/// pointers to its children.
///
/// ```
/// use ownlite::Shared;
///
/// let strong = Shared::new(5);
/// let weak = Shared::downgrade(&strong);
/// assert_eq!(*weak.upgrade().unwrap(), 5);
///
/// drop(strong);
/// assert!(weak.upgrade().is_none());
/// ```
pub struct Weak<T: ?Sized, D: Destroy<T> = DropBox> {
    // `None` for a weak reference that never observed anything
    raw: Option<(NonNull<T>, NonNull<Control<D>>)>,
}

impl<T: ?Sized, D: Destroy<T>> Weak<T, D> {
    /// Constructs a [`Weak<T, D>`] that observes nothing. Upgrading it always
    /// returns `None`.
    ///
    /// ```
    /// use ownlite::Weak;
    ///
    /// let empty: Weak<i64> = Weak::new();
    /// assert!(empty.upgrade().is_none());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Weak<T, D> {
        Weak { raw: None }
    }

    // SAFETY: the caller must own one weak count of `ctrl` for `ptr`.
    #[inline(always)]
    pub(crate) unsafe fn from_parts(ptr: NonNull<T>, ctrl: NonNull<Control<D>>) -> Weak<T, D> {
        Weak {
            raw: Some((ptr, ctrl)),
        }
    }

    #[inline(always)]
    fn control(&self) -> Option<&Control<D>> {
        // SAFETY: the block stays allocated while this weak count is held
        self.raw.map(|(_, ctrl)| unsafe { &*ctrl.as_ptr() })
    }

    /// Makes this reference observe the handle of `shared` instead of the one
    /// it observed before. The strong count of `shared` is not touched.
    ///
    /// ```
    /// use ownlite::{Shared, Weak};
    ///
    /// let first = Shared::new(1);
    /// let second = Shared::new(2);
    /// let mut weak = Shared::downgrade(&first);
    /// weak.set(&second);
    /// assert_eq!(*weak.upgrade().unwrap(), 2);
    /// assert_eq!(first.weak_count(), 0);
    /// ```
    #[inline]
    pub fn set(&mut self, shared: &Shared<T, D>) {
        if self.ptr_eq_shared(shared) {
            return;
        }
        *self = Shared::downgrade(shared);
    }

    #[inline]
    fn ptr_eq_shared(&self, shared: &Shared<T, D>) -> bool {
        match self.raw {
            Some((_, ctrl)) => ctrl == shared.ctrl,
            None => false,
        }
    }

    /// Attempts to promote this reference to a [`Shared<T, D>`]. Returns `None`
    /// if the resource has already been released or if nothing is observed.
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let five = Shared::new(5);
    /// let weak_five = Shared::downgrade(&five);
    ///
    /// let strong_five = weak_five.upgrade();
    /// assert!(strong_five.is_some());
    /// assert_eq!(five.strong_count(), 2);
    ///
    /// drop(strong_five);
    /// drop(five);
    /// assert!(weak_five.upgrade().is_none());
    /// ```
    #[inline]
    pub fn upgrade(&self) -> Option<Shared<T, D>> {
        let (ptr, ctrl) = self.raw?;
        let control = self.control()?;
        if control.strong.get() == 0 {
            return None;
        }
        control.inc_strong();
        // SAFETY: the strong count for the new pointer was just taken
        Some(unsafe { Shared::from_parts(ptr, ctrl) })
    }

    /// Returns `true` while the observed resource has not been released.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.strong_count() != 0
    }

    /// Gets the number of [`Shared<T, D>`] pointers to the observed handle, or
    /// zero if it has been released or nothing is observed.
    #[inline]
    #[must_use]
    pub fn strong_count(&self) -> usize {
        self.control().map_or(0, |control| control.strong.get() as usize)
    }

    /// Gets the number of [`Weak<T, D>`] pointers to the observed handle,
    /// including this one, or zero if nothing is observed.
    ///
    /// ```
    /// use ownlite::Shared;
    ///
    /// let five = Shared::new(5);
    /// let weak = Shared::downgrade(&five);
    /// let _other = weak.clone();
    /// assert_eq!(weak.weak_count(), 2);
    ///
    /// drop(five);
    /// assert_eq!(weak.weak_count(), 2);
    /// ```
    #[inline]
    #[must_use]
    pub fn weak_count(&self) -> usize {
        self.control().map_or(0, |control| {
            let weak = control.weak.get() as usize;
            if control.strong.get() != 0 {
                // the strong owners hold one weak count between them
                weak - 1
            } else {
                weak
            }
        })
    }

    /// Returns `true` if both references observe the same handle, or if both
    /// observe nothing.
    #[inline]
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        match (this.raw, other.raw) {
            (Some((_, a)), Some((_, b))) => a == b,
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ?Sized, D: Destroy<T>> Clone for Weak<T, D> {
    #[inline]
    fn clone(&self) -> Self {
        if let Some(control) = self.control() {
            control.inc_weak();
        }
        Weak { raw: self.raw }
    }
}

impl<T: ?Sized, D: Destroy<T>> Drop for Weak<T, D> {
    #[inline]
    fn drop(&mut self) {
        if let Some((_, ctrl)) = self.raw {
            // SAFETY: this weak count is owned by self and given up exactly once
            unsafe { Control::release_weak(ctrl) };
        }
    }
}

impl<T: ?Sized, D: Destroy<T>> Default for Weak<T, D> {
    #[inline]
    fn default() -> Self {
        Weak::new()
    }
}

impl<T: ?Sized, D: Destroy<T>> From<&Shared<T, D>> for Weak<T, D> {
    #[inline]
    fn from(shared: &Shared<T, D>) -> Self {
        Shared::downgrade(shared)
    }
}

impl<T: ?Sized, D: Destroy<T>> fmt::Debug for Weak<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(Weak)")
    }
}
