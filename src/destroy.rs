use alloc::{
    alloc::{dealloc, Layout},
    boxed::Box,
};
use core::ptr::NonNull;
use log::trace;

/// A destruction strategy releases a resource handle once its owner is done
/// with it.
///
/// [`Shared<T, D>`][`crate::Shared`] calls the strategy exactly once, when the
/// last strong reference to a handle goes away, and
/// [`Unique<T, D>`][`crate::Unique`] calls it when it is dropped. The strategy
/// must pair with the way the handle was produced: [`DropBox`] for handles
/// that came from a [`Box`], [`DropArray`] for boxed slices, [`Dealloc`] for
/// handles from the global allocator, or a closure for anything else.
///
/// Any `Fn(NonNull<T>)` closure is a strategy, which makes it easy to pair a
/// custom open call with its close call:
///
/// ```
/// use core::{cell::Cell, ptr::NonNull};
/// use ownlite::Shared;
///
/// let closed = Cell::new(false);
/// let close = |ptr: NonNull<i32>| {
///     closed.set(true);
///     drop(unsafe { Box::from_raw(ptr.as_ptr()) });
/// };
/// let handle = NonNull::from(Box::leak(Box::new(7)));
/// let file = unsafe { Shared::from_raw_in(handle, close) };
/// drop(file);
/// assert!(closed.get());
/// ```
pub trait Destroy<T: ?Sized> {
    /// Releases the resource behind `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must have been produced by the allocation method this strategy
    /// pairs with, must still be live, and must not be used again after this
    /// call. Owners call `destroy` at most once per handle.
    unsafe fn destroy(&self, ptr: NonNull<T>);
}

/// Releases a single object that was allocated through [`Box`]. This is the
/// default strategy of every owner in this crate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DropBox;

impl<T: ?Sized> Destroy<T> for DropBox {
    #[inline]
    unsafe fn destroy(&self, ptr: NonNull<T>) {
        trace!("releasing boxed handle {:p}", ptr.cast::<()>());
        drop(Box::from_raw(ptr.as_ptr()));
    }
}

/// Releases an array: every element is dropped and the backing allocation of
/// the boxed slice is freed.
///
/// ```
/// use ownlite::{DropArray, Shared};
///
/// let numbers: Shared<[u32], DropArray> = Shared::from_vec(vec![1, 2, 3]);
/// assert_eq!(numbers.len(), 3);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DropArray;

impl<T> Destroy<[T]> for DropArray {
    #[inline]
    unsafe fn destroy(&self, ptr: NonNull<[T]>) {
        trace!(
            "releasing array handle {:p} of {} elements",
            ptr.cast::<()>(),
            ptr.as_ref().len()
        );
        drop(Box::<[T]>::from_raw(ptr.as_ptr()));
    }
}

/// Releases a value that was written into memory obtained directly from the
/// global allocator with `alloc::alloc::alloc(Layout::for_value(..))`.
///
/// The value is dropped in place, then the memory is returned with the
/// matching [`dealloc`] call.
///
/// ```
/// use std::alloc::{alloc, Layout};
/// use core::ptr::NonNull;
/// use ownlite::{Dealloc, Shared};
///
/// let shared = unsafe {
///     let raw = alloc(Layout::new::<u64>()) as *mut u64;
///     raw.write(42);
///     Shared::from_raw_in(NonNull::new(raw).unwrap(), Dealloc)
/// };
/// assert_eq!(*shared, 42);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Dealloc;

impl<T: ?Sized> Destroy<T> for Dealloc {
    unsafe fn destroy(&self, ptr: NonNull<T>) {
        let layout = Layout::for_value(ptr.as_ref());
        trace!(
            "deallocating handle {:p} ({} bytes)",
            ptr.cast::<()>(),
            layout.size()
        );
        core::ptr::drop_in_place(ptr.as_ptr());
        // zero-sized values never touched the allocator
        if layout.size() != 0 {
            dealloc(ptr.as_ptr() as *mut u8, layout);
        }
    }
}

impl<T: ?Sized, F: Fn(NonNull<T>)> Destroy<T> for F {
    #[inline]
    unsafe fn destroy(&self, ptr: NonNull<T>) {
        self(ptr)
    }
}
