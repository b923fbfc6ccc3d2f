#![no_std]
//! # OwnLite: small ownership wrappers with pluggable destruction
//!
//! OwnLite is a lightweight family of owning pointers for single-threaded
//! code. Each type manages a dynamically allocated resource handle and releases
//! it at the right moment, so callers never have to free anything by hand.
//! Four ownership disciplines are provided:
//!
//! - [`Shared<T, D>`] shares ownership of a handle between any number of
//!   clones through a reference counter, and releases it with the destruction
//!   strategy `D` exactly once, when the last clone goes away.
//! - [`Weak<T, D>`] observes a handle owned by [`Shared`] without keeping it
//!   alive. It has to be [`upgrade`][Weak::upgrade]d before use, and the
//!   upgrade fails once the resource is gone.
//! - [`Unique<T, D>`] owns a handle exclusively. It cannot be cloned at all,
//!   only moved.
//! - [`Transfer<T>`] owns a handle exclusively but can hand it over to a new
//!   owner at runtime through the explicit [`transfer`][Transfer::transfer]
//!   operation, which leaves the source empty.
//!
//! ## Destruction strategies
//!
//! How a handle is released is decided by a [`Destroy`] strategy chosen at
//! construction time:
//!
//! |                  | Produced by                              | Released by           |
//! | ---------------- | ---------------------------------------- | --------------------- |
//! | [`DropBox`]      | [`Box::new`][alloc::boxed::Box::new]     | dropping the `Box`    |
//! | [`DropArray`]    | `Vec<T>` / `Box<[T]>`                    | dropping the `Box<[T]>` |
//! | [`Dealloc`]      | `alloc::alloc::alloc`                    | `alloc::alloc::dealloc` |
//! | `Fn(NonNull<T>)` | anything                                 | the closure           |
//!
//! ## Breaking cycles
//!
//! Two values that own each other through [`Shared`] keep each other's
//! counter above zero forever and leak. At least one edge of every cycle must
//! be a [`Weak`]:
//!
//! ```
//! use core::cell::RefCell;
//! use ownlite::{Shared, Weak};
//!
//! struct Node {
//!     next: RefCell<Option<Shared<Node>>>,
//!     prev: RefCell<Weak<Node>>,
//! }
//!
//! let first = Shared::new(Node { next: RefCell::new(None), prev: RefCell::new(Weak::new()) });
//! let second = Shared::new(Node { next: RefCell::new(None), prev: RefCell::new(Weak::new()) });
//! *first.next.borrow_mut() = Some(second.clone());
//! second.prev.borrow_mut().set(&first);
//!
//! assert_eq!(first.strong_count(), 1);
//! assert_eq!(second.strong_count(), 2);
//! ```
//!
//! ## Threads
//!
//! Counters are plain integers updated with non-atomic read-modify-write, so
//! [`Shared`] and [`Weak`] are neither `Send` nor `Sync`. The compiler rejects
//! any attempt to move them across threads:
//!
//! ```compile_fail
//! use ownlite::Shared;
//!
//! let shared = Shared::new(1);
//! std::thread::spawn(move || drop(shared));
//! ```
//!
//! ### Features
//!
//! By default, OwnLite uses a counter size of half the word size for 64-bit
//! systems, with the `usize-for-small-platforms` feature enabled. If you wish
//! to use the half register size on other platforms, you can disable the
//! default features by setting `default-features = false`. This will result
//! in the use of 16-bit counters on 32-bit platforms and 8-bit counters on
//! 16-bit platforms.

#![warn(missing_docs, missing_debug_implementations)]
extern crate alloc;

// Counter definition

#[cfg(target_pointer_width = "64")]
pub(crate) use u32 as ucount;

#[cfg(all(
    not(target_pointer_width = "64"),
    feature = "usize-for-small-platforms"
))]
pub(crate) use usize as ucount;

#[cfg(all(
    target_pointer_width = "32",
    not(feature = "usize-for-small-platforms")
))]
pub(crate) use u16 as ucount;

#[cfg(all(
    target_pointer_width = "16",
    not(feature = "usize-for-small-platforms")
))]
pub(crate) use u8 as ucount;

mod destroy;
mod shared;
mod transfer;
mod unique;
mod weak;

pub use destroy::*;
pub use shared::*;
pub use transfer::*;
pub use unique::*;
pub use weak::*;
