use ownlite::Transfer;
use std::{cell::Cell, rc::Rc};

struct Tracked(Rc<Cell<usize>>);

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[derive(Debug, Default, PartialEq)]
struct Pair {
    a1: i32,
    a2: i32,
}

#[test]
fn transfer_empties_source() {
    let mut ap1 = Transfer::new(Pair::default());
    ap1.a1 += 1;
    ap1.a2 += 1;

    let mut ap2 = ap1.transfer();
    assert!(ap1.is_empty());
    assert!(ap1.get().is_none());
    ap2.a1 += 1;
    ap2.a2 += 1;
    assert_eq!(*ap2, Pair { a1: 2, a2: 2 });
}

#[test]
fn transfer_from_releases_previous_value() {
    let drops = Rc::new(Cell::new(0));
    let mut ap2 = Transfer::new(Tracked(drops.clone()));
    let mut ap3 = Transfer::new(Tracked(drops.clone()));

    ap2.transfer_from(&mut ap3);
    assert_eq!(drops.get(), 1);
    assert!(ap3.is_empty());
    assert!(!ap2.is_empty());

    drop(ap3);
    assert_eq!(drops.get(), 1);
    drop(ap2);
    assert_eq!(drops.get(), 2);
}

#[test]
fn transfer_from_empty_source_empties_target() {
    let drops = Rc::new(Cell::new(0));
    let mut target = Transfer::new(Tracked(drops.clone()));
    let mut source = Transfer::empty();
    target.transfer_from(&mut source);
    assert_eq!(drops.get(), 1);
    assert!(target.is_empty());
}

#[test]
fn released_once_after_chain_of_transfers() {
    let drops = Rc::new(Cell::new(0));
    let mut first = Transfer::new(Tracked(drops.clone()));
    let mut second = first.transfer();
    let third = second.transfer();
    drop(first);
    drop(second);
    assert_eq!(drops.get(), 0);
    drop(third);
    assert_eq!(drops.get(), 1);
}

#[test]
#[should_panic(expected = "dereferenced an empty Transfer pointer")]
fn access_after_transfer_panics() {
    let mut source = Transfer::new(Pair::default());
    let _target = source.transfer();
    assert_eq!(source.a1, 0);
}

#[test]
fn boxes_and_raw_pointers() {
    let transfer: Transfer<str> = Transfer::from_box("text".into());
    assert_eq!(Transfer::into_box(transfer).as_deref(), Some("text"));

    let empty = unsafe { Transfer::<u8>::from_raw(std::ptr::null_mut()) };
    assert!(empty.is_empty());
    assert_eq!(format!("{:?}", empty), "(empty)");

    let raw = Box::into_raw(Box::new(5u8));
    let mut owned = unsafe { Transfer::from_raw(raw) };
    *owned.get_mut().unwrap() += 1;
    assert_eq!(format!("{:?}", owned), "6");
    assert!(Transfer::into_box(Transfer::<u8>::default()).is_none());
}
