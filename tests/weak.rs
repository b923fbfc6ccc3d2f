use ownlite::{Shared, Weak};
use std::{cell::Cell, cell::RefCell, rc::Rc};

struct Tracked(Rc<Cell<usize>>);

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn observes_without_counting() {
    let shared = Shared::new(String::from("observed"));
    let weak = Weak::from(&shared);
    assert_eq!(shared.strong_count(), 1);
    assert_eq!(shared.weak_count(), 1);

    let upgraded = weak.upgrade().unwrap();
    assert_eq!(*upgraded, "observed");
    assert_eq!(shared.strong_count(), 2);
    drop(upgraded);
    assert_eq!(shared.strong_count(), 1);

    let copies: Vec<_> = (0..4).map(|_| weak.clone()).collect();
    assert_eq!(shared.strong_count(), 1);
    assert_eq!(shared.weak_count(), 5);
    drop(copies);
    assert_eq!(shared.weak_count(), 1);
}

#[test]
fn never_releases_the_handle() {
    let drops = Rc::new(Cell::new(0));
    let shared = Shared::new(Tracked(drops.clone()));
    let weak = Shared::downgrade(&shared);
    drop(weak);
    assert_eq!(drops.get(), 0);
    assert_eq!(shared.strong_count(), 1);
    drop(shared);
    assert_eq!(drops.get(), 1);
}

#[test]
fn stale_reference_fails_to_upgrade() {
    let drops = Rc::new(Cell::new(0));
    let a: Shared<RefCell<Weak<Tracked>>> = Shared::new(RefCell::new(Weak::new()));
    let b = Shared::new(Tracked(drops.clone()));
    a.borrow_mut().set(&b);
    assert!(a.borrow().is_alive());

    drop(b);
    assert_eq!(drops.get(), 1);
    let peer = a.borrow();
    assert!(!peer.is_alive());
    assert!(peer.upgrade().is_none());
    assert_eq!(peer.strong_count(), 0);
    assert_eq!(peer.weak_count(), 1);
}

#[test]
fn set_replaces_observed_handle() {
    let first = Shared::new(1);
    let second = Shared::new(2);
    let mut weak: Weak<i32> = Weak::default();
    assert!(weak.upgrade().is_none());

    weak.set(&first);
    assert_eq!(*weak.upgrade().unwrap(), 1);
    weak.set(&first);
    assert_eq!(first.weak_count(), 1);

    weak.set(&second);
    assert_eq!(*weak.upgrade().unwrap(), 2);
    assert_eq!(first.weak_count(), 0);
    assert_eq!(second.weak_count(), 1);
    assert_eq!(second.strong_count(), 1);
}

#[test]
fn ptr_eq_compares_handles() {
    let shared = Shared::new(0);
    let a = Shared::downgrade(&shared);
    let b = a.clone();
    let other = Shared::downgrade(&Shared::new(0));
    assert!(Weak::ptr_eq(&a, &b));
    assert!(!Weak::ptr_eq(&a, &other));
    let empty: Weak<u8> = Weak::new();
    assert!(Weak::ptr_eq(&empty, &Weak::new()));
    assert!(!Weak::ptr_eq(&a, &Weak::new()));
}

struct Node {
    value: i32,
    next: RefCell<Option<Shared<Node>>>,
    prev: RefCell<Weak<Node>>,
    _drop: Tracked,
}

fn node(value: i32, drops: &Rc<Cell<usize>>) -> Shared<Node> {
    Shared::new(Node {
        value,
        next: RefCell::new(None),
        prev: RefCell::new(Weak::new()),
        _drop: Tracked(drops.clone()),
    })
}

#[test]
fn weak_edge_breaks_cycle() {
    let drops = Rc::new(Cell::new(0));
    let n1 = node(1, &drops);
    let n2 = node(2, &drops);
    *n1.next.borrow_mut() = Some(n2.clone());
    n2.prev.borrow_mut().set(&n1);

    assert_eq!(n1.strong_count(), 1);
    assert_eq!(n2.strong_count(), 2);
    assert_eq!(n2.prev.borrow().upgrade().unwrap().value, 1);

    drop(n2);
    assert_eq!(drops.get(), 0);
    drop(n1);
    assert_eq!(drops.get(), 2);
}

#[test]
fn self_observing_value_is_released() {
    let drops = Rc::new(Cell::new(0));
    let n = node(7, &drops);
    n.prev.borrow_mut().set(&n);
    let outside = Shared::downgrade(&n);

    drop(n);
    assert_eq!(drops.get(), 1);
    assert!(outside.upgrade().is_none());
    assert_eq!(outside.weak_count(), 1);
}
