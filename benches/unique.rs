use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ownlite::{Transfer, Unique};

fn new_unique_benchmark(c: &mut Criterion) {
    c.bench_function("ownlite::Unique::new", |b| {
        b.iter(|| black_box(Unique::new(black_box([42u8; 64]))))
    });
    c.bench_function("std::boxed::Box::new", |b| {
        b.iter(|| black_box(Box::new(black_box([42u8; 64]))))
    });
}

fn transfer_benchmark(c: &mut Criterion) {
    let mut source = Transfer::new([42u8; 64]);
    c.bench_function("ownlite::Transfer::transfer_from", |b| {
        let mut target = Transfer::empty();
        b.iter(|| {
            target.transfer_from(&mut source);
            source.transfer_from(&mut target);
        })
    });
    let mut source = Some(Box::new([42u8; 64]));
    c.bench_function("std::option::Option::<Box>::take", |b| {
        let mut target = None;
        b.iter(|| {
            target = source.take();
            source = target.take();
        })
    });
}

fn access_unique_benchmark(c: &mut Criterion) {
    let unique = Unique::new([42u8; 64]);
    c.bench_function("ownlite::Unique::access", |b| {
        b.iter(|| black_box(unique[black_box(7)]))
    });
    let boxed = Box::new([42u8; 64]);
    c.bench_function("std::boxed::Box::access", |b| {
        b.iter(|| black_box(boxed[black_box(7)]))
    });
}

criterion_group!(
    unique_benches,
    new_unique_benchmark,
    transfer_benchmark,
    access_unique_benchmark,
);

criterion_main!(unique_benches);
