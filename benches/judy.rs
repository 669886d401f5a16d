use std::sync::atomic::AtomicPtr;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rcuja::JudyArray;

struct Entry {
    next: AtomicPtr<Entry>,
    value: u64,
}

impl Entry {
    fn new(value: u64) -> Box<Self> {
        Box::new(Self { next: AtomicPtr::new(std::ptr::null_mut()), value })
    }
}

impl rcuja::LeafNode for Entry {
    fn next(&self) -> &AtomicPtr<Self> {
        &self.next
    }
}

fn add_dense(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_dense");
    for size in [64u64, 1024, 65536] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let ja = JudyArray::<Entry>::new(32).unwrap();
                for k in 0..size {
                    ja.add(black_box(k), Entry::new(k)).unwrap();
                }
            });
        });
    }
    group.finish();
}

fn lookup_hit(c: &mut Criterion) {
    let ja = JudyArray::<Entry>::new(32).unwrap();
    for k in 0..65536u64 {
        ja.add(k, Entry::new(k)).unwrap();
    }

    let mut group = c.benchmark_group("lookup_hit");
    group.bench_function("65536_populated", |b| {
        b.iter(|| {
            let guard = ja.pin();
            for k in (0..65536u64).step_by(37) {
                black_box(ja.lookup(&guard, k));
            }
        });
    });
    group.finish();
}

criterion_group!(benches, add_dense, lookup_hit);
criterion_main!(benches);
