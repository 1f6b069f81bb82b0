//! Criterion micro-benchmarks for raw arena operations.

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use vmpool_arena::{Arena, PoolConfig, SlotLayout};

/// 1026 pages: 1024 usable, 4 MiB at 4 KiB pages.
const PAGES: usize = 1026;

fn bench_init_teardown(c: &mut Criterion) {
    c.bench_function("arena_init_teardown", |b| {
        let mut arena = Arena::new(PoolConfig::new(PAGES), SlotLayout::of::<u64>());
        b.iter(|| {
            arena.init(0).unwrap();
            arena.teardown().unwrap();
        });
    });
}

fn bench_allocate_small(c: &mut Criterion) {
    c.bench_function("arena_allocate_16_slots_x1000", |b| {
        b.iter(|| {
            let mut arena = Arena::new(PoolConfig::new(PAGES), SlotLayout::of::<u64>());
            for _ in 0..1000 {
                black_box(arena.allocate(16).unwrap());
            }
        });
    });
}

fn bench_extend_trailing(c: &mut Criterion) {
    c.bench_function("arena_extend_by_one_x100k", |b| {
        b.iter(|| {
            let mut arena = Arena::new(PoolConfig::new(PAGES), SlotLayout::of::<u64>());
            let p = arena.allocate(1).unwrap();
            for len in 1..100_000 {
                arena.extend(p.as_ptr(), len, len + 1).unwrap();
            }
            black_box(arena.committed_pages())
        });
    });
}

criterion_group!(
    benches,
    bench_init_teardown,
    bench_allocate_small,
    bench_extend_trailing
);
criterion_main!(benches);
