//! Benchmarks for sobstore operations

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use sobstore::{Config, OpenMode, RecordStore};
use tempfile::TempDir;

const RECORDS: u64 = 10_000;

fn filled_store(dir: &TempDir, budget: usize) -> RecordStore {
    let config = Config::builder()
        .itemsize(8)
        .sort_memory_budget(budget)
        .build();
    let mut store =
        RecordStore::open(dir.path().join("bench.sob"), OpenMode::CreateTruncate, config).unwrap();
    for i in 0..RECORDS {
        let value = i.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        store.append(&value.to_be_bytes()).unwrap();
    }
    store
}

fn store_benchmarks(c: &mut Criterion) {
    c.bench_function("append 8-byte record", |b| {
        let dir = TempDir::new().unwrap();
        let config = Config::builder().itemsize(8).build();
        let mut store =
            RecordStore::open(dir.path().join("append.sob"), OpenMode::CreateTruncate, config)
                .unwrap();
        let mut i = 0u64;
        b.iter(|| {
            store.append(&i.to_be_bytes()).unwrap();
            i += 1;
        });
    });

    let dir = TempDir::new().unwrap();
    let mut store = filled_store(&dir, 64 * 1024 * 1024);

    c.bench_function("get random position", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = (i + 7919) % RECORDS;
            black_box(store.get(i).unwrap());
        });
    });

    let target = 5_000u64.wrapping_mul(0x9E37_79B9_7F4A_7C15).to_be_bytes();
    c.bench_function("index unordered (linear)", |b| {
        b.iter(|| black_box(store.index(&target).unwrap()));
    });

    store.sort().unwrap();
    c.bench_function("index ordered (binary)", |b| {
        b.iter(|| black_box(store.index(&target).unwrap()));
    });

    store.fill_cache().unwrap();
    c.bench_function("index ordered (cached midpoints)", |b| {
        b.iter(|| black_box(store.index(&target).unwrap()));
    });

    c.bench_function("sort in memory", |b| {
        b.iter_batched(
            || {
                let dir = TempDir::new().unwrap();
                let store = filled_store(&dir, 64 * 1024 * 1024);
                (dir, store)
            },
            |(_dir, mut store)| store.sort().unwrap(),
            BatchSize::PerIteration,
        );
    });

    c.bench_function("sort external (8 KiB budget)", |b| {
        b.iter_batched(
            || {
                let dir = TempDir::new().unwrap();
                let store = filled_store(&dir, 8 * 1024);
                (dir, store)
            },
            |(_dir, mut store)| store.sort().unwrap(),
            BatchSize::PerIteration,
        );
    });
}

criterion_group!(benches, store_benchmarks);
criterion_main!(benches);
