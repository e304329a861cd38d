//! Operation benchmarks for every implementation
//!
//! ```bash
//! cargo bench --bench heap_ops
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use referenceable_heaps::{
    BinarySearchTree, HeapBuilder, HeapKind, ReferenceableHeap, TreeBuilder, TreeKind,
};
use std::hint::black_box;

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

fn random_keys(n: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(0xbe7c);
    (0..n).map(|_| rng.gen_range(0..(n as u64) * 16)).collect()
}

/// Insert everything, then drain
fn insert_extract(kind: HeapKind, keys: &[u64]) -> u64 {
    let mut heap = HeapBuilder::new().kind(kind).build::<u64, ()>();
    for &k in keys {
        heap.insert(k, ());
    }
    let mut sum = 0;
    while let Ok((k, ())) = heap.extract_min() {
        sum ^= k;
    }
    sum
}

/// Dijkstra-like mix: every element decreased once before the drain
fn decrease_heavy(kind: HeapKind, keys: &[u64]) -> u64 {
    let mut heap = HeapBuilder::new().kind(kind).build::<u64, ()>();
    let handles: Vec<_> = keys.iter().map(|&k| heap.insert(k + 1_000_000, ())).collect();
    for (h, &k) in handles.iter().zip(keys) {
        // decrease_key cannot fail for a live handle and a smaller key
        let _ = heap.decrease_key(h, k);
    }
    let mut sum = 0;
    while let Ok((k, ())) = heap.extract_min() {
        sum ^= k;
    }
    sum
}

/// Melds of many small heaps into one
fn meld_many(kind: HeapKind, keys: &[u64]) -> usize {
    let mut acc = HeapBuilder::new().kind(kind).build::<u64, ()>();
    for chunk in keys.chunks(64) {
        let mut part = HeapBuilder::new().kind(kind).build::<u64, ()>();
        for &k in chunk {
            part.insert(k, ());
        }
        let _ = acc.meld(&mut part);
    }
    acc.len()
}

/// Split off the upper half and meld it back
fn split_meld(keys: &[u64]) -> usize {
    let mut tree = TreeBuilder::new().kind(TreeKind::Splay).build::<u64, ()>();
    for &k in keys {
        tree.insert(k, ());
    }
    let pivot = keys.len() as u64 * 8;
    for _ in 0..16 {
        if let Ok(mut upper) = tree.split_greater(&pivot) {
            let _ = tree.meld(&mut upper);
        }
    }
    tree.len()
}

/// Repeated key reads through the deepest handle of an ascending splay tree
fn deep_handle_reads(n: usize) -> u64 {
    let mut tree = TreeBuilder::new().kind(TreeKind::Splay).build::<u64, ()>();
    let handles: Vec<_> = (0..n as u64).map(|k| tree.insert(k, ())).collect();
    let mut sum = 0;
    for _ in 0..n {
        sum += tree.key(&handles[0]).copied().unwrap_or_default();
    }
    sum
}

fn bench_heaps(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_extract");
    for n in SIZES {
        let keys = random_keys(n);
        for kind in HeapKind::ALL {
            group.bench_with_input(BenchmarkId::new(kind.as_str(), n), &keys, |b, keys| {
                b.iter(|| black_box(insert_extract(kind, keys)))
            });
        }
    }
    group.finish();

    let mut group = c.benchmark_group("decrease_heavy");
    for n in SIZES {
        let keys = random_keys(n);
        for kind in HeapKind::ALL {
            group.bench_with_input(BenchmarkId::new(kind.as_str(), n), &keys, |b, keys| {
                b.iter(|| black_box(decrease_heavy(kind, keys)))
            });
        }
    }
    group.finish();

    let mut group = c.benchmark_group("meld_many");
    group.sample_size(20);
    for n in SIZES {
        let keys = random_keys(n);
        for kind in HeapKind::ALL {
            group.bench_with_input(BenchmarkId::new(kind.as_str(), n), &keys, |b, keys| {
                b.iter(|| black_box(meld_many(kind, keys)))
            });
        }
    }
    group.finish();

    let mut group = c.benchmark_group("split_meld");
    group.sample_size(20);
    for n in SIZES {
        let keys = random_keys(n);
        group.bench_with_input(BenchmarkId::new("splay", n), &keys, |b, keys| {
            b.iter(|| black_box(split_meld(keys)))
        });
    }
    group.finish();

    let mut group = c.benchmark_group("deep_handle_reads");
    group.sample_size(20);
    for n in SIZES {
        group.bench_with_input(BenchmarkId::new("splay", n), &n, |b, &n| {
            b.iter(|| black_box(deep_handle_reads(n)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_heaps);
criterion_main!(benches);
