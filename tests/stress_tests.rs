//! Stress tests that push every implementation through long seeded workloads
//!
//! Each test runs against all kinds through the runtime builder, so one failing
//! kind is named in the assertion message.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use referenceable_heaps::{AnyHeap, Comparator, HeapBuilder, HeapKind, HeapRef, ReferenceableHeap};

fn build<V>(kind: HeapKind) -> AnyHeap<i64, V> {
    HeapBuilder::new().kind(kind).build()
}

/// Many inserts then a full drain
#[test]
fn test_massive_operations() {
    for kind in HeapKind::ALL {
        let mut heap = build::<u32>(kind);
        for i in (0..10_000u32).rev() {
            heap.insert(i64::from(i), i);
        }
        assert_eq!(heap.len(), 10_000, "{kind}");
        for i in 0..10_000u32 {
            assert_eq!(heap.extract_min(), Ok((i64::from(i), i)), "{kind}");
        }
        assert!(heap.is_empty(), "{kind}");
    }
}

/// Every element decreased, most of them several times
#[test]
fn test_many_decrease_keys() {
    for kind in HeapKind::ALL {
        let mut heap = build::<usize>(kind);
        let handles: Vec<_> = (0..2000).map(|i| heap.insert(100_000 + i as i64, i)).collect();
        for round in 0..3i64 {
            for (i, h) in handles.iter().enumerate() {
                heap.decrease_key(h, 50_000 - round * 20_000 + i as i64).unwrap();
            }
        }
        for i in 0..2000 {
            assert_eq!(heap.extract_min(), Ok((10_000 + i as i64, i)), "{kind}");
        }
    }
}

/// Random operation mix checked against a multiset of keys
#[test]
fn test_random_workload() {
    for kind in HeapKind::ALL {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut heap = build::<()>(kind);
        let mut live: Vec<(HeapRef, i64)> = Vec::new();
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();

        for _ in 0..20_000 {
            match rng.gen_range(0..10) {
                0..=3 => {
                    let k = rng.gen_range(-10_000..10_000);
                    live.push((heap.insert(k, ()), k));
                    *counts.entry(k).or_default() += 1;
                }
                4 | 5 if !live.is_empty() => {
                    let i = rng.gen_range(0..live.len());
                    let (h, k) = &mut live[i];
                    let new_key = *k - rng.gen_range(0..5_000);
                    decrement(&mut counts, *k);
                    *counts.entry(new_key).or_default() += 1;
                    *k = new_key;
                    heap.decrease_key(h, new_key).unwrap();
                }
                6 if !live.is_empty() => {
                    let i = rng.gen_range(0..live.len());
                    let (h, k) = live.swap_remove(i);
                    assert_eq!(heap.remove(&h), Ok((k, ())), "{kind}");
                    decrement(&mut counts, k);
                }
                7 if !live.is_empty() => {
                    let i = rng.gen_range(0..live.len());
                    let (h, k) = &mut live[i];
                    let new_key = *k + rng.gen_range(1..5_000);
                    decrement(&mut counts, *k);
                    *counts.entry(new_key).or_default() += 1;
                    *k = new_key;
                    heap.increase_key(h, new_key).unwrap();
                }
                _ if !live.is_empty() => {
                    let expected = *counts.keys().next().unwrap();
                    let (k, ()) = heap.extract_min().unwrap();
                    assert_eq!(k, expected, "{kind}");
                    decrement(&mut counts, k);
                    live.retain(|(h, _)| h.is_live());
                }
                _ => {}
            }
            assert_eq!(heap.len(), live.len(), "{kind}");
        }

        let expected: Vec<i64> = counts
            .iter()
            .flat_map(|(&k, &n)| std::iter::repeat(k).take(n))
            .collect();
        let drained: Vec<i64> = std::iter::from_fn(|| heap.extract_min().ok()).map(|(k, _)| k).collect();
        assert_eq!(drained, expected, "{kind}");
    }
}

fn decrement(counts: &mut BTreeMap<i64, usize>, key: i64) {
    if let Some(n) = counts.get_mut(&key) {
        *n -= 1;
        if *n == 0 {
            counts.remove(&key);
        }
    }
}

/// Many small heaps melded pairwise until one remains
#[test]
fn test_meld_tournament() {
    for kind in HeapKind::ALL {
        let mut rng = StdRng::seed_from_u64(42);
        let mut all_handles = Vec::new();
        let mut heaps: Vec<AnyHeap<i64, ()>> = (0..64)
            .map(|_| {
                let mut heap = build(kind);
                for _ in 0..rng.gen_range(0..40) {
                    all_handles.push(heap.insert(rng.gen_range(0..1_000), ()));
                }
                heap
            })
            .collect();

        while heaps.len() > 1 {
            let mut next = Vec::with_capacity(heaps.len() / 2);
            let mut iter = heaps.into_iter();
            while let Some(mut a) = iter.next() {
                if let Some(mut b) = iter.next() {
                    a.meld(&mut b).unwrap();
                    assert!(b.is_empty(), "{kind}");
                }
                next.push(a);
            }
            heaps = next;
        }

        let mut heap = heaps.pop().unwrap();
        assert_eq!(heap.len(), all_handles.len(), "{kind}");
        assert!(all_handles.iter().all(|h| heap.contains(h)), "{kind}");
        let mut prev = i64::MIN;
        while let Ok((k, ())) = heap.extract_min() {
            assert!(k >= prev, "{kind}");
            prev = k;
        }
    }
}

/// Max-heap behaviour through a reversed comparator
#[test]
fn test_reversed_comparator() {
    for kind in HeapKind::ALL {
        let mut rng = StdRng::seed_from_u64(7);
        let mut heap: AnyHeap<i64, ()> =
            HeapBuilder::new().kind(kind).build_with(Comparator::new(|a: &i64, b: &i64| b.cmp(a)));
        let mut keys: Vec<i64> = (0..1000).map(|_| rng.gen_range(0..100_000)).collect();
        let handles: Vec<_> = keys.iter().map(|&k| heap.insert(k, ())).collect();

        // with reversed order a larger key is a "decrease"
        heap.decrease_key(&handles[0], 1_000_000).unwrap();
        keys[0] = 1_000_000;

        keys.sort_unstable_by(|a, b| b.cmp(a));
        let drained: Vec<i64> = std::iter::from_fn(|| heap.extract_min().ok()).map(|(k, _)| k).collect();
        assert_eq!(drained, keys, "{kind}");
    }
}

/// Dijkstra on a seeded random graph agrees with a lazy-deletion binary heap
#[test]
fn test_dijkstra() {
    const NODES: usize = 500;
    let mut rng = StdRng::seed_from_u64(1234);
    let mut edges: Vec<Vec<(usize, i64)>> = vec![Vec::new(); NODES];
    for from in 0..NODES {
        for _ in 0..8 {
            edges[from].push((rng.gen_range(0..NODES), rng.gen_range(1..100)));
        }
    }

    let expected = {
        let mut dist = vec![i64::MAX; NODES];
        let mut queue = BinaryHeap::new();
        dist[0] = 0;
        queue.push(Reverse((0, 0usize)));
        while let Some(Reverse((d, u))) = queue.pop() {
            if d > dist[u] {
                continue;
            }
            for &(v, w) in &edges[u] {
                if d + w < dist[v] {
                    dist[v] = d + w;
                    queue.push(Reverse((d + w, v)));
                }
            }
        }
        dist
    };

    for kind in HeapKind::ALL {
        let mut heap = build::<usize>(kind);
        let mut dist = vec![i64::MAX; NODES];
        let mut handles: Vec<Option<HeapRef>> = vec![None; NODES];
        dist[0] = 0;
        handles[0] = Some(heap.insert(0, 0));

        while let Ok((d, u)) = heap.extract_min() {
            for &(v, w) in &edges[u] {
                let candidate = d + w;
                if candidate >= dist[v] {
                    continue;
                }
                dist[v] = candidate;
                let queued = handles[v].as_ref().filter(|h| h.is_live()).cloned();
                match queued {
                    Some(h) => heap.decrease_key(&h, candidate).unwrap(),
                    None => handles[v] = Some(heap.insert(candidate, v)),
                }
            }
        }
        assert_eq!(dist, expected, "{kind}");
    }
}
