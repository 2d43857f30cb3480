//! Benchmark for SplitListSet with epoch-based memory reclamation.
//!
//! Run with: cargo bench --package splitlist-crossbeam --bench split_list_benchmark

use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use mimalloc::MiMalloc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::RandomState;
use std::sync::Arc;
use std::thread;

use splitlist_core::{DefaultPolicy, StaticPolicy};
use splitlist_crossbeam::EpochSplitListSet;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

type ExpandableSet = EpochSplitListSet<usize, RandomState, DefaultPolicy>;
type StaticSet = EpochSplitListSet<usize, RandomState, StaticPolicy>;

// ============================================================================
// Concurrent insert benchmark
// ============================================================================

fn split_list_insert(set: Arc<ExpandableSet>, thread_count: usize, iteration_count: usize) {
    let mut handles = vec![];

    for i in 0..thread_count {
        let set_clone = Arc::clone(&set);
        let handle = thread::spawn(move || {
            for j in 0..iteration_count {
                set_clone.insert(i * iteration_count + j);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(set.size(), iteration_count * thread_count);
    assert!(set.contains(&42));
}

// ============================================================================
// Mixed operations benchmark (insert + contains + erase)
// ============================================================================

fn split_list_mixed(set: Arc<StaticSet>, thread_count: usize, iteration_count: usize) {
    let mut handles = vec![];

    for t in 0..thread_count {
        let set_clone = Arc::clone(&set);
        let handle = thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(t as u64);
            for _ in 0..iteration_count {
                let key = rng.gen_range(0..iteration_count * 2);
                match rng.gen_range(0..10) {
                    0 => {
                        set_clone.insert(key);
                    }
                    1 => {
                        set_clone.erase(&key);
                    }
                    _ => {
                        let _ = set_clone.contains(&key);
                    }
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

// ============================================================================
// High contention benchmark
// ============================================================================

fn split_list_contention(set: Arc<ExpandableSet>, thread_count: usize, iteration_count: usize) {
    let key_range = 100usize;
    let mut handles = vec![];

    for _ in 0..thread_count {
        let set_clone = Arc::clone(&set);
        let handle = thread::spawn(move || {
            for i in 0..iteration_count {
                let key = i % key_range;
                if i % 2 == 0 {
                    set_clone.insert(key);
                } else {
                    set_clone.erase(&key);
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

// ============================================================================
// Criterion benchmark groups
// ============================================================================

fn concurrent_insert_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_list_concurrent_insert");

    for thread_count in [1, 2, 4, 8, 12, 16] {
        let bench_name = format!("split_list_{:0>2}_10000", thread_count);
        group.bench_function(bench_name, |b| {
            b.iter(|| {
                // Start small so every iteration exercises bucket splitting.
                let set = Arc::new(ExpandableSet::with_capacity(thread_count * 10_000, 1));
                split_list_insert(set, black_box(thread_count), black_box(10_000))
            })
        });
    }

    group.finish();
}

fn mixed_operations_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_list_mixed_operations");

    for thread_count in [1, 2, 4, 8, 12, 16] {
        let set = Arc::new(StaticSet::with_capacity_and_hasher(20_000, 2, RandomState::new()));
        for key in (0..20_000).step_by(2) {
            set.insert(key);
        }

        let bench_name = format!("split_list_static_{:0>2}_10000", thread_count);
        group.bench_function(bench_name, |b| {
            b.iter(|| split_list_mixed(Arc::clone(&set), black_box(thread_count), black_box(10_000)))
        });
    }

    group.finish();
}

fn contention_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_list_high_contention");

    for thread_count in [1, 2, 4, 8, 12, 16] {
        let bench_name = format!("split_list_{:0>2}_10000", thread_count);
        group.bench_function(bench_name, |b| {
            b.iter(|| {
                let set = Arc::new(ExpandableSet::new());
                split_list_contention(set, black_box(thread_count), black_box(10_000))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    concurrent_insert_benchmark,
    mixed_operations_benchmark,
    contention_benchmark
);
criterion_main!(benches);
