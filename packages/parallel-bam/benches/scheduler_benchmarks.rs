//! Scheduler benchmarks
//!
//! - Cold run: every block analysed, cache starts empty
//! - Warm run: every call is a full hit, only the root executor runs
//! - Worker scaling on a wide fanout

#[path = "../tests/common/mod.rs"]
mod common;

use common::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use parallel_bam::{BlockId, CacheKey, DataManager};
use prometheus::Registry;
use std::sync::Arc;

// ============================================================================
// Full runs
// ============================================================================

fn bench_cold_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("cold_run");

    for branches in [8u32, 64, 256] {
        group.throughput(Throughput::Elements(branches as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(branches),
            &branches,
            |b, &branches| {
                let program = fanout(branches);
                b.iter(|| {
                    let harness = Harness::new(Arc::clone(&program), test_config(4));
                    black_box(harness.engine.run(&harness.main_reached()).unwrap())
                });
            },
        );
    }

    group.finish();
}

fn bench_warm_run(c: &mut Criterion) {
    let harness = Harness::new(fanout(256), test_config(4));
    harness.engine.run(&harness.main_reached()).unwrap();

    c.bench_function("warm_run_256", |b| {
        b.iter(|| black_box(harness.engine.run(&harness.main_reached()).unwrap()));
    });
}

fn bench_worker_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("worker_scaling");
    let program = fanout(128);

    for workers in [1usize, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(workers),
            &workers,
            |b, &workers| {
                b.iter(|| {
                    let harness = Harness::new(Arc::clone(&program), test_config(workers));
                    black_box(harness.engine.run(&harness.main_reached()).unwrap())
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Cache
// ============================================================================

fn bench_summary_lookup(c: &mut Criterion) {
    let program = double_call();
    let block = Arc::clone(program.partition.block(BlockId(CALLEE)).unwrap());
    let dm: DataManager<ToyState, ()> = DataManager::new(&Registry::new()).unwrap();

    for v in 0..1024 {
        let key = CacheKey::new(ToyState::new(1000, v), (), Arc::clone(&block));
        let (entry, _) = dm.get_or_create_reached_set(&key).unwrap();
        if v % 2 == 0 {
            entry.set_exit_states(vec![ToyState::new(1002, v)]).unwrap();
        }
    }

    let hit = CacheKey::new(ToyState::new(1000, 10), (), Arc::clone(&block));
    let partial = CacheKey::new(ToyState::new(1000, 11), (), Arc::clone(&block));
    let miss = CacheKey::new(ToyState::new(1000, 5000), (), block);

    let mut group = c.benchmark_group("summary_lookup");
    group.bench_function("full_hit", |b| b.iter(|| black_box(dm.summary(&hit))));
    group.bench_function("partial_hit", |b| b.iter(|| black_box(dm.summary(&partial))));
    group.bench_function("miss", |b| b.iter(|| black_box(dm.summary(&miss))));
    group.finish();
}

criterion_group!(
    benches,
    bench_cold_run,
    bench_warm_run,
    bench_worker_scaling,
    bench_summary_lookup
);
criterion_main!(benches);
