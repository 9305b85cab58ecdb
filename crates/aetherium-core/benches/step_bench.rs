//! Criterion benchmarks for the converter step loop.
//!
//! Three benchmark groups:
//! - `single_converter`: one busy crusher, one step per iteration
//! - `driver`: 1000 converters (engines feeding crushers) stepped together
//! - `persistence`: save + encode and decode + load of a mid-run crusher

use aetherium_core::converter::ConverterInstance;
use aetherium_core::driver::Driver;
use aetherium_core::id::{ConverterId, Face};
use aetherium_core::persist::{decode_record, encode_record};
use aetherium_core::rng::SimRng;
use aetherium_core::test_utils::*;
use criterion::{Criterion, criterion_group, criterion_main};
use std::sync::Arc;

// ===========================================================================
// Builders
// ===========================================================================

fn busy_crusher() -> ConverterInstance {
    let mut crusher = crusher();
    charge(&mut crusher, 10_000);
    insert(&mut crusher, 0, "iron_ore", 64);
    crusher
}

/// 500 engine/crusher pairs, engines already warm.
fn build_plant() -> (Driver, Vec<(ConverterId, ConverterId)>) {
    let mut driver = Driver::new(0xBE7C);
    let mut pairs = Vec::with_capacity(500);
    for _ in 0..500 {
        let mut engine = steam_engine();
        insert(&mut engine, 0, "coal", 64);
        insert(&mut engine, 1, "water_bucket", 1);
        let engine = driver.add(engine);
        let crusher = driver.add(busy_crusher());
        pairs.push((engine, crusher));
    }
    for _ in 0..200 {
        driver.step();
    }
    (driver, pairs)
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_single_converter(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_converter");
    let mut crusher = busy_crusher();
    let mut rng = SimRng::new(1);

    group.bench_function("crusher_step", |b| {
        b.iter(|| {
            charge(&mut crusher, 10_000);
            crusher.step(&mut rng);
        })
    });
    group.finish();
}

fn bench_driver(c: &mut Criterion) {
    let mut group = c.benchmark_group("driver");
    group.sample_size(30);
    let (mut driver, pairs) = build_plant();

    group.bench_function("1000_converters_step_and_transfer", |b| {
        b.iter(|| {
            driver.step();
            for &(engine, crusher) in &pairs {
                driver.transfer_energy(engine, crusher, Face::East, 1_000);
            }
        })
    });
    group.bench_function("state_hash_1000_converters", |b| {
        b.iter(|| driver.state_hash())
    });
    group.finish();
}

fn bench_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("persistence");
    let mut crusher = busy_crusher();
    let mut rng = SimRng::new(1);
    run(&mut crusher, &mut rng, 150);
    let spec = Arc::clone(crusher.spec());
    let items = Arc::clone(crusher.inventory().items());
    let bytes = encode_record(&crusher.save()).unwrap();

    group.bench_function("save_and_encode", |b| {
        b.iter(|| encode_record(&crusher.save()).unwrap())
    });
    group.bench_function("decode_and_load", |b| {
        b.iter(|| {
            let record = decode_record(&bytes).unwrap();
            ConverterInstance::load(Arc::clone(&spec), Arc::clone(&items), &record).unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_single_converter, bench_driver, bench_persistence);
criterion_main!(benches);
