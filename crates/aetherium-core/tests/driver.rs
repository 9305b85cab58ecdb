//! Multi-converter tests: a steam engine feeding processors through the
//! driver, determinism across identical drivers, and save/resume.

use aetherium_core::converter::{ConverterInstance, ConverterState};
use aetherium_core::driver::Driver;
use aetherium_core::event::EventKind;
use aetherium_core::generator::GeneratorPhase;
use aetherium_core::id::{ConverterId, Face};
use aetherium_core::inventory::{SlotFilter, SlotRule};
use aetherium_core::item::ResourceUnit;
use aetherium_core::persist::{decode_record, encode_record};
use aetherium_core::recipe::{Ingredient, RecipeCatalogBuilder, RecipeDef};
use aetherium_core::rng::SimRng;
use aetherium_core::spec::ConverterKind;
use aetherium_core::test_utils::*;
use std::sync::Arc;

// ===========================================================================
// Helpers
// ===========================================================================

/// Steam engine west of a crusher, both loaded.
fn powered_line(seed: u64) -> (Driver, ConverterId, ConverterId) {
    let mut engine = steam_engine();
    insert(&mut engine, 0, "coal", 8);
    insert(&mut engine, 1, "water_bucket", 1);

    let mut crusher = crusher();
    insert(&mut crusher, 0, "iron_ore", 16);

    let mut driver = Driver::new(seed);
    let engine = driver.add(engine);
    let crusher = driver.add(crusher);
    (driver, engine, crusher)
}

fn run_line(driver: &mut Driver, engine: ConverterId, crusher: ConverterId, steps: u32) {
    for _ in 0..steps {
        driver.step();
        driver.transfer_energy(engine, crusher, Face::East, 1_000);
    }
}

// ===========================================================================
// Transfers
// ===========================================================================

#[test]
fn engine_powers_crusher_through_faces() {
    let (mut driver, engine, crusher) = powered_line(1);
    // 200 steps of warmup, then 20 per step.
    run_line(&mut driver, engine, crusher, 200);
    assert_eq!(driver.get(crusher).unwrap().pool().stored(), 0);
    assert_eq!(
        driver.get(engine).unwrap().generator_state().unwrap().phase,
        GeneratorPhase::Warm
    );

    run_line(&mut driver, engine, crusher, 600);
    let crusher_view = driver.get(crusher).unwrap().snapshot().clone();
    assert!(crusher_view.active);
    assert!(crusher_view.slots[1].is_some(), "crusher should have produced something");
}

#[test]
fn energy_transfer_respects_faces_and_rates() {
    let mut engine = steam_engine();
    charge(&mut engine, 5_000);
    let mut driver = Driver::new(0);
    let engine = driver.add(engine);
    let crusher = driver.add(crusher());

    // Crusher takes energy from the sides only, up to 1 000 per call.
    assert_eq!(driver.transfer_energy(engine, crusher, Face::Up, 500), 0);
    assert_eq!(driver.transfer_energy(engine, crusher, Face::East, 4_000), 1_000);
    assert_eq!(driver.get(engine).unwrap().pool().stored(), 4_000);
    assert_eq!(driver.get(crusher).unwrap().pool().stored(), 1_000);

    // Processors never give energy back.
    assert_eq!(driver.transfer_energy(crusher, engine, Face::West, 100), 0);
    assert_eq!(driver.transfer_energy(engine, engine, Face::East, 100), 0);
}

/// A processor that takes raw iron, so crusher output has somewhere to go.
fn iron_infuser() -> ConverterInstance {
    let items = items();
    let mut recipes = RecipeCatalogBuilder::new(Arc::clone(&items));
    recipes.register(RecipeDef {
        name: "infuse_iron".into(),
        input: Ingredient::single(item(&items, "raw_iron"), 1),
        energy_cost: 50,
        duration_steps: 10,
        primary_output: ResourceUnit::one(item(&items, "mana_crystal")),
        secondary_output: None,
    });
    let mut spec = infuser_spec(&items);
    spec.slots[0] = SlotRule::input(SlotFilter::Items(vec![item(&items, "raw_iron")]));
    spec.kind = ConverterKind::Processor {
        catalog: Arc::new(recipes.build().unwrap()),
    };
    build(spec, items)
}

#[test]
fn item_transfer_moves_products_down_the_line() {
    let mut driver = Driver::new(0);
    let mut crusher = crusher();
    fill(&mut crusher, 1, "raw_iron", 10);
    let crusher = driver.add(crusher);
    let sink = driver.add(iron_infuser());

    assert_eq!(driver.transfer_items(crusher, 1, sink, 0, Face::East, 5), 5);
    assert_eq!(count(driver.get(crusher).unwrap(), 1), 5);
    assert_eq!(count(driver.get(sink).unwrap(), 0), 5);

    // Filters and output roles refuse the whole unit.
    let plain = driver.add(infuser());
    assert_eq!(driver.transfer_items(crusher, 1, plain, 0, Face::East, 5), 0);
    assert_eq!(driver.transfer_items(crusher, 1, sink, 1, Face::East, 5), 0);
    // Input slots cannot be pulled from.
    assert_eq!(driver.transfer_items(sink, 0, crusher, 0, Face::West, 5), 0);
    assert_eq!(count(driver.get(crusher).unwrap(), 1), 5);
}

#[test]
fn partial_item_transfer_leaves_the_rest() {
    let mut driver = Driver::new(0);
    let mut crusher = crusher();
    fill(&mut crusher, 1, "raw_iron", 10);
    let crusher = driver.add(crusher);
    let mut sink = iron_infuser();
    insert(&mut sink, 0, "raw_iron", 62);
    let sink = driver.add(sink);

    assert_eq!(driver.transfer_items(crusher, 1, sink, 0, Face::East, 10), 2);
    assert_eq!(count(driver.get(crusher).unwrap(), 1), 8);
    assert_eq!(count(driver.get(sink).unwrap(), 0), 64);
    assert!(driver.get(sink).unwrap().snapshot_is_stale());
}

// ===========================================================================
// Determinism
// ===========================================================================

#[test]
fn identical_drivers_hash_identically() {
    let (mut a, ae, ac) = powered_line(42);
    let (mut b, be, bc) = powered_line(42);
    for _ in 0..50 {
        run_line(&mut a, ae, ac, 20);
        run_line(&mut b, be, bc, 20);
        assert_eq!(a.state_hash(), b.state_hash());
    }
}

#[test]
fn different_seeds_draw_different_byproducts() {
    // Each converter's RNG stream is part of the hash.
    let (mut a, ae, ac) = powered_line(1);
    let (mut b, be, bc) = powered_line(2);
    run_line(&mut a, ae, ac, 10);
    run_line(&mut b, be, bc, 10);
    assert_ne!(a.state_hash(), b.state_hash());
}

#[test]
fn removal_returns_contents_and_keeps_order() {
    let (mut driver, engine, crusher) = powered_line(7);
    run_line(&mut driver, engine, crusher, 5);
    let returned = driver.remove(crusher).unwrap();
    assert_eq!(returned.iter().map(|u| u.count).sum::<u32>(), 16);
    assert!(driver.get(crusher).is_none());
    assert_eq!(driver.ids(), &[engine]);
    assert!(driver.remove(crusher).is_none());
    assert_eq!(driver.len(), 1);
}

#[test]
fn driver_events_are_tagged_by_converter() {
    let (mut driver, engine, crusher) = powered_line(3);
    run_line(&mut driver, engine, crusher, 1);
    let events = driver.drain_events();
    assert!(events.iter().any(|(id, e)| *id == engine && e.kind() == EventKind::FuelIgnited));
    assert!(events.iter().all(|(id, _)| *id == engine));
    assert!(driver.drain_events().is_empty());
}

// ===========================================================================
// Save / resume
// ===========================================================================

#[test]
fn resumed_crusher_finishes_like_the_original() {
    let mut original = crusher();
    charge(&mut original, 10_000);
    insert(&mut original, 0, "iron_ore", 3);
    let mut rng = SimRng::new(99);
    run(&mut original, &mut rng, 150);

    let bytes = encode_record(&original.save()).unwrap();
    let record = decode_record(&bytes).unwrap();
    let mut resumed = ConverterInstance::load(
        Arc::clone(original.spec()),
        Arc::clone(original.inventory().items()),
        &record,
    )
    .unwrap();

    assert_eq!(resumed.state(), original.state());
    assert_eq!(resumed.progress(), 150);
    assert_eq!(resumed.pool().stored(), original.pool().stored());
    assert_eq!(resumed.save(), original.save());

    let mut rng_copy = rng.clone();
    run(&mut original, &mut rng, 60);
    run(&mut resumed, &mut rng_copy, 60);
    assert_eq!(resumed.save(), original.save());
    assert_eq!(resumed.state(), ConverterState::Processing);
}

#[test]
fn resumed_steam_engine_keeps_burning() {
    let mut engine = steam_engine();
    insert(&mut engine, 0, "coal", 1);
    insert(&mut engine, 1, "water_bucket", 1);
    let mut rng = SimRng::new(0);
    run(&mut engine, &mut rng, 250);
    let before = engine.generator_state().unwrap().clone();
    assert_eq!(before.phase, GeneratorPhase::Warm);

    let resumed = ConverterInstance::load(
        Arc::clone(engine.spec()),
        Arc::clone(engine.inventory().items()),
        &decode_record(&encode_record(&engine.save()).unwrap()).unwrap(),
    )
    .unwrap();
    assert_eq!(resumed.generator_state(), Some(&before));
    assert_eq!(resumed.pool().stored(), engine.pool().stored());
    assert_eq!(resumed.snapshot().generator, engine.snapshot().generator);
}
