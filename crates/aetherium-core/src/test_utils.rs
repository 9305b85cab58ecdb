//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).
//!
//! The fixtures model the four stock machines with their usual numbers. Tests
//! that need other numbers build their own [`ConverterSpec`].

use crate::capability::FacePolicy;
use crate::converter::ConverterInstance;
use crate::fixed::{Fixed64, probability_from_f32};
use crate::id::ItemTypeId;
use crate::inventory::{SlotFilter, SlotRule};
use crate::item::ResourceUnit;
use crate::recipe::{Byproduct, Ingredient, RecipeCatalog, RecipeCatalogBuilder, RecipeDef};
use crate::registry::{ItemCatalog, ItemCatalogBuilder};
use crate::rng::SimRng;
use crate::spec::{AuxiliarySource, ConverterKind, ConverterSpec, FuelDef, GeneratorSpec};
use std::sync::Arc;

// ===========================================================================
// Items
// ===========================================================================

/// Every item the fixtures use. Buckets stack to 1 like their filled form
/// would, other items to 64.
pub fn items() -> Arc<ItemCatalog> {
    let mut b = ItemCatalogBuilder::new();
    for name in [
        "iron_ore",
        "raw_iron",
        "gold_ore",
        "raw_gold",
        "coal_ore",
        "coal",
        "diamond_ore",
        "diamond",
        "emerald",
        "charcoal",
        "oak_planks",
        "stick",
        "spirit_bag",
        "pure_spirit",
        "malign_spirit",
        "lapis_lazuli",
        "mana_crystal",
    ] {
        b.register(name);
    }
    b.register_with_stack("water_bucket", 1);
    b.register_with_stack("bucket", 16);
    Arc::new(b.build().unwrap())
}

/// Look up a fixture item by name.
pub fn item(items: &ItemCatalog, name: &str) -> ItemTypeId {
    items
        .item_id(name)
        .unwrap_or_else(|| panic!("fixture item '{name}' missing"))
}

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Recipe catalogs
// ===========================================================================

fn crush(items: &ItemCatalog, ore: &str, out: &str, extra: &str, chance: f32) -> RecipeDef {
    RecipeDef {
        name: format!("crush_{ore}"),
        input: Ingredient::single(item(items, ore), 1),
        energy_cost: 200,
        duration_steps: 200,
        primary_output: ResourceUnit::new(item(items, out), 2),
        secondary_output: Some(Byproduct {
            output: ResourceUnit::one(item(items, extra)),
            probability: probability_from_f32(chance),
        }),
    }
}

pub fn crusher_recipes(items: &Arc<ItemCatalog>) -> RecipeCatalog {
    let mut b = RecipeCatalogBuilder::new(Arc::clone(items));
    b.register(crush(items, "iron_ore", "raw_iron", "raw_gold", 0.15));
    b.register(crush(items, "gold_ore", "raw_gold", "raw_iron", 0.2));
    b.register(crush(items, "coal_ore", "coal", "diamond", 0.1));
    b.register(crush(items, "diamond_ore", "diamond", "emerald", 0.05));
    b.build().unwrap()
}

pub fn centrifuge_recipes(items: &Arc<ItemCatalog>) -> RecipeCatalog {
    let mut b = RecipeCatalogBuilder::new(Arc::clone(items));
    b.register(RecipeDef {
        name: "separate_spirit_bag".into(),
        input: Ingredient::single(item(items, "spirit_bag"), 1),
        energy_cost: 500,
        duration_steps: 100,
        primary_output: ResourceUnit::new(item(items, "pure_spirit"), 2),
        secondary_output: Some(Byproduct {
            output: ResourceUnit::one(item(items, "malign_spirit")),
            probability: Fixed64::ONE,
        }),
    });
    b.build().unwrap()
}

pub fn infuser_recipes(items: &Arc<ItemCatalog>) -> RecipeCatalog {
    let mut b = RecipeCatalogBuilder::new(Arc::clone(items));
    b.register(RecipeDef {
        name: "infuse_lapis".into(),
        input: Ingredient::single(item(items, "lapis_lazuli"), 1),
        energy_cost: 100,
        duration_steps: 100,
        primary_output: ResourceUnit::one(item(items, "mana_crystal")),
        secondary_output: None,
    });
    b.build().unwrap()
}

// ===========================================================================
// Converter specs
// ===========================================================================

fn processor(name: &str, capacity: u64, catalog: RecipeCatalog, secondary: bool) -> ConverterSpec {
    let inputs: Vec<ItemTypeId> = catalog.iter().flat_map(|r| r.input.items.clone()).collect();
    let mut slots = vec![SlotRule::input(SlotFilter::Items(inputs)), SlotRule::output_primary()];
    if secondary {
        slots.push(SlotRule::output_secondary());
    }
    ConverterSpec {
        name: name.into(),
        capacity,
        max_input_rate: 1_000,
        max_output_rate: 0,
        slots,
        faces: FacePolicy::processing(),
        kind: ConverterKind::Processor {
            catalog: Arc::new(catalog),
        },
    }
}

/// Slots: 0 ore, 1 product, 2 byproduct.
pub fn crusher_spec(items: &Arc<ItemCatalog>) -> ConverterSpec {
    processor("mechanical_crusher", 10_000, crusher_recipes(items), true)
}

/// Slots: 0 spirit bag, 1 pure spirit, 2 malign spirit.
pub fn centrifuge_spec(items: &Arc<ItemCatalog>) -> ConverterSpec {
    processor("spirit_centrifuge", 25_000, centrifuge_recipes(items), true)
}

/// Slots: 0 lapis, 1 crystal.
pub fn infuser_spec(items: &Arc<ItemCatalog>) -> ConverterSpec {
    processor("mana_infuser", 10_000, infuser_recipes(items), false)
}

/// Slots: 0 fuel, 1 water. Warms twice as fast as it cools.
pub fn steam_engine_spec(items: &Arc<ItemCatalog>) -> ConverterSpec {
    let fuel = |name: &str, burn_steps| FuelDef {
        item: item(items, name),
        burn_steps,
    };
    let fuels = vec![
        fuel("coal", 1_600),
        fuel("charcoal", 1_600),
        fuel("oak_planks", 400),
        fuel("stick", 200),
    ];
    let fuel_items = fuels.iter().map(|f| f.item).collect();
    ConverterSpec {
        name: "steam_engine".into(),
        capacity: 50_000,
        max_input_rate: 0,
        max_output_rate: 1_000,
        slots: vec![
            SlotRule::input(SlotFilter::Items(fuel_items)),
            SlotRule::auxiliary(SlotFilter::Items(vec![item(items, "water_bucket")])),
        ],
        faces: FacePolicy::generator(),
        kind: ConverterKind::Generator(GeneratorSpec {
            generation_per_step: 20,
            warmup_target: 200,
            warmup_rate: 1,
            cooldown_rate: 2,
            auxiliary_interval: 20,
            fuels,
            auxiliary: vec![AuxiliarySource {
                item: item(items, "water_bucket"),
                level: 1_000,
                residue: Some(item(items, "bucket")),
            }],
        }),
    }
}

// ===========================================================================
// Live converters
// ===========================================================================

pub fn build(spec: ConverterSpec, items: Arc<ItemCatalog>) -> ConverterInstance {
    ConverterInstance::new(Arc::new(spec), items).unwrap()
}

pub fn crusher() -> ConverterInstance {
    let items = items();
    build(crusher_spec(&items), items)
}

pub fn centrifuge() -> ConverterInstance {
    let items = items();
    build(centrifuge_spec(&items), items)
}

pub fn infuser() -> ConverterInstance {
    let items = items();
    build(infuser_spec(&items), items)
}

pub fn steam_engine() -> ConverterInstance {
    let items = items();
    build(steam_engine_spec(&items), items)
}

// ===========================================================================
// Manipulation
// ===========================================================================

/// Set the pool charge directly, bypassing the input rate.
pub fn charge(converter: &mut ConverterInstance, amount: u64) {
    converter.pool.force_set(amount);
    converter.refresh_snapshot();
}

/// Insert through the external path. Panics if anything is refused.
pub fn insert(converter: &mut ConverterInstance, slot: usize, name: &str, count: u32) {
    let id = item(converter.inventory().items(), name);
    let residue = converter
        .inventory
        .try_insert(slot, ResourceUnit::new(id, count), false)
        .unwrap();
    assert!(residue.is_none(), "slot {slot} refused part of {name}");
}

/// Place items into any slot, output slots included.
pub fn fill(converter: &mut ConverterInstance, slot: usize, name: &str, count: u32) {
    let id = item(converter.inventory().items(), name);
    let residue = converter.inventory.deposit(slot, ResourceUnit::new(id, count));
    assert!(residue.is_none(), "slot {slot} refused part of {name}");
}

/// Empty one slot, returning what it held.
pub fn clear(converter: &mut ConverterInstance, slot: usize) -> Option<ResourceUnit> {
    converter.inventory.replace(slot, None)
}

pub fn count(converter: &ConverterInstance, slot: usize) -> u32 {
    converter.inventory().peek(slot).map_or(0, |u| u.count)
}

pub fn run(converter: &mut ConverterInstance, rng: &mut SimRng, steps: u32) {
    for _ in 0..steps {
        converter.step(rng);
    }
}
