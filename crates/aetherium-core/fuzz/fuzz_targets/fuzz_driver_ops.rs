#![no_main]
use aetherium_core::driver::Driver;
use aetherium_core::id::{ConverterId, Face};
use aetherium_core::item::ResourceUnit;
use aetherium_core::test_utils::*;
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

/// A structured operation against a driver.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    AddCrusher,
    AddEngine,
    Remove { index: u8 },
    Feed { index: u8, count: u8 },
    Energy { from: u8, to: u8, face: u8, amount: u16 },
    Items { from: u8, from_slot: u8, to: u8, to_slot: u8, face: u8, count: u8 },
    Step,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    seed: u64,
    ops: Vec<FuzzOp>,
}

fn pick(ids: &[ConverterId], index: u8) -> Option<ConverterId> {
    (!ids.is_empty()).then(|| ids[index as usize % ids.len()])
}

fuzz_target!(|input: FuzzInput| {
    let mut driver = Driver::new(input.seed);
    let face = |f: u8| Face::ALL[f as usize % Face::ALL.len()];

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(200);

    for op in &input.ops[..max_ops] {
        let ids = driver.ids().to_vec();
        match *op {
            FuzzOp::AddCrusher => {
                driver.add(crusher());
            }
            FuzzOp::AddEngine => {
                driver.add(steam_engine());
            }
            FuzzOp::Remove { index } => {
                if let Some(id) = pick(&ids, index) {
                    driver.remove(id);
                }
            }
            FuzzOp::Feed { index, count } => {
                if let Some(converter) = pick(&ids, index).and_then(|id| driver.get_mut(id)) {
                    let name = if converter.spec().is_generator() { "coal" } else { "iron_ore" };
                    let unit = ResourceUnit::new(item(converter.inventory().items(), name), u32::from(count % 64) + 1);
                    // Overflow comes back as residue.
                    let _ = converter
                        .capabilities()
                        .query_items_mut(None)
                        .map(|slots| slots.insert(0, unit, false));
                }
            }
            FuzzOp::Energy { from, to, face: f, amount } => {
                if let (Some(from), Some(to)) = (pick(&ids, from), pick(&ids, to)) {
                    driver.transfer_energy(from, to, face(f), u64::from(amount));
                }
            }
            FuzzOp::Items { from, from_slot, to, to_slot, face: f, count } => {
                if let (Some(from), Some(to)) = (pick(&ids, from), pick(&ids, to)) {
                    driver.transfer_items(from, from_slot as usize % 4, to, to_slot as usize % 4, face(f), u32::from(count));
                }
            }
            FuzzOp::Step => driver.step(),
        }

        for &id in driver.ids() {
            if let Some(converter) = driver.get(id) {
                assert!(converter.pool().stored() <= converter.pool().capacity());
            }
        }
    }
    let _ = driver.drain_events();
    let _ = driver.state_hash();
});
