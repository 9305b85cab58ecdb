//! Powered crusher example: a steam engine feeding a mechanical crusher.
//!
//! Loads the engine with coal and water and the crusher with iron ore, then
//! runs 1200 steps, pushing energy east every step and printing a status
//! line every 100 steps. Engine and crusher diagnostics go through `tracing`.
//!
//! Run with: `cargo run -p aetherium-core --example powered_crusher`
//! (set `RUST_LOG=aetherium_core=debug` for run starts and phase changes).

use aetherium_core::driver::Driver;
use aetherium_core::event::ConverterEvent;
use aetherium_core::id::Face;
use aetherium_core::test_utils::*;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aetherium_core=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // --- Step 1: Build and load the machines ---

    let mut engine = steam_engine();
    insert(&mut engine, 0, "coal", 4);
    insert(&mut engine, 1, "water_bucket", 1);

    let mut crusher = crusher();
    insert(&mut crusher, 0, "iron_ore", 8);

    let mut driver = Driver::new(2024);
    let engine = driver.add(engine);
    let crusher = driver.add(crusher);

    // --- Step 2: Run ---

    let mut completed = 0;
    for step in 1..=1_200u32 {
        driver.step();
        driver.transfer_energy(engine, crusher, Face::East, 1_000);

        for (_, event) in driver.drain_events() {
            if matches!(event, ConverterEvent::RunCompleted { .. }) {
                completed += 1;
            }
        }

        if step % 100 == 0 {
            let (Some(e), Some(c)) = (driver.get(engine), driver.get(crusher)) else {
                break;
            };
            let gen_view = e.snapshot().generator.unwrap_or_default();
            let view = c.snapshot();
            println!(
                "step {:>4} | engine {:?} warmup {:>3}% energy {:>5} | crusher {:?} {:>3}% energy {:>5} | runs {}",
                step,
                gen_view.phase,
                gen_view.warmup_percent,
                e.snapshot().stored,
                view.state,
                view.progress_percent,
                view.stored,
                completed,
            );
        }
    }

    // --- Step 3: Tear down ---

    if let Some(contents) = driver.remove(crusher) {
        println!("crusher returned {contents:?}");
    }
    println!("final state hash: 0x{:016x}", driver.state_hash());
}
