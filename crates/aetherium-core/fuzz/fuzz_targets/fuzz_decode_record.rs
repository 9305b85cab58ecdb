#![no_main]
use aetherium_core::converter::ConverterInstance;
use aetherium_core::persist::decode_record;
use aetherium_core::rng::SimRng;
use aetherium_core::test_utils::*;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode to an error or a record, never a panic.
    let Ok(record) = decode_record(data) else {
        return;
    };

    // Whatever decodes must load cleanly or be rejected, and a loaded
    // converter must keep stepping within its bounds.
    for template in [crusher(), steam_engine()] {
        let spec = Arc::clone(template.spec());
        let items = Arc::clone(template.inventory().items());
        let Ok(mut converter) = ConverterInstance::load(spec, items, &record) else {
            continue;
        };
        let mut rng = SimRng::new(0);
        for _ in 0..8 {
            converter.step(&mut rng);
            assert!(converter.pool().stored() <= converter.pool().capacity());
            if let Some(recipe) = converter.active_recipe() {
                assert!(converter.progress() <= recipe.duration_steps);
            }
        }
    }
});
