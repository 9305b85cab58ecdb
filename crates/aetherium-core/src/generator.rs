//! Fuel-burning generator substate.
//!
//! A generator burns one fuel unit at a time, warms up while burning, and
//! only adds energy to its pool once fully warm. It also consumes an
//! auxiliary resource (water, coolant) on its own cadence. When it cannot
//! operate it cools down at an independent rate.

use crate::event::{ConverterEvent, EventQueue};
use crate::fixed::Steps;
use crate::inventory::SlotInventory;
use crate::item::ResourceUnit;
use crate::pool::ResourcePool;
use crate::spec::{AuxiliarySource, GeneratorSpec, SlotLayout};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum GeneratorPhase {
    #[default]
    Cold,
    WarmingUp,
    Warm,
    CoolingDown,
}

impl GeneratorPhase {
    /// Whether fuel is being burned in this phase.
    pub fn is_running(self) -> bool {
        matches!(self, GeneratorPhase::WarmingUp | GeneratorPhase::Warm)
    }
}

/// Mutable generator bookkeeping carried by a converter instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeneratorState {
    /// Steps left on the current fuel unit.
    pub fuel_remaining: u32,
    /// Burn steps of the current fuel unit, for progress display.
    pub fuel_total: u32,
    /// In `0..=warmup_target`.
    pub warmup: u32,
    pub auxiliary_level: u32,
    /// Warm steps since the auxiliary level last dropped.
    pub auxiliary_timer: u32,
    pub phase: GeneratorPhase,
}

/// Borrowed converter parts a generator step works on.
pub(crate) struct GeneratorContext<'a> {
    pub pool: &'a mut ResourcePool,
    pub inventory: &'a mut SlotInventory,
    pub layout: &'a SlotLayout,
    pub events: &'a mut EventQueue,
    pub step: Steps,
    pub name: &'a str,
}

impl GeneratorState {
    /// Rebuild the phase from the scalar fields after a load.
    pub fn derive_phase(&self, spec: &GeneratorSpec) -> GeneratorPhase {
        if self.fuel_remaining > 0 {
            if self.warmup >= spec.warmup_target {
                GeneratorPhase::Warm
            } else {
                GeneratorPhase::WarmingUp
            }
        } else if self.warmup > 0 {
            GeneratorPhase::CoolingDown
        } else {
            GeneratorPhase::Cold
        }
    }

    pub fn is_warm(&self, spec: &GeneratorSpec) -> bool {
        self.warmup >= spec.warmup_target
    }

    /// The auxiliary source in the slot, if using it now would leave the slot
    /// consistent. A residue item can only replace a single source unit.
    fn usable_source<'s>(
        spec: &'s GeneratorSpec,
        inventory: &SlotInventory,
        layout: &SlotLayout,
    ) -> Option<(&'s AuxiliarySource, ResourceUnit)> {
        let unit = *inventory.peek(layout.auxiliary?)?;
        let source = spec.auxiliary_source(unit.item_type)?;
        (source.residue.is_none() || unit.count == 1).then_some((source, unit))
    }

    fn has_fuel(&self, spec: &GeneratorSpec, inventory: &SlotInventory, layout: &SlotLayout) -> bool {
        self.fuel_remaining > 0
            || inventory
                .peek(layout.input)
                .is_some_and(|u| spec.burn_steps(u.item_type).is_some())
    }

    fn has_auxiliary(&self, spec: &GeneratorSpec, inventory: &SlotInventory, layout: &SlotLayout) -> bool {
        !spec.needs_auxiliary()
            || self.auxiliary_level > 0
            || Self::usable_source(spec, inventory, layout).is_some()
    }

    pub(crate) fn can_operate(&self, spec: &GeneratorSpec, ctx: &GeneratorContext<'_>) -> bool {
        self.has_fuel(spec, ctx.inventory, ctx.layout)
            && self.has_auxiliary(spec, ctx.inventory, ctx.layout)
            && !ctx.pool.is_full()
    }

    /// Advance one step.
    pub(crate) fn step(&mut self, spec: &GeneratorSpec, ctx: &mut GeneratorContext<'_>) {
        let before = self.phase;

        if self.can_operate(spec, ctx) {
            if self.fuel_remaining == 0 {
                self.ignite(spec, ctx);
            }
            if spec.needs_auxiliary() && self.auxiliary_level == 0 {
                self.refill_auxiliary(spec, ctx);
            }

            if self.warmup < spec.warmup_target {
                self.warmup = self.warmup.saturating_add(spec.warmup_rate).min(spec.warmup_target);
                self.phase = if self.is_warm(spec) {
                    GeneratorPhase::Warm
                } else {
                    GeneratorPhase::WarmingUp
                };
            } else {
                self.phase = GeneratorPhase::Warm;
                self.generate(spec, ctx);
            }

            self.fuel_remaining = self.fuel_remaining.saturating_sub(1);
        } else {
            self.warmup = self.warmup.saturating_sub(spec.cooldown_rate);
            self.phase = if self.warmup == 0 {
                GeneratorPhase::Cold
            } else {
                GeneratorPhase::CoolingDown
            };
        }

        if self.phase != before {
            debug!("{} generator {:?} -> {:?} at step {}", ctx.name, before, self.phase, ctx.step);
            ctx.events.push(ConverterEvent::PhaseChanged {
                from: before,
                to: self.phase,
                step: ctx.step,
            });
        }
    }

    fn ignite(&mut self, spec: &GeneratorSpec, ctx: &mut GeneratorContext<'_>) {
        let Some(fuel) = ctx.inventory.peek(ctx.layout.input).copied() else {
            return;
        };
        let Some(burn_steps) = spec.burn_steps(fuel.item_type) else {
            return;
        };
        if ctx.inventory.consume(ctx.layout.input, 1).is_none() {
            return;
        }
        self.fuel_remaining = burn_steps;
        self.fuel_total = burn_steps;
        info!("{} ignited {:?} for {} steps", ctx.name, fuel.item_type, burn_steps);
        ctx.events.push(ConverterEvent::FuelIgnited {
            fuel: fuel.item_type,
            burn_steps,
            step: ctx.step,
        });
    }

    fn refill_auxiliary(&mut self, spec: &GeneratorSpec, ctx: &mut GeneratorContext<'_>) {
        let (Some(slot), Some((source, unit))) = (
            ctx.layout.auxiliary,
            Self::usable_source(spec, ctx.inventory, ctx.layout),
        ) else {
            return;
        };
        match source.residue {
            Some(residue) => {
                ctx.inventory.replace(slot, Some(ResourceUnit::one(residue)));
            }
            None => {
                ctx.inventory.consume(slot, 1);
            }
        }
        self.auxiliary_level = source.level;
        self.auxiliary_timer = 0;
        debug!("{} refilled auxiliary from {:?}", ctx.name, unit.item_type);
        ctx.events.push(ConverterEvent::AuxiliaryRefilled {
            source: unit.item_type,
            level: source.level,
            step: ctx.step,
        });
    }

    fn generate(&mut self, spec: &GeneratorSpec, ctx: &mut GeneratorContext<'_>) {
        if spec.needs_auxiliary() && self.auxiliary_level == 0 {
            return;
        }
        ctx.pool.add_direct(spec.generation_per_step);
        if spec.needs_auxiliary() {
            self.auxiliary_timer += 1;
            if self.auxiliary_timer >= spec.auxiliary_interval {
                self.auxiliary_timer = 0;
                self.auxiliary_level -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ItemTypeId;
    use crate::inventory::{SlotFilter, SlotRule};
    use crate::registry::ItemCatalogBuilder;
    use crate::spec::FuelDef;
    use std::sync::Arc;

    const COAL: ItemTypeId = ItemTypeId(0);
    const WATER_BUCKET: ItemTypeId = ItemTypeId(1);
    const BUCKET: ItemTypeId = ItemTypeId(2);

    struct Rig {
        spec: GeneratorSpec,
        state: GeneratorState,
        pool: ResourcePool,
        inventory: SlotInventory,
        layout: SlotLayout,
        events: EventQueue,
        step: Steps,
    }

    impl Rig {
        fn new(burn_steps: u32) -> Self {
            let mut b = ItemCatalogBuilder::new();
            b.register("coal");
            b.register_with_stack("water_bucket", 1);
            b.register_with_stack("bucket", 16);
            let inventory = SlotInventory::new(
                vec![
                    SlotRule::input(SlotFilter::Items(vec![COAL])),
                    SlotRule::auxiliary(SlotFilter::Items(vec![WATER_BUCKET])),
                ],
                Arc::new(b.build().unwrap()),
            );
            Self {
                spec: GeneratorSpec {
                    generation_per_step: 20,
                    warmup_target: 10,
                    warmup_rate: 1,
                    cooldown_rate: 2,
                    auxiliary_interval: 3,
                    fuels: vec![FuelDef {
                        item: COAL,
                        burn_steps,
                    }],
                    auxiliary: vec![AuxiliarySource {
                        item: WATER_BUCKET,
                        level: 2,
                        residue: Some(BUCKET),
                    }],
                },
                state: GeneratorState::default(),
                pool: ResourcePool::new(1_000, 0, 100),
                inventory,
                layout: SlotLayout {
                    input: 0,
                    output_primary: None,
                    output_secondary: None,
                    auxiliary: Some(1),
                },
                events: EventQueue::new(32),
                step: 0,
            }
        }

        fn load(&mut self, coal: u32, water: bool) {
            self.inventory.try_insert(0, ResourceUnit::new(COAL, coal), false).unwrap();
            if water {
                self.inventory.try_insert(1, ResourceUnit::one(WATER_BUCKET), false).unwrap();
            }
        }

        fn run(&mut self, steps: u32) {
            for _ in 0..steps {
                self.step += 1;
                let mut ctx = GeneratorContext {
                    pool: &mut self.pool,
                    inventory: &mut self.inventory,
                    layout: &self.layout,
                    events: &mut self.events,
                    step: self.step,
                    name: "test_engine",
                };
                self.state.step(&self.spec, &mut ctx);
            }
        }
    }

    #[test]
    fn ignition_consumes_one_fuel_and_swaps_bucket() {
        let mut rig = Rig::new(100);
        rig.load(3, true);
        rig.run(1);
        assert_eq!(rig.inventory.peek(0).map(|u| u.count), Some(2));
        assert_eq!(rig.inventory.peek(1), Some(&ResourceUnit::one(BUCKET)));
        assert_eq!(rig.state.fuel_total, 100);
        assert_eq!(rig.state.fuel_remaining, 99);
        assert_eq!(rig.state.auxiliary_level, 2);
        assert_eq!(rig.state.phase, GeneratorPhase::WarmingUp);
    }

    #[test]
    fn no_generation_until_warm() {
        let mut rig = Rig::new(100);
        rig.load(1, true);
        rig.run(10);
        assert_eq!(rig.state.warmup, 10);
        assert_eq!(rig.state.phase, GeneratorPhase::Warm);
        assert_eq!(rig.pool.stored(), 0);
        rig.run(1);
        assert_eq!(rig.pool.stored(), 20);
    }

    #[test]
    fn auxiliary_drains_on_its_own_cadence_then_stops_generation() {
        let mut rig = Rig::new(100);
        rig.load(1, true);
        rig.run(10);
        // Level 2, one unit per 3 warm steps: six warm steps of output,
        // then two steps of cooling.
        rig.run(8);
        assert_eq!(rig.state.auxiliary_level, 0);
        assert_eq!(rig.pool.stored(), 6 * 20);
        assert_eq!(rig.state.phase, GeneratorPhase::CoolingDown);
    }

    #[test]
    fn cooldown_is_independent_of_warmup_rate() {
        let mut rig = Rig::new(10);
        rig.load(1, true);
        rig.run(10);
        assert_eq!(rig.state.warmup, 10);
        assert_eq!(rig.state.fuel_remaining, 0);
        rig.run(4);
        assert_eq!(rig.state.warmup, 2);
        assert_eq!(rig.state.phase, GeneratorPhase::CoolingDown);
        rig.run(1);
        assert_eq!(rig.state.warmup, 0);
        assert_eq!(rig.state.phase, GeneratorPhase::Cold);
    }

    #[test]
    fn full_pool_stops_burning() {
        let mut rig = Rig::new(100);
        rig.load(1, true);
        rig.pool.force_set(1_000);
        rig.run(5);
        assert_eq!(rig.state.fuel_remaining, 0);
        assert_eq!(rig.inventory.peek(0).map(|u| u.count), Some(1));
        assert_eq!(rig.state.phase, GeneratorPhase::Cold);
    }

    #[test]
    fn missing_water_blocks_ignition() {
        let mut rig = Rig::new(100);
        rig.load(1, false);
        rig.run(3);
        assert_eq!(rig.state.fuel_remaining, 0);
        assert!(rig.events.is_empty());
    }

    #[test]
    fn phase_changes_and_ignition_are_reported() {
        let mut rig = Rig::new(100);
        rig.load(1, true);
        rig.run(10);
        let kinds: Vec<_> = rig.events.drain().iter().map(ConverterEvent::kind).collect();
        use crate::event::EventKind::*;
        assert_eq!(kinds, vec![FuelIgnited, AuxiliaryRefilled, PhaseChanged, PhaseChanged]);
    }

    #[test]
    fn derive_phase_from_scalars() {
        let spec = Rig::new(100).spec;
        let mut state = GeneratorState::default();
        assert_eq!(state.derive_phase(&spec), GeneratorPhase::Cold);
        state.warmup = 4;
        assert_eq!(state.derive_phase(&spec), GeneratorPhase::CoolingDown);
        state.fuel_remaining = 7;
        assert_eq!(state.derive_phase(&spec), GeneratorPhase::WarmingUp);
        state.warmup = 10;
        assert_eq!(state.derive_phase(&spec), GeneratorPhase::Warm);
        assert!(GeneratorPhase::Warm.is_running());
        assert!(!GeneratorPhase::CoolingDown.is_running());
    }
}
