//! Read-only snapshots of converter state.
//!
//! Renderers and sync layers read a [`ConverterSnapshot`], never the live
//! converter. The snapshot is rebuilt once at the end of every step, so all
//! of its fields describe the same instant. All types are owned copies with
//! no references into the converter.

use crate::converter::{ConverterInstance, ConverterState};
use crate::fixed::{Fixed64, percent};
use crate::generator::GeneratorPhase;
use crate::id::RecipeId;
use crate::item::ResourceUnit;

// ---------------------------------------------------------------------------
// Generator snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct GeneratorSnapshot {
    pub phase: GeneratorPhase,
    pub fuel_remaining: u32,
    pub fuel_total: u32,
    /// Share of the current fuel unit left to burn.
    pub fuel_percent: u8,
    pub warmup: u32,
    pub warmup_percent: u8,
    pub auxiliary_level: u32,
}

// ---------------------------------------------------------------------------
// Converter snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of one converter.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ConverterSnapshot {
    /// Local step the snapshot was taken at.
    pub step: u64,
    pub stored: u64,
    pub capacity: u64,
    pub energy_percent: u8,
    pub state: ConverterState,
    pub recipe: Option<RecipeId>,
    pub progress: u32,
    /// Duration of the active recipe, 0 when idle.
    pub duration: u32,
    pub progress_percent: u8,
    /// Progress as a 0..1 fraction.
    pub progress_fraction: Fixed64,
    /// Processing a recipe, or burning fuel for generators.
    pub active: bool,
    /// Finished but unable to deposit: progress at 100 % and still active.
    pub stalled: bool,
    pub slots: Vec<Option<ResourceUnit>>,
    pub generator: Option<GeneratorSnapshot>,
}

impl ConverterSnapshot {
    pub fn capture(converter: &ConverterInstance) -> Self {
        let pool = converter.pool();
        let duration = converter.active_recipe().map_or(0, |r| r.duration_steps);
        let progress = converter.progress();
        let progress_fraction = if duration == 0 {
            Fixed64::ZERO
        } else {
            Fixed64::from_num(progress) / Fixed64::from_num(duration)
        };

        let generator = converter.generator_state().map(|g| GeneratorSnapshot {
            phase: g.phase,
            fuel_remaining: g.fuel_remaining,
            fuel_total: g.fuel_total,
            fuel_percent: percent(g.fuel_remaining as u64, g.fuel_total as u64),
            warmup: g.warmup,
            warmup_percent: converter
                .spec()
                .generator()
                .map_or(0, |spec| percent(g.warmup as u64, spec.warmup_target as u64)),
            auxiliary_level: g.auxiliary_level,
        });

        let active = match &generator {
            Some(g) => g.phase.is_running(),
            None => converter.state() != ConverterState::Idle,
        };

        Self {
            step: converter.steps(),
            stored: pool.stored(),
            capacity: pool.capacity(),
            energy_percent: pool.fill_percent(),
            state: converter.state(),
            recipe: converter.active_recipe().map(|r| r.id),
            progress,
            duration,
            progress_percent: percent(progress as u64, duration as u64),
            progress_fraction,
            active,
            stalled: converter.is_stalled(),
            slots: (0..converter.inventory().len())
                .map(|i| converter.inventory().peek(i).copied())
                .collect(),
            generator,
        }
    }
}
