//! Converter definitions.
//!
//! A [`ConverterSpec`] is everything that distinguishes one machine from
//! another: pool size and rates, slot layout, exposed faces, and whether it
//! runs recipes or burns fuel. Every live converter is the same
//! [`ConverterInstance`](crate::converter::ConverterInstance) driven by one
//! of these values.

use crate::capability::FacePolicy;
use crate::id::ItemTypeId;
use crate::inventory::{SlotRole, SlotRule};
use crate::recipe::RecipeCatalog;
use crate::registry::ItemCatalog;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Generator parameters
// ---------------------------------------------------------------------------

/// A burnable item and how many steps one unit keeps the fire going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FuelDef {
    pub item: ItemTypeId,
    pub burn_steps: u32,
}

/// An item that refills the auxiliary consumable (water, coolant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuxiliarySource {
    pub item: ItemTypeId,
    /// Level restored when one unit is used.
    pub level: u32,
    /// What is left in the slot afterwards, e.g. an empty bucket.
    pub residue: Option<ItemTypeId>,
}

/// Fuel-burning generator behaviour.
///
/// Warmup and cooldown rates are independent. So are the warmup rate and the
/// auxiliary consumption cadence.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeneratorSpec {
    /// Energy added per step while warm.
    pub generation_per_step: u64,
    pub warmup_target: u32,
    /// Added to `warmup` per operating step.
    pub warmup_rate: u32,
    /// Removed from `warmup` per idle step.
    pub cooldown_rate: u32,
    /// Warm steps per unit of auxiliary level consumed.
    pub auxiliary_interval: u32,
    pub fuels: Vec<FuelDef>,
    /// Empty means the generator needs no auxiliary consumable.
    #[serde(default)]
    pub auxiliary: Vec<AuxiliarySource>,
}

impl GeneratorSpec {
    pub fn burn_steps(&self, item: ItemTypeId) -> Option<u32> {
        self.fuels.iter().find(|f| f.item == item).map(|f| f.burn_steps)
    }

    pub fn auxiliary_source(&self, item: ItemTypeId) -> Option<&AuxiliarySource> {
        self.auxiliary.iter().find(|a| a.item == item)
    }

    pub fn needs_auxiliary(&self) -> bool {
        !self.auxiliary.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ConverterSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum ConverterKind {
    /// Runs recipes from a shared catalog.
    Processor { catalog: Arc<RecipeCatalog> },
    /// Burns fuel to fill its pool.
    Generator(GeneratorSpec),
}

#[derive(Debug, Clone)]
pub struct ConverterSpec {
    pub name: String,
    pub capacity: u64,
    pub max_input_rate: u64,
    pub max_output_rate: u64,
    pub slots: Vec<SlotRule>,
    pub faces: FacePolicy,
    pub kind: ConverterKind,
}

/// Slot indices resolved from a spec's rules. The first slot of each role is
/// the one the state machine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    pub input: usize,
    pub output_primary: Option<usize>,
    pub output_secondary: Option<usize>,
    pub auxiliary: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("converter '{converter}' has no {role:?} slot")]
    MissingSlot { converter: String, role: SlotRole },
    #[error("converter '{converter}' has more than one {role:?} slot")]
    DuplicateSlot { converter: String, role: SlotRole },
    #[error("converter '{0}' has zero capacity")]
    ZeroCapacity(String),
    #[error("converter '{0}' has a warmup target but a zero warmup rate")]
    ZeroWarmupRate(String),
    #[error("converter '{0}' has a zero auxiliary interval")]
    ZeroAuxiliaryInterval(String),
    #[error("converter '{converter}' references unknown item {item:?}")]
    UnknownItem { converter: String, item: ItemTypeId },
}

impl ConverterSpec {
    pub fn is_generator(&self) -> bool {
        matches!(self.kind, ConverterKind::Generator(_))
    }

    pub fn catalog(&self) -> Option<&Arc<RecipeCatalog>> {
        match &self.kind {
            ConverterKind::Processor { catalog } => Some(catalog),
            ConverterKind::Generator(_) => None,
        }
    }

    pub fn generator(&self) -> Option<&GeneratorSpec> {
        match &self.kind {
            ConverterKind::Generator(generator) => Some(generator),
            ConverterKind::Processor { .. } => None,
        }
    }

    /// Check the spec against the item catalog and resolve its slot layout.
    pub fn validate(&self, items: &ItemCatalog) -> Result<SlotLayout, SpecError> {
        if self.capacity == 0 {
            return Err(SpecError::ZeroCapacity(self.name.clone()));
        }

        let find = |role: SlotRole| -> Result<Option<usize>, SpecError> {
            let mut matching = self
                .slots
                .iter()
                .enumerate()
                .filter(|(_, rule)| rule.role == role)
                .map(|(i, _)| i);
            let first = matching.next();
            if matching.next().is_some() {
                return Err(SpecError::DuplicateSlot {
                    converter: self.name.clone(),
                    role,
                });
            }
            Ok(first)
        };
        let require = |slot: Option<usize>, role: SlotRole| {
            slot.ok_or_else(|| SpecError::MissingSlot {
                converter: self.name.clone(),
                role,
            })
        };

        let input = require(find(SlotRole::Input)?, SlotRole::Input)?;
        let layout = SlotLayout {
            input,
            output_primary: find(SlotRole::OutputPrimary)?,
            output_secondary: find(SlotRole::OutputSecondary)?,
            auxiliary: find(SlotRole::Auxiliary)?,
        };

        let unknown = |item: ItemTypeId| SpecError::UnknownItem {
            converter: self.name.clone(),
            item,
        };

        match &self.kind {
            ConverterKind::Processor { catalog } => {
                require(layout.output_primary, SlotRole::OutputPrimary)?;
                if catalog.iter().any(|r| r.secondary_output.is_some()) {
                    require(layout.output_secondary, SlotRole::OutputSecondary)?;
                }
            }
            ConverterKind::Generator(generator) => {
                if generator.warmup_target > 0 && generator.warmup_rate == 0 {
                    return Err(SpecError::ZeroWarmupRate(self.name.clone()));
                }
                if generator.auxiliary_interval == 0 {
                    return Err(SpecError::ZeroAuxiliaryInterval(self.name.clone()));
                }
                if generator.needs_auxiliary() {
                    require(layout.auxiliary, SlotRole::Auxiliary)?;
                }
                let referenced = generator
                    .fuels
                    .iter()
                    .map(|f| f.item)
                    .chain(generator.auxiliary.iter().flat_map(|a| [Some(a.item), a.residue]).flatten());
                for item in referenced {
                    if !items.contains(item) {
                        return Err(unknown(item));
                    }
                }
            }
        }
        Ok(layout)
    }
}
