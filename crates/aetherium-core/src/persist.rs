//! Save and resume a single converter.
//!
//! A [`ConverterRecord`] holds the minimal field set needed to resume a
//! converter: charge, run progress, slot contents and generator counters.
//! Items and recipes are stored by name so records survive catalog
//! reordering. The lifecycle state and generator phase are not stored; load
//! derives them from the scalar fields.
//!
//! [`encode_record`] / [`decode_record`] wrap a record in a bitcode payload
//! behind a magic number and format version.

use crate::converter::{ConverterInstance, ConverterState};
use crate::generator::GeneratorState;
use crate::item::ResourceUnit;
use crate::registry::ItemCatalog;
use crate::spec::{ConverterSpec, SpecError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying an encoded converter record.
pub const RECORD_MAGIC: u32 = 0xAE7C_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", RECORD_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("record from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

/// A record that does not fit the converter it is being loaded into.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    #[error("unknown recipe '{0}'")]
    UnknownRecipe(String),
    #[error("slot {slot} out of range (converter has {len})")]
    SlotOutOfRange { slot: usize, len: usize },
    #[error("slot {0} appears more than once")]
    DuplicateSlot(usize),
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One occupied slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub slot_index: usize,
    /// Item type name.
    pub type_id: String,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterRecord {
    pub stored: u64,
    pub progress: u32,
    pub processing: bool,
    /// Recipe name of the run in progress.
    pub active_recipe_id: Option<String>,
    pub inventory: Vec<SlotRecord>,
    // Generators only; zero for processors.
    pub fuel_remaining: u32,
    pub fuel_total: u32,
    pub warmup: u32,
    pub auxiliary_level: u32,
    #[serde(default)]
    pub auxiliary_timer: u32,
}

impl ConverterInstance {
    /// Capture the resume record.
    pub fn save(&self) -> ConverterRecord {
        let items = self.inventory.items();
        let inventory = self
            .inventory
            .contents()
            .filter_map(|(slot_index, unit)| {
                Some(SlotRecord {
                    slot_index,
                    type_id: items.name(unit.item_type)?.to_string(),
                    count: unit.count,
                })
            })
            .collect();
        let generator = self.generator.clone().unwrap_or_default();

        ConverterRecord {
            stored: self.pool.stored(),
            progress: self.progress,
            processing: self.state.is_processing(),
            active_recipe_id: self.active_recipe().map(|r| r.name.clone()),
            inventory,
            fuel_remaining: generator.fuel_remaining,
            fuel_total: generator.fuel_total,
            warmup: generator.warmup,
            auxiliary_level: generator.auxiliary_level,
            auxiliary_timer: generator.auxiliary_timer,
        }
    }

    /// Rebuild a converter from a record.
    ///
    /// Out-of-range amounts are clamped: the charge to capacity, slot counts
    /// to the item's max stack, progress to the recipe's duration, warmup to
    /// its target. Names the catalogs do not know are rejected.
    pub fn load(
        spec: Arc<ConverterSpec>,
        items: Arc<ItemCatalog>,
        record: &ConverterRecord,
    ) -> Result<Self, LoadError> {
        let mut converter = ConverterInstance::new(spec, Arc::clone(&items))?;
        converter.pool.force_set(record.stored);
        converter.restore_slots(&items, &record.inventory)?;

        let spec = Arc::clone(&converter.spec);
        if let Some(generator) = spec.generator() {
            let mut state = GeneratorState {
                fuel_remaining: record.fuel_remaining,
                fuel_total: record.fuel_total.max(record.fuel_remaining),
                warmup: record.warmup.min(generator.warmup_target),
                auxiliary_level: record.auxiliary_level,
                auxiliary_timer: record.auxiliary_timer.min(generator.auxiliary_interval),
                phase: Default::default(),
            };
            state.phase = state.derive_phase(generator);
            converter.generator = Some(state);
        } else if record.processing {
            converter.restore_run(record)?;
        }

        converter.refresh_snapshot();
        Ok(converter)
    }

    fn restore_slots(&mut self, items: &ItemCatalog, slots: &[SlotRecord]) -> Result<(), LoadError> {
        let len = self.inventory.len();
        let mut seen = vec![false; len];
        for record in slots {
            let slot = record.slot_index;
            if slot >= len {
                return Err(LoadError::SlotOutOfRange { slot, len });
            }
            if std::mem::replace(&mut seen[slot], true) {
                return Err(LoadError::DuplicateSlot(slot));
            }
            let item = items
                .item_id(&record.type_id)
                .ok_or_else(|| LoadError::UnknownItem(record.type_id.clone()))?;
            let count = record.count.min(items.max_stack(item));
            self.inventory
                .replace(slot, (count > 0).then(|| ResourceUnit::new(item, count)));
        }
        Ok(())
    }

    fn restore_run(&mut self, record: &ConverterRecord) -> Result<(), LoadError> {
        let Some(name) = record.active_recipe_id.as_deref() else {
            debug!("{}: record marked processing without a recipe, loading idle", self.spec.name);
            return Ok(());
        };
        let recipe = self
            .spec
            .catalog()
            .and_then(|c| c.by_name(name))
            .ok_or_else(|| LoadError::UnknownRecipe(name.to_string()))?;

        let progress = record.progress.min(recipe.duration_steps);
        self.active_recipe = Some(recipe.id);
        self.progress = progress;
        self.state = if progress == recipe.duration_steps {
            ConverterState::Complete
        } else if progress == 0 {
            ConverterState::Starting
        } else {
            ConverterState::Processing
        };
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Binary encoding
// ---------------------------------------------------------------------------

/// Header prepended to every encoded record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordHeader {
    pub magic: u32,
    pub version: u32,
}

impl RecordHeader {
    pub fn new() -> Self {
        Self {
            magic: RECORD_MAGIC,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.magic != RECORD_MAGIC {
            return Err(DecodeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DecodeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DecodeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

impl Default for RecordHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Deserialize)]
struct EncodedRecord {
    header: RecordHeader,
    record: ConverterRecord,
}

pub fn encode_record(record: &ConverterRecord) -> Result<Vec<u8>, EncodeError> {
    let encoded = EncodedRecord {
        header: RecordHeader::new(),
        record: record.clone(),
    };
    bitcode::serialize(&encoded).map_err(|e| EncodeError::Encode(e.to_string()))
}

/// Decode a record, checking the header before handing the record back.
pub fn decode_record(data: &[u8]) -> Result<ConverterRecord, DecodeError> {
    let encoded: EncodedRecord =
        bitcode::deserialize(data).map_err(|e| DecodeError::Decode(e.to_string()))?;
    encoded.header.validate()?;
    Ok(encoded.record)
}
