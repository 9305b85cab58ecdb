//! Fixed-length slot inventory with a per-slot role and validator.
//!
//! External callers go through [`SlotInventory::try_insert`] and
//! [`SlotInventory::try_extract`], which enforce the slot rules. The owning
//! converter uses the crate-internal helpers to place products into output
//! slots and consume inputs.

use crate::id::ItemTypeId;
use crate::item::{ResourceUnit, merge_into};
use crate::registry::ItemCatalog;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Slot rules
// ---------------------------------------------------------------------------

/// What a slot is for. Output roles never accept external insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRole {
    Input,
    OutputPrimary,
    OutputSecondary,
    Auxiliary,
}

impl SlotRole {
    pub fn is_output(self) -> bool {
        matches!(self, SlotRole::OutputPrimary | SlotRole::OutputSecondary)
    }
}

/// Validator bound to a slot: which item types external callers may insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotFilter {
    Any,
    Items(Vec<ItemTypeId>),
    Nothing,
}

impl SlotFilter {
    pub fn accepts(&self, unit: &ResourceUnit) -> bool {
        match self {
            SlotFilter::Any => true,
            SlotFilter::Items(items) => items.contains(&unit.item_type),
            SlotFilter::Nothing => false,
        }
    }
}

/// Role, validator and automated-extraction policy of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRule {
    pub role: SlotRole,
    pub filter: SlotFilter,
    /// Whether external callers may pull from this slot.
    pub extractable: bool,
}

impl SlotRule {
    /// Input slots hold recipe ingredients or fuel and cannot be drained
    /// from outside.
    pub fn input(filter: SlotFilter) -> Self {
        Self {
            role: SlotRole::Input,
            filter,
            extractable: false,
        }
    }

    pub fn output_primary() -> Self {
        Self {
            role: SlotRole::OutputPrimary,
            filter: SlotFilter::Nothing,
            extractable: true,
        }
    }

    pub fn output_secondary() -> Self {
        Self {
            role: SlotRole::OutputSecondary,
            filter: SlotFilter::Nothing,
            extractable: true,
        }
    }

    /// Auxiliary slots feed consumables (coolant, water) and may be emptied
    /// from outside so spent containers can be collected.
    pub fn auxiliary(filter: SlotFilter) -> Self {
        Self {
            role: SlotRole::Auxiliary,
            filter,
            extractable: true,
        }
    }

    pub fn extractable(mut self, extractable: bool) -> Self {
        self.extractable = extractable;
        self
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A slot operation that the slot's rule forbids. Caller contract
/// violations, reported as values and never as panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("slot {slot} is out of range (inventory has {len} slots)")]
    OutOfRange { slot: usize, len: usize },
    #[error("slot {0} is an output slot and does not accept insertion")]
    OutputOnly(usize),
    #[error("slot {0} does not accept this item type")]
    FilterRejected(usize),
    #[error("slot {0} does not allow automated extraction")]
    NotExtractable(usize),
    #[error("slot {0} holds a different item type")]
    TypeMismatch(usize),
}

/// A refused insertion. The whole unit comes back untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct Rejected {
    pub residue: ResourceUnit,
    pub reason: SlotError,
}

// ---------------------------------------------------------------------------
// SlotInventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SlotInventory {
    rules: Vec<SlotRule>,
    slots: Vec<Option<ResourceUnit>>,
    items: Arc<ItemCatalog>,
    revision: u64,
}

impl SlotInventory {
    /// An empty inventory with one slot per rule.
    pub fn new(rules: Vec<SlotRule>, items: Arc<ItemCatalog>) -> Self {
        let slots = vec![None; rules.len()];
        Self {
            rules,
            slots,
            items,
            revision: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn rule(&self, slot: usize) -> Option<&SlotRule> {
        self.rules.get(slot)
    }

    pub fn role(&self, slot: usize) -> Option<SlotRole> {
        self.rules.get(slot).map(|r| r.role)
    }

    /// Index of the first slot with `role`.
    pub fn first_slot(&self, role: SlotRole) -> Option<usize> {
        self.rules.iter().position(|r| r.role == role)
    }

    pub fn items(&self) -> &Arc<ItemCatalog> {
        &self.items
    }

    /// Bumped on every committed change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn peek(&self, slot: usize) -> Option<&ResourceUnit> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Occupied slots as `(index, unit)`.
    pub fn contents(&self) -> impl Iterator<Item = (usize, &ResourceUnit)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|u| (i, u)))
    }

    pub fn total_count(&self) -> u64 {
        crate::item::total_count(self.slots.iter().flatten())
    }

    fn max_stack(&self, item_type: ItemTypeId) -> u32 {
        self.items.max_stack(item_type)
    }

    fn check_range(&self, slot: usize) -> Result<(), SlotError> {
        if slot < self.slots.len() {
            Ok(())
        } else {
            Err(SlotError::OutOfRange {
                slot,
                len: self.slots.len(),
            })
        }
    }

    // -----------------------------------------------------------------------
    // External access
    // -----------------------------------------------------------------------

    /// Insert from outside the converter. Returns the residue that did not
    /// fit, or the whole unit with the reason when the slot refuses it.
    pub fn try_insert(
        &mut self,
        slot: usize,
        unit: ResourceUnit,
        simulate: bool,
    ) -> Result<Option<ResourceUnit>, Rejected> {
        let reject = |reason| Rejected {
            residue: unit,
            reason,
        };
        self.check_range(slot).map_err(reject)?;
        let rule = &self.rules[slot];
        if rule.role.is_output() {
            return Err(reject(SlotError::OutputOnly(slot)));
        }
        if !rule.filter.accepts(&unit) {
            return Err(reject(SlotError::FilterRejected(slot)));
        }
        if self.slots[slot].is_some_and(|held| !held.can_stack_with(&unit)) {
            return Err(reject(SlotError::TypeMismatch(slot)));
        }

        let (merged, residue) = merge_into(self.slots[slot], unit, self.max_stack(unit.item_type));
        if !simulate && merged != self.slots[slot] {
            self.slots[slot] = merged;
            self.revision += 1;
        }
        Ok(residue)
    }

    /// Extract up to `count` items from outside the converter.
    pub fn try_extract(
        &mut self,
        slot: usize,
        count: u32,
        simulate: bool,
    ) -> Result<Option<ResourceUnit>, SlotError> {
        self.check_range(slot)?;
        if !self.rules[slot].extractable {
            return Err(SlotError::NotExtractable(slot));
        }
        let Some(current) = self.slots[slot] else {
            return Ok(None);
        };
        let (taken, left) = current.split(count);
        if !simulate && taken.is_some() {
            self.slots[slot] = left;
            self.revision += 1;
        }
        Ok(taken)
    }

    /// Empty every slot, handing back all contents in slot order.
    pub fn drain_all(&mut self) -> Vec<ResourceUnit> {
        let drained: Vec<ResourceUnit> = self.slots.iter_mut().filter_map(Option::take).collect();
        if !drained.is_empty() {
            self.revision += 1;
        }
        drained
    }

    // -----------------------------------------------------------------------
    // Converter-internal access (bypasses role and filter)
    // -----------------------------------------------------------------------

    /// Whether `unit` fits into `slot` entirely (type match and stack room).
    pub(crate) fn can_accept(&self, slot: usize, unit: &ResourceUnit) -> bool {
        let Some(current) = self.slots.get(slot) else {
            return false;
        };
        let max = self.max_stack(unit.item_type);
        match current {
            None => unit.count <= max,
            Some(existing) => {
                existing.can_stack_with(unit) && existing.count as u64 + unit.count as u64 <= max as u64
            }
        }
    }

    /// Place a product. Returns whatever did not fit.
    pub(crate) fn deposit(&mut self, slot: usize, unit: ResourceUnit) -> Option<ResourceUnit> {
        if slot >= self.slots.len() {
            return Some(unit);
        }
        let (merged, residue) = merge_into(self.slots[slot], unit, self.max_stack(unit.item_type));
        if merged != self.slots[slot] {
            self.slots[slot] = merged;
            self.revision += 1;
        }
        residue
    }

    /// Remove up to `count` items from `slot`. Returns what was removed.
    pub(crate) fn consume(&mut self, slot: usize, count: u32) -> Option<ResourceUnit> {
        let current = self.slots.get(slot).copied().flatten()?;
        let (taken, left) = current.split(count);
        if taken.is_some() {
            self.slots[slot] = left;
            self.revision += 1;
        }
        taken
    }

    /// Overwrite a slot, returning what it held. Used for container swaps and
    /// when restoring saved contents.
    pub(crate) fn replace(&mut self, slot: usize, unit: Option<ResourceUnit>) -> Option<ResourceUnit> {
        let cell = self.slots.get_mut(slot)?;
        let old = std::mem::replace(cell, unit);
        if old != unit {
            self.revision += 1;
        }
        old
    }
}
