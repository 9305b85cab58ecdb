//! Host-side loop that owns live converters.
//!
//! The [`Driver`] steps every converter once per [`step`](Driver::step), in
//! insertion order, each with its own seeded RNG stream. Transfers between
//! neighbours go through the driver one at a time, so two converters never
//! touch each other concurrently. Single-threaded by construction.

use crate::converter::{ConverterInstance, ConverterState};
use crate::event::ConverterEvent;
use crate::fixed::Steps;
use crate::id::{ConverterId, Face};
use crate::item::ResourceUnit;
use crate::rng::SimRng;
use slotmap::SlotMap;
use std::hash::Hasher;

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// FNV-1a (64-bit) over the fields that define converter state. Two
/// drivers that hash equal after the same steps have not diverged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(u64);

impl StateHash {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    pub fn new() -> Self {
        Self(Self::OFFSET)
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for StateHash {
    fn write(&mut self, bytes: &[u8]) {
        self.0 = bytes
            .iter()
            .fold(self.0, |h, &b| (h ^ u64::from(b)).wrapping_mul(Self::PRIME));
    }

    // Fixed-width little-endian so hashes match across platforms.
    fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

fn hash_converter(hash: &mut StateHash, converter: &ConverterInstance, rng: &SimRng) {
    hash.write_u64(converter.pool().stored());
    hash.write_u32(converter.progress());
    hash.write(&[state_tag(converter.state())]);
    hash.write_u32(converter.active_recipe_id().map_or(u32::MAX, |id| id.0));
    for (slot, unit) in converter.inventory().contents() {
        hash.write_u64(slot as u64);
        hash.write_u32(unit.item_type.0);
        hash.write_u32(unit.count);
    }
    if let Some(g) = converter.generator_state() {
        hash.write_u32(g.fuel_remaining);
        hash.write_u32(g.fuel_total);
        hash.write_u32(g.warmup);
        hash.write_u32(g.auxiliary_level);
        hash.write_u32(g.auxiliary_timer);
    }
    hash.write_u64(rng.state());
}

fn state_tag(state: ConverterState) -> u8 {
    match state {
        ConverterState::Idle => 0,
        ConverterState::Starting => 1,
        ConverterState::Processing => 2,
        ConverterState::Complete => 3,
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Entry {
    converter: ConverterInstance,
    rng: SimRng,
}

#[derive(Debug)]
pub struct Driver {
    world_seed: u64,
    converters: SlotMap<ConverterId, Entry>,
    /// Step order. Insertion order, so it survives key reuse.
    order: Vec<ConverterId>,
    /// Instances ever added; seeds each new RNG stream.
    next_index: u64,
    step: Steps,
}

impl Driver {
    pub fn new(world_seed: u64) -> Self {
        Self {
            world_seed,
            converters: SlotMap::with_key(),
            order: Vec::new(),
            next_index: 0,
            step: 0,
        }
    }

    /// Take ownership of a converter. It gets its own RNG stream derived
    /// from the world seed and how many converters were added before it.
    pub fn add(&mut self, converter: ConverterInstance) -> ConverterId {
        let rng = SimRng::for_instance(self.world_seed, self.next_index);
        self.next_index += 1;
        let id = self.converters.insert(Entry { converter, rng });
        self.order.push(id);
        id
    }

    /// Remove a converter, returning everything it held.
    pub fn remove(&mut self, id: ConverterId) -> Option<Vec<ResourceUnit>> {
        let mut entry = self.converters.remove(id)?;
        self.order.retain(|&other| other != id);
        Some(entry.converter.on_remove())
    }

    pub fn get(&self, id: ConverterId) -> Option<&ConverterInstance> {
        self.converters.get(id).map(|e| &e.converter)
    }

    pub fn get_mut(&mut self, id: ConverterId) -> Option<&mut ConverterInstance> {
        self.converters.get_mut(id).map(|e| &mut e.converter)
    }

    pub fn ids(&self) -> &[ConverterId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn steps(&self) -> Steps {
        self.step
    }

    /// Advance every converter by one step.
    pub fn step(&mut self) {
        self.step += 1;
        for id in &self.order {
            if let Some(entry) = self.converters.get_mut(*id) {
                entry.converter.step(&mut entry.rng);
            }
        }
    }

    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    // -----------------------------------------------------------------------
    // Neighbour transfers
    // -----------------------------------------------------------------------

    /// Push up to `amount` energy out of `from` through `face` into `to`,
    /// which sees it arrive on the opposite face. Returns the amount moved.
    pub fn transfer_energy(&mut self, from: ConverterId, to: ConverterId, face: Face, amount: u64) -> u64 {
        if from == to {
            return 0;
        }
        let offered = self
            .converters
            .get_mut(from)
            .and_then(|e| e.converter.capabilities().query_energy_mut(Some(face)).map(|s| s.extract(amount, true)))
            .unwrap_or(0);
        if offered == 0 {
            return 0;
        }
        let accepted = self
            .converters
            .get_mut(to)
            .and_then(|e| {
                e.converter
                    .capabilities()
                    .query_energy_mut(Some(face.opposite()))
                    .map(|s| s.receive(offered, false))
            })
            .unwrap_or(0);
        if let Some(e) = self.converters.get_mut(from)
            && let Some(source) = e.converter.capabilities().query_energy_mut(Some(face))
        {
            source.extract(accepted, false);
        }
        accepted
    }

    /// Move up to `count` items from slot `from_slot` of `from`, through
    /// `face`, into slot `to_slot` of `to`. Returns the number moved.
    pub fn transfer_items(
        &mut self,
        from: ConverterId,
        from_slot: usize,
        to: ConverterId,
        to_slot: usize,
        face: Face,
        count: u32,
    ) -> u32 {
        if from == to {
            return 0;
        }
        let Some(offered) = self.converters.get_mut(from).and_then(|e| {
            e.converter
                .capabilities()
                .query_items_mut(Some(face))
                .and_then(|s| s.extract(from_slot, count, true))
        }) else {
            return 0;
        };

        let residue = match self.converters.get_mut(to).and_then(|e| {
            e.converter
                .capabilities()
                .query_items_mut(Some(face.opposite()))
                .map(|s| s.insert(to_slot, offered, false))
        }) {
            Some(residue) => residue,
            None => return 0,
        };
        let moved = offered.count - residue.map_or(0, |r| r.count);
        if moved > 0
            && let Some(e) = self.converters.get_mut(from)
            && let Some(source) = e.converter.capabilities().query_items_mut(Some(face))
        {
            source.extract(from_slot, moved, false);
        }
        moved
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Drain every converter's events, in step order.
    pub fn drain_events(&mut self) -> Vec<(ConverterId, ConverterEvent)> {
        let mut out = Vec::new();
        for id in &self.order {
            if let Some(entry) = self.converters.get_mut(*id) {
                out.extend(entry.converter.drain_events().into_iter().map(|e| (*id, e)));
            }
        }
        out
    }

    /// Deterministic hash over every converter's state and RNG position.
    pub fn state_hash(&self) -> u64 {
        let mut hash = StateHash::new();
        hash.write_u64(self.step);
        for id in &self.order {
            if let Some(entry) = self.converters.get(*id) {
                hash_converter(&mut hash, &entry.converter, &entry.rng);
            }
        }
        hash.finish()
    }
}
