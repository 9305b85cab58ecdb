//! Directional access to a converter's energy pool and inventory.
//!
//! Neighbours never touch a converter's fields. They ask the
//! [`CapabilityFacade`] for an [`EnergyAccess`] or [`ItemAccess`] handle on a
//! given face, and the converter's [`FacePolicy`] decides whether that face
//! exposes one. `None` as the face means internal access, which is always
//! allowed.

use crate::id::Face;
use crate::inventory::SlotInventory;
use crate::item::ResourceUnit;
use crate::pool::ResourcePool;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FaceSet
// ---------------------------------------------------------------------------

/// A set of block faces packed into one byte.
///
/// Serialized as a list of face names so data files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Face>", into = "Vec<Face>")]
pub struct FaceSet(u8);

impl FaceSet {
    pub const NONE: FaceSet = FaceSet(0);
    pub const ALL: FaceSet = FaceSet(0b11_1111);
    pub const VERTICAL: FaceSet = FaceSet((1 << Face::Down as u8) | (1 << Face::Up as u8));
    pub const HORIZONTAL: FaceSet = FaceSet(Self::ALL.0 & !Self::VERTICAL.0);

    pub fn of(faces: &[Face]) -> Self {
        faces.iter().fold(Self::NONE, |set, &f| set.with(f))
    }

    pub fn contains(self, face: Face) -> bool {
        self.0 & (1 << face.index()) != 0
    }

    pub fn with(self, face: Face) -> Self {
        FaceSet(self.0 | (1 << face.index()))
    }

    pub fn without(self, face: Face) -> Self {
        FaceSet(self.0 & !(1 << face.index()))
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Face> {
        Face::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl From<Vec<Face>> for FaceSet {
    fn from(faces: Vec<Face>) -> Self {
        FaceSet::of(&faces)
    }
}

impl From<FaceSet> for Vec<Face> {
    fn from(set: FaceSet) -> Self {
        set.iter().collect()
    }
}

// ---------------------------------------------------------------------------
// FacePolicy
// ---------------------------------------------------------------------------

/// Which faces expose energy and which expose items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacePolicy {
    pub energy: FaceSet,
    pub items: FaceSet,
}

impl Default for FacePolicy {
    fn default() -> Self {
        Self::all_sides()
    }
}

impl FacePolicy {
    pub fn all_sides() -> Self {
        Self {
            energy: FaceSet::ALL,
            items: FaceSet::ALL,
        }
    }

    pub fn no_energy() -> Self {
        Self {
            energy: FaceSet::NONE,
            items: FaceSet::ALL,
        }
    }

    pub fn no_items() -> Self {
        Self {
            energy: FaceSet::ALL,
            items: FaceSet::NONE,
        }
    }

    /// Energy through top and bottom, items through the sides.
    pub fn top_bottom_energy() -> Self {
        Self {
            energy: FaceSet::VERTICAL,
            items: FaceSet::HORIZONTAL,
        }
    }

    /// Processing machines: energy from the sides, items from any face.
    pub fn processing() -> Self {
        Self {
            energy: FaceSet::HORIZONTAL,
            items: FaceSet::ALL,
        }
    }

    /// Generators push energy out of every face.
    pub fn generator() -> Self {
        Self::all_sides()
    }

    pub fn energy_from(faces: &[Face]) -> Self {
        Self {
            energy: FaceSet::of(faces),
            items: FaceSet::ALL,
        }
    }

    pub fn items_from(faces: &[Face]) -> Self {
        Self {
            energy: FaceSet::ALL,
            items: FaceSet::of(faces),
        }
    }

    pub fn allows_energy(&self, face: Option<Face>) -> bool {
        face.is_none_or(|f| self.energy.contains(f))
    }

    pub fn allows_items(&self, face: Option<Face>) -> bool {
        face.is_none_or(|f| self.items.contains(f))
    }
}

// ---------------------------------------------------------------------------
// Access traits
// ---------------------------------------------------------------------------

/// Energy transfer surface seen by neighbours. All amounts saturate.
pub trait EnergyAccess {
    /// Returns the amount accepted.
    fn receive(&mut self, amount: u64, simulate: bool) -> u64;
    /// Returns the amount removed.
    fn extract(&mut self, amount: u64, simulate: bool) -> u64;
    fn stored(&self) -> u64;
    fn capacity(&self) -> u64;
    /// Whether this store takes energy from outside at all.
    fn can_receive(&self) -> bool;
    /// Whether this store gives energy to outside at all.
    fn can_extract(&self) -> bool;
}

/// Item transfer surface seen by neighbours. Refusals come back as residue.
pub trait ItemAccess {
    fn slot_count(&self) -> usize;
    fn peek(&self, slot: usize) -> Option<ResourceUnit>;
    /// Returns whatever was not inserted.
    fn insert(&mut self, slot: usize, unit: ResourceUnit, simulate: bool) -> Option<ResourceUnit>;
    /// Returns whatever was extracted.
    fn extract(&mut self, slot: usize, count: u32, simulate: bool) -> Option<ResourceUnit>;
}

impl EnergyAccess for ResourcePool {
    fn receive(&mut self, amount: u64, simulate: bool) -> u64 {
        ResourcePool::receive(self, amount, simulate)
    }

    fn extract(&mut self, amount: u64, simulate: bool) -> u64 {
        ResourcePool::extract(self, amount, simulate)
    }

    fn stored(&self) -> u64 {
        ResourcePool::stored(self)
    }

    fn capacity(&self) -> u64 {
        ResourcePool::capacity(self)
    }

    fn can_receive(&self) -> bool {
        self.max_input_rate() > 0
    }

    fn can_extract(&self) -> bool {
        self.max_output_rate() > 0
    }
}

impl ItemAccess for SlotInventory {
    fn slot_count(&self) -> usize {
        self.len()
    }

    fn peek(&self, slot: usize) -> Option<ResourceUnit> {
        SlotInventory::peek(self, slot).copied()
    }

    fn insert(&mut self, slot: usize, unit: ResourceUnit, simulate: bool) -> Option<ResourceUnit> {
        self.try_insert(slot, unit, simulate)
            .unwrap_or_else(|rejected| Some(rejected.residue))
    }

    fn extract(&mut self, slot: usize, count: u32, simulate: bool) -> Option<ResourceUnit> {
        self.try_extract(slot, count, simulate).ok().flatten()
    }
}

// ---------------------------------------------------------------------------
// CapabilityFacade
// ---------------------------------------------------------------------------

/// Face-filtered view over one converter's pool and inventory.
pub struct CapabilityFacade<'a> {
    pool: &'a mut ResourcePool,
    inventory: &'a mut SlotInventory,
    policy: FacePolicy,
}

impl<'a> CapabilityFacade<'a> {
    pub fn new(pool: &'a mut ResourcePool, inventory: &'a mut SlotInventory, policy: FacePolicy) -> Self {
        Self {
            pool,
            inventory,
            policy,
        }
    }

    pub fn policy(&self) -> &FacePolicy {
        &self.policy
    }

    pub fn query_energy(&self, face: Option<Face>) -> Option<&dyn EnergyAccess> {
        self.policy
            .allows_energy(face)
            .then_some(&*self.pool as &dyn EnergyAccess)
    }

    pub fn query_energy_mut(&mut self, face: Option<Face>) -> Option<&mut dyn EnergyAccess> {
        if self.policy.allows_energy(face) {
            Some(&mut *self.pool as &mut dyn EnergyAccess)
        } else {
            None
        }
    }

    pub fn query_items(&self, face: Option<Face>) -> Option<&dyn ItemAccess> {
        self.policy
            .allows_items(face)
            .then_some(&*self.inventory as &dyn ItemAccess)
    }

    pub fn query_items_mut(&mut self, face: Option<Face>) -> Option<&mut dyn ItemAccess> {
        if self.policy.allows_items(face) {
            Some(&mut *self.inventory as &mut dyn ItemAccess)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ItemTypeId;
    use crate::inventory::{SlotFilter, SlotRule};
    use crate::registry::ItemCatalogBuilder;
    use std::sync::Arc;

    fn inventory() -> SlotInventory {
        let mut b = ItemCatalogBuilder::new();
        b.register("iron_ore");
        b.register("raw_iron");
        SlotInventory::new(
            vec![SlotRule::input(SlotFilter::Any), SlotRule::output_primary()],
            Arc::new(b.build().unwrap()),
        )
    }

    #[test]
    fn face_set_membership() {
        let set = FaceSet::of(&[Face::Up, Face::East]);
        assert!(set.contains(Face::Up));
        assert!(set.contains(Face::East));
        assert!(!set.contains(Face::Down));
        assert_eq!(set.without(Face::Up).iter().collect::<Vec<_>>(), vec![Face::East]);
        assert!(FaceSet::NONE.is_empty());
        assert_eq!(FaceSet::ALL.iter().count(), 6);
        assert_eq!(FaceSet::HORIZONTAL.iter().count(), 4);
    }

    #[test]
    fn face_set_serializes_as_names() {
        let set = FaceSet::of(&[Face::Down, Face::West]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["down","west"]"#);
        let back: FaceSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn internal_access_is_always_allowed() {
        for policy in [FacePolicy::no_energy(), FacePolicy::no_items(), FacePolicy::energy_from(&[])] {
            assert!(policy.allows_energy(None));
            assert!(policy.allows_items(None));
        }
    }

    #[test]
    fn presets_follow_their_faces() {
        let tb = FacePolicy::top_bottom_energy();
        assert!(tb.allows_energy(Some(Face::Up)));
        assert!(!tb.allows_energy(Some(Face::North)));
        assert!(tb.allows_items(Some(Face::North)));
        assert!(!tb.allows_items(Some(Face::Down)));

        let processing = FacePolicy::processing();
        assert!(!processing.allows_energy(Some(Face::Up)));
        assert!(processing.allows_energy(Some(Face::West)));
        assert!(processing.allows_items(Some(Face::Up)));

        let from_east = FacePolicy::energy_from(&[Face::East]);
        assert!(from_east.allows_energy(Some(Face::East)));
        assert!(!from_east.allows_energy(Some(Face::West)));
        assert!(FacePolicy::items_from(&[Face::Up]).allows_items(Some(Face::Up)));
        assert!(!FacePolicy::items_from(&[Face::Up]).allows_items(Some(Face::South)));
    }

    #[test]
    fn facade_hides_closed_faces() {
        let mut pool = ResourcePool::new(1000, 100, 100);
        let mut inv = inventory();
        let mut facade = CapabilityFacade::new(&mut pool, &mut inv, FacePolicy::top_bottom_energy());
        assert!(facade.query_energy(Some(Face::North)).is_none());
        assert!(facade.query_items(Some(Face::Up)).is_none());

        let energy = facade.query_energy_mut(Some(Face::Up)).unwrap();
        assert_eq!(energy.receive(250, false), 100);
        assert_eq!(facade.query_energy(None).map(|e| e.stored()), Some(100));
    }

    #[test]
    fn item_access_flattens_rejections() {
        let mut pool = ResourcePool::new(10, 0, 0);
        let mut inv = inventory();
        let mut facade = CapabilityFacade::new(&mut pool, &mut inv, FacePolicy::all_sides());
        let items = facade.query_items_mut(Some(Face::North)).unwrap();

        let ore = ResourceUnit::new(ItemTypeId(0), 4);
        assert_eq!(items.insert(1, ore, false), Some(ore));
        assert_eq!(items.insert(0, ore, false), None);
        assert_eq!(items.extract(0, 1, false), None);
        assert_eq!(items.peek(0), Some(ore));
        assert_eq!(items.slot_count(), 2);
    }

    #[test]
    fn energy_access_reports_directions() {
        let sink = ResourcePool::new(100, 10, 0);
        assert!(EnergyAccess::can_receive(&sink));
        assert!(!EnergyAccess::can_extract(&sink));
    }
}
