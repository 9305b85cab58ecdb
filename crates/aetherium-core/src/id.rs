use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a live converter owned by the [`Driver`](crate::driver::Driver).
    pub struct ConverterId;
}

/// Identifies an item type in the [`ItemCatalog`](crate::registry::ItemCatalog).
/// Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);

/// Identifies a recipe within one [`RecipeCatalog`](crate::recipe::RecipeCatalog).
/// The value is the registration index, so ordering follows registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub u32);

/// One of the six block faces a neighbour can touch a converter from.
///
/// "Internal" access is modelled as `Option<Face>::None` everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Face {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Down,
        Face::Up,
        Face::North,
        Face::South,
        Face::West,
        Face::East,
    ];

    /// Bit index used by [`FaceSet`](crate::capability::FaceSet).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// The face a neighbour sees when looking back at us.
    pub fn opposite(self) -> Face {
        match self {
            Face::Down => Face::Up,
            Face::Up => Face::Down,
            Face::North => Face::South,
            Face::South => Face::North,
            Face::West => Face::East,
            Face::East => Face::West,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Face::Up | Face::Down)
    }
}
