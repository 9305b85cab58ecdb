//! Serde data file structs for machine content definitions.
//!
//! These structs define the on-disk format for items, recipes and
//! converters. They are deserialized from RON, JSON, or TOML data files and
//! then resolved into engine types by the loader. Everything refers to
//! other definitions by name.

use aetherium_core::capability::FaceSet;
use aetherium_core::inventory::SlotRole;
use serde::Deserialize;

// ===========================================================================
// Items
// ===========================================================================

/// An item type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
    /// Falls back to the catalog default (64).
    #[serde(default)]
    pub max_stack: Option<u32>,
}

/// TOML wrapper: `[[items]]` tables.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlItems {
    pub items: Vec<ItemData>,
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A recipe ingredient, supporting a short tuple form and a full form that
/// accepts several interchangeable items.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngredientData {
    /// Short form: `("item_name", count)`.
    Short(String, u32),
    /// Full form: any of `items`, at least `count` of it.
    AnyOf { items: Vec<String>, count: u32 },
}

/// A chance-based secondary output.
#[derive(Debug, Clone, Deserialize)]
pub struct ByproductData {
    pub item: String,
    #[serde(default = "default_count")]
    pub count: u32,
    /// In `[0, 1]`.
    pub chance: f32,
}

fn default_count() -> u32 {
    1
}

/// A recipe definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    /// Name of the converter whose catalog this recipe joins.
    pub machine: String,
    pub input: IngredientData,
    pub energy_cost: u64,
    pub duration: u32,
    pub output: (String, u32),
    #[serde(default)]
    pub byproduct: Option<ByproductData>,
}

// ===========================================================================
// Converters
// ===========================================================================

/// Which items a slot lets external callers insert.
///
/// When a slot leaves this out, input slots take the machine's recipe
/// ingredients (or fuels), auxiliary slots take the auxiliary sources and
/// output slots take nothing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterData {
    Any,
    Nothing,
    Items(Vec<String>),
}

/// One slot of a converter.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotData {
    pub role: SlotRole,
    #[serde(default)]
    pub filter: Option<FilterData>,
    /// Overrides the role's default extraction policy.
    #[serde(default)]
    pub extractable: Option<bool>,
}

/// Faces exposing energy and items, as lists of face names. A missing list
/// means every face.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacesData {
    #[serde(default)]
    pub energy: Option<FaceSet>,
    #[serde(default)]
    pub items: Option<FaceSet>,
}

/// An item that can be burned, with the steps one unit lasts.
#[derive(Debug, Clone, Deserialize)]
pub struct FuelData {
    pub item: String,
    pub burn_steps: u32,
}

/// An item that refills the auxiliary level.
#[derive(Debug, Clone, Deserialize)]
pub struct AuxiliaryData {
    pub item: String,
    pub level: u32,
    #[serde(default)]
    pub residue: Option<String>,
}

/// Generator parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorData {
    pub generation_per_step: u64,
    pub warmup_target: u32,
    pub warmup_rate: u32,
    pub cooldown_rate: u32,
    #[serde(default = "default_auxiliary_interval")]
    pub auxiliary_interval: u32,
    pub fuels: Vec<FuelData>,
    #[serde(default)]
    pub auxiliary: Vec<AuxiliaryData>,
}

fn default_auxiliary_interval() -> u32 {
    20
}

/// What a converter does with its energy.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindData {
    /// Runs the recipes whose `machine` names this converter.
    Processor,
    Generator(GeneratorData),
}

/// A converter definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ConverterData {
    pub name: String,
    pub capacity: u64,
    #[serde(default)]
    pub max_input_rate: u64,
    #[serde(default)]
    pub max_output_rate: u64,
    pub slots: Vec<SlotData>,
    #[serde(default)]
    pub faces: Option<FacesData>,
    pub kind: KindData,
}
