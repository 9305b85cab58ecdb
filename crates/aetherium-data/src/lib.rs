//! Data-driven machine definitions for `aetherium-core`.
//!
//! A data directory holds three files, each in RON, TOML or JSON:
//!
//! - `items`: item types and their max stack (required)
//! - `converters`: pool sizes, rates, slots, faces, generator parameters (required)
//! - `recipes`: processor recipes, each naming the converter it belongs to
//!
//! [`load_game_data`] parses them, resolves every name and returns shared
//! catalogs plus validated converter specs. The four bundled machines live in
//! this crate's `data/` directory; see [`load_bundled`].

pub mod loader;
mod resolve;
pub mod schema;

pub use loader::DataLoadError;

use aetherium_core::converter::ConverterInstance;
use aetherium_core::recipe::RecipeCatalog;
use aetherium_core::registry::ItemCatalog;
use aetherium_core::spec::ConverterSpec;
use loader::{deserialize_list, find_data_file, require_data_file};
use schema::{ConverterData, ItemData, RecipeData};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Everything loaded from one data directory.
#[derive(Debug)]
pub struct GameData {
    items: Arc<ItemCatalog>,
    recipes: HashMap<String, Arc<RecipeCatalog>>,
    /// In file order.
    converters: Vec<Arc<ConverterSpec>>,
    by_name: HashMap<String, usize>,
}

impl GameData {
    pub fn items(&self) -> &Arc<ItemCatalog> {
        &self.items
    }

    /// The recipe catalog of a processor.
    pub fn recipes(&self, machine: &str) -> Option<&Arc<RecipeCatalog>> {
        self.recipes.get(machine)
    }

    pub fn converter(&self, name: &str) -> Option<&Arc<ConverterSpec>> {
        self.by_name.get(name).map(|&i| &self.converters[i])
    }

    pub fn converters(&self) -> impl Iterator<Item = &Arc<ConverterSpec>> {
        self.converters.iter()
    }

    /// Build a fresh, empty converter from a loaded spec.
    pub fn instantiate(&self, name: &str) -> Result<ConverterInstance, DataLoadError> {
        let spec = self
            .converter(name)
            .ok_or_else(|| DataLoadError::UnknownConverter(name.to_string()))?;
        ConverterInstance::new(Arc::clone(spec), Arc::clone(&self.items)).map_err(|source| DataLoadError::Spec {
            name: name.to_string(),
            source,
        })
    }
}

/// Load items, recipes and converters from `dir`.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let items_file = require_data_file(dir, "items")?;
    let item_data: Vec<ItemData> = deserialize_list(&items_file, "items")?;
    let items = Arc::new(resolve::build_items(&item_data, &items_file)?);

    let converters_file = require_data_file(dir, "converters")?;
    let converter_data: Vec<ConverterData> = deserialize_list(&converters_file, "converters")?;

    let (recipes_file, recipe_data) = match find_data_file(dir, "recipes")? {
        Some(path) => {
            let data: Vec<RecipeData> = deserialize_list(&path, "recipes")?;
            (path, data)
        }
        None => (dir.join("recipes"), Vec::new()),
    };
    let recipes = resolve::build_recipe_catalogs(&recipe_data, &converter_data, &items, &recipes_file)?;

    let mut converters = Vec::with_capacity(converter_data.len());
    let mut by_name = HashMap::with_capacity(converter_data.len());
    for data in &converter_data {
        loader::check_duplicate(&by_name, &data.name, &converters_file)?;
        let spec = resolve::resolve_converter(data, &items, &recipes, &converters_file)?;
        by_name.insert(data.name.clone(), converters.len());
        converters.push(Arc::new(spec));
    }

    info!(
        dir = %dir.display(),
        items = items.len(),
        recipes = recipe_data.len(),
        converters = converters.len(),
        "loaded game data"
    );
    Ok(GameData {
        items,
        recipes,
        converters,
        by_name,
    })
}

/// Directory of the machine definitions shipped with this crate.
pub fn bundled_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Load the bundled steam engine, mechanical crusher, spirit centrifuge and
/// mana infuser.
pub fn load_bundled() -> Result<GameData, DataLoadError> {
    load_game_data(&bundled_data_dir())
}
