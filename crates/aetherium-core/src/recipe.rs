use crate::fixed::{Fixed64, spread_share};
use crate::id::{ItemTypeId, RecipeId};
use crate::item::ResourceUnit;
use crate::registry::{CatalogError, ItemCatalog};
use crate::rng::SimRng;
use std::collections::HashMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Recipe types
// ---------------------------------------------------------------------------

/// The input predicate of a recipe: the input slot holds one of `items` with
/// at least `count` units.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Ingredient {
    pub items: Vec<ItemTypeId>,
    pub count: u32,
}

impl Ingredient {
    pub fn single(item: ItemTypeId, count: u32) -> Self {
        Self {
            items: vec![item],
            count,
        }
    }

    /// Any of several interchangeable items (a tag in data files).
    pub fn any_of(items: Vec<ItemTypeId>, count: u32) -> Self {
        Self { items, count }
    }

    pub fn accepts(&self, content: Option<&ResourceUnit>) -> bool {
        content.is_some_and(|unit| unit.count >= self.count && self.items.contains(&unit.item_type))
    }
}

/// A chance-based secondary product.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Byproduct {
    pub output: ResourceUnit,
    /// In `[0, 1]`.
    pub probability: Fixed64,
}

/// A frozen recipe. Built by [`RecipeCatalogBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub input: Ingredient,
    /// Total energy debited over the run.
    pub energy_cost: u64,
    pub duration_steps: u32,
    pub primary_output: ResourceUnit,
    pub secondary_output: Option<Byproduct>,
}

impl Recipe {
    /// Energy debited on the step that takes progress to `progress`.
    pub fn energy_share(&self, progress: u32) -> u64 {
        spread_share(self.energy_cost, self.duration_steps, progress)
    }

    /// Draw the products of one completion. One RNG draw is consumed for
    /// every recipe with a byproduct, whatever its probability.
    pub fn resolve_outputs(&self, rng: &mut SimRng) -> (ResourceUnit, Option<ResourceUnit>) {
        let secondary = self
            .secondary_output
            .as_ref()
            .and_then(|b| rng.chance(b.probability).then_some(b.output));
        (self.primary_output, secondary)
    }
}

/// A recipe as registered, before it gets an id.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecipeDef {
    pub name: String,
    pub input: Ingredient,
    pub energy_cost: u64,
    pub duration_steps: u32,
    pub primary_output: ResourceUnit,
    pub secondary_output: Option<Byproduct>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Collects recipe definitions in registration order, then validates and
/// freezes them.
#[derive(Debug)]
pub struct RecipeCatalogBuilder {
    items: Arc<ItemCatalog>,
    recipes: Vec<Recipe>,
}

impl RecipeCatalogBuilder {
    pub fn new(items: Arc<ItemCatalog>) -> Self {
        Self {
            items,
            recipes: Vec::new(),
        }
    }

    /// Register a recipe. Earlier registrations win when several match.
    pub fn register(&mut self, def: RecipeDef) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(Recipe {
            id,
            name: def.name,
            input: def.input,
            energy_cost: def.energy_cost,
            duration_steps: def.duration_steps,
            primary_output: def.primary_output,
            secondary_output: def.secondary_output,
        });
        id
    }

    pub fn build(self) -> Result<RecipeCatalog, CatalogError> {
        let mut by_name = HashMap::with_capacity(self.recipes.len());
        for recipe in &self.recipes {
            self.validate(recipe)?;
            if by_name.insert(recipe.name.clone(), recipe.id).is_some() {
                return Err(CatalogError::DuplicateName(recipe.name.clone()));
            }
        }
        Ok(RecipeCatalog {
            recipes: self.recipes,
            by_name,
        })
    }

    fn validate(&self, recipe: &Recipe) -> Result<(), CatalogError> {
        let name = || recipe.name.clone();
        if recipe.input.items.is_empty() || recipe.input.count == 0 {
            return Err(CatalogError::EmptyIngredient(name()));
        }
        if recipe.duration_steps == 0 {
            return Err(CatalogError::ZeroDuration(name()));
        }

        let mut outputs = vec![recipe.primary_output];
        if let Some(byproduct) = &recipe.secondary_output {
            if byproduct.probability < Fixed64::ZERO || byproduct.probability > Fixed64::ONE {
                return Err(CatalogError::InvalidProbability(name()));
            }
            outputs.push(byproduct.output);
        }

        let missing = recipe
            .input
            .items
            .iter()
            .copied()
            .chain(outputs.iter().map(|o| o.item_type))
            .find(|i| !self.items.contains(*i));
        if let Some(item) = missing {
            return Err(CatalogError::InvalidItemRef {
                recipe: name(),
                item,
            });
        }

        for output in &outputs {
            if output.count == 0 {
                return Err(CatalogError::ZeroOutput(name()));
            }
            if output.count > self.items.max_stack(output.item_type) {
                return Err(CatalogError::OutputOverStack {
                    recipe: name(),
                    item: output.item_type,
                });
            }
        }
        Ok(())
    }
}

/// Immutable, ordered recipe table shared by every converter of one kind.
#[derive(Debug)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
    by_name: HashMap<String, RecipeId>,
}

impl RecipeCatalog {
    pub fn get(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(id.0 as usize)
    }

    pub fn by_name(&self, name: &str) -> Option<&Recipe> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// The first registered recipe whose ingredient accepts `input`.
    pub fn find_match(&self, input: Option<&ResourceUnit>) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.input.accepts(input))
    }

    /// Whether any recipe could ever use this item type as input.
    pub fn is_ingredient(&self, item: ItemTypeId) -> bool {
        self.recipes.iter().any(|r| r.input.items.contains(&item))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
