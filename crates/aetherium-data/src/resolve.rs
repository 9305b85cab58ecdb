//! Turns parsed data files into engine types.
//!
//! Items are frozen first, then every processor gets a recipe catalog built
//! from the recipes that name it, and finally each converter definition is
//! resolved into a validated [`ConverterSpec`].

use crate::loader::{DataLoadError, check_duplicate, resolve_item, resolve_name};
use crate::schema::{
    ConverterData, FilterData, GeneratorData, IngredientData, ItemData, KindData, RecipeData, SlotData,
};
use aetherium_core::capability::{FacePolicy, FaceSet};
use aetherium_core::fixed::probability_from_f32;
use aetherium_core::id::ItemTypeId;
use aetherium_core::inventory::{SlotFilter, SlotRole, SlotRule};
use aetherium_core::item::ResourceUnit;
use aetherium_core::recipe::{Byproduct, Ingredient, RecipeCatalog, RecipeCatalogBuilder, RecipeDef};
use aetherium_core::registry::{DEFAULT_MAX_STACK, ItemCatalog, ItemCatalogBuilder};
use aetherium_core::spec::{AuxiliarySource, ConverterKind, ConverterSpec, FuelDef, GeneratorSpec};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

pub(crate) fn build_items(data: &[ItemData], file: &Path) -> Result<ItemCatalog, DataLoadError> {
    let mut seen = HashMap::with_capacity(data.len());
    let mut builder = ItemCatalogBuilder::new();
    for item in data {
        check_duplicate(&seen, &item.name, file)?;
        seen.insert(item.name.clone(), ());
        builder.register_with_stack(&item.name, item.max_stack.unwrap_or(DEFAULT_MAX_STACK));
    }
    builder.build().map_err(|source| DataLoadError::Catalog {
        file: file.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

fn resolve_ingredient(data: &IngredientData, items: &ItemCatalog, file: &Path) -> Result<Ingredient, DataLoadError> {
    match data {
        IngredientData::Short(name, count) => Ok(Ingredient::single(resolve_item(items, name, file)?, *count)),
        IngredientData::AnyOf { items: names, count } => {
            let ids = names
                .iter()
                .map(|name| resolve_item(items, name, file))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Ingredient::any_of(ids, *count))
        }
    }
}

fn resolve_recipe(data: &RecipeData, items: &ItemCatalog, file: &Path) -> Result<RecipeDef, DataLoadError> {
    let (output_name, output_count) = &data.output;
    let secondary_output = match &data.byproduct {
        Some(byproduct) => {
            if !(0.0..=1.0).contains(&byproduct.chance) {
                return Err(DataLoadError::InvalidValue {
                    file: file.to_path_buf(),
                    name: data.name.clone(),
                    detail: format!("byproduct chance {} is outside [0, 1]", byproduct.chance),
                });
            }
            Some(Byproduct {
                output: ResourceUnit::new(resolve_item(items, &byproduct.item, file)?, byproduct.count),
                probability: probability_from_f32(byproduct.chance),
            })
        }
        None => None,
    };

    Ok(RecipeDef {
        name: data.name.clone(),
        input: resolve_ingredient(&data.input, items, file)?,
        energy_cost: data.energy_cost,
        duration_steps: data.duration,
        primary_output: ResourceUnit::new(resolve_item(items, output_name, file)?, *output_count),
        secondary_output,
    })
}

/// Group recipes by the machine they name and freeze one catalog per
/// processor. Processors without recipes get an empty catalog.
pub(crate) fn build_recipe_catalogs(
    recipes: &[RecipeData],
    converters: &[ConverterData],
    items: &Arc<ItemCatalog>,
    file: &Path,
) -> Result<HashMap<String, Arc<RecipeCatalog>>, DataLoadError> {
    let mut builders: HashMap<String, RecipeCatalogBuilder> = converters
        .iter()
        .filter(|c| matches!(c.kind, KindData::Processor))
        .map(|c| (c.name.clone(), RecipeCatalogBuilder::new(Arc::clone(items))))
        .collect();

    let mut seen = HashMap::with_capacity(recipes.len());
    for recipe in recipes {
        check_duplicate(&seen, &recipe.name, file)?;
        seen.insert(recipe.name.clone(), ());
        let def = resolve_recipe(recipe, items, file)?;
        resolve_name(&builders, &recipe.machine, file, "processor")?;
        if let Some(builder) = builders.get_mut(&recipe.machine) {
            builder.register(def);
        }
    }

    builders
        .into_iter()
        .map(|(machine, builder)| {
            let catalog = builder.build().map_err(|source| DataLoadError::Catalog {
                file: file.to_path_buf(),
                source,
            })?;
            debug!(machine = %machine, recipes = catalog.len(), "built recipe catalog");
            Ok((machine, Arc::new(catalog)))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Converters
// ---------------------------------------------------------------------------

fn resolve_generator(data: &GeneratorData, items: &ItemCatalog, file: &Path) -> Result<GeneratorSpec, DataLoadError> {
    let fuels = data
        .fuels
        .iter()
        .map(|fuel| {
            Ok(FuelDef {
                item: resolve_item(items, &fuel.item, file)?,
                burn_steps: fuel.burn_steps,
            })
        })
        .collect::<Result<Vec<_>, DataLoadError>>()?;
    let auxiliary = data
        .auxiliary
        .iter()
        .map(|aux| {
            Ok(AuxiliarySource {
                item: resolve_item(items, &aux.item, file)?,
                level: aux.level,
                residue: aux.residue.as_deref().map(|r| resolve_item(items, r, file)).transpose()?,
            })
        })
        .collect::<Result<Vec<_>, DataLoadError>>()?;

    Ok(GeneratorSpec {
        generation_per_step: data.generation_per_step,
        warmup_target: data.warmup_target,
        warmup_rate: data.warmup_rate,
        cooldown_rate: data.cooldown_rate,
        auxiliary_interval: data.auxiliary_interval,
        fuels,
        auxiliary,
    })
}

/// The filter a slot gets when the data leaves it out.
fn default_filter(role: SlotRole, kind: &ConverterKind) -> SlotFilter {
    let mut accepted: Vec<ItemTypeId> = match (role, kind) {
        (SlotRole::OutputPrimary | SlotRole::OutputSecondary, _) => return SlotFilter::Nothing,
        (SlotRole::Input, ConverterKind::Processor { catalog }) => {
            catalog.iter().flat_map(|r| r.input.items.iter().copied()).collect()
        }
        (SlotRole::Input, ConverterKind::Generator(generator)) => generator.fuels.iter().map(|f| f.item).collect(),
        (SlotRole::Auxiliary, ConverterKind::Generator(generator)) => {
            generator.auxiliary.iter().map(|a| a.item).collect()
        }
        (SlotRole::Auxiliary, ConverterKind::Processor { .. }) => return SlotFilter::Any,
    };
    accepted.sort();
    accepted.dedup();
    SlotFilter::Items(accepted)
}

fn resolve_slot(
    data: &SlotData,
    kind: &ConverterKind,
    items: &ItemCatalog,
    file: &Path,
) -> Result<SlotRule, DataLoadError> {
    let filter = match &data.filter {
        None => default_filter(data.role, kind),
        Some(FilterData::Any) => SlotFilter::Any,
        Some(FilterData::Nothing) => SlotFilter::Nothing,
        Some(FilterData::Items(names)) => SlotFilter::Items(
            names
                .iter()
                .map(|name| resolve_item(items, name, file))
                .collect::<Result<_, _>>()?,
        ),
    };

    let mut rule = match data.role {
        SlotRole::Input => SlotRule::input(filter),
        SlotRole::Auxiliary => SlotRule::auxiliary(filter),
        SlotRole::OutputPrimary => SlotRule {
            filter,
            ..SlotRule::output_primary()
        },
        SlotRole::OutputSecondary => SlotRule {
            filter,
            ..SlotRule::output_secondary()
        },
    };
    if let Some(extractable) = data.extractable {
        rule = rule.extractable(extractable);
    }
    Ok(rule)
}

pub(crate) fn resolve_converter(
    data: &ConverterData,
    items: &Arc<ItemCatalog>,
    catalogs: &HashMap<String, Arc<RecipeCatalog>>,
    file: &Path,
) -> Result<ConverterSpec, DataLoadError> {
    let kind = match &data.kind {
        KindData::Processor => ConverterKind::Processor {
            catalog: Arc::clone(resolve_name(catalogs, &data.name, file, "processor")?),
        },
        KindData::Generator(generator) => ConverterKind::Generator(resolve_generator(generator, items, file)?),
    };

    let slots = data
        .slots
        .iter()
        .map(|slot| resolve_slot(slot, &kind, items, file))
        .collect::<Result<Vec<_>, _>>()?;

    let mut faces = match &kind {
        ConverterKind::Processor { .. } => FacePolicy::processing(),
        ConverterKind::Generator(_) => FacePolicy::generator(),
    };
    if let Some(overrides) = &data.faces {
        faces.energy = overrides.energy.unwrap_or(FaceSet::ALL);
        faces.items = overrides.items.unwrap_or(FaceSet::ALL);
    }

    let spec = ConverterSpec {
        name: data.name.clone(),
        capacity: data.capacity,
        max_input_rate: data.max_input_rate,
        max_output_rate: data.max_output_rate,
        slots,
        faces,
        kind,
    };
    spec.validate(items).map_err(|source| DataLoadError::Spec {
        name: data.name.clone(),
        source,
    })?;
    Ok(spec)
}
