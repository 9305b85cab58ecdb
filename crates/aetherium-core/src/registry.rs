use crate::id::ItemTypeId;
use std::collections::HashMap;

/// Max stack applied when an item is registered without one.
pub const DEFAULT_MAX_STACK: u32 = 64;

/// An item type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTypeDef {
    pub name: String,
    pub max_stack: u32,
}

/// Builder for the immutable [`ItemCatalog`].
#[derive(Debug, Default)]
pub struct ItemCatalogBuilder {
    items: Vec<ItemTypeDef>,
    name_to_id: HashMap<String, ItemTypeId>,
}

impl ItemCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item with the default max stack. Returns its ID.
    pub fn register(&mut self, name: &str) -> ItemTypeId {
        self.register_with_stack(name, DEFAULT_MAX_STACK)
    }

    /// Register an item with an explicit max stack. Returns its ID.
    ///
    /// Registering the same name twice keeps the first ID; the duplicate is
    /// reported by [`build`](Self::build).
    pub fn register_with_stack(&mut self, name: &str, max_stack: u32) -> ItemTypeId {
        let id = ItemTypeId(self.items.len() as u32);
        self.items.push(ItemTypeDef {
            name: name.to_string(),
            max_stack,
        });
        *self.name_to_id.entry(name.to_string()).or_insert(id)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.name_to_id.get(name).copied()
    }

    /// Validate and freeze.
    pub fn build(self) -> Result<ItemCatalog, CatalogError> {
        if self.name_to_id.len() != self.items.len() {
            let mut seen = std::collections::HashSet::new();
            for item in &self.items {
                if !seen.insert(item.name.as_str()) {
                    return Err(CatalogError::DuplicateName(item.name.clone()));
                }
            }
        }
        if let Some(item) = self.items.iter().find(|i| i.max_stack == 0) {
            return Err(CatalogError::ZeroMaxStack(item.name.clone()));
        }
        Ok(ItemCatalog {
            items: self.items,
            name_to_id: self.name_to_id,
        })
    }
}

/// Immutable table of item types. Frozen after build; shared via `Arc`.
#[derive(Debug)]
pub struct ItemCatalog {
    items: Vec<ItemTypeDef>,
    name_to_id: HashMap<String, ItemTypeId>,
}

impl ItemCatalog {
    pub fn get(&self, id: ItemTypeId) -> Option<&ItemTypeDef> {
        self.items.get(id.0 as usize)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.name_to_id.get(name).copied()
    }

    pub fn name(&self, id: ItemTypeId) -> Option<&str> {
        self.get(id).map(|def| def.name.as_str())
    }

    /// Max stack for a type. Unknown types can never be stacked.
    pub fn max_stack(&self, id: ItemTypeId) -> u32 {
        self.get(id).map(|def| def.max_stack).unwrap_or(0)
    }

    pub fn contains(&self, id: ItemTypeId) -> bool {
        (id.0 as usize) < self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Errors raised while freezing an item or recipe catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate name: {0}")]
    DuplicateName(String),
    #[error("item '{0}' has a max stack of zero")]
    ZeroMaxStack(String),
    #[error("recipe '{recipe}' references unknown item {item:?}")]
    InvalidItemRef { recipe: String, item: ItemTypeId },
    #[error("recipe '{0}' has an empty ingredient")]
    EmptyIngredient(String),
    #[error("recipe '{0}' has a zero duration")]
    ZeroDuration(String),
    #[error("recipe '{0}' has a zero-count output")]
    ZeroOutput(String),
    #[error("recipe '{recipe}' output exceeds the max stack of {item:?}")]
    OutputOverStack { recipe: String, item: ItemTypeId },
    #[error("recipe '{0}' byproduct probability is outside [0, 1]")]
    InvalidProbability(String),
}
