use crate::id::ItemTypeId;
use serde::{Deserialize, Serialize};

/// A counted stack of one item type. Plain value: copied and merged, never
/// shared between slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceUnit {
    pub item_type: ItemTypeId,
    pub count: u32,
}

impl ResourceUnit {
    pub fn new(item_type: ItemTypeId, count: u32) -> Self {
        Self { item_type, count }
    }

    /// A single item.
    pub fn one(item_type: ItemTypeId) -> Self {
        Self::new(item_type, 1)
    }

    pub fn can_stack_with(&self, other: &ResourceUnit) -> bool {
        self.item_type == other.item_type
    }

    /// The same type with a different count, or `None` for a zero count.
    pub fn with_count(&self, count: u32) -> Option<ResourceUnit> {
        (count > 0).then(|| ResourceUnit::new(self.item_type, count))
    }

    /// Split off up to `count` items. Returns `(taken, left)`; either side is
    /// `None` when empty.
    pub fn split(self, count: u32) -> (Option<ResourceUnit>, Option<ResourceUnit>) {
        let taken = count.min(self.count);
        (self.with_count(taken), self.with_count(self.count - taken))
    }
}

/// Merge `incoming` into `existing` up to `max_stack`.
///
/// Returns `(merged, overflow)`. Units of different types do not merge: the
/// slot is left as is and the whole of `incoming` comes back as overflow.
#[must_use = "overflow indicates items that did not fit"]
pub fn merge_into(
    existing: Option<ResourceUnit>,
    incoming: ResourceUnit,
    max_stack: u32,
) -> (Option<ResourceUnit>, Option<ResourceUnit>) {
    match existing {
        None => {
            let fits = incoming.count.min(max_stack);
            (incoming.with_count(fits), incoming.with_count(incoming.count - fits))
        }
        Some(current) if !current.can_stack_with(&incoming) => (Some(current), Some(incoming)),
        Some(current) => {
            let room = max_stack.saturating_sub(current.count);
            let fits = incoming.count.min(room);
            (
                Some(ResourceUnit::new(current.item_type, current.count + fits)),
                incoming.with_count(incoming.count - fits),
            )
        }
    }
}

/// Total count across a set of units of any type.
pub fn total_count<'a>(units: impl IntoIterator<Item = &'a ResourceUnit>) -> u64 {
    units.into_iter().map(|u| u.count as u64).sum()
}
