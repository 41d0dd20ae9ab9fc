use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coords::Vec2;

use super::index::{EntityKind, Spatial};

/// One physical unit of an item. Unique across the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u64);

/// Item type shared by every unit in a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("item stack needs at least one unit")]
    Empty,
    #[error("cannot merge item {incoming:?} into a stack of {existing:?}")]
    Mismatch { existing: ItemId, incoming: ItemId },
    #[error("cannot split {requested} units from a stack of {available}")]
    Insufficient { requested: usize, available: usize },
}

/// A pile of same-type units lying in the world, `amount = unit_ids.len()`.
///
/// The stack keeps the id it was registered under even as units move in and
/// out, so index lookups stay stable.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    stack_id: UnitId,
    item_id: ItemId,
    unit_ids: BTreeSet<UnitId>,
    /// World pixels.
    pub position: Vec2,
}

impl ItemStack {
    /// The stack id is the smallest unit id at creation.
    pub fn new(
        item_id: ItemId,
        unit_ids: impl IntoIterator<Item = UnitId>,
        position: Vec2,
    ) -> Result<Self, ItemError> {
        let unit_ids = unit_ids.into_iter().collect::<BTreeSet<_>>();
        let stack_id = unit_ids.first().copied().ok_or(ItemError::Empty)?;
        Ok(Self {
            stack_id,
            item_id,
            unit_ids,
            position,
        })
    }

    pub fn stack_id(&self) -> UnitId {
        self.stack_id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn amount(&self) -> usize {
        self.unit_ids.len()
    }

    pub fn unit_ids(&self) -> &BTreeSet<UnitId> {
        &self.unit_ids
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.unit_ids.contains(&unit)
    }

    /// Takes the `count` highest unit ids into a new stack at the same position.
    /// At least one unit always stays behind.
    pub fn split_off(&mut self, count: usize) -> Result<ItemStack, ItemError> {
        let available = self.unit_ids.len();
        if count == 0 || count >= available {
            return Err(ItemError::Insufficient {
                requested: count,
                available,
            });
        }
        let keep = available - count;
        let pivot = self
            .unit_ids
            .iter()
            .nth(keep)
            .copied()
            .ok_or(ItemError::Insufficient {
                requested: count,
                available,
            })?;
        let taken = self.unit_ids.split_off(&pivot);
        ItemStack::new(self.item_id, taken, self.position)
    }

    /// Moves every unit of `other` into this stack. Units already present are
    /// not duplicated.
    pub fn absorb(&mut self, other: ItemStack) -> Result<(), ItemError> {
        if other.item_id != self.item_id {
            return Err(ItemError::Mismatch {
                existing: self.item_id,
                incoming: other.item_id,
            });
        }
        self.unit_ids.extend(other.unit_ids);
        Ok(())
    }
}

impl Spatial for ItemStack {
    type Id = UnitId;
    const KIND: EntityKind = EntityKind::Item;

    fn id(&self) -> UnitId {
        self.stack_id
    }

    fn position(&self) -> Vec2 {
        self.position
    }
}
