use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

use crate::coords::{TileScale, Vec2};

/// Entity buckets are this many world tiles wide.
pub const DEFAULT_ENTITY_CHUNK_SIZE: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Mob,
    Player,
    Item,
}

impl EntityKind {
    pub fn as_token(self) -> &'static str {
        match self {
            EntityKind::Mob => "mob",
            EntityKind::Player => "player",
            EntityKind::Item => "item",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("duplicate {} id {id}", kind.as_token())]
    Duplicate { kind: EntityKind, id: String },
}

/// Anything the spatial index can bucket: a stable id and a pixel position.
pub trait Spatial {
    type Id: Copy + Eq + Hash + Ord + Debug;
    const KIND: EntityKind;

    fn id(&self) -> Self::Id;
    fn position(&self) -> Vec2;
}

/// Entity bucket coordinate, in units of `entity_chunk_size` world tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityChunkKey {
    pub x: i32,
    pub y: i32,
}

/// Pixel width of one entity bucket at the given scale.
pub fn entity_cell_size_px(scale: &TileScale, entity_chunk_size: u32) -> f32 {
    scale.scaled_tile_size() * entity_chunk_size.max(1) as f32
}

impl EntityChunkKey {
    pub fn from_pixels(position: Vec2, cell_size_px: f32) -> Self {
        Self {
            x: (position.x / cell_size_px).floor() as i32,
            y: (position.y / cell_size_px).floor() as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated { migrated: bool },
}

/// Flat `id -> entity` map plus `bucket -> ids`. Every `&mut self` method leaves
/// the two in agreement before it returns; empty buckets are dropped.
#[derive(Debug, Clone)]
pub struct SpatialIndex<T: Spatial> {
    entries: HashMap<T::Id, T>,
    buckets: HashMap<EntityChunkKey, HashSet<T::Id>>,
    cell_size_px: f32,
}

impl<T: Spatial> SpatialIndex<T> {
    pub fn new(cell_size_px: f32) -> Self {
        Self {
            entries: HashMap::new(),
            buckets: HashMap::new(),
            cell_size_px: sanitize_cell_size(cell_size_px),
        }
    }

    pub fn cell_size_px(&self) -> f32 {
        self.cell_size_px
    }

    pub fn key_for(&self, position: Vec2) -> EntityChunkKey {
        EntityChunkKey::from_pixels(position, self.cell_size_px)
    }

    pub fn insert(&mut self, entity: T) -> Result<(), IndexError> {
        let id = entity.id();
        if self.entries.contains_key(&id) {
            return Err(IndexError::Duplicate {
                kind: T::KIND,
                id: format!("{id:?}"),
            });
        }
        let key = self.key_for(entity.position());
        self.buckets.entry(key).or_default().insert(id);
        self.entries.insert(id, entity);
        Ok(())
    }

    /// Idempotent: removing an unknown id is a no-op.
    pub fn remove(&mut self, id: T::Id) -> Option<T> {
        let entity = self.entries.remove(&id)?;
        let key = self.key_for(entity.position());
        self.detach(key, id);
        Some(entity)
    }

    /// Mutates the entity through `apply`, then moves it to its new bucket if its
    /// position crossed a bucket edge.
    pub fn update_with<R>(&mut self, id: T::Id, apply: impl FnOnce(&mut T) -> R) -> Option<R> {
        let cell_size_px = self.cell_size_px;
        let entity = self.entries.get_mut(&id)?;
        let old_key = EntityChunkKey::from_pixels(entity.position(), cell_size_px);
        let result = apply(entity);
        let new_key = EntityChunkKey::from_pixels(entity.position(), cell_size_px);
        if old_key != new_key {
            self.detach(old_key, id);
            self.buckets.entry(new_key).or_default().insert(id);
        }
        Some(result)
    }

    /// Updates an existing entity, or inserts `create()` when the id is unknown.
    pub fn upsert(
        &mut self,
        id: T::Id,
        create: impl FnOnce() -> T,
        apply: impl FnOnce(&mut T),
    ) -> UpsertOutcome {
        if !self.entries.contains_key(&id) {
            let mut entity = create();
            apply(&mut entity);
            let key = self.key_for(entity.position());
            let id = entity.id();
            self.buckets.entry(key).or_default().insert(id);
            self.entries.insert(id, entity);
            return UpsertOutcome::Inserted;
        }

        let cell_size_px = self.cell_size_px;
        let migrated = self
            .update_with(id, |entity| {
                let before = EntityChunkKey::from_pixels(entity.position(), cell_size_px);
                apply(entity);
                before != EntityChunkKey::from_pixels(entity.position(), cell_size_px)
            })
            .unwrap_or(false);
        UpsertOutcome::Updated { migrated }
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<T::Id> {
        let mut ids = self.entries.keys().copied().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    pub fn bucket_of(&self, id: T::Id) -> Option<EntityChunkKey> {
        self.get(id).map(|entity| self.key_for(entity.position()))
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&EntityChunkKey, &HashSet<T::Id>)> {
        self.buckets.iter()
    }

    /// Members of the bucket containing `position`.
    pub fn find_at(&self, position: Vec2) -> Vec<&T> {
        self.resolve_keys(&[self.key_for(position)])
    }

    /// Union of the buckets under the four corners of a window centered on
    /// `center`. Ids whose flat entry has gone missing are skipped.
    pub fn find_near(&self, center: Vec2, half_extent: Vec2) -> Vec<&T> {
        let corners = [
            Vec2::new(center.x - half_extent.x, center.y - half_extent.y),
            Vec2::new(center.x + half_extent.x, center.y - half_extent.y),
            Vec2::new(center.x - half_extent.x, center.y + half_extent.y),
            Vec2::new(center.x + half_extent.x, center.y + half_extent.y),
        ];
        let mut keys = corners
            .iter()
            .map(|corner| self.key_for(*corner))
            .collect::<Vec<_>>();
        keys.sort();
        keys.dedup();
        self.resolve_keys(&keys)
    }

    /// Rebuilds every bucket for a new cell size (zoom change).
    pub fn set_cell_size(&mut self, cell_size_px: f32) {
        self.cell_size_px = sanitize_cell_size(cell_size_px);
        self.buckets.clear();
        for (id, entity) in &self.entries {
            let key = EntityChunkKey::from_pixels(entity.position(), self.cell_size_px);
            self.buckets.entry(key).or_default().insert(*id);
        }
    }

    /// Applies `apply` to every entity, keeping bucket membership in sync.
    pub fn update_all(&mut self, mut apply: impl FnMut(&mut T)) {
        for id in self.ids() {
            self.update_with(id, &mut apply);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.buckets.clear();
    }

    fn detach(&mut self, key: EntityChunkKey, id: T::Id) {
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.remove(&id);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
    }

    fn resolve_keys(&self, keys: &[EntityChunkKey]) -> Vec<&T> {
        let mut ids = keys
            .iter()
            .filter_map(|key| self.buckets.get(key))
            .flat_map(|bucket| bucket.iter().copied())
            .collect::<Vec<_>>();
        ids.sort();
        ids.dedup();
        ids.into_iter()
            .filter_map(|id| self.entries.get(&id))
            .collect()
    }
}

fn sanitize_cell_size(cell_size_px: f32) -> f32 {
    if cell_size_px.is_finite() && cell_size_px > 0.0 {
        cell_size_px
    } else {
        entity_cell_size_px(&TileScale::default(), DEFAULT_ENTITY_CHUNK_SIZE)
    }
}
