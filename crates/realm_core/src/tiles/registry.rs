use std::collections::HashMap;

use super::TileId;

/// Opaque reference the renderer resolves to a sprite: a tileset image and the
/// cell index inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DrawableHandle {
    pub image: String,
    pub index: u32,
}

/// Per-tile overrides read from tileset properties. Only `is_walkable` and
/// `render_after` matter to the core; the rest is carried for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileProps {
    pub is_walkable: bool,
    pub render_after: bool,
    pub damage: f32,
    pub animated: bool,
}

impl Default for TileProps {
    fn default() -> Self {
        Self {
            is_walkable: true,
            render_after: false,
            damage: 0.0,
            animated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileDescriptor {
    pub id: TileId,
    pub name: String,
    pub props: TileProps,
    pub drawable: Option<DrawableHandle>,
}

impl TileDescriptor {
    pub fn new(id: TileId, name: impl Into<String>, props: TileProps) -> Self {
        Self {
            id,
            name: name.into(),
            props,
            drawable: None,
        }
    }

    pub fn with_drawable(mut self, drawable: DrawableHandle) -> Self {
        self.drawable = Some(drawable);
        self
    }

    pub fn is_walkable(&self) -> bool {
        self.props.is_walkable
    }
}

#[derive(Debug, Default, Clone)]
pub struct TileRegistry {
    tiles: HashMap<TileId, TileDescriptor>,
}

impl TileRegistry {
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = TileDescriptor>) -> Self {
        let mut registry = Self::default();
        for descriptor in descriptors {
            registry.insert(descriptor);
        }
        registry
    }

    /// Later loads win; returns the descriptor that was replaced, if any.
    pub fn insert(&mut self, descriptor: TileDescriptor) -> Option<TileDescriptor> {
        self.tiles.insert(descriptor.id, descriptor)
    }

    pub fn get(&self, id: TileId) -> Option<&TileDescriptor> {
        self.tiles.get(&id)
    }

    /// Unknown ids, including the empty tile, are walkable.
    pub fn is_walkable(&self, id: TileId) -> bool {
        self.get(id).map(TileDescriptor::is_walkable).unwrap_or(true)
    }

    pub fn renders_after(&self, id: TileId) -> bool {
        self.get(id)
            .map(|descriptor| descriptor.props.render_after)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }
}
