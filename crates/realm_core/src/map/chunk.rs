use std::collections::HashMap;

use thiserror::Error;

use crate::coords::{ChunkKey, CHUNK_SIZE};
use crate::tiles::{TileId, EMPTY_TILE};

const CHUNK_AREA: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Background,
    Foreground,
    Animated,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Background, Layer::Foreground, Layer::Animated];

    /// Loose, case-insensitive substring match on a map layer name.
    pub fn classify(layer_name: &str) -> Option<Layer> {
        let lowered = layer_name.to_ascii_lowercase();
        if lowered.contains("background") {
            Some(Layer::Background)
        } else if lowered.contains("foreground") {
            Some(Layer::Foreground)
        } else if lowered.contains("animated") {
            Some(Layer::Animated)
        } else {
            None
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Layer::Background => "background",
            Layer::Foreground => "foreground",
            Layer::Animated => "animated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("chunk origin ({origin_x}, {origin_y}) is not a multiple of {chunk_size}")]
    Misaligned {
        origin_x: i32,
        origin_y: i32,
        chunk_size: i32,
    },
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
}

/// A `CHUNK_SIZE`×`CHUNK_SIZE` row-major block of tile ids. Never mutated after
/// it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    origin_x: i32,
    origin_y: i32,
    tiles: Vec<TileId>,
}

impl Chunk {
    pub fn new(origin_x: i32, origin_y: i32, tiles: Vec<TileId>) -> Result<Self, ChunkError> {
        if !ChunkKey::is_aligned(origin_x, origin_y) {
            return Err(ChunkError::Misaligned {
                origin_x,
                origin_y,
                chunk_size: CHUNK_SIZE,
            });
        }
        if tiles.len() != CHUNK_AREA {
            return Err(ChunkError::TileCountMismatch {
                expected: CHUNK_AREA,
                actual: tiles.len(),
            });
        }
        Ok(Self {
            origin_x,
            origin_y,
            tiles,
        })
    }

    pub fn origin_x(&self) -> i32 {
        self.origin_x
    }

    pub fn origin_y(&self) -> i32 {
        self.origin_y
    }

    pub fn key(&self) -> ChunkKey {
        ChunkKey {
            origin_x: self.origin_x,
            origin_y: self.origin_y,
        }
    }

    pub fn contains_tile(&self, tile_x: i32, tile_y: i32) -> bool {
        ChunkKey::for_tile(tile_x, tile_y) == self.key()
    }

    /// Tile at a world-tile coordinate, `None` outside this chunk.
    pub fn tile_at(&self, tile_x: i32, tile_y: i32) -> Option<TileId> {
        if !self.contains_tile(tile_x, tile_y) {
            return None;
        }
        let local_x = (tile_x - self.origin_x) as usize;
        let local_y = (tile_y - self.origin_y) as usize;
        self.tiles
            .get(local_y * CHUNK_SIZE as usize + local_x)
            .copied()
    }

    /// Row `local_y` of the chunk, `local_y` in `0..CHUNK_SIZE`.
    pub fn row(&self, local_y: usize) -> &[TileId] {
        let start = local_y * CHUNK_SIZE as usize;
        &self.tiles[start..start + CHUNK_SIZE as usize]
    }
}

#[derive(Debug, Default, Clone)]
pub struct ChunkStore {
    chunks: HashMap<ChunkKey, Chunk>,
}

impl ChunkStore {
    pub fn insert(&mut self, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(chunk.key(), chunk)
    }

    pub fn get(&self, tile_x: i32, tile_y: i32) -> Option<&Chunk> {
        self.chunks.get(&ChunkKey::for_tile(tile_x, tile_y))
    }

    pub fn get_by_key(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

/// Sparse per-layer tile storage. Chunks live until the store is cleared.
#[derive(Debug, Default, Clone)]
pub struct LayeredChunkStore {
    background: ChunkStore,
    foreground: ChunkStore,
    animated: ChunkStore,
}

impl LayeredChunkStore {
    pub fn layer(&self, layer: Layer) -> &ChunkStore {
        match layer {
            Layer::Background => &self.background,
            Layer::Foreground => &self.foreground,
            Layer::Animated => &self.animated,
        }
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut ChunkStore {
        match layer {
            Layer::Background => &mut self.background,
            Layer::Foreground => &mut self.foreground,
            Layer::Animated => &mut self.animated,
        }
    }

    /// Stores the chunk at `(origin_x, origin_y)`, replacing any previous one.
    pub fn insert_chunk(
        &mut self,
        layer: Layer,
        origin_x: i32,
        origin_y: i32,
        tiles: Vec<TileId>,
    ) -> Result<(), ChunkError> {
        let chunk = Chunk::new(origin_x, origin_y, tiles)?;
        self.layer_mut(layer).insert(chunk);
        Ok(())
    }

    pub fn insert(&mut self, layer: Layer, chunk: Chunk) -> Option<Chunk> {
        self.layer_mut(layer).insert(chunk)
    }

    pub fn get_chunk(&self, layer: Layer, tile_x: i32, tile_y: i32) -> Option<&Chunk> {
        self.layer(layer).get(tile_x, tile_y)
    }

    /// Unloaded tiles read as the empty tile.
    pub fn tile_at(&self, layer: Layer, tile_x: i32, tile_y: i32) -> TileId {
        self.get_chunk(layer, tile_x, tile_y)
            .and_then(|chunk| chunk.tile_at(tile_x, tile_y))
            .unwrap_or(EMPTY_TILE)
    }

    pub fn chunk_count(&self) -> usize {
        Layer::ALL
            .iter()
            .map(|layer| self.layer(*layer).len())
            .sum()
    }

    pub fn clear(&mut self) {
        for layer in Layer::ALL {
            self.layer_mut(layer).clear();
        }
    }
}
