use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::coords::CHUNK_SIZE;
use crate::tiles::TileId;

use super::chunk::{Chunk, ChunkError, Layer, LayeredChunkStore};

/// Tiled stores flip/rotation flags in the top bits of each gid.
const GID_FLAG_MASK: u32 = 0x1FFF_FFFF;

#[derive(Debug, Error)]
pub enum WorldLoadError {
    #[error("failed to read world file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse world data at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(
        "layer '{layer}' chunk at ({x}, {y}) is {width}x{height} with {actual} tiles, expected {side}x{side}",
        side = CHUNK_SIZE
    )]
    ChunkShape {
        layer: String,
        x: i32,
        y: i32,
        width: usize,
        height: usize,
        actual: usize,
    },
    #[error("layer '{layer}' chunk at ({x}, {y}) rejected: {source}")]
    Chunk {
        layer: String,
        x: i32,
        y: i32,
        #[source]
        source: ChunkError,
    },
}

/// Infinite-map export: a list of named layers, each made of chunk records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldData {
    #[serde(default)]
    pub layers: Vec<LayerData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerData {
    pub name: String,
    #[serde(default)]
    pub chunks: Vec<ChunkRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub data: Vec<u32>,
    pub width: usize,
    pub height: usize,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub layers_loaded: usize,
    pub layers_skipped: usize,
    pub chunks_loaded: usize,
}

pub fn parse_world(raw: &str) -> Result<WorldData, WorldLoadError> {
    let deserializer = &mut serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(deserializer).map_err(|error| WorldLoadError::Parse {
        path: error.path().to_string(),
        source: error.into_inner(),
    })
}

pub fn load_world_file(path: &Path) -> Result<WorldData, WorldLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| WorldLoadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_world(&raw)
}

/// Converts every classified layer into chunks. Layers whose names match no known
/// layer are dropped with a warning. Chunks are validated before anything is
/// inserted, so a rejected world leaves the store untouched.
pub fn populate_store(
    store: &mut LayeredChunkStore,
    world: &WorldData,
) -> Result<LoadSummary, WorldLoadError> {
    let mut staged = Vec::<(Layer, Chunk)>::new();
    let mut summary = LoadSummary::default();

    for layer_data in &world.layers {
        let Some(layer) = Layer::classify(&layer_data.name) else {
            warn!(layer = %layer_data.name, "world_layer_unclassified");
            summary.layers_skipped += 1;
            continue;
        };

        for record in &layer_data.chunks {
            let tiles = record_to_tiles(&layer_data.name, record)?;
            let chunk =
                Chunk::new(record.x, record.y, tiles).map_err(|source| WorldLoadError::Chunk {
                    layer: layer_data.name.clone(),
                    x: record.x,
                    y: record.y,
                    source,
                })?;
            staged.push((layer, chunk));
        }

        info!(
            layer = %layer_data.name,
            kind = layer.as_token(),
            chunk_count = layer_data.chunks.len(),
            "world_layer_loaded"
        );
        summary.layers_loaded += 1;
    }

    summary.chunks_loaded = staged.len();
    for (layer, chunk) in staged {
        store.insert(layer, chunk);
    }

    Ok(summary)
}

/// Row-major, exactly `CHUNK_SIZE` tiles wide and tall.
fn record_to_tiles(layer: &str, record: &ChunkRecord) -> Result<Vec<TileId>, WorldLoadError> {
    let side = CHUNK_SIZE as usize;
    if record.width != side || record.height != side || record.data.len() != side * side {
        return Err(WorldLoadError::ChunkShape {
            layer: layer.to_string(),
            x: record.x,
            y: record.y,
            width: record.width,
            height: record.height,
            actual: record.data.len(),
        });
    }
    Ok(record.data.iter().map(|gid| gid & GID_FLAG_MASK).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIDE: usize = CHUNK_SIZE as usize;

    fn chunk_json(x: i32, y: i32, fill: u32) -> serde_json::Value {
        serde_json::json!({
            "data": vec![fill; SIDE * SIDE],
            "width": SIDE,
            "height": SIDE,
            "x": x,
            "y": y,
        })
    }

    #[test]
    fn loads_classified_layers_and_skips_unknown() {
        let raw = serde_json::json!({
            "layers": [
                { "name": "Background", "chunks": [chunk_json(0, 0, 1), chunk_json(32, 0, 1)] },
                { "name": "Foreground_walls", "chunks": [chunk_json(0, 0, 2)] },
                { "name": "objects", "chunks": [chunk_json(0, 0, 3)] },
                { "name": "animated water", "chunks": [] }
            ]
        })
        .to_string();
        let world = parse_world(&raw).expect("parse");
        let mut store = LayeredChunkStore::default();
        let summary = populate_store(&mut store, &world).expect("populate");

        assert_eq!(
            summary,
            LoadSummary {
                layers_loaded: 3,
                layers_skipped: 1,
                chunks_loaded: 3
            }
        );
        assert_eq!(store.tile_at(Layer::Background, 40, 5), 1);
        assert_eq!(store.tile_at(Layer::Foreground, 5, 5), 2);
        assert_eq!(store.tile_at(Layer::Foreground, 40, 5), 0);
    }

    #[test]
    fn flip_flags_are_stripped_from_gids() {
        let mut record = chunk_json(0, 0, 0);
        record["data"][1] = serde_json::json!(0x8000_0005u32);
        let raw = serde_json::json!({ "layers": [{ "name": "foreground", "chunks": [record] }] })
            .to_string();
        let world = parse_world(&raw).expect("parse");
        let mut store = LayeredChunkStore::default();
        populate_store(&mut store, &world).expect("populate");
        assert_eq!(store.tile_at(Layer::Foreground, 1, 0), 5);
    }

    #[test]
    fn parse_error_reports_json_path() {
        let raw = r#"{"layers":[{"name":"foreground","chunks":[{"data":[1],"width":"wide","height":1,"x":0,"y":0}]}]}"#;
        match parse_world(raw).expect_err("should fail") {
            WorldLoadError::Parse { path, .. } => assert_eq!(path, "layers[0].chunks[0].width"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_chunk_leaves_store_untouched() {
        let raw = serde_json::json!({
            "layers": [
                { "name": "foreground", "chunks": [chunk_json(0, 0, 1)] },
                { "name": "background", "chunks": [{ "data": [1, 2, 3], "width": 2, "height": 2, "x": 0, "y": 0 }] }
            ]
        })
        .to_string();
        let world = parse_world(&raw).expect("parse");
        let mut store = LayeredChunkStore::default();
        let error = populate_store(&mut store, &world).expect_err("should fail");
        assert!(matches!(error, WorldLoadError::ChunkShape { actual: 3, .. }));
        assert_eq!(store.chunk_count(), 0);
    }

    #[test]
    fn non_square_chunk_with_full_tile_count_is_rejected() {
        let mut data = vec![1u32; SIDE * SIDE];
        data[16] = 9;
        let raw = serde_json::json!({
            "layers": [{
                "name": "foreground",
                "chunks": [{ "data": data, "width": 16, "height": 64, "x": 0, "y": 0 }]
            }]
        })
        .to_string();
        let world = parse_world(&raw).expect("parse");
        let mut store = LayeredChunkStore::default();
        let error = populate_store(&mut store, &world).expect_err("should fail");
        assert!(matches!(
            error,
            WorldLoadError::ChunkShape {
                width: 16,
                height: 64,
                actual: 1024,
                ..
            }
        ));
        assert_eq!(store.chunk_count(), 0);
    }

    #[test]
    fn misaligned_chunk_is_rejected() {
        let raw = serde_json::json!({
            "layers": [{ "name": "foreground", "chunks": [chunk_json(16, 0, 1)] }]
        })
        .to_string();
        let world = parse_world(&raw).expect("parse");
        let mut store = LayeredChunkStore::default();
        let error = populate_store(&mut store, &world).expect_err("should fail");
        assert!(matches!(
            error,
            WorldLoadError::Chunk {
                source: ChunkError::Misaligned { .. },
                ..
            }
        ));
    }
}
