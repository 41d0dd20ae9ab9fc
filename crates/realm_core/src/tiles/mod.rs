mod registry;
mod tileset;

pub use registry::{DrawableHandle, TileDescriptor, TileProps, TileRegistry};
pub use tileset::{
    load_tileset_file, parse_tileset, Tileset, TilesetError, MAX_TILESET_TILES,
};

/// Global tile id. Tilesets are concatenated by their `firstgid`; 0 is "no tile".
pub type TileId = u32;

pub const EMPTY_TILE: TileId = 0;
