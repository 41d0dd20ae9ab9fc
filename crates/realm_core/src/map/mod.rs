mod chunk;
mod loader;
mod window;

pub use chunk::{Chunk, ChunkError, ChunkStore, Layer, LayeredChunkStore};
pub use loader::{
    load_world_file, parse_world, populate_store, ChunkRecord, LayerData, LoadSummary, WorldData,
    WorldLoadError,
};
pub use window::{
    extract_window, ScreenWindow, WindowRequest, DEFAULT_VIEW_BIAS, UPDATE_WINDOW_FACTOR,
};
