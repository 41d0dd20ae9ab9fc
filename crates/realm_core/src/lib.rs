use thiserror::Error;

pub mod actor;
pub mod collision;
pub mod combat;
pub mod config;
pub mod coords;
pub mod entities;
pub mod map;
pub mod net;
pub mod tiles;
pub mod world;

pub use actor::{
    step_actor, Actor, ActorId, ActorState, ActorStats, Direction, Mob, MobBehavior, MobMode,
    MoveIntent, Player, RenderState, StepReport,
};
pub use collision::{resolve_collision, CollisionInput, CollisionOutcome, CollisionParams};
pub use combat::{SkillBook, SkillError};
pub use config::{ConfigError, EngineConfig};
pub use coords::{
    screen_to_world_px, tile_pos_to_world, tile_to_chunk_origin, world_to_screen_px,
    world_to_tile, world_to_tile_pos, Camera2D, ChunkKey, TileScale, Vec2, Viewport, CHUNK_SIZE,
};
pub use entities::{
    ActorTemplate, DeltaOutcome, EntityChunkKey, EntityKind, EntityManager, EntityRef,
    IndexError, ItemError, ItemId, ItemStack, SpatialIndex, UnitId,
};
pub use map::{
    extract_window, load_world_file, parse_world, populate_store, ChunkError, ChunkRecord, Layer,
    LayerData, LayeredChunkStore, LoadSummary, ScreenWindow, WindowRequest, WorldData,
    WorldLoadError,
};
pub use net::{DamageEvent, EntityDelta, NullNotifier, PeerEvent, PeerNotifier, RecordingNotifier};
pub use tiles::{
    load_tileset_file, parse_tileset, TileDescriptor, TileId, TileProps, TileRegistry, Tileset,
    TilesetError, EMPTY_TILE,
};
pub use world::{GameWorld, TickReport};

#[derive(Debug, Error)]
pub enum RealmError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    WorldLoad(#[from] WorldLoadError),
    #[error(transparent)]
    Tileset(#[from] TilesetError),
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Skill(#[from] SkillError),
    #[error("no item stack with id {id:?}")]
    UnknownItem { id: UnitId },
}
