use std::fs;
use std::path::Path;

use realm_core::{
    load_tileset_file, load_world_file, ChunkRecord, EngineConfig, GameWorld, Layer, LayerData,
    MoveIntent, RecordingNotifier, Vec2, WorldData, CHUNK_SIZE,
};

const GRASS: u32 = 1;
const WALL: u32 = 2;

const TERRAIN_TSX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" name="terrain" tilewidth="32" tileheight="32" tilecount="2" columns="2">
 <image source="terrain.png" width="64" height="32"/>
 <tile id="1">
  <properties>
   <property name="isWalkable" type="bool" value="false"/>
  </properties>
 </tile>
</tileset>"#;

/// Two foreground chunks side by side with a wall on both sides of the seam.
fn seam_world() -> WorldData {
    let chunk = |origin_x: i32, wall_x: i32| {
        let side = CHUNK_SIZE as usize;
        let mut data = vec![GRASS; side * side];
        for row in 0..side {
            data[row * side + (wall_x - origin_x) as usize] = WALL;
        }
        ChunkRecord {
            data,
            width: side,
            height: side,
            x: origin_x,
            y: 0,
        }
    };
    WorldData {
        layers: vec![
            LayerData {
                name: "Foreground".to_string(),
                chunks: vec![chunk(0, 31), chunk(CHUNK_SIZE, 32)],
            },
            LayerData {
                name: "Collision Debug".to_string(),
                chunks: Vec::new(),
            },
        ],
    }
}

fn write_fixtures(dir: &Path) {
    let world = serde_json::to_string_pretty(&seam_world()).expect("serialize world");
    fs::write(dir.join("seam.json"), world).expect("write world");
    fs::write(dir.join("terrain.tsx"), TERRAIN_TSX).expect("write tileset");
}

fn world_from_files(dir: &Path) -> GameWorld<RecordingNotifier> {
    let mut world = GameWorld::with_notifier(&EngineConfig::default(), RecordingNotifier::default());
    let tileset = load_tileset_file(&dir.join("terrain.tsx"), 1).expect("tileset");
    assert_eq!(world.load_tileset(tileset), 2);
    let data = load_world_file(&dir.join("seam.json")).expect("world");
    let summary = world.load_world(&data).expect("load");
    assert_eq!(summary.layers_loaded, 1);
    assert_eq!(summary.layers_skipped, 1);
    assert_eq!(summary.chunks_loaded, 2);
    world
}

#[test]
fn files_round_trip_into_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    let world = world_from_files(dir.path());

    assert_eq!(world.chunks().tile_at(Layer::Foreground, 31, 7), WALL);
    assert_eq!(world.chunks().tile_at(Layer::Foreground, 32, 7), WALL);
    assert_eq!(world.chunks().tile_at(Layer::Foreground, 30, 7), GRASS);
    assert_eq!(world.chunks().tile_at(Layer::Foreground, 64, 7), 0);
    assert!(!world.registry().is_walkable(WALL));
    assert!(world.registry().is_walkable(GRASS));
}

#[test]
fn actor_never_enters_the_seam_wall() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    let mut world = world_from_files(dir.path());
    world
        .spawn_player("hero", Vec2::new(29.5, 5.5), Default::default())
        .expect("spawn");
    world.set_player_intent(MoveIntent {
        right: true,
        ..MoveIntent::NONE
    });

    for _ in 0..60 {
        world.tick();
        let tile = world
            .player()
            .map(|player| player.actor.tile_position(world.scale()))
            .expect("player");
        assert!(tile.x < 30.6, "player reached x = {}", tile.x);
        assert!((tile.y - 5.5).abs() < 1e-3);
    }
    let last = world.notifier().events().len();
    world.tick();
    assert_eq!(world.notifier().events().len(), last, "blocked player still reported moving");
}

#[test]
fn actor_at_seam_row_zero_stays_out_of_tile_31() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    let mut world = world_from_files(dir.path());
    world
        .spawn_player("hero", Vec2::new(30.5, 0.5), Default::default())
        .expect("spawn");
    world.set_player_intent(MoveIntent {
        right: true,
        ..MoveIntent::NONE
    });

    for _ in 0..30 {
        world.tick();
        let tile = world
            .player()
            .map(|player| player.actor.tile_position(world.scale()))
            .expect("player");
        assert_eq!(tile.x.floor() as i32, 30, "player left tile 30 at x = {}", tile.x);
        assert!(tile.x + 0.45 < 31.05, "player overlaps the wall at x = {}", tile.x);
        assert!((tile.y - 0.5).abs() < 1e-3);
    }
}

#[test]
fn diagonal_move_slides_along_the_seam_wall() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    let mut world = world_from_files(dir.path());
    world
        .spawn_player("hero", Vec2::new(30.5, 5.5), Default::default())
        .expect("spawn");
    world.set_player_intent(MoveIntent {
        right: true,
        down: true,
        ..MoveIntent::NONE
    });

    for _ in 0..20 {
        world.tick();
    }
    let tile = world
        .player()
        .map(|player| player.actor.tile_position(world.scale()))
        .expect("player");
    assert!(tile.x < 30.75, "player reached x = {}", tile.x);
    assert!(tile.y > 6.5, "player did not slide, y = {}", tile.y);
}

#[test]
fn rejected_reload_keeps_the_previous_map() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixtures(dir.path());
    let mut world = world_from_files(dir.path());

    let mut broken = seam_world();
    broken.layers[0].chunks[1].x = 33;
    assert!(world.load_world(&broken).is_err());
    assert_eq!(world.chunks().chunk_count(), 2);
    assert_eq!(world.chunks().tile_at(Layer::Foreground, 32, 0), WALL);
}
