use realm_core::{
    ActorStats, ChunkRecord, LayerData, TileDescriptor, TileId, TileProps, Vec2, WorldData,
    CHUNK_SIZE,
};

pub(crate) const GRASS: TileId = 1;
pub(crate) const WALL: TileId = 2;
pub(crate) const WATER: TileId = 3;

const SIDE: usize = CHUNK_SIZE as usize;
/// The demo room spans chunks `-1..=0` on both axes.
const ROOM_MIN: i32 = -CHUNK_SIZE;
const ROOM_MAX: i32 = CHUNK_SIZE - 1;

pub(crate) struct DemoSpawn {
    pub(crate) name: &'static str,
    pub(crate) tile: Vec2,
    pub(crate) stats: ActorStats,
}

pub(crate) fn tile_descriptors() -> Vec<TileDescriptor> {
    vec![
        TileDescriptor::new(GRASS, "grass", TileProps::default()),
        TileDescriptor::new(
            WALL,
            "stone_wall",
            TileProps {
                is_walkable: false,
                render_after: true,
                ..TileProps::default()
            },
        ),
        TileDescriptor::new(
            WATER,
            "water",
            TileProps {
                is_walkable: false,
                animated: true,
                ..TileProps::default()
            },
        ),
    ]
}

/// A walled room with a pillar row and a pond, split over four chunks so the
/// player crosses chunk seams.
pub(crate) fn world_data() -> WorldData {
    let origins = [
        (-CHUNK_SIZE, -CHUNK_SIZE),
        (0, -CHUNK_SIZE),
        (-CHUNK_SIZE, 0),
        (0, 0),
    ];
    let layer = |name: &str, tile: fn(i32, i32) -> TileId| LayerData {
        name: name.to_string(),
        chunks: origins
            .iter()
            .map(|(x, y)| chunk_record(*x, *y, tile))
            .collect(),
    };
    WorldData {
        layers: vec![
            layer("Background", |_, _| GRASS),
            layer("Foreground", foreground_tile),
            layer("Animated Water", water_tile),
        ],
    }
}

pub(crate) fn player_spawn() -> DemoSpawn {
    DemoSpawn {
        name: "hero",
        tile: Vec2::new(-4.5, -4.5),
        stats: ActorStats {
            max_hp: 120.0,
            defense: 2.0,
            damage: 12.0,
            ..ActorStats::default()
        },
    }
}

pub(crate) fn mob_spawns() -> Vec<DemoSpawn> {
    let slime = ActorStats {
        max_hp: 30.0,
        defense: 1.0,
        damage: 4.0,
        move_speed: 0.05,
    };
    [(-1.5, -6.5), (6.5, 3.5), (-12.5, 10.5), (20.5, -20.5)]
        .into_iter()
        .enumerate()
        .map(|(index, (x, y))| DemoSpawn {
            name: if index % 2 == 0 { "slime" } else { "bat" },
            tile: Vec2::new(x, y),
            stats: slime,
        })
        .collect()
}

fn chunk_record(origin_x: i32, origin_y: i32, tile: fn(i32, i32) -> TileId) -> ChunkRecord {
    let mut data = Vec::with_capacity(SIDE * SIDE);
    for local_y in 0..CHUNK_SIZE {
        for local_x in 0..CHUNK_SIZE {
            data.push(tile(origin_x + local_x, origin_y + local_y));
        }
    }
    ChunkRecord {
        data,
        width: SIDE,
        height: SIDE,
        x: origin_x,
        y: origin_y,
    }
}

fn foreground_tile(x: i32, y: i32) -> TileId {
    let border = x == ROOM_MIN || x == ROOM_MAX || y == ROOM_MIN || y == ROOM_MAX;
    let pillar = y == 0 && x % 4 == 0 && x.abs() < 24;
    if border || pillar {
        WALL
    } else if water_tile(x, y) != 0 {
        WATER
    } else {
        0
    }
}

fn water_tile(x: i32, y: i32) -> TileId {
    if (8..12).contains(&x) && (8..12).contains(&y) {
        WATER
    } else {
        0
    }
}
