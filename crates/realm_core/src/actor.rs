use serde::{Deserialize, Serialize};

use crate::collision::{resolve_collision, CollisionInput, CollisionOutcome, CollisionParams};
use crate::combat::SkillBook;
use crate::coords::{tile_pos_to_world, world_to_tile_pos, TileScale, Vec2};
use crate::entities::{EntityKind, EntityRef, Spatial};
use crate::map::ScreenWindow;
use crate::tiles::TileRegistry;

pub const DEFAULT_MAX_HP: f32 = 100.0;
/// Tiles per tick.
pub const DEFAULT_MOVE_SPEED: f32 = 0.1;
pub const DEFAULT_WANDER_PERIOD_TICKS: u64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderState {
    #[default]
    Idle,
    Walk,
    Attack,
    Dead,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActorState {
    #[default]
    Alive,
    Defeated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorStats {
    pub max_hp: f32,
    pub defense: f32,
    pub damage: f32,
    /// Tiles per tick.
    pub move_speed: f32,
}

impl Default for ActorStats {
    fn default() -> Self {
        Self {
            max_hp: DEFAULT_MAX_HP,
            defense: 0.0,
            damage: 10.0,
            move_speed: DEFAULT_MOVE_SPEED,
        }
    }
}

/// Held movement keys. Screen y points down, so `up` is negative y.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveIntent {
    pub const NONE: MoveIntent = MoveIntent {
        up: false,
        down: false,
        left: false,
        right: false,
    };

    /// Intent pointing along `delta`, one key per axis. Axes shorter than
    /// `dead_zone` are left released.
    pub fn toward(delta: Vec2, dead_zone: f32) -> Self {
        Self {
            up: delta.y < -dead_zone,
            down: delta.y > dead_zone,
            left: delta.x < -dead_zone,
            right: delta.x > dead_zone,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.direction() == Vec2::ZERO
    }

    /// Unit vector of the held keys; opposing keys cancel.
    pub fn direction(&self) -> Vec2 {
        let mut x = 0.0f32;
        let mut y = 0.0f32;
        if self.right {
            x += 1.0;
        }
        if self.left {
            x -= 1.0;
        }
        if self.down {
            y += 1.0;
        }
        if self.up {
            y -= 1.0;
        }

        let len_sq = x * x + y * y;
        if len_sq > 0.0 {
            let inv_len = len_sq.sqrt().recip();
            x *= inv_len;
            y *= inv_len;
        }
        Vec2::new(x, y)
    }

    /// Horizontal wins on diagonals.
    pub fn facing(&self) -> Option<Direction> {
        let direction = self.direction();
        if direction == Vec2::ZERO {
            None
        } else if direction.x.abs() >= direction.y.abs() {
            Some(if direction.x > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            })
        } else {
            Some(if direction.y > 0.0 {
                Direction::Down
            } else {
                Direction::Up
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    /// World pixels.
    pub position: Vec2,
    pub previous_position: Vec2,
    pub hp: f32,
    pub stats: ActorStats,
    pub direction: Direction,
    pub render_state: RenderState,
    pub state: ActorState,
    /// Weak reference, resolved through the entity index.
    pub target: Option<EntityRef>,
    pub intent: MoveIntent,
}

impl Actor {
    pub fn new(id: ActorId, name: impl Into<String>, position: Vec2, stats: ActorStats) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            previous_position: position,
            hp: stats.max_hp,
            stats,
            direction: Direction::default(),
            render_state: RenderState::Idle,
            state: ActorState::Alive,
            target: None,
            intent: MoveIntent::NONE,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == ActorState::Alive && self.hp > 0.0
    }

    pub fn hp_fraction(&self) -> f32 {
        if self.stats.max_hp <= 0.0 {
            return 0.0;
        }
        (self.hp / self.stats.max_hp).clamp(0.0, 1.0)
    }

    pub fn tile_position(&self, scale: &TileScale) -> Vec2 {
        world_to_tile_pos(self.position, scale)
    }

    /// Moves to a pixel position outside of collision (teleport, delta sync).
    pub fn place_at(&mut self, position: Vec2) {
        self.previous_position = self.position;
        self.position = position;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub actor: Actor,
    pub skills: SkillBook,
}

impl Player {
    pub fn new(actor: Actor) -> Self {
        Self {
            actor,
            skills: SkillBook::default(),
        }
    }
}

impl Spatial for Player {
    type Id = ActorId;
    const KIND: EntityKind = EntityKind::Player;

    fn id(&self) -> ActorId {
        self.actor.id
    }

    fn position(&self) -> Vec2 {
        self.actor.position
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobMode {
    Wander,
    Chase,
    Flee,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobBehavior {
    pub chase_radius_tiles: f32,
    /// At or below this HP fraction a mob within chase range runs away instead.
    pub flee_hp_fraction: f32,
    pub wander_period_ticks: u64,
    pub mode: MobMode,
}

impl Default for MobBehavior {
    fn default() -> Self {
        Self {
            chase_radius_tiles: 6.0,
            flee_hp_fraction: 0.25,
            wander_period_ticks: DEFAULT_WANDER_PERIOD_TICKS,
            mode: MobMode::Wander,
        }
    }
}

const WANDER_CYCLE: [MoveIntent; 5] = [
    MoveIntent::NONE,
    MoveIntent {
        right: true,
        ..MoveIntent::NONE
    },
    MoveIntent {
        down: true,
        ..MoveIntent::NONE
    },
    MoveIntent {
        left: true,
        ..MoveIntent::NONE
    },
    MoveIntent {
        up: true,
        ..MoveIntent::NONE
    },
];

impl MobBehavior {
    /// `distance_tiles` is `None` when no player is around.
    pub fn select(&self, distance_tiles: Option<f32>, hp_fraction: f32) -> MobMode {
        match distance_tiles {
            Some(distance) if distance <= self.chase_radius_tiles => {
                if hp_fraction <= self.flee_hp_fraction {
                    MobMode::Flee
                } else {
                    MobMode::Chase
                }
            }
            _ => MobMode::Wander,
        }
    }

    /// Movement for `mode`. Wandering walks a fixed per-id cycle so runs are
    /// reproducible.
    pub fn intent_for(
        &self,
        mode: MobMode,
        mob_id: ActorId,
        mob_tile: Vec2,
        player_tile: Option<Vec2>,
        tick: u64,
    ) -> MoveIntent {
        const DEAD_ZONE: f32 = 0.25;
        match (mode, player_tile) {
            (MobMode::Chase, Some(player)) => MoveIntent::toward(player - mob_tile, DEAD_ZONE),
            (MobMode::Flee, Some(player)) => MoveIntent::toward(mob_tile - player, DEAD_ZONE),
            _ => {
                let period = self.wander_period_ticks.max(1);
                let phase = (tick / period).wrapping_add(mob_id.0) % WANDER_CYCLE.len() as u64;
                WANDER_CYCLE[phase as usize]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mob {
    pub actor: Actor,
    pub behavior: MobBehavior,
    /// Spawn point, world pixels.
    pub home: Vec2,
}

impl Mob {
    pub fn new(actor: Actor, behavior: MobBehavior) -> Self {
        let home = actor.position;
        Self {
            actor,
            behavior,
            home,
        }
    }
}

impl Spatial for Mob {
    type Id = ActorId;
    const KIND: EntityKind = EntityKind::Mob;

    fn id(&self) -> ActorId {
        self.actor.id
    }

    fn position(&self) -> Vec2 {
        self.actor.position
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Net pixel movement this tick, for camera follow.
    pub displacement: Vec2,
    pub collision: CollisionOutcome,
}

/// Moves `actor` one tick along its intent.
///
/// The full move is applied tentatively, blocked axes are rolled back to the
/// pre-move position, and a diagonal move that hit something slides along the
/// free axis instead, unless the slide itself runs into a wall on that axis.
pub fn step_actor(
    actor: &mut Actor,
    window: &ScreenWindow,
    registry: &TileRegistry,
    scale: &TileScale,
    params: &CollisionParams,
) -> StepReport {
    actor.previous_position = actor.position;
    if !actor.is_alive() {
        actor.render_state = RenderState::Dead;
        return StepReport::default();
    }

    let direction = actor.intent.direction();
    if direction == Vec2::ZERO {
        actor.render_state = RenderState::Idle;
        return StepReport::default();
    }
    if let Some(facing) = actor.intent.facing() {
        actor.direction = facing;
    }

    let move_speed = actor.stats.move_speed;
    let previous = world_to_tile_pos(actor.position, scale);
    let tentative = previous + direction.scaled(move_speed);
    let collision = resolve_collision(
        &CollisionInput {
            previous,
            current: tentative,
            move_speed,
        },
        window,
        registry,
        params,
    );

    let resolved = match collision.slide {
        Some(slide) if slide_is_clear(previous, slide, move_speed, window, registry, params) => {
            previous + slide
        }
        Some(_) => previous,
        None => Vec2::new(
            if collision.blocked_x { previous.x } else { tentative.x },
            if collision.blocked_y { previous.y } else { tentative.y },
        ),
    };

    let new_position = if resolved == previous {
        actor.position
    } else {
        tile_pos_to_world(resolved, scale)
    };
    let displacement = new_position - actor.position;
    actor.position = new_position;
    actor.render_state = if displacement == Vec2::ZERO {
        RenderState::Idle
    } else {
        RenderState::Walk
    };

    StepReport {
        displacement,
        collision,
    }
}

fn slide_is_clear(
    previous: Vec2,
    slide: Vec2,
    move_speed: f32,
    window: &ScreenWindow,
    registry: &TileRegistry,
    params: &CollisionParams,
) -> bool {
    let check = resolve_collision(
        &CollisionInput {
            previous,
            current: previous + slide,
            move_speed,
        },
        window,
        registry,
        params,
    );
    if slide.x != 0.0 {
        !check.blocked_x
    } else {
        !check.blocked_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CHUNK_SIZE;
    use crate::map::{extract_window, Layer, LayeredChunkStore, WindowRequest};
    use crate::tiles::{TileDescriptor, TileId, TileProps};

    const WALL: TileId = 2;

    fn registry() -> TileRegistry {
        TileRegistry::from_descriptors([
            TileDescriptor::new(1, "grass", TileProps::default()),
            TileDescriptor::new(
                WALL,
                "wall",
                TileProps {
                    is_walkable: false,
                    ..TileProps::default()
                },
            ),
        ])
    }

    fn store_with_walls(walls: impl IntoIterator<Item = (i32, i32)>) -> LayeredChunkStore {
        let mut tiles = vec![1; (CHUNK_SIZE * CHUNK_SIZE) as usize];
        for (x, y) in walls {
            tiles[(y * CHUNK_SIZE + x) as usize] = WALL;
        }
        let mut store = LayeredChunkStore::default();
        store
            .insert_chunk(Layer::Foreground, 0, 0, tiles)
            .expect("insert");
        store
    }

    fn step(actor: &mut Actor, store: &LayeredChunkStore, scale: &TileScale) -> StepReport {
        let params = CollisionParams::default();
        let window = extract_window(
            store,
            Layer::Foreground,
            &WindowRequest::around_actor(actor.tile_position(scale), params.check_radius),
        );
        step_actor(actor, &window, &registry(), scale, &params)
    }

    fn actor_at_tile(x: f32, y: f32, scale: &TileScale) -> Actor {
        Actor::new(
            ActorId(1),
            "hero",
            tile_pos_to_world(Vec2::new(x, y), scale),
            ActorStats::default(),
        )
    }

    #[test]
    fn diagonal_intent_is_normalized() {
        let intent = MoveIntent {
            up: true,
            right: true,
            ..MoveIntent::NONE
        };
        let direction = intent.direction();
        assert!((direction.length_sq() - 1.0).abs() < 1e-6);
        assert!(direction.x > 0.0 && direction.y < 0.0);
        assert_eq!(intent.facing(), Some(Direction::Right));

        let cancelled = MoveIntent {
            left: true,
            right: true,
            ..MoveIntent::NONE
        };
        assert!(cancelled.is_idle());
    }

    #[test]
    fn open_ground_moves_full_speed_and_walks() {
        let scale = TileScale::default();
        let store = store_with_walls([]);
        let mut actor = actor_at_tile(10.5, 10.5, &scale);
        actor.intent.right = true;

        let report = step(&mut actor, &store, &scale);
        assert!((report.displacement.x - 0.1 * 32.0).abs() < 1e-3);
        assert_eq!(report.displacement.y, 0.0);
        assert_eq!(actor.render_state, RenderState::Walk);
        assert_eq!(actor.direction, Direction::Right);
    }

    #[test]
    fn straight_wall_restores_blocked_axis() {
        let scale = TileScale::default();
        let store = store_with_walls([(12, 10)]);
        let mut actor = actor_at_tile(11.5, 10.5, &scale);
        actor.intent.right = true;
        let start = actor.position;

        let report = step(&mut actor, &store, &scale);
        assert!(report.collision.blocked_x);
        assert_eq!(actor.position, start);
        assert_eq!(report.displacement, Vec2::ZERO);
        assert_eq!(actor.render_state, RenderState::Idle);
    }

    #[test]
    fn diagonal_against_wall_column_slides_at_full_speed() {
        let scale = TileScale::default();
        let store = store_with_walls((0..CHUNK_SIZE).map(|y| (5, y)));
        let mut actor = actor_at_tile(4.7, 2.5, &scale);
        actor.intent.right = true;
        actor.intent.down = true;
        let speed = actor.stats.move_speed;

        for tick in 1..=8 {
            let report = step(&mut actor, &store, &scale);
            assert!(report.collision.blocked_x, "tick {tick}");
            let tile = actor.tile_position(&scale);
            assert!((tile.x - 4.7).abs() < 1e-4, "tick {tick}: x drifted to {}", tile.x);
            assert!(
                (tile.y - (2.5 + speed * tick as f32)).abs() < 1e-3,
                "tick {tick}: y = {}",
                tile.y
            );
        }
    }

    #[test]
    fn slide_into_corner_stops() {
        let scale = TileScale::default();
        let mut walls = (0..8).map(|y| (5, y)).collect::<Vec<_>>();
        walls.push((4, 3));
        let store = store_with_walls(walls);
        let mut actor = actor_at_tile(4.7, 2.7, &scale);
        actor.intent.right = true;
        actor.intent.down = true;
        let start = actor.position;

        step(&mut actor, &store, &scale);
        assert_eq!(actor.position, start);
    }

    #[test]
    fn dead_actor_does_not_move() {
        let scale = TileScale::default();
        let store = store_with_walls([]);
        let mut actor = actor_at_tile(3.5, 3.5, &scale);
        actor.intent.left = true;
        actor.state = ActorState::Defeated;

        let report = step(&mut actor, &store, &scale);
        assert_eq!(report.displacement, Vec2::ZERO);
        assert_eq!(actor.render_state, RenderState::Dead);
    }

    #[test]
    fn behavior_selects_by_distance_and_health() {
        let behavior = MobBehavior::default();
        assert_eq!(behavior.select(None, 1.0), MobMode::Wander);
        assert_eq!(behavior.select(Some(10.0), 1.0), MobMode::Wander);
        assert_eq!(behavior.select(Some(3.0), 1.0), MobMode::Chase);
        assert_eq!(behavior.select(Some(3.0), 0.2), MobMode::Flee);
    }

    #[test]
    fn chase_and_flee_point_relative_to_player() {
        let behavior = MobBehavior::default();
        let mob = Vec2::new(5.0, 5.0);
        let player = Some(Vec2::new(8.0, 5.1));
        let chase = behavior.intent_for(MobMode::Chase, ActorId(3), mob, player, 0);
        assert_eq!(
            chase,
            MoveIntent {
                right: true,
                ..MoveIntent::NONE
            }
        );
        let flee = behavior.intent_for(MobMode::Flee, ActorId(3), mob, player, 0);
        assert_eq!(
            flee,
            MoveIntent {
                left: true,
                ..MoveIntent::NONE
            }
        );
    }

    #[test]
    fn wander_cycle_is_deterministic_per_id() {
        let behavior = MobBehavior {
            wander_period_ticks: 10,
            ..MobBehavior::default()
        };
        let at = |id: u64, tick: u64| {
            behavior.intent_for(MobMode::Wander, ActorId(id), Vec2::ZERO, None, tick)
        };
        assert_eq!(at(0, 0), MoveIntent::NONE);
        assert_eq!(at(0, 9), MoveIntent::NONE);
        assert!(at(0, 10).right);
        assert!(at(1, 0).right);
        assert_eq!(at(2, 25), at(2, 25));
    }
}
