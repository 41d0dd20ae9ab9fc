//! Tile collision for moving actors.
//!
//! Callers apply the full move first, ask [`resolve_collision`] which axes hit
//! something, then roll those axes back and apply the slide. This is not a swept
//! test: a displacement larger than a tile per tick can tunnel through a
//! one-tile wall.

use crate::coords::Vec2;
use crate::map::ScreenWindow;
use crate::tiles::TileRegistry;

pub const DEFAULT_PLAYER_RADIUS: f32 = 0.45;
pub const DEFAULT_CHECK_RADIUS: i32 = 1;
pub const DEFAULT_DIAGONAL_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionParams {
    /// Actor radius in tiles.
    pub player_radius: f32,
    /// Cells scanned around the actor's tile, per axis.
    pub check_radius: i32,
    pub diagonal_epsilon: f32,
}

impl Default for CollisionParams {
    fn default() -> Self {
        Self {
            player_radius: DEFAULT_PLAYER_RADIUS,
            check_radius: DEFAULT_CHECK_RADIUS,
            diagonal_epsilon: DEFAULT_DIAGONAL_EPSILON,
        }
    }
}

/// Positions are fractional tile coordinates of the actor's center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionInput {
    pub previous: Vec2,
    pub current: Vec2,
    /// Tiles per tick.
    pub move_speed: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionOutcome {
    pub blocked_x: bool,
    pub blocked_y: bool,
    /// Displacement from the pre-move position along the free axis, in tiles.
    pub slide: Option<Vec2>,
    /// Tile that produced the block.
    pub obstacle: Option<(i32, i32)>,
}

impl CollisionOutcome {
    pub fn is_blocked(&self) -> bool {
        self.blocked_x || self.blocked_y
    }
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    tile_x: i32,
    tile_y: i32,
    center: Vec2,
    distance_sq: f32,
}

/// Only the nearest non-walkable tile decides the blocked axis. Tiles the actor
/// is moving away from are ignored so an overlapping actor can always back out.
pub fn resolve_collision(
    input: &CollisionInput,
    window: &ScreenWindow,
    registry: &TileRegistry,
    params: &CollisionParams,
) -> CollisionOutcome {
    let reach = params.player_radius + 0.5;
    let reach_sq = reach * reach;
    let tile_x = input.current.x.floor() as i32;
    let tile_y = input.current.y.floor() as i32;
    let radius = params.check_radius.max(0);

    let mut nearest: Option<Hit> = None;
    for cell_y in tile_y.saturating_sub(radius)..=tile_y.saturating_add(radius) {
        for cell_x in tile_x.saturating_sub(radius)..=tile_x.saturating_add(radius) {
            let Some(tile_id) = window.get(cell_x, cell_y) else {
                continue;
            };
            if registry.is_walkable(tile_id) {
                continue;
            }
            let center = Vec2::new(cell_x as f32 + 0.5, cell_y as f32 + 0.5);
            let distance_sq = input.current.distance_sq(center);
            if distance_sq >= reach_sq || distance_sq >= input.previous.distance_sq(center) {
                continue;
            }
            if nearest.map_or(true, |hit| distance_sq < hit.distance_sq) {
                nearest = Some(Hit {
                    tile_x: cell_x,
                    tile_y: cell_y,
                    center,
                    distance_sq,
                });
            }
        }
    }

    let Some(hit) = nearest else {
        return CollisionOutcome::default();
    };

    let dx = input.current.x - hit.center.x;
    let dy = input.current.y - hit.center.y;
    let horizontal = dx.abs() >= dy.abs();

    let moved = input.current - input.previous;
    let diagonal =
        moved.x.abs() > params.diagonal_epsilon && moved.y.abs() > params.diagonal_epsilon;
    let slide = diagonal.then(|| {
        if horizontal {
            Vec2::new(0.0, axis_sign(moved.y) * input.move_speed)
        } else {
            Vec2::new(axis_sign(moved.x) * input.move_speed, 0.0)
        }
    });

    CollisionOutcome {
        blocked_x: horizontal,
        blocked_y: !horizontal,
        slide,
        obstacle: Some((hit.tile_x, hit.tile_y)),
    }
}

fn axis_sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
