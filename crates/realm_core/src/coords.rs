/// Edge length of a tile chunk, in tiles.
pub const CHUNK_SIZE: i32 = 32;
pub const DEFAULT_TILE_SIZE_PX: f32 = 32.0;

pub const ZOOM_DEFAULT: f32 = 1.0;
pub const ZOOM_MIN: f32 = 0.5;
pub const ZOOM_MAX: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.25;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance_sq(self, other: Vec2) -> f32 {
        Vec2::new(self.x - other.x, self.y - other.y).length_sq()
    }

    pub fn scaled(self, factor: f32) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Pixel size of one tile at the current zoom.
///
/// Zoom changes at runtime, so the scaled size is recomputed on every call to
/// [`TileScale::scaled_tile_size`] instead of being cached by callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileScale {
    base_tile_size: f32,
    zoom: f32,
}

impl Default for TileScale {
    fn default() -> Self {
        Self {
            base_tile_size: DEFAULT_TILE_SIZE_PX,
            zoom: ZOOM_DEFAULT,
        }
    }
}

impl TileScale {
    pub fn new(base_tile_size: f32, zoom: f32) -> Self {
        let base_tile_size = if base_tile_size.is_finite() && base_tile_size > 0.0 {
            base_tile_size
        } else {
            DEFAULT_TILE_SIZE_PX
        };
        Self {
            base_tile_size,
            zoom: clamp_zoom(zoom),
        }
    }

    pub fn base_tile_size(&self) -> f32 {
        self.base_tile_size
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn scaled_tile_size(&self) -> f32 {
        self.base_tile_size * self.zoom
    }

    pub fn set_zoom_clamped(&mut self, zoom: f32) {
        self.zoom = clamp_zoom(zoom);
    }

    pub fn apply_zoom_steps(&mut self, steps: i32) {
        if steps == 0 {
            return;
        }
        self.set_zoom_clamped(self.zoom + steps as f32 * ZOOM_STEP);
    }
}

fn clamp_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() {
        return ZOOM_DEFAULT;
    }
    zoom.clamp(ZOOM_MIN, ZOOM_MAX)
}

pub fn world_to_tile(pixel: f32, scale: &TileScale) -> i32 {
    (pixel / scale.scaled_tile_size()).floor() as i32
}

/// Fractional tile-space position of a pixel coordinate.
pub fn world_to_tile_f(pixel: f32, scale: &TileScale) -> f32 {
    pixel / scale.scaled_tile_size()
}

pub fn world_to_tile_pos(pixel: Vec2, scale: &TileScale) -> Vec2 {
    Vec2::new(world_to_tile_f(pixel.x, scale), world_to_tile_f(pixel.y, scale))
}

/// Pixel coordinate of the top-left corner of `tile`.
pub fn tile_to_world_px(tile: i32, scale: &TileScale) -> f32 {
    tile as f32 * scale.scaled_tile_size()
}

pub fn tile_center_px(tile: i32, scale: &TileScale) -> f32 {
    (tile as f32 + 0.5) * scale.scaled_tile_size()
}

pub fn tile_pos_to_world(tile_pos: Vec2, scale: &TileScale) -> Vec2 {
    tile_pos.scaled(scale.scaled_tile_size())
}

/// Origin of the chunk containing `tile`. Uses floor-mod so negative tiles land
/// in the chunk below them (`-5` maps to `-32`, never `0`).
pub fn tile_to_chunk_origin(tile: i32, chunk_size: i32) -> i32 {
    tile - tile.rem_euclid(chunk_size)
}

/// Key of a tile chunk: the world-tile origin of its top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub origin_x: i32,
    pub origin_y: i32,
}

impl ChunkKey {
    pub fn for_tile(tile_x: i32, tile_y: i32) -> Self {
        Self {
            origin_x: tile_to_chunk_origin(tile_x, CHUNK_SIZE),
            origin_y: tile_to_chunk_origin(tile_y, CHUNK_SIZE),
        }
    }

    pub fn is_aligned(origin_x: i32, origin_y: i32) -> bool {
        origin_x.rem_euclid(CHUNK_SIZE) == 0 && origin_y.rem_euclid(CHUNK_SIZE) == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Camera position in world pixels; the camera sits at the viewport center.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
}

impl Camera2D {
    pub fn follow(&mut self, displacement: Vec2) {
        self.position = self.position + displacement;
    }
}

/// Canvas coordinates grow right and down, same as world pixels.
pub fn world_to_screen_px(world: Vec2, camera: &Camera2D, viewport: Viewport) -> (i32, i32) {
    let x = world.x - camera.position.x + viewport.width as f32 * 0.5;
    let y = world.y - camera.position.y + viewport.height as f32 * 0.5;
    (x.round() as i32, y.round() as i32)
}

pub fn screen_to_world_px(screen: Vec2, camera: &Camera2D, viewport: Viewport) -> Vec2 {
    Vec2 {
        x: screen.x - viewport.width as f32 * 0.5 + camera.position.x,
        y: screen.y - viewport.height as f32 * 0.5 + camera.position.y,
    }
}
