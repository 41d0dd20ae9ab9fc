use crate::coords::{tile_to_chunk_origin, ChunkKey, TileScale, Vec2, Viewport, CHUNK_SIZE};
use crate::tiles::{TileId, EMPTY_TILE};

use super::chunk::{Layer, LayeredChunkStore};

/// The update window covers this many viewports per axis.
pub const UPDATE_WINDOW_FACTOR: f32 = 3.0;
pub const DEFAULT_VIEW_BIAS: i32 = 2;

/// Rectangle to extract, centered on a focal tile position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowRequest {
    pub focus: Vec2,
    pub half_tiles_x: f32,
    pub half_tiles_y: f32,
    pub bias: i32,
}

impl WindowRequest {
    /// Viewport-sized window around `focus` (tile space), half extents rounded up.
    pub fn for_viewport(focus: Vec2, viewport: Viewport, scale: &TileScale, bias: i32) -> Self {
        let scaled = scale.scaled_tile_size();
        Self {
            focus,
            half_tiles_x: (viewport.width as f32 / scaled / 2.0).ceil(),
            half_tiles_y: (viewport.height as f32 / scaled / 2.0).ceil(),
            bias,
        }
    }

    /// Look-ahead window, `UPDATE_WINDOW_FACTOR` viewports wide.
    pub fn update_window(focus: Vec2, viewport: Viewport, scale: &TileScale, bias: i32) -> Self {
        let view = Self::for_viewport(focus, viewport, scale, bias);
        Self {
            half_tiles_x: (view.half_tiles_x * UPDATE_WINDOW_FACTOR).ceil(),
            half_tiles_y: (view.half_tiles_y * UPDATE_WINDOW_FACTOR).ceil(),
            ..view
        }
    }

    /// Small window for resolving one actor's collisions.
    pub fn around_actor(focus: Vec2, check_radius: i32) -> Self {
        Self {
            focus,
            half_tiles_x: check_radius as f32 + 1.0,
            half_tiles_y: check_radius as f32 + 1.0,
            bias: 0,
        }
    }

    /// Half-open tile bounds `(start_x, start_y, end_x, end_y)`. Positions past
    /// the `i32` tile range clamp to its edge.
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        let min_x = (self.focus.x - self.half_tiles_x).floor() as i32;
        let min_y = (self.focus.y - self.half_tiles_y).floor() as i32;
        let max_x = (self.focus.x + self.half_tiles_x).ceil() as i32;
        let max_y = (self.focus.y + self.half_tiles_y).ceil() as i32;
        let start_x = min_x.saturating_sub(self.bias);
        let start_y = min_y.saturating_sub(self.bias);
        let end_x = max_x.saturating_add(self.bias);
        let end_y = max_y.saturating_add(self.bias);
        (start_x, start_y, end_x.max(start_x), end_y.max(start_y))
    }
}

/// Dense tile ids for `[origin_x, origin_x + width) × [origin_y, origin_y + height)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenWindow {
    origin_x: i32,
    origin_y: i32,
    width: usize,
    height: usize,
    tiles: Vec<TileId>,
}

impl ScreenWindow {
    fn empty(origin_x: i32, origin_y: i32, width: usize, height: usize) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
            tiles: vec![EMPTY_TILE; width * height],
        }
    }

    pub fn origin_x(&self) -> i32 {
        self.origin_x
    }

    pub fn origin_y(&self) -> i32 {
        self.origin_y
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, tile_x: i32, tile_y: i32) -> bool {
        let local_x = i64::from(tile_x) - i64::from(self.origin_x);
        let local_y = i64::from(tile_y) - i64::from(self.origin_y);
        local_x >= 0
            && local_y >= 0
            && (local_x as usize) < self.width
            && (local_y as usize) < self.height
    }

    /// Tile at a world-tile coordinate, `None` outside the window.
    pub fn get(&self, tile_x: i32, tile_y: i32) -> Option<TileId> {
        if !self.contains(tile_x, tile_y) {
            return None;
        }
        let index = (tile_y - self.origin_y) as usize * self.width + (tile_x - self.origin_x) as usize;
        self.tiles.get(index).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[TileId]> {
        // chunks_exact panics on a zero size; an empty window simply has no rows.
        self.tiles.chunks_exact(self.width.max(1)).take(self.height)
    }

    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }
}

/// Stitches the chunks overlapping `request` into a dense window.
///
/// Walks the chunk grid rather than every tile, so each chunk is resolved once.
/// Cells with no loaded chunk stay empty, so an unloaded store yields an all-zero
/// window of the requested size.
pub fn extract_window(
    store: &LayeredChunkStore,
    layer: Layer,
    request: &WindowRequest,
) -> ScreenWindow {
    let (start_x, start_y, end_x, end_y) = request.bounds();
    let width = end_x.abs_diff(start_x) as usize;
    let height = end_y.abs_diff(start_y) as usize;
    let mut window = ScreenWindow::empty(start_x, start_y, width, height);
    if width == 0 || height == 0 {
        return window;
    }

    let layer_store = store.layer(layer);
    if layer_store.is_empty() {
        return window;
    }

    let first_chunk_x = tile_to_chunk_origin(start_x, CHUNK_SIZE);
    let first_chunk_y = tile_to_chunk_origin(start_y, CHUNK_SIZE);
    for chunk_y in (first_chunk_y..end_y).step_by(CHUNK_SIZE as usize) {
        for chunk_x in (first_chunk_x..end_x).step_by(CHUNK_SIZE as usize) {
            let key = ChunkKey {
                origin_x: chunk_x,
                origin_y: chunk_y,
            };
            let Some(chunk) = layer_store.get_by_key(key) else {
                continue;
            };

            let copy_x0 = chunk_x.max(start_x);
            let copy_x1 = chunk_x.saturating_add(CHUNK_SIZE).min(end_x);
            let copy_y0 = chunk_y.max(start_y);
            let copy_y1 = chunk_y.saturating_add(CHUNK_SIZE).min(end_y);
            let src_x0 = (copy_x0 - chunk_x) as usize;
            let src_x1 = (copy_x1 - chunk_x) as usize;
            let dst_x0 = (copy_x0 - start_x) as usize;
            let run = src_x1 - src_x0;

            for tile_y in copy_y0..copy_y1 {
                let src = &chunk.row((tile_y - chunk_y) as usize)[src_x0..src_x1];
                let dst_row = (tile_y - start_y) as usize * width;
                window.tiles[dst_row + dst_x0..dst_row + dst_x0 + run].copy_from_slice(src);
            }
        }
    }

    window
}

#[cfg(test)]
mod tests {
    use super::*;

    const AREA: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

    /// Every tile encodes its world coordinate so misplaced copies are visible.
    fn coded_chunk(origin_x: i32, origin_y: i32) -> Vec<TileId> {
        let mut tiles = Vec::with_capacity(AREA);
        for local_y in 0..CHUNK_SIZE {
            for local_x in 0..CHUNK_SIZE {
                tiles.push(tile_code(origin_x + local_x, origin_y + local_y));
            }
        }
        tiles
    }

    fn tile_code(tile_x: i32, tile_y: i32) -> TileId {
        ((tile_x + 1000) * 10_000 + (tile_y + 1000)) as TileId
    }

    fn request(focus_x: f32, focus_y: f32, half: f32, bias: i32) -> WindowRequest {
        WindowRequest {
            focus: Vec2::new(focus_x, focus_y),
            half_tiles_x: half,
            half_tiles_y: half,
            bias,
        }
    }

    #[test]
    fn window_matches_source_chunks_across_seams() {
        let mut store = LayeredChunkStore::default();
        for (origin_x, origin_y) in [(-32, -32), (0, -32), (-32, 0), (0, 0)] {
            store
                .insert_chunk(Layer::Foreground, origin_x, origin_y, coded_chunk(origin_x, origin_y))
                .expect("insert");
        }

        let window = extract_window(&store, Layer::Foreground, &request(0.5, 0.5, 10.0, 2));
        assert_eq!(window.origin_x(), -12);
        assert_eq!(window.origin_y(), -12);
        assert_eq!(window.width(), 25);
        assert_eq!(window.height(), 25);
        for tile_y in -12..13 {
            for tile_x in -12..13 {
                assert_eq!(
                    window.get(tile_x, tile_y),
                    Some(tile_code(tile_x, tile_y)),
                    "tile ({tile_x}, {tile_y})"
                );
            }
        }
    }

    #[test]
    fn adjacent_chunks_with_different_edges_stitch_exactly() {
        let mut store = LayeredChunkStore::default();
        store
            .insert_chunk(Layer::Foreground, 0, 0, vec![1; AREA])
            .expect("left");
        store
            .insert_chunk(Layer::Foreground, 32, 0, vec![2; AREA])
            .expect("right");

        let window = extract_window(&store, Layer::Foreground, &request(32.0, 16.0, 4.0, 0));
        assert_eq!(window.get(31, 16), Some(1));
        assert_eq!(window.get(32, 16), Some(2));
        assert_eq!(window.get(28, 12), Some(1));
        assert_eq!(window.get(35, 19), Some(2));
    }

    #[test]
    fn unloaded_area_is_all_zero_with_correct_size() {
        let store = LayeredChunkStore::default();
        let window = extract_window(&store, Layer::Background, &request(500.0, -500.0, 6.0, 1));
        assert_eq!(window.width(), 14);
        assert_eq!(window.height(), 14);
        assert_eq!(window.tiles().len(), 14 * 14);
        assert!(window.tiles().iter().all(|tile| *tile == EMPTY_TILE));
        assert_eq!(window.rows().count(), 14);
    }

    #[test]
    fn partially_loaded_window_leaves_gaps_empty() {
        let mut store = LayeredChunkStore::default();
        store
            .insert_chunk(Layer::Foreground, 0, 0, vec![9; AREA])
            .expect("insert");
        let window = extract_window(&store, Layer::Foreground, &request(0.0, 0.0, 3.0, 0));
        assert_eq!(window.get(-1, -1), Some(EMPTY_TILE));
        assert_eq!(window.get(0, 0), Some(9));
        assert_eq!(window.get(2, 2), Some(9));
        assert_eq!(window.get(-1, 2), Some(EMPTY_TILE));
        assert_eq!(window.get(100, 100), None);
    }

    #[test]
    fn far_focus_clamps_to_the_tile_range() {
        let mut store = LayeredChunkStore::default();
        store
            .insert_chunk(Layer::Foreground, 0, 0, vec![9; AREA])
            .expect("insert");
        for focus in [3.0e9, -3.0e9] {
            let window = extract_window(&store, Layer::Foreground, &request(focus, focus, 2.0, 2));
            assert_eq!(window.width(), 2);
            assert_eq!(window.height(), 2);
            assert!(window.tiles().iter().all(|tile| *tile == EMPTY_TILE));
            assert_eq!(window.get(i32::MAX, i32::MAX), None);
        }

        let last_origin = i32::MAX - i32::MAX.rem_euclid(CHUNK_SIZE);
        store
            .insert_chunk(Layer::Foreground, last_origin, 0, vec![7; AREA])
            .expect("insert edge chunk");
        let edge = extract_window(
            &store,
            Layer::Foreground,
            &request(2_147_483_520.0, 0.0, 2.0, 200),
        );
        assert_eq!(edge.origin_x() + edge.width() as i32, i32::MAX);
        assert_eq!(edge.get(last_origin, 0), Some(7));
        assert_eq!(edge.get(i32::MAX - 1, 0), Some(7));
        assert_eq!(edge.get(last_origin - 1, 0), Some(EMPTY_TILE));
    }

    #[test]
    fn viewport_request_rounds_half_extents_up() {
        let scale = TileScale::new(32.0, 1.0);
        let viewport = Viewport {
            width: 1000,
            height: 600,
        };
        let view = WindowRequest::for_viewport(Vec2::new(10.0, 10.0), viewport, &scale, 2);
        assert_eq!(view.half_tiles_x, 16.0);
        assert_eq!(view.half_tiles_y, 10.0);

        let update = WindowRequest::update_window(Vec2::new(10.0, 10.0), viewport, &scale, 2);
        assert_eq!(update.half_tiles_x, 48.0);
        assert_eq!(update.half_tiles_y, 30.0);
    }
}
