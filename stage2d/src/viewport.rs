//! Conversions between world, canvas and tile coordinates.
//!
//! World space: X right, Y up, (0, 0) at the real origin.
//! Canvas space: pixels, X right, Y down, (0, 0) at the canvas' top-left corner.

use glam::Affine2;

use crate::math::Vec2;

/// Origin fraction plus an integral pan offset over a canvas of a given size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Where world (0, 0) sits on the canvas, as a fraction of its size. (0.5, 0.5) is the center;
    /// the Y fraction is measured from the bottom.
    pub origin: Vec2,
    offset: (i32, i32),
    canvas_size: (u32, u32),
    /// Position of the canvas' top-left corner in client (pointer) coordinates.
    pub canvas_position: Vec2,
}

impl Viewport {
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            origin: Vec2::HALF,
            offset: (0, 0),
            canvas_size: (canvas_width, canvas_height),
            canvas_position: Vec2::ZERO,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas_size
    }

    /// Record a new canvas size, e.g. after the window was resized.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.canvas_size = (width, height);
    }

    pub fn offset(&self) -> (i32, i32) {
        self.offset
    }

    /// Set the pan offset, rounded to whole pixels.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = (offset.x.round() as i32, offset.y.round() as i32);
    }

    /// Pan by a pointer delta in canvas pixels. Dragging down moves the world down, which
    /// is a negative Y offset.
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.offset.0 += dx;
        self.offset.1 -= dy;
    }

    /// Canvas pixel that corresponds to world (0, 0).
    pub fn real_origin(&self) -> Vec2 {
        let (width, height) = self.canvas_size;
        Vec2::new(
            self.origin.x * width as f32 + self.offset.0 as f32,
            (1.0 - self.origin.y) * height as f32 - self.offset.1 as f32,
        )
    }

    /// The world to canvas mapping as an affine transform (translate then flip Y).
    pub fn world_to_canvas_transform(&self) -> Affine2 {
        let origin = self.real_origin().to_glam();
        Affine2::from_translation(origin) * Affine2::from_scale(glam::Vec2::new(1.0, -1.0))
    }

    pub fn world_to_canvas(&self, world: Vec2) -> Vec2 {
        self.world_to_canvas_transform()
            .transform_point2(world.to_glam())
            .into()
    }

    pub fn canvas_to_world(&self, canvas: Vec2) -> Vec2 {
        let origin = self.real_origin();
        Vec2::new(canvas.x - origin.x, origin.y - canvas.y)
    }

    /// Pointer position relative to the canvas' top-left corner.
    pub fn client_to_canvas(&self, client: Vec2) -> Vec2 {
        client - self.canvas_position
    }

    pub fn client_to_world(&self, client: Vec2) -> Vec2 {
        self.canvas_to_world(self.client_to_canvas(client))
    }

    /// Tile `(row, column)` under a pointer position.
    ///
    /// Tiles are centered on multiples of the tile size, so the index is shifted by half a tile
    /// before flooring the row and ceiling the column.
    pub fn client_to_tile(&self, client: Vec2, tile_size: Vec2) -> (i32, i32) {
        let canvas = self.client_to_canvas(client);
        let origin = self.real_origin();
        let row = 0.5 + (canvas.x - origin.x) / tile_size.x;
        let column = -0.5 + (origin.y - canvas.y) / tile_size.y;
        (row.floor() as i32, column.ceil() as i32)
    }

    /// Canvas-space top-left corner of the tile at `(row, column)`.
    pub fn tile_to_canvas(&self, row: i32, column: i32, tile_size: Vec2) -> Vec2 {
        let origin = self.real_origin();
        Vec2::new(
            origin.x + (row as f32 - 0.5) * tile_size.x,
            origin.y - (column as f32 + 0.5) * tile_size.y,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn centered_origin_maps_to_canvas_center() {
        let viewport = Viewport::new(800, 600);
        assert_eq!(viewport.real_origin(), Vec2::new(400.0, 300.0));
        assert_eq!(viewport.world_to_canvas(Vec2::ZERO), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn world_y_up_is_canvas_y_down() {
        let viewport = Viewport::new(800, 600);
        let canvas = viewport.world_to_canvas(Vec2::new(10.0, 20.0));
        assert_eq!(canvas, Vec2::new(410.0, 280.0));
    }

    #[test]
    fn offset_shifts_real_origin() {
        let mut viewport = Viewport::new(800, 600);
        viewport.set_offset(Vec2::new(10.4, 5.6));
        assert_eq!(viewport.offset(), (10, 6));
        assert_eq!(viewport.real_origin(), Vec2::new(410.0, 294.0));

        viewport.pan(5, 4);
        assert_eq!(viewport.offset(), (15, 2));
    }

    #[test]
    fn canvas_world_round_trip() {
        let mut viewport = Viewport::new(1024, 768).with_origin(Vec2::new(0.25, 0.8));
        viewport.set_offset(Vec2::new(-37.0, 12.0));
        for point in [
            Vec2::new(0.0, 0.0),
            Vec2::new(123.5, -987.25),
            Vec2::new(-4000.0, 3.0),
        ] {
            let back = viewport.canvas_to_world(viewport.world_to_canvas(point));
            assert!(approx(back, point), "{point:?} came back as {back:?}");
        }
    }

    #[test]
    fn client_position_accounts_for_canvas_position() {
        let mut viewport = Viewport::new(200, 100);
        viewport.canvas_position = Vec2::new(20.0, 10.0);
        assert_eq!(viewport.client_to_world(Vec2::new(120.0, 60.0)), Vec2::ZERO);
    }

    #[test]
    fn client_to_tile_floors_rows_and_ceils_columns() {
        let viewport = Viewport::new(640, 640);
        let tile = Vec2::splat(64.0);
        // Canvas center is inside tile (0, 0).
        assert_eq!(viewport.client_to_tile(Vec2::new(320.0, 320.0), tile), (0, 0));
        // Half a tile to the right lands on the boundary of row 1.
        assert_eq!(viewport.client_to_tile(Vec2::new(352.0, 320.0), tile), (1, 0));
        // Just below the center column boundary.
        assert_eq!(viewport.client_to_tile(Vec2::new(320.0, 353.0), tile), (0, -1));
        assert_eq!(viewport.client_to_tile(Vec2::new(250.0, 250.0), tile), (-1, 1));
    }

    #[test]
    fn tile_rectangle_contains_its_pointer_hits() {
        let viewport = Viewport::new(640, 480);
        let tile = Vec2::new(64.0, 32.0);
        let top_left = viewport.tile_to_canvas(2, -3, tile);
        let inside = top_left + Vec2::new(10.0, 10.0);
        assert_eq!(viewport.client_to_tile(inside, tile), (2, -3));
    }
}
