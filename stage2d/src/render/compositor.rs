use serde::{Deserialize, Serialize};

use super::canvas::{Canvas, Color, Rect};
use crate::assets::ImageHandle;
use crate::entities::Entity;
use crate::math::Vec2;
use crate::terrain::Terrain;
use crate::viewport::Viewport;
use crate::world::{EntityId, World};

/// Fill drawn over highlighted tiles.
pub const HIGHLIGHT_FILL: Color = Color::WHITE.with_alpha(102);
/// Stroke used for the tile grid.
pub const GRID_STROKE: Color = Color::WHITE;
/// Stroke used for collision borders.
pub const BORDER_STROKE: Color = Color::PURPLE;

/// Optional debug drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugOverlays {
    /// Lines between terrain tiles.
    pub tile_grid: bool,
    /// Collision border of every active physical entity.
    pub borders: bool,
    /// Translucent fill over highlighted tiles.
    pub tile_highlight: bool,
}

impl DebugOverlays {
    /// Every overlay enabled.
    pub fn all() -> Self {
        Self {
            tile_grid: true,
            borders: true,
            tile_highlight: true,
        }
    }
}

/// Draws the terrain, overlays and registered entities through a [`Viewport`].
pub struct Compositor {
    viewport: Viewport,
    terrain: Option<Terrain>,
    pub overlays: DebugOverlays,
    drawables: Vec<EntityId>,
}

impl Compositor {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            terrain: None,
            overlays: DebugOverlays::default(),
            drawables: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_overlays(mut self, overlays: DebugOverlays) -> Self {
        self.overlays = overlays;
        self
    }

    /// Add an entity to the draw list. Returns `false` if it was already registered.
    pub fn register_drawable(&mut self, id: EntityId) -> bool {
        if self.drawables.contains(&id) {
            return false;
        }
        self.drawables.push(id);
        true
    }

    /// Remove an entity from the draw list. Returns `false` if it was not registered.
    pub fn unregister_drawable(&mut self, id: EntityId) -> bool {
        let before = self.drawables.len();
        self.drawables.retain(|other| *other != id);
        self.drawables.len() != before
    }

    pub fn is_drawable(&self, id: EntityId) -> bool {
        self.drawables.contains(&id)
    }

    /// Registered drawables in registration order.
    pub fn drawables(&self) -> &[EntityId] {
        &self.drawables
    }

    /// Swap the terrain, returning the previous one.
    pub fn set_terrain(&mut self, terrain: Terrain) -> Option<Terrain> {
        self.terrain.replace(terrain)
    }

    pub fn take_terrain(&mut self) -> Option<Terrain> {
        self.terrain.take()
    }

    pub fn terrain(&self) -> Option<&Terrain> {
        self.terrain.as_ref()
    }

    pub fn terrain_mut(&mut self) -> Option<&mut Terrain> {
        self.terrain.as_mut()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Record a new canvas size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport.resize(width, height);
    }

    /// Tile under a pointer position, or `None` when no terrain is set.
    pub fn client_to_tile(&self, client: Vec2) -> Option<(i32, i32)> {
        let Some(terrain) = self.terrain.as_ref() else {
            log::warn!("client_to_tile called without a terrain");
            return None;
        };
        Some(self.viewport.client_to_tile(client, terrain.tile_size()))
    }

    /// Registered entities that still exist, sorted for drawing.
    ///
    /// Ascending layer first; within a layer, higher Y draws first so lower entities
    /// appear in front. The sort is stable.
    pub fn draw_order(&self, world: &World) -> Vec<EntityId> {
        let mut order: Vec<(EntityId, i32, f32)> = self
            .drawables
            .iter()
            .filter_map(|&id| {
                let sprite = &world.get(id)?.sprite;
                Some((id, sprite.layer, sprite.position.y))
            })
            .collect();
        order.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| b.2.total_cmp(&a.2)));
        order.into_iter().map(|(id, _, _)| id).collect()
    }

    /// Draw one frame. The viewport adopts the canvas size first.
    pub fn draw(&mut self, canvas: &mut dyn Canvas, world: &World) {
        let (width, height) = canvas.size();
        self.viewport.resize(width, height);

        canvas.clear_rect(Rect::new(0.0, 0.0, width as f32, height as f32));
        self.draw_terrain(canvas);
        if self.overlays.tile_grid {
            self.draw_tile_grid(canvas);
        }
        self.draw_entities(canvas, world);
    }

    fn draw_terrain(&self, canvas: &mut dyn Canvas) {
        let Some(terrain) = self.terrain.as_ref() else {
            return;
        };
        let tile_size = terrain.tile_size();
        canvas.set_fill_style(HIGHLIGHT_FILL);

        for tile in terrain.tiles() {
            let top_left = self.viewport.tile_to_canvas(tile.row, tile.column, tile_size);
            let rect = Rect::from_origin_size(top_left, tile_size).rounded();

            if let Some(image) = tile.image.as_ref().and_then(ImageHandle::image) {
                canvas.draw_image(&image, rect);
            }
            if self.overlays.tile_highlight && tile.highlighted {
                canvas.fill_rect(rect);
            }
        }
    }

    fn draw_tile_grid(&self, canvas: &mut dyn Canvas) {
        let Some(terrain) = self.terrain.as_ref() else {
            return;
        };
        let size = terrain.tile_size();
        if size.x <= 0.0 || size.y <= 0.0 {
            return;
        }
        let (width, height) = self.viewport.canvas_size();
        let (width, height) = (width as f32, height as f32);
        let origin = self.viewport.real_origin();

        canvas.set_stroke_style(GRID_STROKE);
        canvas.set_line_width(1.0);
        canvas.begin_path();

        let min_x = (0.5 - origin.x / size.x).ceil() as i32;
        let max_x = (0.5 + (width - origin.x) / size.x).floor() as i32;
        for i in min_x..=max_x {
            let x = (origin.x + (i as f32 - 0.5) * size.x).round();
            canvas.move_to(x, 0.0);
            canvas.line_to(x, height);
        }

        let min_y = (-0.5 + (origin.y - height) / size.y).ceil() as i32;
        let max_y = (-0.5 + origin.y / size.y).floor() as i32;
        for j in min_y..=max_y {
            let y = (origin.y - (j as f32 + 0.5) * size.y).round();
            canvas.move_to(0.0, y);
            canvas.line_to(width, y);
        }

        canvas.stroke();
    }

    fn draw_entities(&self, canvas: &mut dyn Canvas, world: &World) {
        let origin = self.viewport.real_origin();
        canvas.set_stroke_style(BORDER_STROKE);
        canvas.set_line_width(2.0);

        for id in self.draw_order(world) {
            let Some(entity) = world.get(id) else {
                continue;
            };

            if entity.may_render() {
                if let Some(image) = entity.sprite.image().and_then(ImageHandle::image) {
                    canvas.draw_image(&image, sprite_rect(entity, origin));
                }
            }

            if self.overlays.borders && entity.is_physical() && entity.is_active() {
                if let Some(border) = entity.border() {
                    canvas.stroke_rect(Rect::new(
                        origin.x + border.left,
                        origin.y - border.top,
                        border.width(),
                        border.height(),
                    ));
                }
            }
        }
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

/// Canvas rectangle of an entity's image: the pivot lands on the entity's position.
fn sprite_rect(entity: &Entity, origin: Vec2) -> Rect {
    let sprite = &entity.sprite;
    let size = sprite.size();
    Rect::new(
        origin.x + sprite.position.x - sprite.pivot.x * size.x,
        origin.y - (sprite.position.y + (1.0 - sprite.pivot.y) * size.y),
        size.x,
        size.y,
    )
    .rounded()
}

#[cfg(test)]
mod tests {
    use image::RgbaImage;

    use super::*;
    use crate::entities::{Body, Sprite};
    use crate::render::canvas::{DrawCall, RecordingCanvas};
    use crate::terrain::Tile;

    fn image(width: u32, height: u32) -> ImageHandle {
        ImageHandle::from_image("test", RgbaImage::new(width, height))
    }

    fn sprite_at(x: f32, y: f32) -> Sprite {
        Sprite::new(Some(image(20, 10))).with_position(Vec2::new(x, y))
    }

    fn spawn(world: &mut World, compositor: &mut Compositor, entity: Entity) -> EntityId {
        let id = world.spawn(entity);
        compositor.register_drawable(id);
        id
    }

    #[test]
    fn lower_entities_draw_later_within_a_layer() {
        let mut world = World::new();
        let mut compositor = Compositor::default();
        let top_layer = spawn(&mut world, &mut compositor, Entity::drawable(sprite_at(0.0, 100.0).with_layer(1)));
        let low = spawn(&mut world, &mut compositor, Entity::drawable(sprite_at(0.0, -5.0)));
        let high = spawn(&mut world, &mut compositor, Entity::drawable(sprite_at(0.0, 10.0)));

        assert_eq!(compositor.draw_order(&world), vec![high, low, top_layer]);
    }

    #[test]
    fn equal_keys_keep_registration_order() {
        let mut world = World::new();
        let mut compositor = Compositor::default();
        let first = spawn(&mut world, &mut compositor, Entity::drawable(sprite_at(3.0, 0.0)));
        let second = spawn(&mut world, &mut compositor, Entity::drawable(sprite_at(-3.0, 0.0)));
        assert_eq!(compositor.draw_order(&world), vec![first, second]);
    }

    #[test]
    fn image_is_placed_by_pivot_and_size() {
        let mut world = World::new();
        let mut compositor = Compositor::default();
        spawn(&mut world, &mut compositor, Entity::drawable(sprite_at(10.0, 20.0)));

        let mut canvas = RecordingCanvas::new(200, 100);
        compositor.draw(&mut canvas, &world);

        assert_eq!(canvas.calls()[0], DrawCall::Clear(Rect::new(0.0, 0.0, 200.0, 100.0)));
        assert_eq!(canvas.images(), vec![Rect::new(100.0, 25.0, 20.0, 10.0)]);
    }

    #[test]
    fn unresolved_and_hidden_sprites_are_skipped() {
        let mut world = World::new();
        let mut compositor = Compositor::default();
        let mut hidden = sprite_at(0.0, 0.0);
        hidden.visible = false;
        spawn(&mut world, &mut compositor, Entity::drawable(hidden));
        spawn(
            &mut world,
            &mut compositor,
            Entity::drawable(Sprite::new(Some(ImageHandle::pending("later.png")))),
        );

        let mut canvas = RecordingCanvas::new(64, 64);
        compositor.draw(&mut canvas, &world);
        assert!(canvas.images().is_empty());
    }

    #[test]
    fn unregistered_and_despawned_entities_are_not_drawn() {
        let mut world = World::new();
        let mut compositor = Compositor::default();
        let kept = spawn(&mut world, &mut compositor, Entity::drawable(sprite_at(0.0, 0.0)));
        let removed = spawn(&mut world, &mut compositor, Entity::drawable(sprite_at(5.0, 0.0)));
        let gone = spawn(&mut world, &mut compositor, Entity::drawable(sprite_at(9.0, 0.0)));

        assert!(compositor.unregister_drawable(removed));
        assert!(!compositor.unregister_drawable(removed));
        world.despawn(gone);

        assert_eq!(compositor.draw_order(&world), vec![kept]);
        assert!(!compositor.register_drawable(kept));
    }

    #[test]
    fn tiles_and_highlight_follow_the_tile_convention() {
        let world = World::new();
        let mut compositor = Compositor::default().with_overlays(DebugOverlays {
            tile_highlight: true,
            ..DebugOverlays::default()
        });
        let mut terrain = Terrain::new();
        terrain.set_tile(Tile::new(0, 0, Some(image(8, 8))));
        terrain.set_tile_highlight(0, 0, true);
        compositor.set_terrain(terrain);

        let mut canvas = RecordingCanvas::new(640, 480);
        compositor.draw(&mut canvas, &world);

        let tile_rect = Rect::new(288.0, 208.0, 64.0, 64.0);
        assert_eq!(canvas.images(), vec![tile_rect]);
        assert!(canvas.calls().contains(&DrawCall::Fill {
            rect: tile_rect,
            color: HIGHLIGHT_FILL,
        }));
    }

    #[test]
    fn highlight_is_not_drawn_with_the_overlay_off() {
        let world = World::new();
        let mut compositor = Compositor::default();
        let mut terrain = Terrain::new();
        terrain.set_tile_highlight(1, 1, true);
        compositor.set_terrain(terrain);

        let mut canvas = RecordingCanvas::new(640, 480);
        compositor.draw(&mut canvas, &world);
        assert_eq!(canvas.calls().len(), 1);
    }

    #[test]
    fn grid_lines_cover_the_visible_tiles() {
        let world = World::new();
        let mut compositor = Compositor::default().with_overlays(DebugOverlays {
            tile_grid: true,
            ..DebugOverlays::default()
        });
        compositor.set_terrain(Terrain::new());

        let mut canvas = RecordingCanvas::new(128, 128);
        compositor.draw(&mut canvas, &world);

        let lines: Vec<(Vec2, Vec2)> = canvas
            .calls()
            .iter()
            .filter_map(|call| match call {
                DrawCall::Line { from, to, color, line_width } => {
                    assert_eq!(*color, GRID_STROKE);
                    assert_eq!(*line_width, 1.0);
                    Some((*from, *to))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            lines,
            vec![
                (Vec2::new(32.0, 0.0), Vec2::new(32.0, 128.0)),
                (Vec2::new(96.0, 0.0), Vec2::new(96.0, 128.0)),
                (Vec2::new(0.0, 32.0), Vec2::new(128.0, 32.0)),
            ]
        );
    }

    #[test]
    fn borders_are_stroked_for_active_physical_entities() {
        let mut world = World::new();
        let mut compositor = Compositor::default().with_overlays(DebugOverlays {
            borders: true,
            ..DebugOverlays::default()
        });
        // No image: the border is still drawn.
        spawn(
            &mut world,
            &mut compositor,
            Entity::physical(
                Sprite::default().with_position(Vec2::new(10.0, 0.0)),
                Body::obstacle().with_border_size(Vec2::new(40.0, 20.0)),
            ),
        );
        let mut inactive = Body::obstacle();
        inactive.active = false;
        spawn(&mut world, &mut compositor, Entity::physical(Sprite::default(), inactive));
        spawn(&mut world, &mut compositor, Entity::drawable(sprite_at(0.0, 0.0)));

        let mut canvas = RecordingCanvas::new(200, 100);
        compositor.draw(&mut canvas, &world);

        let strokes: Vec<&DrawCall> = canvas
            .calls()
            .iter()
            .filter(|call| matches!(call, DrawCall::StrokeRect { .. }))
            .collect();
        assert_eq!(
            strokes,
            vec![&DrawCall::StrokeRect {
                rect: Rect::new(90.0, 40.0, 40.0, 20.0),
                color: BORDER_STROKE,
                line_width: 2.0,
            }]
        );
    }

    #[test]
    fn client_to_tile_needs_a_terrain() {
        let mut compositor = Compositor::new(Viewport::new(640, 640));
        assert_eq!(compositor.client_to_tile(Vec2::new(320.0, 320.0)), None);

        compositor.set_terrain(Terrain::new());
        assert_eq!(compositor.client_to_tile(Vec2::new(320.0, 320.0)), Some((0, 0)));
    }
}
