use std::time::Instant;

use anyhow::Result;
use image::{Rgba, RgbaImage};
use stage2d::{
    all_settled, Body, Controller, DebugOverlays, Engine, EngineConfig, EngineContext, Entity,
    Game, ImageHandle, MouseButton, MouseEventKind, Sprite, Terrain, Tile, Vec2,
};

/// Grass tiles around a tree, with a walking hero.
///
/// Middle-drag pans the view, hovering highlights the tile under the pointer and the
/// arrow keys (or WASD) move the hero, who cannot walk through the tree.
struct Meadow {
    grass: Option<ImageHandle>,
    tree: Option<ImageHandle>,
    started: bool,
}

impl Meadow {
    fn new() -> Self {
        Self {
            grass: None,
            tree: None,
            started: false,
        }
    }

    fn populate(&self, ctx: &mut EngineContext, grass: &ImageHandle, tree: &ImageHandle) {
        let scheduler = ctx.scheduler();

        if let Some(terrain) = scheduler.compositor_mut().terrain_mut() {
            for row in -2..=2 {
                for column in -2..=2 {
                    terrain.set_tile(Tile::new(row, column, Some(grass.clone())));
                }
            }
        }

        scheduler.spawn(Entity::physical(
            Sprite::new(Some(tree.clone()))
                .with_pivot(Vec2::new(0.5, 0.1))
                .with_uniform_scale(0.4),
            Body::obstacle().with_border_size(Vec2::new(250.0, 120.0)),
        ));
    }
}

impl Game for Meadow {
    fn init(&mut self, ctx: &mut EngineContext) -> Result<()> {
        let mut handles = ctx
            .resources()
            .add_images([("img/grass.png", Some("grass")), ("img/tree.png", Some("tree"))])
            .into_iter();
        self.grass = handles.next();
        self.tree = handles.next();

        let hero_image = ctx
            .resources()
            .insert_rgba("hero", RgbaImage::from_pixel(24, 40, Rgba([200, 70, 40, 255])));

        let scheduler = ctx.scheduler();
        scheduler.compositor_mut().set_terrain(Terrain::new());

        let hero = scheduler.spawn(Entity::actor(
            Sprite::new(Some(hero_image))
                .with_position(Vec2::new(0.0, -150.0))
                .with_pivot(Vec2::new(0.5, 0.0)),
            Controller::new(200.0),
        ));
        scheduler.route_keys_to(hero);

        let mut drag_from: Option<Vec2> = None;
        let mut highlighted: Option<(i32, i32)> = None;
        scheduler.register_mouse_handler(move |event, ctx| match event.kind {
            MouseEventKind::Down if event.button == Some(MouseButton::Middle) => {
                drag_from = Some(event.position);
            }
            MouseEventKind::Up if event.button == Some(MouseButton::Middle) => drag_from = None,
            MouseEventKind::Leave => drag_from = None,
            MouseEventKind::Move => {
                if let Some(from) = drag_from {
                    let delta = event.position - from;
                    ctx.compositor
                        .viewport_mut()
                        .pan(delta.x.round() as i32, delta.y.round() as i32);
                    drag_from = Some(event.position);
                }

                let Some((row, column)) = ctx.compositor.client_to_tile(event.position) else {
                    return;
                };
                if let Some(terrain) = ctx.compositor.terrain_mut() {
                    if let Some((last_row, last_column)) = highlighted {
                        if let Some(tile) = terrain.tile_mut(last_row, last_column) {
                            tile.highlighted = false;
                        }
                    }
                    terrain.set_tile_highlight(row, column, true);
                    highlighted = Some((row, column));
                }
            }
            _ => {}
        });

        Ok(())
    }

    fn update(&mut self, ctx: &mut EngineContext) -> Result<()> {
        if self.started {
            return Ok(());
        }
        let (Some(grass), Some(tree)) = (self.grass.clone(), self.tree.clone()) else {
            return Ok(());
        };
        if !all_settled([&grass, &tree]) {
            return Ok(());
        }

        for handle in [&grass, &tree] {
            if let Some(error) = handle.error() {
                log::warn!("{} will not be drawn: {error}", handle.source());
            }
        }

        self.populate(ctx, &grass, &tree);
        ctx.scheduler().start(Instant::now());
        self.started = true;
        log::info!("meadow ready");
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig {
            title: "Meadow".into(),
            width: 960,
            height: 640,
            overlays: DebugOverlays::all(),
            ..EngineConfig::default()
        },
    };

    Engine::from_config(config).run(Meadow::new())
}
